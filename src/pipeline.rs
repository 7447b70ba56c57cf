//! Per-job execution: workspace, extraction and conversion.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use chdforge_core::{Error, Result};
use chdforge_disc::{resolve_extracted, DiscSet, Discovered, OutputPlan};
use chdforge_tools::{Converter, Extractor, Workspace};

use crate::job::Job;

/// What a successful job left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutput {
    /// Artifacts written by this job.
    Produced(Vec<PathBuf>),
    /// Nothing was written because every artifact already existed.
    Existing(Vec<PathBuf>),
}

/// Runs one job to completion.
///
/// [`Error::Cancelled`] means the job was stopped by its token; every
/// other error is a failure.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, job: &Job, cancel: &CancellationToken) -> Result<JobOutput>;
}

/// The real runner: converts discs with chdman, extracting archives with
/// 7z first.
pub struct DiscPipeline {
    extractor: Extractor,
    converter: Converter,
    plan: OutputPlan,
    /// Workspace root; `None` puts each workspace beside the job's output.
    temp_root: Option<PathBuf>,
    skip_existing: bool,
}

impl DiscPipeline {
    pub fn new(extractor: Extractor, converter: Converter, plan: OutputPlan) -> Self {
        Self {
            extractor,
            converter,
            plan,
            temp_root: None,
            skip_existing: true,
        }
    }

    pub fn with_temp_root(mut self, temp_root: Option<PathBuf>) -> Self {
        self.temp_root = temp_root;
        self
    }

    pub fn with_skip_existing(mut self, skip_existing: bool) -> Self {
        self.skip_existing = skip_existing;
        self
    }

    fn acquire(&self, output: &Path, cancel: &CancellationToken) -> Result<Workspace> {
        checkpoint(cancel)?;
        let root = match &self.temp_root {
            Some(root) => root.as_path(),
            None => output.parent().unwrap_or_else(|| Path::new(".")),
        };
        Workspace::acquire(root)
    }

    async fn run_disc(
        &self,
        disc: &DiscSet,
        workspace: &Workspace,
        cancel: &CancellationToken,
    ) -> Result<JobOutput> {
        checkpoint(cancel)?;
        let output = self.converter.convert(disc, workspace, cancel).await?;
        Ok(JobOutput::Produced(vec![output]))
    }

    async fn run_archive(
        &self,
        archive: &Path,
        workspace: &Workspace,
        cancel: &CancellationToken,
    ) -> Result<JobOutput> {
        checkpoint(cancel)?;
        let files = self.extractor.extract(archive, workspace, cancel).await?;

        let discs = resolve_extracted(&files, archive, &self.plan);
        if discs.is_empty() {
            return Err(Error::extraction(archive, "no disc images found in archive"));
        }

        let mut produced = Vec::with_capacity(discs.len());
        let mut existing = Vec::new();
        for disc in &discs {
            if self.skip_existing && disc.output.exists() {
                tracing::info!("Output exists, not converting: {}", disc.output.display());
                existing.push(disc.output.clone());
                continue;
            }
            checkpoint(cancel)?;
            produced.push(self.converter.convert(disc, workspace, cancel).await?);
        }

        if produced.is_empty() {
            Ok(JobOutput::Existing(existing))
        } else {
            Ok(JobOutput::Produced(produced))
        }
    }
}

#[async_trait]
impl JobRunner for DiscPipeline {
    async fn run(&self, job: &Job, cancel: &CancellationToken) -> Result<JobOutput> {
        let (workspace, result) = match &job.source {
            Discovered::Disc(disc) => {
                let workspace = self.acquire(&disc.output, cancel)?;
                let result = self.run_disc(disc, &workspace, cancel).await;
                (workspace, result)
            }
            Discovered::Archive { path, output } => {
                let workspace = self.acquire(output, cancel)?;
                let result = self.run_archive(path, &workspace, cancel).await;
                (workspace, result)
            }
            Discovered::Unsupported(path) => {
                return Err(Error::Unsupported { path: path.clone() });
            }
        };

        release(workspace, job.seq);
        result
    }
}

/// Cooperative cancellation point between stages.
fn checkpoint(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(Error::Cancelled)
    } else {
        Ok(())
    }
}

fn release(workspace: Workspace, seq: usize) {
    let path = workspace.path().to_path_buf();
    if let Err(e) = workspace.release() {
        tracing::warn!(job = seq, "Failed to remove workspace {}: {e}", path.display());
    }
}
