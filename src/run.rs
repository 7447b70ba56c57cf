//! One invocation: discover, check tools, schedule, summarize.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use chdforge_core::Result;
use chdforge_disc::discover;
use chdforge_tools::{Converter, Extractor, ToolRegistry, CHDMAN, SEVENZIP};

use crate::cancel::{listen_for_signals, CancelController};
use crate::job::{jobs_from, Job};
use crate::pipeline::{DiscPipeline, JobRunner};
use crate::report::{self, Reporter};
use crate::scheduler::Scheduler;
use crate::settings::Settings;
use crate::summary::{RunSummary, SummarySnapshot};

/// How a run ended, mapped to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every job completed, or every job was skipped.
    Success,
    /// At least one job failed, was cancelled, or a mix of completed and
    /// skipped jobs remained.
    Incomplete,
    /// The user stopped the whole run.
    HardCancelled,
}

impl RunOutcome {
    pub fn from_summary(snapshot: &SummarySnapshot, hard_cancelled: bool) -> Self {
        if hard_cancelled {
            RunOutcome::HardCancelled
        } else if snapshot.all_succeeded() {
            RunOutcome::Success
        } else {
            RunOutcome::Incomplete
        }
    }

    pub fn exit_code(self) -> u8 {
        match self {
            RunOutcome::Success => 0,
            RunOutcome::Incomplete => 1,
            RunOutcome::HardCancelled => 130,
        }
    }
}

/// Tools the queued jobs will need; nothing for a dry run.
pub fn required_tools(jobs: &[Job], dry_run: bool) -> Vec<&'static str> {
    if dry_run {
        return Vec::new();
    }
    let mut tools = Vec::new();
    if jobs.iter().any(|job| !job.is_unsupported()) {
        tools.push(CHDMAN);
    }
    if jobs.iter().any(Job::is_archive) {
        tools.push(SEVENZIP);
    }
    tools
}

/// Build the pipeline that runs real jobs from resolved tool paths.
pub fn build_pipeline(settings: &Settings, registry: &ToolRegistry) -> DiscPipeline {
    let stdio = settings.stdio_policy();
    let sevenzip = registry
        .require(SEVENZIP)
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|_| settings.tools.sevenzip.clone().into());
    let chdman = registry
        .require(CHDMAN)
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|_| settings.tools.chdman.clone().into());

    let extractor = Extractor::new(sevenzip, stdio).with_parallel(settings.parallel);
    let converter = Converter::new(chdman, stdio, settings.mode, settings.auto_threshold_mb)
        .with_processors(settings.processors);

    DiscPipeline::new(extractor, converter, settings.output_plan())
        .with_temp_root(settings.temp_dir.clone())
        .with_skip_existing(settings.skip_existing)
}

/// Execute a full run with the given runner.
///
/// # Errors
///
/// [`chdforge_core::Error::ToolNotFound`] when a tool the queue needs is
/// missing; no job is started in that case.
pub async fn run_with(
    settings: &Settings,
    registry: &ToolRegistry,
    runner: Arc<dyn JobRunner>,
) -> Result<RunOutcome> {
    let started_at = Instant::now();

    let jobs = jobs_from(discover(&settings.inputs, &settings.discover_options()));
    registry.require_all(&required_tools(&jobs, settings.dry_run))?;

    if settings.stats {
        report::print_queue_size(jobs.len());
    }

    let cancel = Arc::new(CancelController::new(settings.hard_cancel));
    let summary = Arc::new(RunSummary::new());
    let scheduler = Scheduler::new(
        runner,
        cancel.clone(),
        summary.clone(),
        Reporter::new(settings.names),
        settings.scheduler_options(),
    );

    let stop_listening = CancellationToken::new();
    let listener = tokio::spawn(listen_for_signals(cancel.clone(), stop_listening.clone()));

    let finished = scheduler.run(jobs).await;

    stop_listening.cancel();
    if let Err(e) = listener.await {
        tracing::debug!("Signal listener ended abnormally: {e}");
    }

    let snapshot = summary.snapshot();
    tracing::debug!(jobs = finished.len(), "Run finished: {snapshot:?}");
    if settings.stats {
        report::print_stats(&snapshot, started_at.elapsed());
    }

    Ok(RunOutcome::from_summary(&snapshot, cancel.is_hard_cancelled()))
}

/// Execute a full run with the real extraction and conversion pipeline.
pub async fn run(settings: &Settings, registry: &ToolRegistry) -> Result<RunOutcome> {
    let pipeline = build_pipeline(settings, registry);
    run_with(settings, registry, Arc::new(pipeline)).await
}
