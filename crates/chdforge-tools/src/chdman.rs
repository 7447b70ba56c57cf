//! Disc conversion with chdman.

use std::fmt;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use chdforge_core::{Error, FormatMode, Result};
use chdforge_disc::DiscSet;

use crate::command::{StdioPolicy, ToolCommand};
use crate::workspace::{move_file, Workspace};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Name prefix of the artifact while it is being written in a workspace.
const STAGING_PREFIX: &str = ".staged-";

/// The chdman creation sub-command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscFormat {
    Cd,
    Dvd,
}

impl DiscFormat {
    pub fn subcommand(self) -> &'static str {
        match self {
            DiscFormat::Cd => "createcd",
            DiscFormat::Dvd => "createdvd",
        }
    }
}

impl fmt::Display for DiscFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscFormat::Cd => write!(f, "cd"),
            DiscFormat::Dvd => write!(f, "dvd"),
        }
    }
}

/// Pick the sub-command for a disc of `size_bytes`. Auto mode selects dvd
/// only when the size is strictly above the threshold.
pub fn select_format(mode: FormatMode, size_bytes: u64, threshold_mb: u64) -> DiscFormat {
    match mode {
        FormatMode::Cd => DiscFormat::Cd,
        FormatMode::Dvd => DiscFormat::Dvd,
        FormatMode::Auto => {
            if size_bytes > threshold_mb.saturating_mul(BYTES_PER_MB) {
                DiscFormat::Dvd
            } else {
                DiscFormat::Cd
            }
        }
    }
}

/// Runs chdman for resolved disc sets.
#[derive(Debug, Clone)]
pub struct Converter {
    program: PathBuf,
    stdio: StdioPolicy,
    mode: FormatMode,
    threshold_mb: u64,
    /// `--numprocessors`; 0 leaves the choice to chdman.
    processors: usize,
}

impl Converter {
    pub fn new(program: PathBuf, stdio: StdioPolicy, mode: FormatMode, threshold_mb: u64) -> Self {
        Self {
            program,
            stdio,
            mode,
            threshold_mb,
            processors: 0,
        }
    }

    pub fn with_processors(mut self, processors: usize) -> Self {
        self.processors = processors;
        self
    }

    /// Build `chdman <createcd|createdvd> [--numprocessors N] --input <in> --output <out>`.
    pub fn command(&self, format: DiscFormat, input: &Path, output: &Path) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.program.clone());
        cmd.arg(format.subcommand());
        if self.processors > 0 {
            cmd.arg("--numprocessors").arg(self.processors.to_string());
        }
        cmd.arg("--input")
            .arg(input)
            .arg("--output")
            .arg(output)
            .stdio(self.stdio);
        cmd
    }

    /// The sub-command this converter would use for `disc`.
    pub fn format_for(&self, disc: &DiscSet) -> DiscFormat {
        select_format(self.mode, disc.data_size(), self.threshold_mb)
    }

    /// Convert `disc` into `workspace`, then move the artifact to
    /// `disc.output`. Returns the final artifact path.
    ///
    /// # Errors
    ///
    /// - [`Error::ResolutionIncomplete`] when a referenced data file is
    ///   missing; chdman is not started.
    /// - [`Error::Cancelled`] when `cancel` fires; no artifact is left at
    ///   the destination.
    /// - [`Error::ConversionFailed`] naming the would-be output for every
    ///   other failure, including a zero exit without an artifact.
    pub async fn convert(
        &self,
        disc: &DiscSet,
        workspace: &Workspace,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        disc.ensure_complete()?;

        let format = self.format_for(disc);
        let file_name = disc
            .output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::conversion(&disc.output, "output path has no file name"))?;
        let staged = workspace.file(&format!("{STAGING_PREFIX}{file_name}"));

        tracing::debug!(
            "Converting {} as {format} to {}",
            disc.primary.display(),
            disc.output.display()
        );

        self.command(format, &disc.primary, &staged)
            .execute(cancel)
            .await
            .map_err(|e| match e {
                Error::Cancelled => e,
                other => Error::conversion(&disc.output, other.to_string()),
            })?;

        if !staged.is_file() {
            return Err(Error::conversion(
                &disc.output,
                "chdman exited successfully but produced no file",
            ));
        }

        move_file(&staged, &disc.output)
            .map_err(|e| Error::conversion(&disc.output, format!("failed to move artifact: {e}")))?;

        Ok(disc.output.clone())
    }
}
