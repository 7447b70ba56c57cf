//! Archive extraction with 7-Zip.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use chdforge_core::{Error, Result};
use chdforge_disc::list_files;

use crate::command::{StdioPolicy, ToolCommand};
use crate::workspace::Workspace;

/// Runs `7z x` into job workspaces.
#[derive(Debug, Clone)]
pub struct Extractor {
    program: PathBuf,
    stdio: StdioPolicy,
    /// Other jobs share the terminal.
    parallel: bool,
}

impl Extractor {
    pub fn new(program: PathBuf, stdio: StdioPolicy) -> Self {
        Self {
            program,
            stdio,
            parallel: stdio == StdioPolicy::Parallel,
        }
    }

    /// Mark the extractor as running alongside other jobs, independent of
    /// the stdio policy (quiet output still runs in parallel).
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Build the extraction command: `7z x [-y] [-bd] -o<dest> <archive>`.
    ///
    /// `-y` answers prompts whenever the user cannot; `-bd` drops the
    /// progress indicator when several tools share the terminal.
    pub fn command(&self, archive: &Path, dest: &Path) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.program.clone());
        cmd.arg("x");
        if !self.stdio.is_interactive() {
            cmd.arg("-y");
        }
        if self.parallel {
            cmd.arg("-bd");
        }

        let mut out = OsString::from("-o");
        out.push(dest.as_os_str());
        cmd.arg(out).arg(archive).stdio(self.stdio);
        cmd
    }

    /// Extract `archive` into `workspace` and list the extracted files.
    ///
    /// # Errors
    ///
    /// [`Error::Cancelled`] passes through unchanged; every other failure
    /// (missing tool, non-zero exit, empty result) becomes
    /// [`Error::ExtractionFailed`] naming the archive.
    pub async fn extract(
        &self,
        archive: &Path,
        workspace: &Workspace,
        cancel: &CancellationToken,
    ) -> Result<Vec<PathBuf>> {
        self.command(archive, workspace.path())
            .execute(cancel)
            .await
            .map_err(|e| match e {
                Error::Cancelled => e,
                other => Error::extraction(archive, other.to_string()),
            })?;

        let files = list_files(workspace.path(), true);
        if files.is_empty() {
            return Err(Error::extraction(archive, "archive contained no files"));
        }

        tracing::debug!(
            "Extracted {} file(s) from {}",
            files.len(),
            archive.display()
        );
        Ok(files)
    }
}
