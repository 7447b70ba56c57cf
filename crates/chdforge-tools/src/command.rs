//! Builder for executing external tool commands with cancellation support.

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use chdforge_core::{Error, Result};

/// How long a failed tool waits for a pending cancellation to show up.
const CANCEL_GRACE: Duration = Duration::from_millis(100);

/// How the standard streams of a tool are wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StdioPolicy {
    /// Inherit all streams; the user sees progress and can answer prompts.
    #[default]
    Inherit,
    /// Capture and discard all output; stdin is closed.
    Quiet,
    /// Stdout is shown, stderr is captured and stdin is closed, so that
    /// concurrent tools never block on a prompt.
    Parallel,
}

impl StdioPolicy {
    /// Whether the tool may interact with the terminal.
    pub fn is_interactive(self) -> bool {
        matches!(self, StdioPolicy::Inherit)
    }
}

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8); empty unless captured.
    pub stdout: String,
    /// Captured standard error (lossy UTF-8); empty unless captured.
    pub stderr: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use chdforge_tools::{StdioPolicy, ToolCommand};
/// use std::path::PathBuf;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> chdforge_core::Result<()> {
/// let cancel = CancellationToken::new();
/// ToolCommand::new(PathBuf::from("chdman"))
///     .arg("createcd")
///     .arg("--input").arg("game.cue")
///     .arg("--output").arg("game.chd")
///     .stdio(StdioPolicy::Quiet)
///     .execute(&cancel)
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
    stdio: StdioPolicy,
}

impl ToolCommand {
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            stdio: StdioPolicy::default(),
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl AsRef<OsStr>) -> &mut Self {
        self.args.push(s.as_ref().to_os_string());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl AsRef<OsStr>>) -> &mut Self {
        self.args
            .extend(iter.into_iter().map(|s| s.as_ref().to_os_string()));
        self
    }

    pub fn stdio(&mut self, policy: StdioPolicy) -> &mut Self {
        self.stdio = policy;
        self
    }

    /// The arguments added so far.
    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Short tool name for messages.
    pub fn name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// The full command line, for logging.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|s| s.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the command to completion, or kill it when `cancel` fires.
    ///
    /// # Errors
    ///
    /// - [`Error::Cancelled`] if `cancel` is already cancelled (the process
    ///   is not started) or fires while the process runs (it is killed and
    ///   reaped before returning).
    /// - [`Error::ToolNotFound`] if the program does not exist.
    /// - [`Error::Tool`] if spawning fails or the process exits with a
    ///   non-zero status (message includes captured stderr).
    pub async fn execute(&self, cancel: &CancellationToken) -> Result<ToolOutput> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let name = self.name();
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).kill_on_drop(true);

        match self.stdio {
            StdioPolicy::Inherit => {}
            StdioPolicy::Quiet => {
                cmd.stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped());
            }
            StdioPolicy::Parallel => {
                cmd.stdin(Stdio::null()).stderr(Stdio::piped());
            }
        }

        tracing::debug!("Running: {}", self.display());

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::tool_not_found(self.program.display().to_string()),
            _ => Error::tool(&name, format!("failed to spawn: {e}")),
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (status, stdout, stderr) = tokio::select! {
            (status, stdout, stderr) = async {
                tokio::join!(child.wait(), drain(stdout), drain(stderr))
            } => (status, stdout, stderr),
            () = cancel.cancelled() => {
                tracing::debug!("Killing {name} after cancellation");
                if let Err(e) = child.kill().await {
                    tracing::warn!("Failed to kill {name}: {e}");
                }
                return Err(Error::Cancelled);
            }
        };

        let status = status.map_err(|e| Error::tool(&name, format!("I/O error waiting for process: {e}")))?;

        let output = ToolOutput {
            status,
            stdout: String::from_utf8_lossy(&stdout).to_string(),
            stderr: String::from_utf8_lossy(&stderr).to_string(),
        };

        if !status.success() {
            // A terminal Ctrl+C reaches the child as well as this process;
            // let the signal listener record it before calling this a failure.
            if tokio::time::timeout(CANCEL_GRACE, cancel.cancelled())
                .await
                .is_ok()
            {
                return Err(Error::Cancelled);
            }

            let detail = output.stderr.trim();
            let message = if detail.is_empty() {
                format!("exited with {status}")
            } else {
                format!("exited with {status}: {}", last_lines(detail, 5))
            };
            return Err(Error::tool(name, message));
        }

        Ok(output)
    }
}

async fn drain<R: AsyncRead + Unpin>(reader: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        if let Err(e) = reader.read_to_end(&mut buf).await {
            tracing::debug!("Failed to read tool output: {e}");
        }
    }
    buf
}

fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}
