//! Unified error type for chdforge.
//!
//! Every per-job failure is represented here so the scheduler can decide the
//! terminal state of a job from the error alone: [`Error::Cancelled`] ends a
//! job as cancelled, everything else ends it as failed.

use std::path::PathBuf;

/// Unified error type covering all failure modes in chdforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input path has no supported extension or does not exist.
    #[error("unsupported input: {}", path.display())]
    Unsupported {
        /// The offending input path.
        path: PathBuf,
    },

    /// A sheet file references data files that cannot be found.
    #[error("incomplete disc set {}: {message}", sheet.display())]
    ResolutionIncomplete {
        /// The sheet (cue/gdi) file.
        sheet: PathBuf,
        /// The output path that would have been created.
        output: PathBuf,
        /// Which references are missing.
        message: String,
    },

    /// The archive tool failed or the archive yielded nothing to convert.
    #[error("extraction failed [{}]: {message}", archive.display())]
    ExtractionFailed {
        /// The archive being extracted.
        archive: PathBuf,
        /// Human-readable error description.
        message: String,
    },

    /// The conversion tool failed or did not produce its artifact.
    #[error("conversion failed [{}]: {message}", output.display())]
    ConversionFailed {
        /// The output path that would have been created.
        output: PathBuf,
        /// Human-readable error description.
        message: String,
    },

    /// An external tool returned an error or could not be spawned.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// A required external tool is not installed.
    #[error("tool not found: {tool}")]
    ToolNotFound {
        /// The command name or path that was looked up.
        tool: String,
    },

    /// The job was cancelled by the user.
    #[error("cancelled")]
    Cancelled,

    /// The configuration is invalid.
    #[error("Config error: {0}")]
    Config(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

impl Error {
    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::ToolNotFound`].
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Error::ToolNotFound { tool: tool.into() }
    }

    /// Convenience constructor for [`Error::ExtractionFailed`].
    pub fn extraction(archive: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::ExtractionFailed {
            archive: archive.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::ConversionFailed`].
    pub fn conversion(output: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::ConversionFailed {
            output: output.into(),
            message: message.into(),
        }
    }

    /// Whether this error is a user cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// The path a job line should report for this error, if the error
    /// carries one.
    pub fn failed_path(&self) -> Option<&std::path::Path> {
        match self {
            Error::Unsupported { path } => Some(path),
            Error::ResolutionIncomplete { output, .. } => Some(output),
            Error::ExtractionFailed { archive, .. } => Some(archive),
            Error::ConversionFailed { output, .. } => Some(output),
            _ => None,
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
