//! Configuration file model.
//!
//! The top-level [`Config`] is deserialized from TOML. Every section
//! defaults sensibly so an empty file (or no file at all) is valid.
//! Command-line flags are layered on top of this by the binary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::{Error, Result};

/// Default size above which `auto` mode picks the DVD sub-command.
pub const DEFAULT_AUTO_THRESHOLD_MB: u64 = 750;

/// Default worker count for bounded-parallel mode.
pub const DEFAULT_THREADS: usize = 2;

/// Locations searched when no explicit config path is given.
const DEFAULT_PATHS: &[&str] = &["./chdforge.toml", "~/.config/chdforge/config.toml"];

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub output: OutputConfig,
    pub convert: ConvertConfig,
    pub run: RunConfig,
}

/// External tool commands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolsConfig {
    /// Command name or path of the disc-conversion tool.
    pub chdman: String,
    /// Command name or path of the archive tool.
    pub sevenzip: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            chdman: "chdman".to_string(),
            sevenzip: "7z".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Destination directory; `None` keeps each artifact beside its input.
    pub dir: Option<PathBuf>,
    /// Root for job workspaces; `None` uses the destination directory.
    pub temp_dir: Option<PathBuf>,
    /// Name archive-derived artifacts after the archive.
    pub rename: bool,
    /// Skip jobs whose artifact already exists.
    pub skip_existing: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: None,
            temp_dir: None,
            rename: true,
            skip_existing: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConvertConfig {
    pub mode: FormatMode,
    pub auto_threshold_mb: u64,
    /// Forwarded as `--numprocessors`; 0 leaves it to the tool.
    pub processors: usize,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            mode: FormatMode::default(),
            auto_threshold_mb: DEFAULT_AUTO_THRESHOLD_MB,
            processors: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    pub parallel: bool,
    /// Worker count in parallel mode; 0 means one per logical CPU.
    pub threads: usize,
    /// First cancellation aborts the whole run instead of the current job.
    pub hard_cancel: bool,
    /// Descend into sub-directories of directory inputs.
    pub recursive: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            threads: DEFAULT_THREADS,
            hard_cancel: false,
            recursive: false,
        }
    }
}

/// Requested disc format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatMode {
    #[default]
    Cd,
    Dvd,
    /// Choose per disc from the size of its data.
    Auto,
}

impl FromStr for FormatMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cd" => Ok(FormatMode::Cd),
            "dvd" => Ok(FormatMode::Dvd),
            "auto" => Ok(FormatMode::Auto),
            _ => Err(format!("unknown format mode: {s} (expected cd, dvd or auto)")),
        }
    }
}

impl fmt::Display for FormatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FormatMode::Cd => "cd",
            FormatMode::Dvd => "dvd",
            FormatMode::Auto => "auto",
        })
    }
}

impl Config {
    /// Parse a configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(content).map_err(|e| Error::Config(format!("parse error: {e}")))?;
        config.expand_paths();
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Load from `custom_path`, or the first default location that exists,
    /// or return defaults.
    pub fn load_or_default(custom_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = custom_path {
            return Self::load(path);
        }

        for candidate in DEFAULT_PATHS {
            let path = expand_path(candidate);
            if path.is_file() {
                tracing::debug!("Using config file {}", path.display());
                return Self::load(&path);
            }
        }

        Ok(Self::default())
    }

    fn expand_paths(&mut self) {
        self.output.dir = self.output.dir.as_deref().map(expand_os_path);
        self.output.temp_dir = self.output.temp_dir.as_deref().map(expand_os_path);
    }
}

/// Expand `~` and environment variables in a user-supplied path.
///
/// Unknown variables are left untouched rather than treated as errors.
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(raw).as_ref()),
    }
}

fn expand_os_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(raw) => expand_path(raw),
        None => path.to_path_buf(),
    }
}
