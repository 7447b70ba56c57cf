//! External tool detection.
//!
//! The [`ToolRegistry`] resolves the configured commands for `chdman` and
//! `7z` to executable paths once at startup, so a missing tool is reported
//! before any job runs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chdforge_core::config::{expand_path, ToolsConfig};
use chdforge_core::{Error, Result};

/// Registry key of the disc-conversion tool.
pub const CHDMAN: &str = "chdman";

/// Registry key of the archive tool.
pub const SEVENZIP: &str = "7z";

/// Tools the registry manages, in listing order.
const KNOWN_TOOLS: &[&str] = &[CHDMAN, SEVENZIP];

/// A configured tool and where it resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolEntry {
    /// Registry key (e.g. "chdman").
    pub name: &'static str,
    /// The command as configured.
    pub command: String,
    /// Resolved executable, if found.
    pub path: Option<PathBuf>,
}

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub available: bool,
    /// First line the tool prints when run without arguments.
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

/// Registry holding resolved tool locations.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: HashMap<&'static str, ToolEntry>,
}

impl ToolRegistry {
    /// Resolve each known tool from its configured command.
    ///
    /// A command containing a path separator (or a leading `~`) is treated
    /// as a path and must exist; a bare name is looked up in `PATH` with
    /// [`which::which`]. Tools that cannot be resolved stay in the registry
    /// without a path.
    pub fn discover(config: &ToolsConfig) -> Self {
        let mut tools = HashMap::new();

        for &name in KNOWN_TOOLS {
            let command = match name {
                CHDMAN => config.chdman.clone(),
                _ => config.sevenzip.clone(),
            };
            let path = resolve_command(&command);
            match &path {
                Some(p) => tracing::debug!("Resolved {name} to {}", p.display()),
                None => tracing::debug!("{name} not found (command: {command})"),
            }
            tools.insert(
                name,
                ToolEntry {
                    name,
                    command,
                    path,
                },
            );
        }

        Self { tools }
    }

    /// Path of the given tool, or [`Error::ToolNotFound`].
    pub fn require(&self, name: &str) -> Result<&Path> {
        self.tools
            .get(name)
            .and_then(|entry| entry.path.as_deref())
            .ok_or_else(|| {
                let command = self
                    .tools
                    .get(name)
                    .map(|entry| entry.command.clone())
                    .unwrap_or_else(|| name.to_string());
                Error::tool_not_found(command)
            })
    }

    /// Require several tools at once, reporting the first missing one.
    pub fn require_all(&self, names: &[&str]) -> Result<()> {
        for name in names {
            self.require(name)?;
        }
        Ok(())
    }

    /// Check all known tools and return availability information.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        self.iter()
            .map(|entry| ToolInfo {
                name: entry.name.to_string(),
                available: entry.path.is_some(),
                version: entry.path.as_deref().and_then(detect_version),
                path: entry.path.clone(),
            })
            .collect()
    }

    /// Iterate over the registered tools in listing order.
    pub fn iter(&self) -> impl Iterator<Item = &ToolEntry> {
        KNOWN_TOOLS.iter().filter_map(|name| self.tools.get(name))
    }
}

fn resolve_command(command: &str) -> Option<PathBuf> {
    let looks_like_path = command.starts_with('~') || command.contains(std::path::MAIN_SEPARATOR);
    if looks_like_path {
        let path = expand_path(command);
        return path.is_file().then_some(path);
    }
    which::which(command).ok()
}

/// Neither tool has a version flag; both print a banner line when run
/// without arguments.
fn detect_version(path: &Path) -> Option<String> {
    let output = std::process::Command::new(path)
        .stdin(std::process::Stdio::null())
        .output()
        .ok()?;

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}
