//! Effective settings: the configuration file overlaid with command-line
//! options.

use std::path::{Path, PathBuf};

use chdforge_core::config::{expand_path, ToolsConfig};
use chdforge_core::{Config, Error, FormatMode, Result};
use chdforge_disc::{DiscoverOptions, OutputPlan};
use chdforge_tools::StdioPolicy;

use crate::cli::Cli;
use crate::scheduler::SchedulerOptions;

/// Merged, validated settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub inputs: Vec<PathBuf>,
    /// No inputs were given, so the current directory is listed instead.
    pub fallback: bool,
    pub tools: ToolsConfig,
    pub output_dir: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
    pub rename: bool,
    pub skip_existing: bool,
    pub mode: FormatMode,
    pub auto_threshold_mb: u64,
    pub processors: usize,
    pub parallel: bool,
    /// Concurrent jobs; always 1 in sequential mode.
    pub workers: usize,
    pub hard_cancel: bool,
    pub recursive: bool,
    pub quiet: bool,
    pub names: bool,
    pub stats: bool,
    pub dry_run: bool,
}

impl Settings {
    /// Overlay `cli` onto `config`. `stdin_paths` are the paths read from
    /// stdin when `-` was given.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when the output or temp directory does not exist.
    pub fn resolve(cli: &Cli, config: Config, stdin_paths: Vec<String>) -> Result<Self> {
        let mut inputs = Vec::new();
        for raw in cli
            .paths
            .iter()
            .filter(|p| p.as_str() != "-")
            .chain(stdin_paths.iter())
        {
            let path = expand_path(raw);
            if !inputs.contains(&path) {
                inputs.push(path);
            }
        }

        let fallback = inputs.is_empty() && !cli.reads_stdin();
        if fallback {
            inputs.push(PathBuf::from("."));
        }

        let mut tools = config.tools;
        if let Some(cmd) = &cli.chdman {
            tools.chdman = cmd.clone();
        }
        if let Some(cmd) = &cli.sevenzip {
            tools.sevenzip = cmd.clone();
        }

        let output_dir = cli
            .output_dir
            .as_deref()
            .map(expand_os)
            .or(config.output.dir);
        let temp_dir = cli
            .temp_dir
            .as_deref()
            .map(expand_os)
            .or(config.output.temp_dir);
        existing_dir("output directory", output_dir.as_deref())?;
        existing_dir("temp directory", temp_dir.as_deref())?;

        let parallel = cli.parallel || config.run.parallel;
        let threads = cli.threads.unwrap_or(config.run.threads);
        let workers = if !parallel {
            1
        } else if threads == 0 {
            num_cpus::get()
        } else {
            threads
        };

        Ok(Self {
            inputs,
            fallback,
            tools,
            output_dir,
            temp_dir,
            rename: config.output.rename && !cli.no_rename,
            skip_existing: config.output.skip_existing && !cli.overwrite,
            mode: cli.mode.unwrap_or(config.convert.mode),
            auto_threshold_mb: cli.auto_threshold.unwrap_or(config.convert.auto_threshold_mb),
            processors: cli.chd_processors.unwrap_or(config.convert.processors),
            parallel,
            workers,
            hard_cancel: cli.hard_cancel || config.run.hard_cancel,
            recursive: cli.recursive || config.run.recursive,
            quiet: cli.quiet,
            names: cli.names,
            stats: cli.stats,
            dry_run: cli.dry_run || fallback,
        })
    }

    pub fn stdio_policy(&self) -> StdioPolicy {
        if self.quiet {
            StdioPolicy::Quiet
        } else if self.parallel {
            StdioPolicy::Parallel
        } else {
            StdioPolicy::Inherit
        }
    }

    pub fn output_plan(&self) -> OutputPlan {
        OutputPlan::new(self.output_dir.clone(), self.rename)
    }

    pub fn discover_options(&self) -> DiscoverOptions {
        DiscoverOptions {
            recursive: self.recursive,
            plan: self.output_plan(),
        }
    }

    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            workers: self.workers,
            dry_run: self.dry_run,
            skip_existing: self.skip_existing,
        }
    }
}

/// Split stdin text into paths: one per line, blank lines and duplicates
/// dropped.
pub fn parse_path_lines(text: &str) -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || paths.iter().any(|p| p == line) {
            continue;
        }
        paths.push(line.to_string());
    }
    paths
}

fn existing_dir(what: &str, dir: Option<&Path>) -> Result<()> {
    match dir {
        Some(dir) if !dir.is_dir() => Err(Error::Config(format!(
            "{what} does not exist: {}",
            dir.display()
        ))),
        _ => Ok(()),
    }
}

fn expand_os(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(raw) => expand_path(raw),
        None => path.to_path_buf(),
    }
}
