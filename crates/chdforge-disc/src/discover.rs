//! Input discovery: turns user-supplied paths into an ordered list of
//! conversion candidates.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::classify::{classify, classify_name, is_hidden, PathKind};
use crate::model::{DiscSet, DiscSource, OutputPlan};
use crate::resolve::resolve_scope;

/// Options controlling discovery.
#[derive(Debug, Clone, Default)]
pub struct DiscoverOptions {
    /// Descend into sub-directories of directory inputs.
    pub recursive: bool,
    pub plan: OutputPlan,
}

/// One discovered unit of work, in job order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovered {
    /// A disc set found directly on the filesystem.
    Disc(DiscSet),
    /// An archive whose disc sets are only known after extraction.
    Archive {
        path: PathBuf,
        /// Artifact path when the archive holds a single disc and renaming
        /// is enabled.
        output: PathBuf,
    },
    /// An explicit input that cannot be converted.
    Unsupported(PathBuf),
}

impl Discovered {
    /// The path this candidate was discovered from.
    pub fn input(&self) -> &Path {
        match self {
            Discovered::Disc(disc) => &disc.primary,
            Discovered::Archive { path, .. } => path,
            Discovered::Unsupported(path) => path,
        }
    }
}

enum Slot {
    Scope(PathBuf, Vec<PathBuf>),
    Unsupported(PathBuf),
}

/// Discover candidates from `inputs`.
///
/// Explicit files join the scope of their parent directory, so the sheet
/// suppression rule applies no matter how a file was named on the command
/// line. Running discovery twice on an unchanged filesystem yields the same
/// candidates in the same order.
pub fn discover(inputs: &[PathBuf], options: &DiscoverOptions) -> Vec<Discovered> {
    let mut slots: Vec<Slot> = Vec::new();

    for input in inputs {
        let input = std::fs::canonicalize(input).unwrap_or_else(|_| input.clone());

        match classify(&input) {
            PathKind::Directory => {
                let files = list_files(&input, options.recursive)
                    .into_iter()
                    .filter(|file| classify_name(file).is_supported());
                for file in files {
                    add_file(&mut slots, file);
                }
            }
            kind if kind.is_supported() && !is_hidden(&input) => add_file(&mut slots, input),
            _ => {
                let seen = slots
                    .iter()
                    .any(|slot| matches!(slot, Slot::Unsupported(p) if *p == input));
                if !seen {
                    tracing::debug!("Unsupported input: {}", input.display());
                    slots.push(Slot::Unsupported(input));
                }
            }
        }
    }

    let mut discovered = Vec::new();
    for slot in slots {
        match slot {
            Slot::Scope(_, files) => {
                let resolution = resolve_scope(&files, &DiscSource::Filesystem, &options.plan);
                discovered.extend(resolution.discs.into_iter().map(Discovered::Disc));
                discovered.extend(resolution.archives.into_iter().map(|path| {
                    let output = options.plan.for_archive(&path);
                    Discovered::Archive { path, output }
                }));
            }
            Slot::Unsupported(path) => discovered.push(Discovered::Unsupported(path)),
        }
    }

    discovered
}

fn add_file(slots: &mut Vec<Slot>, file: PathBuf) {
    let parent = file.parent().map(Path::to_path_buf).unwrap_or_default();

    let scope = slots.iter_mut().find_map(|slot| match slot {
        Slot::Scope(dir, files) if *dir == parent => Some(files),
        _ => None,
    });

    match scope {
        Some(files) => {
            if !files.contains(&file) {
                files.push(file);
            }
        }
        None => slots.push(Slot::Scope(parent, vec![file])),
    }
}

/// Non-hidden regular files below `dir`, sorted by name within each
/// directory. Without `recursive` only the top level is listed.
pub fn list_files(dir: &Path, recursive: bool) -> Vec<PathBuf> {
    let max_depth = if recursive { usize::MAX } else { 1 };

    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.path()))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry under {}: {e}", dir.display());
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}
