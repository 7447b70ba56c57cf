//! Disc-set types and output naming.

use std::path::{Path, PathBuf};

use chdforge_core::{Error, Result};

use crate::classify::SheetKind;

/// Extension of the produced artifact.
pub const OUTPUT_EXTENSION: &str = "chd";

/// What the primary file of a disc set is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscKind {
    /// A lone raw image; it is its own data.
    RawImage,
    /// A sheet whose referenced files hold the data.
    Sheet(SheetKind),
}

/// Where a disc set was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscSource {
    Filesystem,
    /// Extracted from an archive into a job workspace.
    Archive { archive: PathBuf },
}

/// The unit of conversion: one primary file plus the data files it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscSet {
    pub primary: PathBuf,
    pub kind: DiscKind,
    /// Referenced data files, in sheet order. Empty for raw images.
    pub dependents: Vec<PathBuf>,
    /// Set when the sheet could not be read; the job fails at conversion.
    pub sheet_error: Option<String>,
    pub source: DiscSource,
    /// Final location of the artifact.
    pub output: PathBuf,
}

impl DiscSet {
    /// The origin archive, for archive-derived sets.
    pub fn archive(&self) -> Option<&Path> {
        match &self.source {
            DiscSource::Archive { archive } => Some(archive),
            DiscSource::Filesystem => None,
        }
    }

    /// Referenced data files that do not exist.
    pub fn missing_dependents(&self) -> Vec<&Path> {
        self.dependents
            .iter()
            .map(PathBuf::as_path)
            .filter(|p| !p.is_file())
            .collect()
    }

    /// Verify every referenced file is present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResolutionIncomplete`] when the sheet was unreadable
    /// or any data file is missing.
    pub fn ensure_complete(&self) -> Result<()> {
        if let Some(reason) = &self.sheet_error {
            return Err(Error::ResolutionIncomplete {
                sheet: self.primary.clone(),
                output: self.output.clone(),
                message: format!("unreadable sheet: {reason}"),
            });
        }

        if !self.primary.is_file() {
            return Err(Error::ResolutionIncomplete {
                sheet: self.primary.clone(),
                output: self.output.clone(),
                message: "primary file is missing".into(),
            });
        }

        let missing = self.missing_dependents();
        if !missing.is_empty() {
            let names: Vec<String> = missing
                .iter()
                .map(|p| {
                    p.file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| p.display().to_string())
                })
                .collect();
            return Err(Error::ResolutionIncomplete {
                sheet: self.primary.clone(),
                output: self.output.clone(),
                message: format!("missing data files: {}", names.join(", ")),
            });
        }

        Ok(())
    }

    /// Size in bytes of the disc's data: the image itself, or the sum of
    /// the existing referenced files of a sheet.
    pub fn data_size(&self) -> u64 {
        let size_of = |p: &Path| std::fs::metadata(p).map(|m| m.len()).unwrap_or(0);
        match self.kind {
            DiscKind::RawImage => size_of(&self.primary),
            DiscKind::Sheet(_) => self.dependents.iter().map(|p| size_of(p)).sum(),
        }
    }
}

/// How artifact paths are derived from inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputPlan {
    /// Destination directory; `None` keeps artifacts beside their input.
    pub dir: Option<PathBuf>,
    /// Name archive-derived artifacts after the archive.
    pub rename: bool,
}

impl OutputPlan {
    pub fn new(dir: Option<PathBuf>, rename: bool) -> Self {
        Self { dir, rename }
    }

    /// Artifact path for a filesystem-derived disc.
    pub fn for_file(&self, primary: &Path) -> PathBuf {
        self.dir_for(primary).join(with_extension(&file_stem(primary)))
    }

    /// Natural artifact path for an archive: the archive's own name.
    pub fn for_archive(&self, archive: &Path) -> PathBuf {
        self.dir_for(archive).join(with_extension(&file_stem(archive)))
    }

    /// Artifact path for disc `index` of `total` found inside `archive`.
    pub fn for_archive_disc(
        &self,
        archive: &Path,
        primary: &Path,
        index: usize,
        total: usize,
    ) -> PathBuf {
        let name = if !self.rename {
            file_stem(primary)
        } else if total > 1 {
            format!("{} (Disc {})", file_stem(archive), index + 1)
        } else {
            file_stem(archive)
        };
        self.dir_for(archive).join(with_extension(&name))
    }

    /// Fill in `output` for a batch of disc sets resolved from one source.
    pub fn assign(&self, discs: &mut [DiscSet]) {
        let total = discs.len();
        for (index, disc) in discs.iter_mut().enumerate() {
            disc.output = match &disc.source {
                DiscSource::Filesystem => self.for_file(&disc.primary),
                DiscSource::Archive { archive } => {
                    self.for_archive_disc(archive, &disc.primary, index, total)
                }
            };
        }
    }

    fn dir_for(&self, input: &Path) -> PathBuf {
        match &self.dir {
            Some(dir) => dir.clone(),
            None => input
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "disc".to_string())
}

fn with_extension(stem: &str) -> String {
    format!("{stem}.{OUTPUT_EXTENSION}")
}
