//! Path classification by file extension.
//!
//! Classification never fails: anything that is not a directory and does
//! not carry a known extension is [`PathKind::Unsupported`].

use std::path::Path;

/// Sheet file extensions, in the order they are listed to the user.
const SHEET_EXTENSIONS: &[&str] = &["gdi", "cue"];

/// Raw image extensions.
const IMAGE_EXTENSIONS: &[&str] = &["iso"];

/// Archive extensions handed to the archive tool.
const ARCHIVE_EXTENSIONS: &[&str] = &["7z", "zip", "gz", "gzip", "bz2", "bzip2", "rar", "tar"];

/// The family of a sheet file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SheetKind {
    Cue,
    Gdi,
}

/// Classification of an input path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathKind {
    RawImage,
    Sheet(SheetKind),
    Archive,
    Directory,
    Unsupported,
}

impl PathKind {
    /// Whether this kind can become (part of) a conversion job.
    pub fn is_supported(self) -> bool {
        !matches!(self, PathKind::Unsupported | PathKind::Directory)
    }
}

/// Classify a path on disk.
///
/// Directories are detected with a metadata check; everything else must
/// exist as a file and is classified by its extension.
pub fn classify(path: &Path) -> PathKind {
    if path.is_dir() {
        PathKind::Directory
    } else if path.is_file() {
        classify_name(path)
    } else {
        PathKind::Unsupported
    }
}

/// Classify a path by its extension alone, without touching the filesystem.
pub fn classify_name(path: &Path) -> PathKind {
    let Some(ext) = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
    else {
        return PathKind::Unsupported;
    };

    match ext.as_str() {
        "cue" => PathKind::Sheet(SheetKind::Cue),
        "gdi" => PathKind::Sheet(SheetKind::Gdi),
        e if IMAGE_EXTENSIONS.contains(&e) => PathKind::RawImage,
        e if ARCHIVE_EXTENSIONS.contains(&e) => PathKind::Archive,
        _ => PathKind::Unsupported,
    }
}

/// Whether the final path component is a dot-file.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// The supported extension table, grouped by type.
pub fn supported_formats() -> [(&'static str, &'static [&'static str]); 3] {
    [
        ("sheet", SHEET_EXTENSIONS),
        ("image", IMAGE_EXTENSIONS),
        ("archive", ARCHIVE_EXTENSIONS),
    ]
}
