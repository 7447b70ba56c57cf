//! Per-job workspace directories.
//!
//! A [`Workspace`] is a hidden temporary directory that one job extracts
//! and converts into. The directory is removed when the workspace is
//! released or dropped, so every exit path of a job (success, failure,
//! cancellation, early return) cleans it up.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use chdforge_core::Result;

/// Name prefix of workspace directories. The leading dot keeps them out
/// of discovery.
pub const WORKSPACE_PREFIX: &str = ".chdforge-";

/// Scoped temporary directory owned by a single job.
///
/// # Example
///
/// ```no_run
/// use chdforge_tools::Workspace;
///
/// let workspace = Workspace::acquire(std::path::Path::new("/data/out")).unwrap();
/// // ... extract and convert into workspace.path() ...
/// workspace.release().unwrap();
/// ```
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a new workspace directory under `root`.
    pub fn acquire(root: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(root)?;
        tracing::debug!("Acquired workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    /// Path to the workspace directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path for a named file inside the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Remove the workspace and everything in it.
    pub fn release(self) -> std::io::Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        tracing::debug!("Released workspace {}", path.display());
        Ok(())
    }
}

/// Move a finished artifact to its destination, replacing any existing
/// file. Falls back to copy and remove across filesystems.
pub fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to)?;
    if let Err(e) = std::fs::remove_file(from) {
        tracing::debug!("Failed to remove {} after copy: {e}", from.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn workspace_is_hidden_and_inside_root() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::acquire(root.path()).unwrap();

        assert!(ws.path().starts_with(root.path()));
        let name = ws.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(WORKSPACE_PREFIX));
        assert!(ws.file("x.chd").starts_with(ws.path()));
    }

    #[test]
    fn release_removes_contents() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::acquire(root.path()).unwrap();
        let path = ws.path().to_path_buf();
        fs::create_dir_all(path.join("sub")).unwrap();
        fs::write(path.join("sub/disc.iso"), b"data").unwrap();

        ws.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn drop_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let ws = Workspace::acquire(root.path()).unwrap();
            ws.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn acquire_fails_for_missing_root() {
        let root = tempfile::tempdir().unwrap();
        assert!(Workspace::acquire(&root.path().join("missing")).is_err());
    }

    #[test]
    fn move_file_replaces_destination() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("staged.chd");
        let to = dir.path().join("game.chd");
        fs::write(&from, b"new").unwrap();
        fs::write(&to, b"old").unwrap();

        move_file(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(fs::read_to_string(&to).unwrap(), "new");
    }
}
