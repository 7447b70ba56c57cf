//! Shared fixtures for integration tests.
//!
//! External programs are replaced by small shell scripts:
//!
//! - the fake `7z` treats an "archive" as a text file listing the entries
//!   to create, one per line, as `name` or `name|content`;
//! - the fake `chdman` writes its sub-command into the `--output` file.
//!   Inputs whose file name starts with `bad` fail, `slow` sleep first.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub const FAKE_7Z: &str = r#"#!/bin/sh
dest=""
archive=""
for a in "$@"; do
  case "$a" in
    x|-y|-bd) ;;
    -o*) dest="${a#-o}" ;;
    *) archive="$a" ;;
  esac
done
[ -f "$archive" ] || { echo "cannot open $archive" >&2; exit 2; }
while IFS= read -r line; do
  [ -n "$line" ] || continue
  name="${line%%|*}"
  content="${line#*|}"
  [ "$content" = "$line" ] && content="data"
  mkdir -p "$dest/$(dirname "$name")"
  printf '%s\n' "$content" > "$dest/$name"
done < "$archive"
"#;

pub const FAKE_CHDMAN: &str = r#"#!/bin/sh
sub="$1"
in=""
out=""
while [ $# -gt 0 ]; do
  case "$1" in
    --input) in="$2"; shift ;;
    --output) out="$2"; shift ;;
  esac
  shift
done
case "$(basename "$in")" in
  bad*) echo "Error: input is corrupt" >&2; exit 1 ;;
  slow*) sleep 5 ;;
esac
printf '%s\n' "$sub" > "$out"
"#;

/// Fake tool pair installed in a temp directory.
pub struct FakeTools {
    _dir: tempfile::TempDir,
    pub sevenzip: PathBuf,
    pub chdman: PathBuf,
}

#[cfg(unix)]
pub fn fake_tools() -> FakeTools {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let install = |name: &str, body: &str| {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    };
    let sevenzip = install("7z", FAKE_7Z);
    let chdman = install("chdman", FAKE_CHDMAN);
    FakeTools {
        _dir: dir,
        sevenzip,
        chdman,
    }
}

/// Write `content` to `path`, creating parent directories.
pub fn touch(path: &Path, content: &str) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
    path.to_path_buf()
}

/// Entries of `dir` that look like job workspaces.
pub fn leftover_workspaces(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .map(|n| n.to_string_lossy().starts_with(chdforge_tools::WORKSPACE_PREFIX))
                .unwrap_or(false)
        })
        .collect()
}

/// A temp directory with its canonical path, so paths compare equal to
/// what discovery reports.
pub fn canonical_tempdir() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = fs::canonicalize(dir.path()).unwrap();
    (dir, path)
}
