//! Disc-set resolution.
//!
//! A scope is either one directory on disk or the whole extracted tree of
//! an archive. Within a scope every sheet becomes one disc set; raw images
//! only become disc sets when the scope holds no sheet at all, so decoy or
//! patch copies of an image shipped with a cue/gdi are not converted twice.
//!
//! Output order is stable: sheets before images, each group in listing
//! order, directories in first-seen order.

use std::path::{Path, PathBuf};

use crate::classify::{classify_name, PathKind};
use crate::model::{DiscKind, DiscSet, DiscSource, OutputPlan};
use crate::sheet::referenced_files;

/// Result of resolving a single scope.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScopeResolution {
    pub discs: Vec<DiscSet>,
    /// Archives found in the scope, in listing order.
    pub archives: Vec<PathBuf>,
}

/// Resolve the candidate files of one directory scope.
///
/// Files of unsupported kinds are ignored.
pub fn resolve_scope(files: &[PathBuf], source: &DiscSource, plan: &OutputPlan) -> ScopeResolution {
    let mut resolution = resolve_files(files, source);
    plan.assign(&mut resolution.discs);
    resolution
}

/// Resolve the extracted contents of `archive` as a single scope: a sheet
/// anywhere in the tree suppresses every raw image in it. Nested archives
/// are not followed.
pub fn resolve_extracted(files: &[PathBuf], archive: &Path, plan: &OutputPlan) -> Vec<DiscSet> {
    let source = DiscSource::Archive {
        archive: archive.to_path_buf(),
    };

    let ordered: Vec<PathBuf> = group_by_parent(files.iter().cloned())
        .into_iter()
        .flat_map(|(_, members)| members)
        .collect();

    let mut resolution = resolve_files(&ordered, &source);
    for nested in &resolution.archives {
        tracing::info!(
            "Ignoring nested archive {} in {}",
            nested.display(),
            archive.display()
        );
    }

    plan.assign(&mut resolution.discs);
    resolution.discs
}

/// Group paths by parent directory, keeping first-seen order of both the
/// groups and the paths inside each group.
pub fn group_by_parent(files: impl IntoIterator<Item = PathBuf>) -> Vec<(PathBuf, Vec<PathBuf>)> {
    let mut groups: Vec<(PathBuf, Vec<PathBuf>)> = Vec::new();

    for file in files {
        let parent = file.parent().map(Path::to_path_buf).unwrap_or_default();
        match groups.iter_mut().find(|(dir, _)| *dir == parent) {
            Some((_, members)) => {
                if !members.contains(&file) {
                    members.push(file);
                }
            }
            None => groups.push((parent, vec![file])),
        }
    }

    groups
}

fn resolve_files(files: &[PathBuf], source: &DiscSource) -> ScopeResolution {
    let mut sheets = Vec::new();
    let mut images = Vec::new();
    let mut archives = Vec::new();

    for file in files {
        match classify_name(file) {
            PathKind::Sheet(kind) => sheets.push((file, kind)),
            PathKind::RawImage => images.push(file),
            PathKind::Archive => archives.push(file.clone()),
            PathKind::Directory | PathKind::Unsupported => {}
        }
    }

    let mut discs: Vec<DiscSet> = sheets
        .into_iter()
        .map(|(sheet, kind)| {
            let (dependents, sheet_error) = match referenced_files(sheet, kind) {
                Ok(refs) => (refs, None),
                Err(e) => {
                    tracing::warn!("Failed to read sheet {}: {e}", sheet.display());
                    (Vec::new(), Some(e.to_string()))
                }
            };
            DiscSet {
                primary: sheet.clone(),
                kind: DiscKind::Sheet(kind),
                dependents,
                sheet_error,
                source: source.clone(),
                output: PathBuf::new(),
            }
        })
        .collect();

    if discs.is_empty() {
        discs.extend(images.into_iter().map(|image| DiscSet {
            primary: image.clone(),
            kind: DiscKind::RawImage,
            dependents: Vec::new(),
            sheet_error: None,
            source: source.clone(),
            output: PathBuf::new(),
        }));
    } else {
        for image in images {
            tracing::debug!(
                "Ignoring {}: a sheet file is present in the same scope",
                image.display()
            );
        }
    }

    ScopeResolution { discs, archives }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::SheetKind;
    use crate::discover::list_files;
    use std::fs;

    fn touch(path: &Path, content: &str) -> PathBuf {
        fs::write(path, content).unwrap();
        path.to_path_buf()
    }

    #[test]
    fn sheet_suppresses_sibling_images() {
        let dir = tempfile::tempdir().unwrap();
        let cue = touch(&dir.path().join("a.cue"), "FILE \"a.bin\" BINARY\n");
        let bin = touch(&dir.path().join("a.bin"), "data");
        let iso = touch(&dir.path().join("stray.iso"), "data");

        let resolution = resolve_scope(
            &[cue.clone(), bin.clone(), iso],
            &DiscSource::Filesystem,
            &OutputPlan::default(),
        );

        assert_eq!(resolution.discs.len(), 1);
        let disc = &resolution.discs[0];
        assert_eq!(disc.primary, cue);
        assert_eq!(disc.kind, DiscKind::Sheet(SheetKind::Cue));
        assert_eq!(disc.dependents, vec![bin]);
        assert_eq!(disc.output, dir.path().join("a.chd"));
    }

    #[test]
    fn lone_images_each_become_a_disc() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(&dir.path().join("a.iso"), "");
        let b = touch(&dir.path().join("b.iso"), "");

        let resolution =
            resolve_scope(&[a.clone(), b.clone()], &DiscSource::Filesystem, &OutputPlan::default());
        let primaries: Vec<_> = resolution.discs.iter().map(|d| d.primary.clone()).collect();
        assert_eq!(primaries, vec![a, b]);
        assert!(resolution.discs.iter().all(|d| d.dependents.is_empty()));
    }

    #[test]
    fn sheets_come_before_images_and_archives_are_separate() {
        let dir = tempfile::tempdir().unwrap();
        let zip = touch(&dir.path().join("0.zip"), "");
        let gdi = touch(&dir.path().join("z.gdi"), "1\n1 0 4 2352 track01.bin 0\n");

        let resolution =
            resolve_scope(&[zip.clone(), gdi.clone()], &DiscSource::Filesystem, &OutputPlan::default());
        assert_eq!(resolution.archives, vec![zip]);
        assert_eq!(resolution.discs.len(), 1);
        assert_eq!(resolution.discs[0].primary, gdi);
        assert_eq!(resolution.discs[0].dependents, vec![dir.path().join("track01.bin")]);
    }

    #[test]
    fn unreadable_sheet_is_kept_with_error() {
        let dir = tempfile::tempdir().unwrap();
        let cue = dir.path().join("gone.cue");

        let resolution = resolve_scope(&[cue], &DiscSource::Filesystem, &OutputPlan::default());
        assert_eq!(resolution.discs.len(), 1);
        assert!(resolution.discs[0].sheet_error.is_some());
        assert!(resolution.discs[0].ensure_complete().is_err());
    }

    #[test]
    fn extracted_tree_is_one_scope() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("cue")).unwrap();
        fs::create_dir_all(root.join("patch")).unwrap();
        touch(&root.join("cue/game.cue"), "FILE \"game.bin\" BINARY\n");
        touch(&root.join("cue/game.bin"), "");
        touch(&root.join("patch/game.iso"), "");
        touch(&root.join("._junk.cue"), "");
        touch(&root.join("nested.zip"), "");

        let archive = PathBuf::from("/library/game.7z");
        let files = list_files(root, true);
        let discs = resolve_extracted(&files, &archive, &OutputPlan::new(None, true));

        let primaries: Vec<_> = discs.iter().map(|d| d.primary.clone()).collect();
        assert_eq!(primaries, vec![root.join("cue/game.cue")]);
        assert_eq!(discs[0].archive(), Some(archive.as_path()));
        assert_eq!(discs[0].output, PathBuf::from("/library/game.chd"));
    }

    #[test]
    fn extracted_sheets_in_several_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("disc1")).unwrap();
        fs::create_dir_all(root.join("disc2")).unwrap();
        touch(&root.join("disc1/game.cue"), "FILE \"game.bin\" BINARY\n");
        touch(&root.join("disc1/game.bin"), "");
        touch(&root.join("disc2/game.gdi"), "1\n1 0 4 2352 track01.bin 0\n");
        touch(&root.join("disc2/track01.bin"), "");
        touch(&root.join("readme.iso"), "");

        let archive = PathBuf::from("/library/game.7z");
        let files = list_files(root, true);
        let discs = resolve_extracted(&files, &archive, &OutputPlan::new(None, true));

        let primaries: Vec<_> = discs.iter().map(|d| d.primary.clone()).collect();
        assert_eq!(
            primaries,
            vec![root.join("disc1/game.cue"), root.join("disc2/game.gdi")]
        );
        assert_eq!(discs[0].output, PathBuf::from("/library/game (Disc 1).chd"));
        assert_eq!(discs[1].output, PathBuf::from("/library/game (Disc 2).chd"));
    }

    #[test]
    fn extracted_images_without_sheets_all_convert() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("b")).unwrap();
        touch(&root.join("a.iso"), "");
        touch(&root.join("b/c.iso"), "");

        let files = list_files(root, true);
        let discs = resolve_extracted(&files, Path::new("/library/set.zip"), &OutputPlan::new(None, false));

        let outputs: Vec<_> = discs.iter().map(|d| d.output.clone()).collect();
        assert_eq!(
            outputs,
            vec![PathBuf::from("/library/a.chd"), PathBuf::from("/library/c.chd")]
        );
    }

    #[test]
    fn group_by_parent_is_stable() {
        let groups = group_by_parent(vec![
            PathBuf::from("/a/1.iso"),
            PathBuf::from("/b/1.iso"),
            PathBuf::from("/a/2.iso"),
            PathBuf::from("/a/1.iso"),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, PathBuf::from("/a"));
        assert_eq!(
            groups[0].1,
            vec![PathBuf::from("/a/1.iso"), PathBuf::from("/a/2.iso")]
        );
        assert_eq!(groups[1].1, vec![PathBuf::from("/b/1.iso")]);
    }
}
