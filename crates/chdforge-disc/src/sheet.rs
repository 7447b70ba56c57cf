//! Sheet file reference parsing.
//!
//! Only the data-file names a sheet references are extracted; track
//! layout, indexes and timing are the conversion tool's business.

use std::path::{Path, PathBuf};

use crate::classify::SheetKind;

/// Read a sheet and return the data files it references, resolved
/// relative to the sheet's directory, in order of first reference.
pub fn referenced_files(sheet: &Path, kind: SheetKind) -> std::io::Result<Vec<PathBuf>> {
    let bytes = std::fs::read(sheet)?;
    // Sheets written by Windows tools are frequently not UTF-8.
    let content = String::from_utf8_lossy(&bytes);
    let base = sheet.parent().unwrap_or_else(|| Path::new("."));

    let names = match kind {
        SheetKind::Cue => parse_cue(&content),
        SheetKind::Gdi => parse_gdi(&content),
    };

    Ok(names.iter().map(|name| resolve_name(base, name)).collect())
}

/// Data-file names from the `FILE` commands of a cue sheet.
pub fn parse_cue(content: &str) -> Vec<String> {
    let mut names = Vec::new();

    for line in content.lines() {
        let line = line.trim_start_matches('\u{feff}').trim();
        let Some(keyword) = line.get(..4) else {
            continue;
        };
        if !keyword.eq_ignore_ascii_case("FILE") {
            continue;
        }
        let rest = line[4..].trim_start();
        if rest.len() == line.len() - 4 {
            // "FILENAME ..." or similar, not the FILE command
            continue;
        }

        let name = if let Some(quoted) = rest.strip_prefix('"') {
            quoted.split('"').next().unwrap_or_default()
        } else {
            // FILE name.bin BINARY -- the last token is the file type.
            rest.rsplit_once(char::is_whitespace)
                .map(|(name, _)| name.trim())
                .unwrap_or(rest)
        };

        push_unique(&mut names, name);
    }

    names
}

/// Data-file names from the track lines of a gdi sheet.
///
/// The first non-empty line holds the track count; each track line is
/// `number lba type sector_size filename offset`, where the filename may
/// be quoted to allow spaces.
pub fn parse_gdi(content: &str) -> Vec<String> {
    let mut names = Vec::new();

    let tracks = content
        .lines()
        .map(|line| line.trim_start_matches('\u{feff}').trim())
        .filter(|line| !line.is_empty())
        .skip(1);

    for line in tracks {
        let mut rest = line;
        for _ in 0..4 {
            rest = rest.trim_start();
            match rest.find(char::is_whitespace) {
                Some(end) => rest = &rest[end..],
                None => {
                    rest = "";
                    break;
                }
            }
        }
        let rest = rest.trim_start();

        let name = if let Some(quoted) = rest.strip_prefix('"') {
            quoted.split('"').next().unwrap_or_default()
        } else {
            rest.split_whitespace().next().unwrap_or_default()
        };

        push_unique(&mut names, name);
    }

    names
}

fn push_unique(names: &mut Vec<String>, name: &str) {
    if !name.is_empty() && !names.iter().any(|n| n == name) {
        names.push(name.to_string());
    }
}

/// Join a referenced name onto the sheet directory, accepting the
/// backslash separators of sheets authored on Windows.
fn resolve_name(base: &Path, name: &str) -> PathBuf {
    let direct = base.join(name);
    if direct.exists() || !name.contains('\\') {
        return direct;
    }
    base.join(name.replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cue_quoted_and_unquoted() {
        let cue = "\u{feff}REM GENRE Action\r\n\
                   FILE \"Game (Track 1).bin\" BINARY\r\n\
                   \x20 TRACK 01 MODE2/2352\r\n\
                   \x20   INDEX 01 00:00:00\r\n\
                   file track2.bin binary\r\n\
                   \x20 TRACK 02 AUDIO\r\n\
                   FILE \"Game (Track 1).bin\" BINARY\r\n";
        assert_eq!(parse_cue(cue), vec!["Game (Track 1).bin", "track2.bin"]);
    }

    #[test]
    fn cue_ignores_other_commands() {
        let cue = "TITLE \"FILE in a title\"\nFILENAME x\nREM FILE y.bin BINARY\n";
        assert!(parse_cue(cue).is_empty());
    }

    #[test]
    fn gdi_track_lines() {
        let gdi = "3\n\
                   1 0 4 2352 track01.bin 0\n\
                   2 756 0 2352 \"track 02.raw\" 0\n\
                   3 45000 4 2352 track03.bin 0\n";
        assert_eq!(
            parse_gdi(gdi),
            vec!["track01.bin", "track 02.raw", "track03.bin"]
        );
    }

    #[test]
    fn gdi_tolerates_short_lines() {
        assert!(parse_gdi("1\n1 0 4\n").is_empty());
        assert!(parse_gdi("").is_empty());
    }

    #[test]
    fn referenced_files_resolve_relative_to_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = dir.path().join("a.cue");
        std::fs::write(&sheet, "FILE \"a.bin\" BINARY\n  TRACK 01 MODE1/2352\n").unwrap();

        let refs = referenced_files(&sheet, SheetKind::Cue).unwrap();
        assert_eq!(refs, vec![dir.path().join("a.bin")]);
    }

    #[test]
    fn backslash_names_fall_back_to_forward_slashes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("data")).unwrap();
        std::fs::write(dir.path().join("data").join("t1.bin"), b"x").unwrap();

        let resolved = resolve_name(dir.path(), "data\\t1.bin");
        if cfg!(unix) {
            assert_eq!(resolved, dir.path().join("data/t1.bin"));
        }
        assert!(resolved.exists());
    }
}
