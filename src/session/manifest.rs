//! Name manifest
//!
//! `CF_NAMES` in the data directory lists every namespace known for that
//! directory, one UTF-8 name per line, `default` first, no duplicates.
//!
//! Written at session close and read at open when no options file is
//! given, so every existing namespace is declared before the engine opens.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::errors::{SessionError, SessionResult};
use crate::engine::DEFAULT_COLUMN_FAMILY;

/// Manifest file name inside the data directory
pub const MANIFEST_FILE_NAME: &str = "CF_NAMES";

pub fn manifest_path(directory: &Path) -> PathBuf {
    directory.join(MANIFEST_FILE_NAME)
}

/// Reads the manifest. A missing file yields no names.
///
/// Only the line terminator (`\n` or `\r\n`) is stripped; other
/// whitespace belongs to the name. Blank lines are skipped and repeated
/// names are kept once, first occurrence wins.
pub fn load(directory: &Path) -> SessionResult<Vec<String>> {
    let path = manifest_path(directory);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(SessionError::manifest_io(
                format!("failed to read {}", path.display()),
                e,
            ))
        }
    };

    let mut seen = HashSet::new();
    Ok(content
        .lines()
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(line.to_string()))
        .map(str::to_string)
        .collect())
}

/// Writes the manifest with `default` first and without duplicates.
///
/// The new contents go to a temporary file that is fsynced and then renamed
/// over `CF_NAMES`, so a crash leaves either the old or the new list.
pub fn save<'a, I>(directory: &Path, names: I) -> SessionResult<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    seen.insert(DEFAULT_COLUMN_FAMILY);
    let mut lines = vec![DEFAULT_COLUMN_FAMILY];
    for name in names {
        if !name.is_empty() && seen.insert(name) {
            lines.push(name);
        }
    }

    let mut content = lines.join("\n");
    content.push('\n');

    let path = manifest_path(directory);
    let tmp_path = directory.join(format!("{}.tmp", MANIFEST_FILE_NAME));

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp_path)
        .map_err(|e| {
            SessionError::manifest_io(format!("failed to create {}", tmp_path.display()), e)
        })?;
    file.write_all(content.as_bytes()).map_err(|e| {
        SessionError::manifest_io(format!("failed to write {}", tmp_path.display()), e)
    })?;
    file.sync_all().map_err(|e| {
        SessionError::manifest_io(format!("failed to fsync {}", tmp_path.display()), e)
    })?;
    drop(file);

    fs::rename(&tmp_path, &path).map_err(|e| {
        SessionError::manifest_io(format!("failed to replace {}", path.display()), e)
    })?;

    // Directory fsync makes the rename durable.
    if let Ok(dir) = File::open(directory) {
        let _ = dir.sync_all();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_manifest_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(load(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_save_puts_default_first_and_dedups() {
        let dir = TempDir::new().unwrap();
        save(dir.path(), ["usertable", "default", "t2", "usertable"]).unwrap();

        let content = fs::read_to_string(manifest_path(dir.path())).unwrap();
        assert_eq!(content, "default\nusertable\nt2\n");
        assert_eq!(load(dir.path()).unwrap(), vec!["default", "usertable", "t2"]);
        assert!(!dir.path().join("CF_NAMES.tmp").exists());
    }

    #[test]
    fn test_load_tolerates_blank_and_repeated_lines() {
        let dir = TempDir::new().unwrap();
        fs::write(manifest_path(dir.path()), "default\n\nt1\nt1\r\nt2").unwrap();
        assert_eq!(load(dir.path()).unwrap(), vec!["default", "t1", "t2"]);
    }

    #[test]
    fn test_load_keeps_surrounding_whitespace_in_names() {
        let dir = TempDir::new().unwrap();
        save(dir.path(), ["t ", " t", "t"]).unwrap();
        assert_eq!(load(dir.path()).unwrap(), vec!["default", "t ", " t", "t"]);

        fs::write(manifest_path(dir.path()), "default\r\nt \r\n").unwrap();
        assert_eq!(load(dir.path()).unwrap(), vec!["default", "t "]);
    }

    #[test]
    fn test_save_with_no_names_writes_default() {
        let dir = TempDir::new().unwrap();
        save(dir.path(), std::iter::empty()).unwrap();
        assert_eq!(load(dir.path()).unwrap(), vec!["default"]);
    }
}
