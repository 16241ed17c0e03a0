//! File processor — read, normalize, back up and rewrite one notebook

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::normalizer::{normalize_notebook, serialize_canonical, NormalizeOptions};
use crate::{Error, Result};

/// Suffix appended to the notebook path for backup copies
pub const BACKUP_SUFFIX: &str = ".bak";

/// Per-run settings for [`process_file`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Report what would change without touching the filesystem
    pub dry_run: bool,
    /// Copy the original to `<file>.bak` before overwriting
    pub backup: bool,
    pub normalize: NormalizeOptions,
}

/// What happened to a single notebook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Already normalized; nothing written
    Unchanged,
    /// Dry run found volatile fields; nothing written
    WouldChange,
    /// Rewritten in place, with the backup location if one was made
    Updated { backup: Option<PathBuf> },
}

impl Outcome {
    /// True for `WouldChange` and `Updated`
    pub fn is_changed(&self) -> bool {
        !matches!(self, Outcome::Unchanged)
    }
}

/// Normalize the notebook at `path`, rewriting it unless this is a dry run
///
/// # Errors
/// `Read` if the file is not readable UTF-8, `Parse` if it is not JSON,
/// `InvalidNotebook` if it is not shaped like a notebook, and `Backup` /
/// `Write` / `Serialize` if rewriting fails. The file is left as it was in
/// every error case except a failed final write.
pub fn process_file(path: &Path, options: &ProcessOptions) -> Result<Outcome> {
    let text = fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut notebook: Value = serde_json::from_str(&text).map_err(Error::Parse)?;

    if !normalize_notebook(&mut notebook, &options.normalize)? {
        debug!(path = %path.display(), "already normalized");
        return Ok(Outcome::Unchanged);
    }

    let bytes = serialize_canonical(&notebook)?;

    if options.dry_run {
        debug!(path = %path.display(), "dry run, not writing");
        return Ok(Outcome::WouldChange);
    }

    let backup = if options.backup {
        let bak = backup_path(path);
        copy_with_mtime(path, &bak).map_err(|source| Error::Backup {
            path: bak.clone(),
            source,
        })?;
        debug!(path = %path.display(), backup = %bak.display(), "backup written");
        Some(bak)
    } else {
        None
    };

    fs::write(path, bytes).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Outcome::Updated { backup })
}

/// Copy contents and permissions, then carry over the modification time
fn copy_with_mtime(from: &Path, to: &Path) -> io::Result<()> {
    fs::copy(from, to)?;
    let modified = fs::metadata(from)?.modified()?;
    fs::OpenOptions::new()
        .write(true)
        .open(to)?
        .set_modified(modified)
}

/// `a/b.ipynb` → `a/b.ipynb.bak`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    const DIRTY: &str = r#"{
  "cells": [
    {
      "cell_type": "code",
      "execution_count": 12,
      "metadata": {},
      "outputs": [{"output_type": "stream", "name": "stdout", "text": ["héllo\n"]}],
      "source": ["print('héllo')"]
    }
  ],
  "metadata": {"kernelspec": {"name": "python3"}},
  "nbformat": 4,
  "nbformat_minor": 5
}"#;

    fn write_notebook(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn clearing(dry_run: bool, backup: bool) -> ProcessOptions {
        ProcessOptions {
            dry_run,
            backup,
            normalize: NormalizeOptions {
                clear_metadata: true,
            },
        }
    }

    #[test]
    fn test_backup_path() {
        assert_eq!(
            backup_path(Path::new("dir/nb.ipynb")),
            PathBuf::from("dir/nb.ipynb.bak")
        );
    }

    #[test]
    fn test_rewrites_dirty_notebook() {
        let dir = tempdir().unwrap();
        let path = write_notebook(dir.path(), "nb.ipynb", DIRTY);

        let outcome = process_file(&path, &clearing(false, false)).unwrap();
        assert_eq!(outcome, Outcome::Updated { backup: None });
        assert!(!backup_path(&path).exists());

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("}\n"));
        assert!(text.starts_with("{\n \"cells\": [\n  {\n"));
        let written: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(written["cells"][0]["execution_count"], Value::Null);
        assert_eq!(written["cells"][0]["outputs"], json!([]));
        assert_eq!(written["cells"][0]["source"], json!(["print('héllo')"]));
        assert_eq!(written["metadata"], json!({}));
    }

    #[test]
    fn test_second_run_unchanged() {
        let dir = tempdir().unwrap();
        let path = write_notebook(dir.path(), "nb.ipynb", DIRTY);

        process_file(&path, &clearing(false, false)).unwrap();
        let first = fs::read(&path).unwrap();
        let outcome = process_file(&path, &clearing(false, false)).unwrap();
        assert_eq!(outcome, Outcome::Unchanged);
        assert_eq!(first, fs::read(&path).unwrap());
    }

    #[test]
    fn test_backup_keeps_original() {
        let dir = tempdir().unwrap();
        let path = write_notebook(dir.path(), "nb.ipynb", DIRTY);

        let outcome = process_file(&path, &clearing(false, true)).unwrap();
        let bak = backup_path(&path);
        assert_eq!(
            outcome,
            Outcome::Updated {
                backup: Some(bak.clone())
            }
        );
        assert_eq!(fs::read_to_string(&bak).unwrap(), DIRTY);
        assert_ne!(fs::read_to_string(&path).unwrap(), DIRTY);
    }

    #[test]
    fn test_backup_keeps_modification_time() {
        let dir = tempdir().unwrap();
        let path = write_notebook(dir.path(), "nb.ipynb", DIRTY);
        let past = std::time::SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000_000_000);
        fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(past)
            .unwrap();

        process_file(&path, &clearing(false, true)).unwrap();
        let bak_modified = fs::metadata(backup_path(&path)).unwrap().modified().unwrap();
        assert_eq!(bak_modified, past);
    }

    #[test]
    fn test_numbers_keep_source_text() {
        let dir = tempdir().unwrap();
        let path = write_notebook(
            dir.path(),
            "nb.ipynb",
            r#"{"cells": [], "metadata": {"widgets": {}, "big": 123456789012345678901234567890, "f": 1e-07}}"#,
        );

        let outcome = process_file(&path, &ProcessOptions::default()).unwrap();
        assert_eq!(outcome, Outcome::Updated { backup: None });
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "{\n \"cells\": [],\n \"metadata\": {\n  \"big\": 123456789012345678901234567890,\n  \"f\": 1e-07\n }\n}\n"
        );
    }

    #[test]
    fn test_dry_run_never_writes() {
        let dir = tempdir().unwrap();
        let path = write_notebook(dir.path(), "nb.ipynb", DIRTY);

        for backup in [false, true] {
            let outcome = process_file(&path, &clearing(true, backup)).unwrap();
            assert_eq!(outcome, Outcome::WouldChange);
            assert!(outcome.is_changed());
            assert_eq!(fs::read_to_string(&path).unwrap(), DIRTY);
            assert!(!backup_path(&path).exists());
        }
    }

    #[test]
    fn test_clean_notebook_untouched() {
        let dir = tempdir().unwrap();
        let clean = r#"{"cells": [], "metadata": {}, "nbformat": 4}"#;
        let path = write_notebook(dir.path(), "nb.ipynb", clean);

        let outcome = process_file(&path, &clearing(false, true)).unwrap();
        assert_eq!(outcome, Outcome::Unchanged);
        assert!(!outcome.is_changed());
        // no rewrite, so the original formatting survives
        assert_eq!(fs::read_to_string(&path).unwrap(), clean);
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn test_conservative_metadata() {
        let dir = tempdir().unwrap();
        let path = write_notebook(
            dir.path(),
            "nb.ipynb",
            r#"{"cells": [], "metadata": {"widgets": {}, "kernelspec": {"name": "python3"}}}"#,
        );

        process_file(&path, &ProcessOptions::default()).unwrap();
        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["metadata"], json!({"kernelspec": {"name": "python3"}}));
    }

    #[test]
    fn test_malformed_json() {
        let dir = tempdir().unwrap();
        let path = write_notebook(dir.path(), "bad.ipynb", "{ not json");

        let err = process_file(&path, &clearing(false, true)).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert!(err.to_string().starts_with("failed to parse JSON: "));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = process_file(&dir.path().join("gone.ipynb"), &ProcessOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn test_not_a_notebook() {
        let dir = tempdir().unwrap();
        let path = write_notebook(dir.path(), "list.ipynb", "[1, 2, 3]");
        let err = process_file(&path, &ProcessOptions::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidNotebook(_)));
    }
}
