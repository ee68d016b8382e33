use crate::{Error, Result};
use std::ffi::OsStr;
use std::fs;
use std::path::Path;

/// Remove `path` and everything below it. Returns `false` when nothing existed.
pub fn remove_tree(path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::Remove {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Empty `dir` except for the top-level names in `keep`.
///
/// Returns the number of top-level children removed. A missing `dir` is empty.
pub fn clear_dir_except(dir: impl AsRef<Path>, keep: &[&OsStr]) -> Result<usize> {
    let dir = dir.as_ref();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => {
            return Err(Error::Read {
                path: dir.to_path_buf(),
                source: e,
            });
        }
    };

    let mut removed = 0;
    for entry in entries {
        let entry = entry.map_err(|e| Error::Read {
            path: dir.to_path_buf(),
            source: e,
        })?;
        if keep.contains(&entry.file_name().as_os_str()) {
            continue;
        }
        let path = entry.path();
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        let result = if is_dir {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.map_err(|e| Error::Remove { path, source: e })?;
        removed += 1;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_remove_tree() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("out");
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::write(root.join("a/b/c.txt"), "c").unwrap();

        assert!(remove_tree(&root).unwrap());
        assert!(!root.exists());
        assert!(!remove_tree(&root).unwrap());
    }

    #[test]
    fn test_clear_dir_except_keeps_named_children() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/x.csv"), "x").unwrap();
        fs::write(dir.path().join("y.csv"), "y").unwrap();
        fs::write(dir.path().join(".keep.json"), "{}").unwrap();

        let removed = clear_dir_except(dir.path(), &[OsStr::new(".keep.json")]).unwrap();
        assert_eq!(removed, 2);
        assert!(dir.path().join(".keep.json").exists());
        assert!(!dir.path().join("sub").exists());
        assert!(!dir.path().join("y.csv").exists());
    }

    #[test]
    fn test_clear_missing_dir() {
        let dir = tempdir().unwrap();
        assert_eq!(clear_dir_except(dir.path().join("none"), &[]).unwrap(), 0);
    }
}
