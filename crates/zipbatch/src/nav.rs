//! Read-only, filesystem-like navigation over an archive.
//!
//! The current directory is a [`Location`] value: `cd` hands back a new one
//! instead of mutating shared state.

use std::io::{Read, Seek};

use crate::archive::Archive;
use crate::catalog::dir_prefix;
use crate::entry::Entry;
use crate::error::{Error, Result};

/// An archive-internal directory. `""` is the root, otherwise `dir/`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Location {
    prefix: String,
}

impl Location {
    pub fn root() -> Self { Self::default() }

    /// Trusts `prefix` to name a directory; see [`Archive::cd`] for a checked move.
    pub fn from_prefix(prefix: &str) -> Self {
        Self {
            prefix: dir_prefix(&prefix.replace('\\', "/")),
        }
    }

    pub fn prefix(&self) -> &str { &self.prefix }

    pub fn is_root(&self) -> bool { self.prefix.is_empty() }

    pub fn pwd(&self) -> String { format!("/{}", self.prefix) }

    /// Resolve `path` against this location.
    ///
    /// Leading `/` starts from the root; `.` and `..` are folded; a trailing
    /// `/` is kept. Climbing above the root is a traversal error.
    pub fn resolve(&self, path: &str) -> Result<String> {
        let unified = path.replace('\\', "/");
        let had_trailing = unified.ends_with('/');

        let mut segments: Vec<&str> = if unified.starts_with('/') {
            Vec::new()
        } else {
            self.prefix.split('/').filter(|s| !s.is_empty()).collect()
        };
        for segment in unified.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(Error::PathTraversal {
                            entry: path.to_string(),
                            reason: "escapes the archive root",
                        });
                    }
                }
                normal => segments.push(normal),
            }
        }

        let mut resolved = segments.join("/");
        if had_trailing && !resolved.is_empty() {
            resolved.push('/');
        }
        Ok(resolved)
    }
}

impl<R: Read + Seek> Archive<R> {
    fn file_entry(&self, resolved: &str) -> Result<&Entry> {
        let catalog = self.catalog();
        let name = resolved.trim_end_matches('/');
        if resolved.is_empty() || resolved.ends_with('/') || catalog.get(name).is_none() {
            if catalog.has_dir(name) {
                return Err(Error::IsADirectory(resolved.to_string()));
            }
            return Err(Error::NotFound(resolved.to_string()));
        }
        catalog.lookup(name)
    }

    fn require_dir(&self, resolved: &str) -> Result<()> {
        let name = resolved.trim_end_matches('/');
        if self.catalog().has_dir(name) {
            Ok(())
        } else if self.catalog().get(name).is_some() {
            Err(Error::NotADirectory(resolved.to_string()))
        } else {
            Err(Error::NotFound(resolved.to_string()))
        }
    }

    /// Move to `path`, returning the new location. Implicit directories count.
    pub fn cd(&self, at: &Location, path: &str) -> Result<Location> {
        let resolved = at.resolve(path)?;
        self.require_dir(&resolved)?;
        Ok(Location {
            prefix: dir_prefix(&resolved),
        })
    }

    /// Sorted children (or all descendants) of `path`, directories suffixed with `/`.
    pub fn ls(&self, at: &Location, path: Option<&str>, recursive: bool) -> Result<Vec<String>> {
        let resolved = at.resolve(path.unwrap_or(""))?;
        self.require_dir(&resolved)?;
        Ok(if recursive {
            self.catalog().descendants_of(&resolved)
        } else {
            self.catalog().children_of(&resolved)
        })
    }

    pub fn exists(&self, at: &Location, path: &str) -> bool {
        at.resolve(path).is_ok_and(|resolved| {
            let name = resolved.trim_end_matches('/');
            self.catalog().get(name).is_some() || self.catalog().has_dir(name)
        })
    }

    pub fn is_dir(&self, at: &Location, path: &str) -> bool {
        at.resolve(path)
            .is_ok_and(|resolved| self.catalog().has_dir(resolved.trim_end_matches('/')))
    }

    pub fn is_file(&self, at: &Location, path: &str) -> bool { self.file_entry_at(at, path).is_ok() }

    fn file_entry_at(&self, at: &Location, path: &str) -> Result<&Entry> {
        let resolved = at.resolve(path)?;
        self.file_entry(&resolved)
    }

    /// Metadata of a file member.
    pub fn info(&self, at: &Location, path: &str) -> Result<&Entry> { self.file_entry_at(at, path) }

    pub fn cat(&mut self, at: &Location, path: &str) -> Result<Vec<u8>> {
        let entry = self.file_entry_at(at, path)?.clone();
        self.read_entry(&entry)
    }

    pub fn cat_text(&mut self, at: &Location, path: &str) -> Result<String> {
        let bytes = self.cat(at, path)?;
        String::from_utf8(bytes).map_err(|_| Error::InvalidText(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Member, build_zip};
    use std::io::Cursor;

    fn sample() -> Archive<Cursor<Vec<u8>>> {
        let bytes = build_zip(&[
            Member::deflated("payload/data1.csv", b"a,b,c\n1,2,3\n"),
            Member::deflated("payload/data2.csv", b"x,y,z\n4,5,6\n"),
            Member::deflated("payload/sub/a.txt", b"hello sub\n"),
            Member::stored("payload/sub/nested/b.bin", b"\x00\x01\x02\x03"),
            Member::deflated("top.txt", b"hello\n"),
            Member::deflated("docs/readme.md", b"# readme\n"),
            Member::stored("docs/raw.bin", b"\xff\xfe\x00"),
        ]);
        Archive::new(Cursor::new(bytes)).unwrap()
    }

    #[test]
    fn resolve_relative_and_absolute() {
        let at = Location::from_prefix("payload/sub");
        assert_eq!(at.resolve("a.txt").unwrap(), "payload/sub/a.txt");
        assert_eq!(at.resolve("../data1.csv").unwrap(), "payload/data1.csv");
        assert_eq!(at.resolve("/top.txt").unwrap(), "top.txt");
        assert_eq!(at.resolve("nested/").unwrap(), "payload/sub/nested/");
        assert_eq!(at.resolve("..\\..").unwrap(), "");
        assert!(at.resolve("../../..").is_err());
    }

    #[test]
    fn cd_returns_new_location() {
        let archive = sample();
        let root = Location::root();
        let payload = archive.cd(&root, "payload").unwrap();
        assert_eq!(payload.pwd(), "/payload/");
        assert_eq!(root.pwd(), "/");

        let nested = archive.cd(&payload, "sub/nested/").unwrap();
        assert_eq!(nested.pwd(), "/payload/sub/nested/");
        assert_eq!(archive.cd(&nested, "/").unwrap(), Location::root());
    }

    #[test]
    fn cd_errors() {
        let archive = sample();
        let root = Location::root();
        assert!(matches!(archive.cd(&root, "top.txt"), Err(Error::NotADirectory(_))));
        assert!(matches!(archive.cd(&root, "nowhere"), Err(Error::NotFound(_))));
        assert!(matches!(archive.cd(&root, ".."), Err(Error::PathTraversal { .. })));
    }

    #[test]
    fn ls_lists_children() {
        let archive = sample();
        let root = Location::root();
        assert_eq!(archive.ls(&root, None, false).unwrap(), vec!["docs/", "payload/", "top.txt"]);

        let payload = archive.cd(&root, "payload").unwrap();
        assert_eq!(
            archive.ls(&payload, Some("sub"), true).unwrap(),
            vec!["payload/sub/a.txt", "payload/sub/nested/", "payload/sub/nested/b.bin"]
        );
        assert!(matches!(archive.ls(&root, Some("top.txt"), false), Err(Error::NotADirectory(_))));
    }

    #[test]
    fn cat_and_info() {
        let mut archive = sample();
        let root = Location::root();
        assert_eq!(archive.cat_text(&root, "payload/data1.csv").unwrap(), "a,b,c\n1,2,3\n");
        assert_eq!(archive.cat(&root, "payload/sub/nested/b.bin").unwrap(), vec![0, 1, 2, 3]);
        assert!(matches!(archive.cat(&root, "payload"), Err(Error::IsADirectory(_))));
        assert!(matches!(archive.cat(&root, "missing.txt"), Err(Error::NotFound(_))));
        assert!(matches!(archive.cat_text(&root, "docs/raw.bin"), Err(Error::InvalidText(_))));

        let info = archive.info(&root, "top.txt").unwrap();
        assert_eq!(info.uncompressed_size, 6);
        assert_eq!(info.crc32, crc32fast::hash(b"hello\n"));
        assert_eq!(info.compression_method, "DEFLATED");
        assert!(matches!(archive.info(&root, "docs/"), Err(Error::IsADirectory(_))));
    }

    #[test]
    fn existence_queries() {
        let archive = sample();
        let root = Location::root();
        assert!(archive.exists(&root, "payload"));
        assert!(archive.exists(&root, "payload/data2.csv"));
        assert!(!archive.exists(&root, "payload/nope"));
        assert!(archive.is_dir(&root, "payload/sub"));
        assert!(!archive.is_dir(&root, "top.txt"));
        assert!(archive.is_file(&root, "top.txt"));
        assert!(!archive.is_file(&root, "docs"));
    }
}
