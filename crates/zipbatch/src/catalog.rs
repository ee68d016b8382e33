use std::collections::{BTreeSet, HashMap};

use crate::entry::Entry;
use crate::error::{Error, Result};

/// `""` for the root, otherwise `dir/`.
pub(crate) fn dir_prefix(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

/// Queryable view of an archive's central directory, in catalog order.
#[derive(Clone, Debug, Default)]
pub struct EntryCatalog {
    entries: Vec<Entry>,
    by_path: HashMap<String, usize>,
}

impl EntryCatalog {
    /// Duplicate paths keep their first occurrence.
    pub fn from_entries(entries: impl IntoIterator<Item = Entry>) -> Self {
        let mut catalog = Self::default();
        for entry in entries {
            if catalog.by_path.contains_key(&entry.path) {
                tracing::warn!(path = %entry.path, "duplicate archive member ignored");
                continue;
            }
            catalog.by_path.insert(entry.path.clone(), catalog.entries.len());
            catalog.entries.push(entry);
        }
        catalog
    }

    pub fn entries(&self) -> &[Entry] { &self.entries }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn get(&self, path: &str) -> Option<&Entry> {
        self.by_path.get(path).map(|&i| &self.entries[i])
    }

    pub fn lookup(&self, path: &str) -> Result<&Entry> {
        self.get(path).ok_or_else(|| Error::NotFound(path.to_string()))
    }

    /// True for the root, explicit directory entries, and implicit directories
    /// that only exist as a prefix of deeper members.
    pub fn has_dir(&self, path: &str) -> bool {
        let prefix = dir_prefix(path);
        prefix.is_empty() || self.entries.iter().any(|e| e.path.starts_with(&prefix))
    }

    /// Immediate children of `path`, sorted, directories suffixed with `/`.
    pub fn children_of(&self, path: &str) -> Vec<String> {
        let prefix = dir_prefix(path);
        let mut children = BTreeSet::new();
        for entry in &self.entries {
            let Some(rest) = entry.path.strip_prefix(&prefix) else {
                continue;
            };
            if rest.is_empty() {
                continue;
            }
            match rest.find('/') {
                Some(slash) => children.insert(format!("{prefix}{}", &rest[..=slash])),
                None => children.insert(entry.path.clone()),
            };
        }
        children.into_iter().collect()
    }

    /// Every file and directory below `path`, sorted, directories suffixed.
    pub fn descendants_of(&self, path: &str) -> Vec<String> {
        let prefix = dir_prefix(path);
        let mut out = BTreeSet::new();
        for entry in &self.entries {
            let Some(rest) = entry.path.strip_prefix(&prefix) else {
                continue;
            };
            for (i, _) in rest.match_indices('/') {
                out.insert(format!("{prefix}{}", &rest[..=i]));
            }
            if !rest.is_empty() {
                out.insert(entry.path.clone());
            }
        }
        out.into_iter().collect()
    }

    /// File entries below `path`, in catalog order.
    pub fn files_under<'a>(&'a self, path: &str) -> impl Iterator<Item = &'a Entry> + use<'a> {
        let prefix = dir_prefix(path);
        self.entries
            .iter()
            .filter(move |e| e.is_file() && e.path.starts_with(&prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EntryCatalog {
        EntryCatalog::from_entries(
            [
                "payload/data1.csv",
                "payload/data2.csv",
                "payload/sub/a.txt",
                "payload/sub/nested/b.bin",
                "top.txt",
                "docs/",
                "docs/readme.md",
            ]
            .iter()
            .enumerate()
            .map(|(i, p)| Entry::synthetic(i, p, 4)),
        )
    }

    #[test]
    fn lookup_and_classification() {
        let catalog = sample();
        assert!(catalog.lookup("top.txt").unwrap().is_file());
        assert!(catalog.lookup("docs/").unwrap().is_directory);
        assert!(matches!(catalog.lookup("missing"), Err(Error::NotFound(_))));
    }

    #[test]
    fn implicit_directories() {
        let catalog = sample();
        assert!(catalog.has_dir(""));
        assert!(catalog.has_dir("payload"));
        assert!(catalog.has_dir("payload/sub/"));
        assert!(!catalog.has_dir("top.txt"));
        assert!(!catalog.has_dir("pay"));
    }

    #[test]
    fn children_are_immediate() {
        let catalog = sample();
        assert_eq!(catalog.children_of(""), vec!["docs/", "payload/", "top.txt"]);
        assert_eq!(
            catalog.children_of("payload/"),
            vec!["payload/data1.csv", "payload/data2.csv", "payload/sub/"]
        );
        assert_eq!(catalog.children_of("docs"), vec!["docs/readme.md"]);
    }

    #[test]
    fn descendants_include_implicit_dirs() {
        let catalog = sample();
        assert_eq!(
            catalog.descendants_of("payload/sub"),
            vec!["payload/sub/a.txt", "payload/sub/nested/", "payload/sub/nested/b.bin"]
        );
    }

    #[test]
    fn files_under_keeps_catalog_order() {
        let catalog = sample();
        let files: Vec<_> = catalog.files_under("").map(|e| e.path.as_str()).collect();
        assert_eq!(files.len(), 6);
        assert_eq!(files[0], "payload/data1.csv");
        assert_eq!(files[5], "docs/readme.md");
    }

    #[test]
    fn duplicates_keep_first() {
        let catalog = EntryCatalog::from_entries([
            Entry::synthetic(0, "a.txt", 1),
            Entry::synthetic(1, "a.txt", 2),
        ]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.lookup("a.txt").unwrap().uncompressed_size, 1);
    }
}
