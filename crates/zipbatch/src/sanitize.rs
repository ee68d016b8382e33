use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// An archive member path that is safe to join onto a destination root.
///
/// Always relative, `/`-separated, free of `.`/`..`/empty segments and of
/// volume prefixes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SanitizedPath {
    pub original: String,
    relative: String,
}

impl SanitizedPath {
    pub fn as_str(&self) -> &str { &self.relative }

    pub fn segments(&self) -> impl Iterator<Item = &str> { self.relative.split('/') }

    /// Join onto `root`; the result never leaves `root`.
    pub fn join_to(&self, root: impl AsRef<Path>) -> PathBuf {
        let mut out = root.as_ref().to_path_buf();
        for segment in self.segments() {
            out.push(segment);
        }
        out
    }
}

fn reject(entry: &str, reason: &'static str) -> Error {
    Error::PathTraversal {
        entry: entry.to_string(),
        reason,
    }
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Validate and normalize a raw member path (zip-slip prevention).
///
/// Rejects absolute paths, drive/volume prefixes, NUL bytes and any `..`
/// segment. Backslashes count as separators.
pub fn sanitize(raw: &str) -> Result<SanitizedPath> {
    if raw.contains('\0') {
        return Err(reject(raw, "contains a NUL byte"));
    }

    let unified = raw.replace('\\', "/");
    if unified.starts_with('/') {
        return Err(reject(raw, "is absolute"));
    }
    if has_drive_prefix(&unified) {
        return Err(reject(raw, "has a volume prefix"));
    }

    let mut segments = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(reject(raw, "contains a parent segment")),
            normal => {
                // A segment must stay a single plain component on this platform.
                let mut components = Path::new(normal).components();
                match (components.next(), components.next()) {
                    (Some(Component::Normal(_)), None) => segments.push(normal),
                    _ => return Err(reject(raw, "has a non-portable segment")),
                }
            }
        }
    }

    if segments.is_empty() {
        return Err(reject(raw, "resolves to the destination root"));
    }

    Ok(SanitizedPath {
        original: raw.to_string(),
        relative: segments.join("/"),
    })
}
