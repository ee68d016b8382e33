use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("zip-slip attack detected: entry '{entry}' {reason}")]
    PathTraversal { entry: String, reason: &'static str },

    #[error("not found: '{0}'")]
    NotFound(String),

    #[error("not a directory: '{0}'")]
    NotADirectory(String),

    #[error("is a directory: '{0}'")]
    IsADirectory(String),

    #[error("'{0}' is not valid UTF-8 text")]
    InvalidText(String),

    #[error("persisted state does not match the current plan: {0}")]
    StateMismatch(String),

    #[error("unsupported state schema version {found} (expected {expected})")]
    UnsupportedStateVersion { found: u64, expected: u32 },

    #[error(
        "insufficient free space in '{path}': need ~{required} bytes, {available} available"
    )]
    InsufficientSpace {
        path: PathBuf,
        required: u64,
        available: u64,
    },

    #[error("integrity check failed for '{entry}': {detail}")]
    Integrity { entry: String, detail: String },

    #[error("failed to extract '{entry}': {source}")]
    ExtractionIo { entry: String, source: io::Error },

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("no files under '/{base}' match the requested filter")]
    EmptySelection { base: String },

    #[error("invalid iterator state: {0}")]
    InvalidState(&'static str),

    #[error("archive is corrupted: {0}")]
    Corrupted(String),

    #[error("state persistence failed: {source}")]
    Fs { source: zipbatch_fs::Error },

    #[error("malformed state record: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Whether another attempt at the same member may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Integrity { .. } | Self::ExtractionIo { .. })
    }

    /// Failures that stay local to one member and follow the `on_error` policy.
    pub fn is_member_failure(&self) -> bool {
        self.is_retryable() || matches!(self, Self::PathTraversal { .. } | Self::NotFound(_))
    }
}

impl From<zipbatch_fs::Error> for Error {
    fn from(e: zipbatch_fs::Error) -> Self {
        match e {
            zipbatch_fs::Error::NotFound(path) => Self::NotFound(path.display().to_string()),
            other => Self::Fs { source: other },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_kinds() {
        let integrity = Error::Integrity {
            entry: "a.csv".into(),
            detail: "crc".into(),
        };
        let io = Error::ExtractionIo {
            entry: "a.csv".into(),
            source: io::Error::other("disk"),
        };
        let traversal = Error::PathTraversal {
            entry: "../a".into(),
            reason: "contains a parent segment",
        };
        assert!(integrity.is_retryable());
        assert!(io.is_retryable());
        assert!(!traversal.is_retryable());
        assert!(traversal.is_member_failure());
        assert!(!Error::Configuration("x".into()).is_member_failure());
    }

    #[test]
    fn fs_not_found_maps_to_not_found() {
        let err: Error = zipbatch_fs::Error::NotFound(PathBuf::from("/tmp/state.json")).into();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
