use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("path not found: '{0}'")]
    NotFound(PathBuf),

    #[error("failed to read '{path}': {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write '{path}': {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to remove '{path}': {source}")]
    Remove { path: PathBuf, source: io::Error },
}

impl Error {
    pub fn is_not_found(&self) -> bool { matches!(self, Self::NotFound(_)) }
}

pub type Result<T> = std::result::Result<T, Error>;
