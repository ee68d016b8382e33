use crate::{Error, Result};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, Default)]
pub struct AtomicWriteOptions {
    /// Flush the temp file before the rename and the directory after it.
    pub sync: bool,
}

impl AtomicWriteOptions {
    pub fn new() -> Self { Self::default() }

    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }
}

/// Sibling of `target` named `.<name>.<pid>.tmp`.
fn staging_path(dir: &Path, target: &Path) -> PathBuf {
    let name = target.file_name().unwrap_or_default().to_string_lossy();
    dir.join(format!(".{name}.{}.tmp", std::process::id()))
}

fn write_staged(staging: &Path, content: &[u8], sync: bool) -> io::Result<()> {
    let mut file = fs::File::create(staging)?;
    file.write_all(content)?;
    if sync {
        file.sync_all()?;
    }
    Ok(())
}

/// Replace `path` with `content` through a staged sibling and a rename.
///
/// Readers see the old bytes or the new ones, never a torn file. The parent
/// directory must already exist.
pub fn atomic_write(path: impl AsRef<Path>, content: &[u8], options: AtomicWriteOptions) -> Result<()> {
    let target = path.as_ref();
    let Some(dir) = target.parent() else {
        return Err(Error::Write {
            path:   target.to_path_buf(),
            source: io::Error::other("path has no parent directory"),
        });
    };
    let staging = staging_path(dir, target);

    let staged = write_staged(&staging, content, options.sync)
        .and_then(|()| fs::rename(&staging, target));
    if let Err(source) = staged {
        let _ = fs::remove_file(&staging);
        return Err(Error::Write {
            path: target.to_path_buf(),
            source,
        });
    }

    #[cfg(unix)]
    if options.sync
        && let Ok(handle) = fs::File::open(dir)
    {
        let _ = handle.sync_all();
    }
    Ok(())
}

/// Read a file written by [`atomic_write`]; a missing file is [`Error::NotFound`].
pub fn atomic_read(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    fs::read(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            Error::NotFound(path.to_path_buf())
        } else {
            Error::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}
