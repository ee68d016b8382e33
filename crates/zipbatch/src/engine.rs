//! Single-member extraction: sanitize, stream to a temp file, verify, rename.

use std::fs;
use std::io::{self, ErrorKind, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use zipbatch_fs::SpaceProbe;

use crate::archive::Archive;
use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::sanitize::sanitize;
use crate::state::FailureRecord;
use crate::verify::CrcReader;

const CHUNK_SIZE: usize = 1024 * 1024;
const SPACE_MARGIN: u64 = 16 * 1024 * 1024;

/// Result of running one member through the engine, retries included.
#[derive(Debug)]
pub enum Outcome {
    Extracted { path: PathBuf, attempts: u32 },
    Failed { record: FailureRecord, error: Error },
}

pub struct ExtractionEngine {
    max_retries:  u32,
    validate_crc: bool,
    probe:        Arc<dyn SpaceProbe + Send + Sync>,
}

impl ExtractionEngine {
    pub fn new(max_retries: u32, validate_crc: bool, probe: Arc<dyn SpaceProbe + Send + Sync>) -> Self {
        Self {
            max_retries,
            validate_crc,
            probe,
        }
    }

    /// Refuse to start a batch that cannot fit on the destination volume.
    ///
    /// Needs the uncompressed total plus 5% and a fixed margin. A volume the
    /// probe cannot resolve is not checked.
    pub fn preflight(&self, entries: &[&Entry], root: &Path) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let total: u64 = entries.iter().map(|e| e.uncompressed_size).sum();
        let required = total
            .saturating_add(total / 20)
            .saturating_add(SPACE_MARGIN);

        let probe_path = nearest_existing(root);
        let Some(available) = self.probe.available_space(&probe_path) else {
            tracing::debug!(path = %probe_path.display(), "free space unknown, skipping preflight");
            return Ok(());
        };
        if available < required {
            return Err(Error::InsufficientSpace {
                path: probe_path,
                required,
                available,
            });
        }
        tracing::debug!(required, available, "space preflight passed");
        Ok(())
    }

    /// Extract `entry` below `root`, retrying integrity and I/O failures.
    ///
    /// `retry_count` is the member's cumulative counter and may already be
    /// non-zero from an earlier run. Every retry bumps it and passes the new
    /// value to `checkpoint` before the next attempt starts; an error from
    /// `checkpoint` is returned as is. `attempts` in the outcome is always
    /// `retry_count + 1`.
    pub fn extract_one<R: Read + Seek>(
        &self,
        archive: &mut Archive<R>,
        entry: &Entry,
        root: &Path,
        retry_count: &mut u32,
        mut checkpoint: impl FnMut(u32) -> Result<()>,
    ) -> Result<Outcome> {
        let target = match sanitize(&entry.path) {
            Ok(sanitized) => sanitized.join_to(root),
            Err(error) => {
                tracing::warn!(entry = %entry.path, %error, "unsafe member path");
                return Ok(failed(entry, error, *retry_count + 1));
            }
        };

        loop {
            match self.attempt(archive, entry, &target) {
                Ok(()) => {
                    tracing::debug!(entry = %entry.path, target = %target.display(), "member extracted");
                    return Ok(Outcome::Extracted {
                        path:     target,
                        attempts: *retry_count + 1,
                    });
                }
                Err(error) if error.is_retryable() && *retry_count < self.max_retries => {
                    *retry_count += 1;
                    tracing::warn!(
                        entry = %entry.path,
                        retry = *retry_count,
                        max_retries = self.max_retries,
                        %error,
                        "retrying member"
                    );
                    checkpoint(*retry_count)?;
                }
                Err(error) => {
                    tracing::warn!(entry = %entry.path, attempts = *retry_count + 1, %error, "member failed");
                    return Ok(failed(entry, error, *retry_count + 1));
                }
            }
        }
    }

    fn attempt<R: Read + Seek>(&self, archive: &mut Archive<R>, entry: &Entry, target: &Path) -> Result<()> {
        let io_err = |source: io::Error| Error::ExtractionIo {
            entry: entry.path.clone(),
            source,
        };

        if entry.is_directory {
            return fs::create_dir_all(target).map_err(io_err);
        }
        let parent = target
            .parent()
            .ok_or_else(|| io_err(io::Error::other("target has no parent directory")))?;
        fs::create_dir_all(parent).map_err(io_err)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".zipbatch-")
            .suffix(".part")
            .tempfile_in(parent)
            .map_err(io_err)?;

        let mut reader = CrcReader::new(archive.open_entry(entry, self.validate_crc)?);
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.read_error(entry, e)),
            };
            tmp.write_all(&buf[..n]).map_err(io_err)?;
        }

        if self.validate_crc {
            reader
                .finish(entry.crc32, entry.uncompressed_size)
                .map_err(|detail| Error::Integrity {
                    entry: entry.path.clone(),
                    detail,
                })?;
        }
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(target).map_err(|e| io_err(e.error))?;
        Ok(())
    }

    /// Decoder complaints are corruption when the caller asked for integrity checks.
    fn read_error(&self, entry: &Entry, source: io::Error) -> Error {
        let corrupt = matches!(
            source.kind(),
            ErrorKind::InvalidData | ErrorKind::InvalidInput | ErrorKind::UnexpectedEof
        );
        if self.validate_crc && corrupt {
            Error::Integrity {
                entry:  entry.path.clone(),
                detail: source.to_string(),
            }
        } else {
            Error::ExtractionIo {
                entry: entry.path.clone(),
                source,
            }
        }
    }
}

fn failed(entry: &Entry, error: Error, attempts: u32) -> Outcome {
    Outcome::Failed {
        record: FailureRecord {
            path: entry.path.clone(),
            reason: error.to_string(),
            attempts,
        },
        error,
    }
}

fn nearest_existing(path: &Path) -> PathBuf {
    path.ancestors()
        .find(|p| !p.as_os_str().is_empty() && p.exists())
        .unwrap_or(path)
        .to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Member, build_zip, corrupt};
    use std::io::Cursor;
    use zipbatch_fs::FixedSpaceProbe;

    fn engine(max_retries: u32, validate_crc: bool) -> ExtractionEngine {
        ExtractionEngine::new(max_retries, validate_crc, Arc::new(FixedSpaceProbe(None)))
    }

    fn archive(members: &[Member]) -> Archive<Cursor<Vec<u8>>> {
        Archive::new(Cursor::new(build_zip(members))).unwrap()
    }

    #[test]
    fn extracts_stored_and_deflated() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = archive(&[
            Member::stored("a/one.txt", b"stored payload"),
            Member::deflated("a/b/two.txt", b"deflated payload deflated payload"),
        ]);
        let engine = engine(0, true);

        for path in ["a/one.txt", "a/b/two.txt"] {
            let entry = archive.catalog().lookup(path).unwrap().clone();
            let mut retries = 0;
            match engine
                .extract_one(&mut archive, &entry, dir.path(), &mut retries, |_| Ok(()))
                .unwrap()
            {
                Outcome::Extracted { path, attempts } => {
                    assert_eq!(attempts, 1);
                    assert!(path.starts_with(dir.path()));
                }
                Outcome::Failed { error, .. } => panic!("unexpected failure: {error}"),
            }
        }
        assert_eq!(fs::read(dir.path().join("a/one.txt")).unwrap(), b"stored payload");
        assert_eq!(
            fs::read(dir.path().join("a/b/two.txt")).unwrap(),
            b"deflated payload deflated payload"
        );
        let leftovers: Vec<_> = fs::read_dir(dir.path().join("a"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn corrupted_member_exhausts_retries() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = build_zip(&[Member::stored("bad.bin", b"UNIQUE-CORRUPTIBLE-CONTENT")]);
        corrupt(&mut bytes, b"UNIQUE-CORRUPTIBLE-CONTENT");
        let mut archive = Archive::new(Cursor::new(bytes)).unwrap();
        let entry = archive.catalog().lookup("bad.bin").unwrap().clone();

        let mut retries = 0;
        let mut checkpoints = Vec::new();
        let outcome = engine(2, true)
            .extract_one(&mut archive, &entry, dir.path(), &mut retries, |count| {
                checkpoints.push(count);
                Ok(())
            })
            .unwrap();
        match outcome {
            Outcome::Failed { record, error } => {
                assert!(matches!(error, Error::Integrity { .. }));
                assert_eq!(record.attempts, 3);
                assert_eq!(record.path, "bad.bin");
            }
            Outcome::Extracted { .. } => panic!("corruption went unnoticed"),
        }
        assert_eq!(retries, 2);
        assert_eq!(checkpoints, vec![1, 2]);
        assert!(!dir.path().join("bad.bin").exists());
    }

    #[test]
    fn retry_budget_counts_earlier_runs() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = build_zip(&[Member::stored("bad.bin", b"UNIQUE-CORRUPTIBLE-CONTENT")]);
        corrupt(&mut bytes, b"UNIQUE-CORRUPTIBLE-CONTENT");
        let mut archive = Archive::new(Cursor::new(bytes)).unwrap();
        let entry = archive.catalog().lookup("bad.bin").unwrap().clone();

        // Two retries already spent: one more attempt, no further retry.
        let mut retries = 2;
        let outcome = engine(2, true)
            .extract_one(&mut archive, &entry, dir.path(), &mut retries, |_| {
                panic!("no retry budget left")
            })
            .unwrap();
        assert!(matches!(outcome, Outcome::Failed { ref record, .. } if record.attempts == 3));
        assert_eq!(retries, 2);
    }

    #[test]
    fn checkpoint_error_stops_the_member() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = build_zip(&[Member::stored("bad.bin", b"UNIQUE-CORRUPTIBLE-CONTENT")]);
        corrupt(&mut bytes, b"UNIQUE-CORRUPTIBLE-CONTENT");
        let mut archive = Archive::new(Cursor::new(bytes)).unwrap();
        let entry = archive.catalog().lookup("bad.bin").unwrap().clone();

        let mut retries = 0;
        let result = engine(3, true).extract_one(&mut archive, &entry, dir.path(), &mut retries, |_| {
            Err(Error::InvalidState("state not writable"))
        });
        assert!(matches!(result, Err(Error::InvalidState(_))));
        assert_eq!(retries, 1);
    }

    #[test]
    fn traversal_fails_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("out");
        let mut archive = archive(&[Member::stored("../escape.txt", b"nope")]);
        let entry = archive.catalog().lookup("../escape.txt").unwrap().clone();

        let mut retries = 0;
        let outcome = engine(3, false)
            .extract_one(&mut archive, &entry, &root, &mut retries, |_| Ok(()))
            .unwrap();
        assert!(matches!(
            outcome,
            Outcome::Failed { error: Error::PathTraversal { .. }, ref record } if record.attempts == 1
        ));
        assert!(!dir.path().join("escape.txt").exists());
        assert_eq!(retries, 0);
    }

    #[test]
    fn directory_entries_are_created() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = archive(&[Member::dir("empty/")]);
        let entry = archive.catalog().lookup("empty/").unwrap().clone();
        let mut retries = 0;
        let outcome = engine(0, false)
            .extract_one(&mut archive, &entry, dir.path(), &mut retries, |_| Ok(()))
            .unwrap();
        assert!(matches!(outcome, Outcome::Extracted { .. }));
        assert!(dir.path().join("empty").is_dir());
    }

    #[test]
    fn preflight_checks_free_space() {
        let dir = tempfile::tempdir().unwrap();
        let entry = Entry::synthetic(0, "big.bin", 100 * 1024 * 1024);
        let entries = [&entry];

        let starved = ExtractionEngine::new(0, false, Arc::new(FixedSpaceProbe(Some(1024))));
        assert!(matches!(
            starved.preflight(&entries, &dir.path().join("not/yet/created")),
            Err(Error::InsufficientSpace { required, .. }) if required == 105 * 1024 * 1024 + SPACE_MARGIN
        ));

        let roomy = ExtractionEngine::new(0, false, Arc::new(FixedSpaceProbe(Some(u64::MAX))));
        roomy.preflight(&entries, dir.path()).unwrap();
        engine(0, false).preflight(&entries, dir.path()).unwrap();
        starved.preflight(&[], dir.path()).unwrap();
    }
}
