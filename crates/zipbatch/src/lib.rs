//! Resumable, batched extraction of large ZIP archives.
//!
//! An [`Archive`] is opened once and its central directory becomes an
//! [`EntryCatalog`]. A [`BatchIterator`] selects members under a base
//! directory, orders them (catalog order, or a seeded shuffle), and extracts
//! them a batch at a time. Progress lives in `.zip_iter_state.json` inside the
//! extraction directory, so a killed process picks up where it stopped.
//!
//! Every member path goes through [`sanitize`] before anything touches the
//! filesystem, and with `validate_crc` each member's CRC-32 and size are
//! checked against the central directory.
//!
//! Between pulls the archive can be browsed read-only with a [`Location`]:
//!
//! ```no_run
//! use zipbatch::{Archive, Location};
//!
//! let mut archive = Archive::open("data.zip")?;
//! let here = archive.cd(&Location::root(), "payload")?;
//! for name in archive.ls(&here, None, false)? {
//!     println!("{name}");
//! }
//! println!("{}", archive.cat_text(&here, "readme.txt")?);
//! # Ok::<(), zipbatch::Error>(())
//! ```

mod archive;
mod catalog;
mod engine;
mod entry;
mod error;
mod iter;
mod nav;
mod options;
mod plan;
mod sanitize;
mod state;
mod verify;

#[cfg(test)]
#[path = "../tests/common/fixture.rs"]
mod test_support;

pub use archive::Archive;
pub use catalog::EntryCatalog;
pub use engine::{ExtractionEngine, Outcome};
pub use entry::Entry;
pub use error::{Error, Result};
pub use iter::{BatchIterator, BatchResult, FAILED_TAIL_LEN, Phase, StatusSnapshot, read_status, reset_output};
pub use nav::Location;
pub use options::{DEFAULT_BATCH_SIZE, DEFAULT_EXTRACT_SUBDIR, DEFAULT_MAX_RETRIES, IterConfig, OnError};
pub use plan::{Plan, SplitMix64, plan, shuffle};
pub use sanitize::{SanitizedPath, sanitize};
pub use state::{FailureRecord, PersistentState, SCHEMA_VERSION, STATE_FILE_NAME};
pub use zipbatch_fs::{FixedSpaceProbe, SpaceProbe, SystemSpaceProbe};
