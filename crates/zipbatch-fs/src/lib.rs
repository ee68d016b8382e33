//! Filesystem primitives for resumable extraction.
//!
//! - `atomic_write` / `atomic_read`: temp-then-rename persistence, so a crash
//!   mid-write leaves the previous copy intact
//! - `remove_tree` / `clear_dir_except`: output tree cleanup
//! - `SpaceProbe`: free-space lookup for the volume holding a path

mod error;
mod primitives;
mod space;

pub use error::{Error, Result};
pub use primitives::{AtomicWriteOptions, atomic_read, atomic_write, clear_dir_except, remove_tree};
pub use space::{FixedSpaceProbe, SpaceProbe, SystemSpaceProbe};
