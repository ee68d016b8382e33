pub mod atomic_write;
pub mod remove_tree;

pub use atomic_write::{AtomicWriteOptions, atomic_read, atomic_write};
pub use remove_tree::{clear_dir_except, remove_tree};
