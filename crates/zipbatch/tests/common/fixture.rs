//! In-memory archives for tests. Shared by the unit tests in `src/` and the
//! integration tests, so it may only depend on `zip` and std.
#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

pub struct Member {
    pub name:   String,
    pub data:   Vec<u8>,
    /// `None` writes a directory entry.
    pub method: Option<CompressionMethod>,
}

impl Member {
    pub fn stored(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name:   name.into(),
            data:   data.into(),
            method: Some(CompressionMethod::Stored),
        }
    }

    pub fn deflated(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name:   name.into(),
            data:   data.into(),
            method: Some(CompressionMethod::Deflated),
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name:   name.into(),
            data:   Vec::new(),
            method: None,
        }
    }
}

pub fn build_zip(members: &[Member]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for member in members {
        match member.method {
            None => writer
                .add_directory(member.name.as_str(), SimpleFileOptions::default())
                .unwrap(),
            Some(method) => {
                let options = SimpleFileOptions::default().compression_method(method);
                writer.start_file(member.name.as_str(), options).unwrap();
                writer.write_all(&member.data).unwrap();
            }
        }
    }
    writer.finish().unwrap().into_inner()
}

/// Flip the first byte of `needle` inside the archive bytes. With a stored
/// member this lands in its data and leaves the central directory intact.
pub fn corrupt(bytes: &mut [u8], needle: &[u8]) {
    let at = bytes
        .windows(needle.len())
        .position(|w| w == needle)
        .expect("needle present in archive");
    bytes[at] ^= 0xff;
}
