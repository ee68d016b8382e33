use std::fs::File;
use std::io::{self, BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use flate2::read::DeflateDecoder;

use crate::catalog::EntryCatalog;
use crate::entry::{Codec, Entry, RawRecord};
use crate::error::{Error, Result};

/// An open ZIP archive plus the catalog built from its central directory.
///
/// All reads go through `&mut self`, so navigation and extraction against one
/// handle are serialized by the borrow checker.
pub struct Archive<R: Read + Seek = BufReader<File>> {
    zip: zip::ZipArchive<R>,
    catalog: EntryCatalog,
    source: Option<PathBuf>,
}

impl Archive<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::NotFound(path.display().to_string()),
            _ => Error::Io(e),
        })?;
        let mut archive = Self::new(BufReader::new(file))?;
        archive.source = Some(path.canonicalize().unwrap_or_else(|_| path.to_path_buf()));
        Ok(archive)
    }
}

impl<R: Read + Seek> Archive<R> {
    pub fn new(reader: R) -> Result<Self> {
        let mut zip =
            zip::ZipArchive::new(reader).map_err(|e| Error::Corrupted(e.to_string()))?;

        let mut entries = Vec::with_capacity(zip.len());
        for index in 0..zip.len() {
            let file = zip
                .by_index_raw(index)
                .map_err(|e| Error::Corrupted(e.to_string()))?;
            let record = RawRecord {
                name: file.name().to_string(),
                size: file.size(),
                compressed_size: file.compressed_size(),
                crc32: file.crc32(),
                method: file.compression(),
                modified: file.last_modified(),
            };
            entries.push(Entry::from_record(index, record));
        }

        let catalog = EntryCatalog::from_entries(entries);
        tracing::debug!(entries = catalog.len(), "archive catalog built");
        Ok(Self {
            zip,
            catalog,
            source: None,
        })
    }

    pub fn catalog(&self) -> &EntryCatalog { &self.catalog }

    /// Canonical path of the archive file when opened with [`Archive::open`].
    pub fn source(&self) -> Option<&Path> { self.source.as_deref() }

    /// Stream the decompressed bytes of `entry`.
    ///
    /// With `verify`, stored and deflated members are decoded from their raw
    /// bytes so the caller's own CRC accounting sees corruption first. Other
    /// methods go through the zip crate's decoder.
    pub(crate) fn open_entry(&mut self, entry: &Entry, verify: bool) -> Result<Box<dyn Read + '_>> {
        let map_err = |e: zip::result::ZipError| match e {
            zip::result::ZipError::FileNotFound => Error::NotFound(entry.path.clone()),
            zip::result::ZipError::Io(source) => Error::ExtractionIo {
                entry: entry.path.clone(),
                source,
            },
            other => Error::ExtractionIo {
                entry: entry.path.clone(),
                source: io::Error::other(other),
            },
        };

        if verify && entry.codec != Codec::Other {
            let raw = self.zip.by_index_raw(entry.index).map_err(map_err)?;
            return Ok(match entry.codec {
                Codec::Deflated => Box::new(DeflateDecoder::new(raw)),
                _ => Box::new(raw),
            });
        }
        let file = self.zip.by_index(entry.index).map_err(map_err)?;
        Ok(Box::new(file))
    }

    /// Whole content of a file member, decoded and checked by the zip crate.
    pub fn read_entry(&mut self, entry: &Entry) -> Result<Vec<u8>> {
        if entry.is_directory {
            return Err(Error::IsADirectory(entry.path.clone()));
        }
        let mut buf = Vec::with_capacity(entry.uncompressed_size.min(64 * 1024 * 1024) as usize);
        self.open_entry(entry, false)?
            .read_to_end(&mut buf)
            .map_err(|source| Error::ExtractionIo {
                entry: entry.path.clone(),
                source,
            })?;
        Ok(buf)
    }
}
