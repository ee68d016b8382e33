use chrono::{NaiveDate, NaiveDateTime};

/// How the engine can decode a member itself when verifying integrity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Codec {
    Stored,
    Deflated,
    Other,
}

impl Codec {
    pub(crate) fn from_method(method: zip::CompressionMethod) -> Self {
        match method {
            zip::CompressionMethod::Stored => Self::Stored,
            zip::CompressionMethod::Deflated => Self::Deflated,
            _ => Self::Other,
        }
    }
}

/// Central-directory fields as read from the zip crate.
pub(crate) struct RawRecord {
    pub name: String,
    pub size: u64,
    pub compressed_size: u64,
    pub crc32: u32,
    pub method: zip::CompressionMethod,
    pub modified: Option<zip::DateTime>,
}

/// One record of the archive's central directory.
#[derive(Clone, Debug)]
pub struct Entry {
    /// Archive-internal path, `/`-separated. Directories end with `/`.
    pub path: String,
    pub is_directory: bool,
    pub uncompressed_size: u64,
    pub compressed_size: u64,
    pub crc32: u32,
    /// Upper-case method name, e.g. `STORED` or `DEFLATED`.
    pub compression_method: String,
    pub timestamp: Option<NaiveDateTime>,
    pub(crate) index: usize,
    pub(crate) codec: Codec,
}

impl Entry {
    pub(crate) fn from_record(index: usize, record: RawRecord) -> Self {
        let path = record.name.replace('\\', "/");
        Self {
            is_directory: path.ends_with('/'),
            path,
            uncompressed_size: record.size,
            compressed_size: record.compressed_size,
            crc32: record.crc32,
            compression_method: format!("{:?}", record.method).to_uppercase(),
            timestamp: record.modified.and_then(to_naive),
            index,
            codec: Codec::from_method(record.method),
        }
    }

    pub fn is_file(&self) -> bool { !self.is_directory }

    /// Last path segment, without the trailing `/` of directories.
    pub fn name(&self) -> &str {
        let trimmed = self.path.trim_end_matches('/');
        trimmed.rsplit('/').next().unwrap_or(trimmed)
    }

    /// Case-insensitive suffix match against normalized (`.ext`, lowercase) extensions.
    pub fn has_extension<'a>(&self, extensions: impl IntoIterator<Item = &'a String>) -> bool {
        let name = self.name().to_lowercase();
        extensions.into_iter().any(|ext| name.ends_with(ext.as_str()))
    }

    #[cfg(test)]
    pub(crate) fn synthetic(index: usize, path: &str, size: u64) -> Self {
        Self {
            path: path.to_string(),
            is_directory: path.ends_with('/'),
            uncompressed_size: size,
            compressed_size: size,
            crc32: 0,
            compression_method: "STORED".into(),
            timestamp: None,
            index,
            codec: Codec::Stored,
        }
    }
}

fn to_naive(dt: zip::DateTime) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(dt.year() as i32, dt.month() as u32, dt.day() as u32)?.and_hms_opt(
        dt.hour() as u32,
        dt.minute() as u32,
        dt.second() as u32,
    )
}
