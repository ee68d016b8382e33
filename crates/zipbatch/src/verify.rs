use std::io::{self, Read};

/// Reader that accumulates a CRC-32 and byte count as data passes through.
pub(crate) struct CrcReader<R> {
    reader: R,
    hasher: crc32fast::Hasher,
    len:    u64,
}

impl<R: Read> CrcReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            hasher: crc32fast::Hasher::new(),
            len: 0,
        }
    }

    /// Compare against the central-directory record. `Err` carries a description.
    pub fn finish(self, expected_crc: u32, expected_len: u64) -> Result<(), String> {
        if self.len != expected_len {
            return Err(format!("size mismatch: expected {expected_len} bytes, got {}", self.len));
        }
        let actual = self.hasher.finalize();
        if actual != expected_crc {
            return Err(format!("crc32 mismatch: expected {expected_crc:08x}, got {actual:08x}"));
        }
        Ok(())
    }
}

impl<R: Read> Read for CrcReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.reader.read(buf)?;
        if n > 0 {
            self.hasher.update(&buf[..n]);
            self.len += n as u64;
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_content_passes() {
        let data = b"hello world";
        let mut reader = CrcReader::new(&data[..]);
        io::copy(&mut reader, &mut io::sink()).unwrap();
        reader.finish(crc32fast::hash(data), data.len() as u64).unwrap();
    }

    #[test]
    fn mismatches_are_described() {
        let data = b"hello world";
        let mut reader = CrcReader::new(&data[..]);
        io::copy(&mut reader, &mut io::sink()).unwrap();
        let err = reader.finish(0xdead_beef, data.len() as u64).unwrap_err();
        assert!(err.contains("crc32 mismatch"));

        let mut short = CrcReader::new(&data[..5]);
        io::copy(&mut short, &mut io::sink()).unwrap();
        let err = short.finish(crc32fast::hash(data), data.len() as u64).unwrap_err();
        assert!(err.contains("size mismatch"));
    }
}
