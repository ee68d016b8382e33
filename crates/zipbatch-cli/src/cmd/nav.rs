use std::io::Write;

use anyhow::Result;
use zipbatch::{Archive, Location};

use crate::app::LsArg;
use crate::ui::{Field, Formatter, human_bytes};

pub fn ls(archive: &Archive, arg: &LsArg) -> Result<()> {
    let names = archive.ls(&Location::root(), arg.path.as_deref(), arg.recursive)?;
    let mut out = std::io::stdout().lock();
    for name in names {
        writeln!(out, "{name}")?;
    }
    Ok(())
}

pub fn cat(archive: &mut Archive, path: &str) -> Result<()> {
    let bytes = archive.cat(&Location::root(), path)?;
    let mut out = std::io::stdout().lock();
    out.write_all(&bytes)?;
    out.flush()?;
    Ok(())
}

pub fn info(archive: &Archive, path: &str) -> Result<()> {
    let entry = archive.info(&Location::root(), path)?;
    let ratio = if entry.uncompressed_size == 0 {
        "-".to_string()
    } else {
        format!("{:.1}%", entry.compressed_size as f64 * 100.0 / entry.uncompressed_size as f64)
    };
    let modified = entry
        .timestamp
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());

    let table = Formatter::default().build([
        Field::new("path", &entry.path),
        Field::new("size", format!("{} ({})", entry.uncompressed_size, human_bytes(entry.uncompressed_size))),
        Field::new("compressed", format!("{} ({ratio})", entry.compressed_size)),
        Field::new("method", &entry.compression_method),
        Field::new("crc32", format!("{:08x}", entry.crc32)),
        Field::new("modified", modified),
    ]);
    println!("{table}");
    Ok(())
}
