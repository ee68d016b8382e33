#![allow(dead_code)]

mod fixture;

use std::io::Cursor;

use zipbatch::{Archive, BatchIterator, FixedSpaceProbe};

pub use fixture::{Member, build_zip, corrupt};

/// `payload/f00.csv` .. `payload/f{n-1}.csv`, each with distinct content.
pub fn numbered_csvs(n: usize) -> Vec<Member> {
    (0..n)
        .map(|i| Member::deflated(format!("payload/f{i:02}.csv"), content_of(i)))
        .collect()
}

pub fn content_of(i: usize) -> Vec<u8> { format!("id,value\n{i},{}\n", i * 7).into_bytes() }

/// Iterator over in-memory bytes with the free-space check switched off.
pub fn iterator(bytes: &[u8]) -> BatchIterator<Cursor<Vec<u8>>> {
    let archive = Archive::new(Cursor::new(bytes.to_vec())).unwrap();
    BatchIterator::new(archive).with_space_probe(FixedSpaceProbe(None))
}
