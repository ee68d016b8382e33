//! Member selection, deterministic ordering and batch partitioning.

use std::collections::BTreeSet;

use sha2::{Digest, Sha256};

use crate::catalog::EntryCatalog;
use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::nav::Location;

const FINGERPRINT_TAG: &[u8] = b"zipbatch-plan-v1";

/// The ordered member list of one run, fixed at initialize.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plan {
    fingerprint: String,
    base_prefix: String,
    members:     Vec<String>,
    batch_size:  usize,
}

impl Plan {
    pub fn fingerprint(&self) -> &str { &self.fingerprint }

    pub fn base_prefix(&self) -> &str { &self.base_prefix }

    pub fn members(&self) -> &[String] { &self.members }

    pub fn batch_size(&self) -> usize { self.batch_size }

    /// Never zero: `plan` refuses an empty selection.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize { self.members.len() }

    pub fn batch_count(&self) -> usize { self.members.len().div_ceil(self.batch_size) }

    pub fn batch(&self, index: usize) -> Option<&[String]> { self.members.chunks(self.batch_size).nth(index) }

    pub fn batches(&self) -> impl Iterator<Item = &[String]> { self.members.chunks(self.batch_size) }
}

/// Select files under `base` matching `extensions`, order them, and fingerprint the result.
///
/// Without a seed the catalog order is kept. With one, the selection is
/// shuffled by [`shuffle`], so identical inputs always give identical plans.
pub fn plan(
    catalog: &EntryCatalog,
    base: &Location,
    extensions: Option<&BTreeSet<String>>,
    seed: Option<u64>,
    batch_size: usize,
) -> Result<Plan> {
    if batch_size == 0 {
        return Err(Error::Configuration("batch_size must be greater than zero".into()));
    }
    let base_prefix = base.prefix().to_string();
    if !catalog.has_dir(&base_prefix) {
        return Err(Error::NotFound(base.pwd()));
    }

    let mut selected: Vec<&Entry> = catalog
        .files_under(&base_prefix)
        .filter(|entry| extensions.is_none_or(|exts| entry.has_extension(exts)))
        .collect();
    if selected.is_empty() {
        return Err(Error::EmptySelection { base: base_prefix });
    }
    if let Some(seed) = seed {
        shuffle(&mut selected, seed);
    }

    let fingerprint = fingerprint(&base_prefix, &selected, extensions, seed, batch_size);
    tracing::debug!(
        members = selected.len(),
        base = %base.pwd(),
        seeded = seed.is_some(),
        %fingerprint,
        "extraction plan built"
    );
    Ok(Plan {
        fingerprint,
        base_prefix,
        members: selected.into_iter().map(|e| e.path.clone()).collect(),
        batch_size,
    })
}

fn fingerprint(
    base_prefix: &str,
    selected: &[&Entry],
    extensions: Option<&BTreeSet<String>>,
    seed: Option<u64>,
    batch_size: usize,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(FINGERPRINT_TAG);
    hasher.update([0]);
    hasher.update(base_prefix.as_bytes());
    hasher.update([0]);
    hasher.update((selected.len() as u64).to_le_bytes());
    for entry in selected {
        hasher.update(entry.path.as_bytes());
        hasher.update([0]);
        hasher.update(entry.uncompressed_size.to_le_bytes());
        hasher.update(entry.crc32.to_le_bytes());
    }
    match extensions {
        None => hasher.update([0]),
        Some(exts) => {
            hasher.update([1]);
            for ext in exts {
                hasher.update(ext.as_bytes());
                hasher.update([0]);
            }
        }
    }
    match seed {
        None => hasher.update([0]),
        Some(seed) => {
            hasher.update([1]);
            hasher.update(seed.to_le_bytes());
        }
    }
    hasher.update((batch_size as u64).to_le_bytes());
    hex::encode(hasher.finalize())
}

/// SplitMix64 generator. Small, seedable, and stable across platforms.
#[derive(Clone, Debug)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self { Self { state: seed } }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform draw in `[0, bound)` by rejection, so no value is favoured.
    pub fn below(&mut self, bound: u64) -> u64 {
        debug_assert!(bound > 0);
        let threshold = bound.wrapping_neg() % bound;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return r % bound;
            }
        }
    }
}

/// Durstenfeld's Fisher-Yates: `i` runs from `n - 1` down to 1, `j` in `[0, i]`.
pub fn shuffle<T>(items: &mut [T], seed: u64) {
    let mut rng = SplitMix64::new(seed);
    for i in (1..items.len()).rev() {
        let j = rng.below(i as u64 + 1) as usize;
        items.swap(i, j);
    }
}
