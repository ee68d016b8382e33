//! Durable progress record, one JSON file per extraction directory.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zipbatch_fs::{AtomicWriteOptions, atomic_read, atomic_write};

use crate::error::{Error, Result};
use crate::options::{IterConfig, OnError};
use crate::plan::Plan;

pub const STATE_FILE_NAME: &str = ".zip_iter_state.json";
pub const SCHEMA_VERSION: u32 = 1;

/// A member that exhausted its attempts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub path:     String,
    pub reason:   String,
    pub attempts: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersistentState {
    pub schema_version:   u32,
    pub fingerprint:      String,
    pub base_prefix:      String,
    pub seed:             Option<u64>,
    pub extensions:       Option<BTreeSet<String>>,
    pub batch_size:       usize,
    pub total_members:    usize,
    pub next_batch_index: usize,
    pub extracted:        BTreeSet<String>,
    pub failed:           Vec<FailureRecord>,
    pub retry_counts:     BTreeMap<String, u32>,
    pub output_dir:       PathBuf,
    pub extract_subdir:   String,
    pub on_error:         OnError,
    pub max_retries:      u32,
    pub validate_crc:     bool,
    pub rotate:           bool,
    pub updated_at:       DateTime<Utc>,
}

impl PersistentState {
    /// Fresh state for `plan`, nothing extracted yet.
    pub fn new(plan: &Plan, config: &IterConfig) -> Result<Self> {
        Ok(Self {
            schema_version:   SCHEMA_VERSION,
            fingerprint:      plan.fingerprint().to_string(),
            base_prefix:      plan.base_prefix().to_string(),
            seed:             config.seed,
            extensions:       config.normalized_extensions()?,
            batch_size:       plan.batch_size(),
            total_members:    plan.len(),
            next_batch_index: 0,
            extracted:        BTreeSet::new(),
            failed:           Vec::new(),
            retry_counts:     BTreeMap::new(),
            output_dir:       config.output_dir.clone(),
            extract_subdir:   config.extract_subdir.clone(),
            on_error:         config.on_error,
            max_retries:      config.max_retries,
            validate_crc:     config.validate_crc,
            rotate:           config.rotate,
            updated_at:       Utc::now(),
        })
    }

    /// Policies follow the caller on every initialize, even when resuming.
    pub fn apply_policy(&mut self, config: &IterConfig) {
        self.on_error = config.on_error;
        self.max_retries = config.max_retries;
        self.validate_crc = config.validate_crc;
        self.rotate = config.rotate;
        self.output_dir = config.output_dir.clone();
    }

    /// Read the state file at `path`.
    ///
    /// The schema version is checked before the record is decoded, so a
    /// future layout is reported as such rather than as malformed JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = atomic_read(path)?;
        let value: serde_json::Value = serde_json::from_slice(&bytes)?;
        let found = value
            .get("schema_version")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0);
        if found != u64::from(SCHEMA_VERSION) {
            return Err(Error::UnsupportedStateVersion {
                found,
                expected: SCHEMA_VERSION,
            });
        }
        let state: Self = serde_json::from_value(value)?;
        tracing::debug!(
            path = %path.display(),
            extracted = state.extracted.len(),
            failed = state.failed.len(),
            next_batch = state.next_batch_index,
            "state loaded"
        );
        Ok(state)
    }

    /// Atomically replace the state file at `path`.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.updated_at = Utc::now();
        let content = serde_json::to_vec_pretty(self)?;
        atomic_write(path, &content, AtomicWriteOptions::new().sync(true))?;
        Ok(())
    }

    /// The stored fingerprint must name `plan`, and the record must fit inside it.
    pub fn verify_against(&self, plan: &Plan) -> Result<()> {
        if self.fingerprint != plan.fingerprint() {
            return Err(Error::StateMismatch(format!(
                "state was written for plan {} but the current plan is {}; reset to start over",
                short(&self.fingerprint),
                short(plan.fingerprint())
            )));
        }
        self.check_invariants(plan)
    }

    pub fn check_invariants(&self, plan: &Plan) -> Result<()> {
        let members: HashSet<&str> = plan.members().iter().map(String::as_str).collect();
        if let Some(stray) = self.extracted.iter().find(|p| !members.contains(p.as_str())) {
            return Err(Error::StateMismatch(format!(
                "extracted member '{stray}' is not part of the plan"
            )));
        }
        let mut seen = HashSet::new();
        for record in &self.failed {
            if !members.contains(record.path.as_str()) {
                return Err(Error::StateMismatch(format!(
                    "failed member '{}' is not part of the plan",
                    record.path
                )));
            }
            if self.extracted.contains(&record.path) || !seen.insert(record.path.as_str()) {
                return Err(Error::StateMismatch(format!(
                    "member '{}' is recorded more than once",
                    record.path
                )));
            }
        }
        if self.next_batch_index > plan.batch_count() {
            return Err(Error::StateMismatch(format!(
                "next batch {} is past the last batch {}",
                self.next_batch_index,
                plan.batch_count()
            )));
        }
        Ok(())
    }

    /// Extracted or failed: nothing left to do for `path`.
    pub fn is_settled(&self, path: &str) -> bool {
        self.extracted.contains(path) || self.failed.iter().any(|r| r.path == path)
    }

    pub fn record_success(&mut self, path: &str) {
        self.retry_counts.remove(path);
        self.failed.retain(|r| r.path != path);
        self.extracted.insert(path.to_string());
    }

    pub fn record_failure(&mut self, record: FailureRecord) {
        self.extracted.remove(&record.path);
        self.failed.retain(|r| r.path != record.path);
        self.failed.push(record);
    }

    pub fn retry_count(&self, path: &str) -> u32 { self.retry_counts.get(path).copied().unwrap_or(0) }

    pub fn set_retry_count(&mut self, path: &str, count: u32) {
        if count == 0 {
            self.retry_counts.remove(path);
        } else {
            self.retry_counts.insert(path.to_string(), count);
        }
    }

    /// Most recent `k` failures, oldest first.
    pub fn failed_tail(&self, k: usize) -> &[FailureRecord] {
        &self.failed[self.failed.len().saturating_sub(k)..]
    }

    pub fn remaining(&self) -> usize {
        self.total_members
            .saturating_sub(self.extracted.len() + self.failed.len())
    }
}

fn short(fingerprint: &str) -> &str { fingerprint.get(..12).unwrap_or(fingerprint) }
