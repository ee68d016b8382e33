//! Pull-based, resumable batch extraction over one archive.

use std::ffi::OsStr;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use zipbatch_fs::{SpaceProbe, SystemSpaceProbe, clear_dir_except, remove_tree};

use crate::archive::Archive;
use crate::engine::{ExtractionEngine, Outcome};
use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::options::{IterConfig, OnError};
use crate::plan::{Plan, plan};
use crate::state::{FailureRecord, PersistentState, STATE_FILE_NAME};

/// Failure records shown by [`BatchIterator::status`].
pub const FAILED_TAIL_LEN: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Uninitialized,
    Ready,
    Iterating,
    Completed,
    Aborted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
            Self::Iterating => "iterating",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        })
    }
}

/// What one `next_batch` call did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchResult {
    pub batch_index: usize,
    /// Output paths written by this call, in plan order.
    pub extracted:   Vec<PathBuf>,
    /// Archive paths that failed under the skip policy.
    pub failed:      Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub phase:            Phase,
    pub total:            usize,
    pub extracted_so_far: usize,
    pub remaining:        usize,
    pub failed_so_far:    usize,
    pub next_batch_index: usize,
    pub batch_count:      usize,
    pub failed_tail:      Vec<FailureRecord>,
}

impl StatusSnapshot {
    fn empty(phase: Phase) -> Self {
        Self {
            phase,
            total: 0,
            extracted_so_far: 0,
            remaining: 0,
            failed_so_far: 0,
            next_batch_index: 0,
            batch_count: 0,
            failed_tail: Vec::new(),
        }
    }

    pub fn from_state(phase: Phase, state: &PersistentState) -> Self {
        Self {
            phase,
            total: state.total_members,
            extracted_so_far: state.extracted.len(),
            remaining: state.remaining(),
            failed_so_far: state.failed.len(),
            next_batch_index: state.next_batch_index,
            batch_count: state.total_members.div_ceil(state.batch_size.max(1)),
            failed_tail: state.failed_tail(FAILED_TAIL_LEN).to_vec(),
        }
    }
}

struct Session {
    plan:        Plan,
    state:       PersistentState,
    engine:      ExtractionEngine,
    extract_dir: PathBuf,
    state_path:  PathBuf,
}

/// Owns an archive and walks one extraction plan batch by batch.
///
/// ```no_run
/// use zipbatch::{Archive, BatchIterator, IterConfig};
///
/// let archive = Archive::open("data.zip")?;
/// let mut iter = BatchIterator::new(archive);
/// iter.initialize(&IterConfig::new("out").batch_size(50).extensions(["csv"]))?;
/// while let Some(batch) = iter.next_batch()? {
///     println!("batch {}: {} files", batch.batch_index, batch.extracted.len());
/// }
/// # Ok::<(), zipbatch::Error>(())
/// ```
pub struct BatchIterator<R: Read + Seek = BufReader<File>> {
    archive: Archive<R>,
    probe:   Arc<dyn SpaceProbe + Send + Sync>,
    phase:   Phase,
    session: Option<Session>,
    /// Extraction directory of the last validated config, kept even when
    /// `initialize` fails so that `reset` can still clear it.
    target:  Option<PathBuf>,
}

impl<R: Read + Seek> BatchIterator<R> {
    pub fn new(archive: Archive<R>) -> Self {
        Self {
            archive,
            probe: Arc::new(SystemSpaceProbe),
            phase: Phase::Uninitialized,
            session: None,
            target: None,
        }
    }

    /// Replace the free-space source used by the batch preflight.
    pub fn with_space_probe(mut self, probe: impl SpaceProbe + Send + Sync + 'static) -> Self {
        self.probe = Arc::new(probe);
        self
    }

    /// Build the plan and start a fresh run or resume the persisted one.
    pub fn initialize(&mut self, config: &IterConfig) -> Result<()> {
        self.phase = Phase::Uninitialized;
        self.session = None;

        config.validate()?;
        self.target = Some(config.extract_dir());
        let extensions = config.normalized_extensions()?;
        let plan = plan(
            self.archive.catalog(),
            &config.base,
            extensions.as_ref(),
            config.seed,
            config.batch_size,
        )?;

        let extract_dir = config.extract_dir();
        let state_path = config.state_path();
        if config.reset && reset_output(&config.output_dir, &config.extract_subdir)? {
            tracing::info!(dir = %extract_dir.display(), "previous output removed");
        }

        let mut state = match PersistentState::load(&state_path) {
            Ok(mut state) => {
                state.verify_against(&plan)?;
                state.apply_policy(config);
                tracing::info!(
                    extracted = state.extracted.len(),
                    failed = state.failed.len(),
                    next_batch = state.next_batch_index,
                    "resuming extraction"
                );
                state
            }
            Err(Error::NotFound(_)) => {
                tracing::info!(
                    members = plan.len(),
                    batches = plan.batch_count(),
                    dir = %extract_dir.display(),
                    "starting extraction"
                );
                PersistentState::new(&plan, config)?
            }
            Err(e) => return Err(e),
        };
        fs::create_dir_all(&extract_dir)?;
        state.save(&state_path)?;

        let engine = ExtractionEngine::new(config.max_retries, config.validate_crc, Arc::clone(&self.probe));
        self.session = Some(Session {
            plan,
            state,
            engine,
            extract_dir,
            state_path,
        });
        self.phase = Phase::Ready;
        Ok(())
    }

    /// Extract the next batch, or `Ok(None)` once every batch is done.
    ///
    /// Any error leaves the iterator aborted; `initialize` again to resume
    /// from the persisted state.
    pub fn next_batch(&mut self) -> Result<Option<BatchResult>> {
        match self.phase {
            Phase::Uninitialized => {
                return Err(Error::InvalidState("initialize must be called before next_batch"));
            }
            Phase::Aborted => {
                return Err(Error::InvalidState("iteration was aborted; initialize again to resume"));
            }
            _ => {}
        }
        let result = self.run_batch();
        if result.is_err() {
            self.phase = Phase::Aborted;
        }
        result
    }

    fn run_batch(&mut self) -> Result<Option<BatchResult>> {
        let Some(session) = self.session.as_mut() else {
            return Err(Error::InvalidState("initialize must be called before next_batch"));
        };
        let batch_index = session.state.next_batch_index;
        let Some(members) = session.plan.batch(batch_index) else {
            self.phase = Phase::Completed;
            return Ok(None);
        };
        self.phase = Phase::Iterating;

        let entries: Vec<Entry> = members
            .iter()
            .map(|path| self.archive.catalog().lookup(path).cloned())
            .collect::<Result<_>>()?;

        let untouched = entries.iter().all(|e| !session.state.is_settled(&e.path));
        if session.state.rotate && batch_index > 0 && untouched {
            let removed = clear_dir_except(&session.extract_dir, &[OsStr::new(STATE_FILE_NAME)])?;
            tracing::debug!(removed, "previous batch output rotated out");
        }

        let pending: Vec<&Entry> = entries
            .iter()
            .filter(|e| !session.state.is_settled(&e.path))
            .collect();
        session.engine.preflight(&pending, &session.extract_dir)?;

        let mut result = BatchResult {
            batch_index,
            extracted: Vec::new(),
            failed: Vec::new(),
        };
        for entry in pending {
            let mut retries = session.state.retry_count(&entry.path);
            let state = &mut session.state;
            let state_path = &session.state_path;
            let outcome = session.engine.extract_one(
                &mut self.archive,
                entry,
                &session.extract_dir,
                &mut retries,
                |count| {
                    state.set_retry_count(&entry.path, count);
                    state.save(state_path)
                },
            )?;

            match outcome {
                Outcome::Extracted { path, .. } => {
                    session.state.record_success(&entry.path);
                    session.state.save(&session.state_path)?;
                    result.extracted.push(path);
                }
                Outcome::Failed { record, error } => match session.state.on_error {
                    OnError::Skip => {
                        session.state.set_retry_count(&entry.path, retries);
                        session.state.record_failure(record);
                        session.state.save(&session.state_path)?;
                        result.failed.push(entry.path.clone());
                    }
                    OnError::Abort => {
                        // Spent retries stay on record; extracted and failed are untouched.
                        session.state.set_retry_count(&entry.path, retries);
                        session.state.save(&session.state_path)?;
                        tracing::warn!(entry = %entry.path, batch = batch_index, "extraction aborted");
                        return Err(error);
                    }
                },
            }
        }

        session.state.next_batch_index = batch_index + 1;
        session.state.save(&session.state_path)?;
        tracing::info!(
            batch = batch_index,
            of = session.plan.batch_count(),
            extracted = result.extracted.len(),
            failed = result.failed.len(),
            total_extracted = session.state.extracted.len(),
            "batch complete"
        );
        if session.state.next_batch_index >= session.plan.batch_count() {
            self.phase = Phase::Completed;
            tracing::info!(
                extracted = session.state.extracted.len(),
                failed = session.state.failed.len(),
                "extraction finished"
            );
        }
        Ok(Some(result))
    }

    pub fn status(&self) -> StatusSnapshot {
        match &self.session {
            Some(session) => StatusSnapshot::from_state(self.phase, &session.state),
            None => StatusSnapshot::empty(self.phase),
        }
    }

    /// Remove the persisted state and everything extracted so far.
    ///
    /// Also works after `initialize` rejected the persisted state, against
    /// the directory that call was given.
    pub fn reset(&mut self) -> Result<()> {
        self.session = None;
        self.phase = Phase::Uninitialized;
        if let Some(dir) = &self.target
            && remove_tree(dir)?
        {
            tracing::info!(dir = %dir.display(), "extraction reset");
        }
        Ok(())
    }

    pub fn phase(&self) -> Phase { self.phase }

    pub fn plan(&self) -> Option<&Plan> { self.session.as_ref().map(|s| &s.plan) }

    pub fn state(&self) -> Option<&PersistentState> { self.session.as_ref().map(|s| &s.state) }

    pub fn extract_dir(&self) -> Option<&Path> { self.session.as_ref().map(|s| s.extract_dir.as_path()) }

    pub fn archive(&self) -> &Archive<R> { &self.archive }

    pub fn archive_mut(&mut self) -> &mut Archive<R> { &mut self.archive }

    pub fn into_archive(self) -> Archive<R> { self.archive }
}

/// Delete `<output_dir>/<subdir>` with its state file. Returns whether anything existed.
pub fn reset_output(output_dir: impl AsRef<Path>, subdir: &str) -> Result<bool> {
    let config = IterConfig::new(output_dir.as_ref()).extract_subdir(subdir);
    config.validate()?;
    Ok(remove_tree(config.extract_dir())?)
}

/// Progress of a run as recorded on disk, without opening the archive.
pub fn read_status(output_dir: impl AsRef<Path>, subdir: &str) -> Result<StatusSnapshot> {
    let config = IterConfig::new(output_dir.as_ref()).extract_subdir(subdir);
    config.validate()?;
    let state = PersistentState::load(config.state_path())?;
    let batch_count = state.total_members.div_ceil(state.batch_size.max(1));
    let phase = if state.next_batch_index >= batch_count {
        Phase::Completed
    } else {
        Phase::Ready
    };
    Ok(StatusSnapshot::from_state(phase, &state))
}
