use std::path::Path;

use anyhow::{Context, Result};
use tabled::Tabled;
use zipbatch::{
    Archive, FailureRecord, IterConfig, Location, PersistentState, StatusSnapshot, plan, read_status,
    reset_output,
};

use crate::app::OutputArg;
use crate::ui::{Field, Formatter};

#[derive(Tabled)]
struct FailureRow {
    member:   String,
    attempts: u32,
    reason:   String,
}

impl From<&FailureRecord> for FailureRow {
    fn from(record: &FailureRecord) -> Self {
        Self {
            member:   record.path.clone(),
            attempts: record.attempts,
            reason:   record.reason.clone(),
        }
    }
}

pub fn print_status(status: &StatusSnapshot) {
    let table = Formatter::default().header("progress").build([
        Field::new("phase", status.phase),
        Field::new("batches", format!("{}/{}", status.next_batch_index, status.batch_count)),
        Field::new("extracted", format!("{}/{}", status.extracted_so_far, status.total)),
        Field::new("failed", status.failed_so_far),
        Field::new("remaining", status.remaining),
    ]);
    println!("{table}");

    if !status.failed_tail.is_empty() {
        let failures = Formatter::default()
            .header("recent failures")
            .col_names(true)
            .build(status.failed_tail.iter().map(FailureRow::from));
        println!("{failures}");
    }
}

/// Print recorded progress and whether it still belongs to `archive_path`.
pub fn show(archive_path: &Path, arg: &OutputArg) -> Result<()> {
    let status = read_status(&arg.out, &arg.subdir)
        .with_context(|| format!("no extraction progress under '{}'", arg.out.display()))?;
    print_status(&status);

    match Archive::open(archive_path) {
        Ok(archive) => {
            let state_path = IterConfig::new(&arg.out).extract_subdir(&arg.subdir).state_path();
            let state = PersistentState::load(state_path)?;
            let current = plan(
                archive.catalog(),
                &Location::from_prefix(&state.base_prefix),
                state.extensions.as_ref(),
                state.seed,
                state.batch_size,
            );
            match current {
                Ok(p) if p.fingerprint() == state.fingerprint => println!("state matches '{}'", archive_path.display()),
                _ => println!(
                    "state does not match '{}'; extract with --reset to start over",
                    archive_path.display()
                ),
            }
        }
        Err(e) => tracing::warn!(archive = %archive_path.display(), error = %e, "archive not checked"),
    }
    Ok(())
}

pub fn reset(arg: &OutputArg) -> Result<()> {
    let dir = arg.out.join(&arg.subdir);
    if reset_output(&arg.out, &arg.subdir)? {
        println!("removed '{}'", dir.display());
    } else {
        println!("nothing to remove at '{}'", dir.display());
    }
    Ok(())
}
