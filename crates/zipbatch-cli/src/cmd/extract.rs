use anyhow::{Context, Result};
use zipbatch::{Archive, BatchIterator, IterConfig, Location};

use crate::app::ExtractArg;
use crate::cmd::status::print_status;

pub fn run(archive: Archive, arg: &ExtractArg) -> Result<()> {
    let base = archive
        .cd(&Location::root(), &arg.base)
        .with_context(|| format!("base directory '{}' is not in the archive", arg.base))?;

    let mut config = IterConfig::new(&arg.output.out)
        .extract_subdir(&arg.output.subdir)
        .batch_size(arg.batch_size)
        .base(base)
        .reset(arg.reset)
        .seed(arg.seed)
        .on_error(arg.on_error)
        .max_retries(arg.max_retries)
        .validate_crc(arg.validate_crc)
        .rotate(arg.rotate);
    if !arg.extensions.is_empty() {
        config = config.extensions(arg.extensions.iter().cloned());
    }

    let mut iter = BatchIterator::new(archive);
    iter.initialize(&config)?;

    let start = iter.status();
    let pb = crate::ui::batch_progress(start.batch_count, start.next_batch_index);
    let mut pulled = 0;
    while arg.batches.is_none_or(|limit| pulled < limit) {
        let batch = match iter.next_batch() {
            Ok(Some(batch)) => batch,
            Ok(None) => break,
            Err(e) => {
                pb.abandon_with_message("aborted");
                return Err(e).context("extraction stopped; run the same command again to resume");
            }
        };
        pulled += 1;
        pb.inc(1);
        pb.set_message(format!("{} files", iter.status().extracted_so_far));
        for path in &batch.failed {
            tracing::warn!(batch = batch.batch_index, member = %path, "member skipped");
        }
    }
    pb.finish_and_clear();

    print_status(&iter.status());
    Ok(())
}
