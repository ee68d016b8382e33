//! `zipbatch`: browse a ZIP archive and extract it in resumable batches.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod app;
mod cmd;
mod ui;

const DEFAULT_LOG_FILTER: &str = "zipbatch=info";
const VERBOSE_LOG_FILTER: &str = "zipbatch=debug";

fn main() -> anyhow::Result<()> {
    let app = app::App::parse();

    let fallback = if app.verbose { VERBOSE_LOG_FILTER } else { DEFAULT_LOG_FILTER };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    cmd::run(&app)
}
