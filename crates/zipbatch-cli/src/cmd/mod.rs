mod extract;
mod nav;
mod status;

use anyhow::{Context, Result};
use zipbatch::Archive;

use crate::app::{App, Commands};

pub fn run(app: &App) -> Result<()> {
    match &app.cmd {
        Commands::Ls(arg) => nav::ls(&open(app)?, arg),
        Commands::Cat(arg) => nav::cat(&mut open(app)?, &arg.path),
        Commands::Info(arg) => nav::info(&open(app)?, &arg.path),
        Commands::Extract(arg) => extract::run(open(app)?, arg),
        Commands::Status(arg) => status::show(&app.archive, arg),
        Commands::Reset(arg) => status::reset(arg),
    }
}

fn open(app: &App) -> Result<Archive> {
    Archive::open(&app.archive).with_context(|| format!("cannot open archive '{}'", app.archive.display()))
}
