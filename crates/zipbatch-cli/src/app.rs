use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use zipbatch::{DEFAULT_BATCH_SIZE, DEFAULT_EXTRACT_SUBDIR, DEFAULT_MAX_RETRIES, OnError};

#[derive(Debug, Parser)]
#[command(name = "zipbatch", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct App {
    /// ZIP archive to read
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Log member-level progress
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List a directory inside the archive
    Ls(LsArg),
    /// Print a member to stdout
    Cat(PathArg),
    /// Show a member's central-directory record
    #[command(alias = "i")]
    Info(PathArg),
    /// Extract the next batches, resuming any previous run
    #[command(alias = "x")]
    Extract(ExtractArg),
    /// Show progress recorded in an output directory
    Status(OutputArg),
    /// Delete extracted files and the progress record
    Reset(OutputArg),
}

#[derive(Debug, Args)]
pub struct LsArg {
    /// Directory to list, relative to the archive root
    pub path: Option<String>,
    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,
}

#[derive(Debug, Args)]
pub struct PathArg {
    pub path: String,
}

#[derive(Debug, Args)]
pub struct OutputArg {
    /// Directory that holds the extraction folder
    #[arg(long, value_name = "DIR")]
    pub out: PathBuf,
    /// Extraction folder name under --out
    #[arg(long, value_name = "NAME", default_value = DEFAULT_EXTRACT_SUBDIR)]
    pub subdir: String,
}

#[derive(Debug, Args)]
pub struct ExtractArg {
    #[command(flatten)]
    pub output: OutputArg,
    /// Members per batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,
    /// Archive directory to extract from
    #[arg(long, value_name = "PATH", default_value = "/")]
    pub base: String,
    /// Shuffle members deterministically with this seed
    #[arg(long)]
    pub seed: Option<u64>,
    /// Only extract files with this extension (repeatable)
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,
    /// What to do when a member keeps failing
    #[arg(long, value_name = "POLICY", default_value_t = OnError::Skip)]
    pub on_error: OnError,
    /// Extra attempts for members that fail integrity or I/O
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,
    /// Check every member's CRC-32 and size while writing
    #[arg(long)]
    pub validate_crc: bool,
    /// Keep only the latest batch on disk
    #[arg(long)]
    pub rotate: bool,
    /// Discard previous progress and output first
    #[arg(long)]
    pub reset: bool,
    /// Stop after this many batches
    #[arg(long, value_name = "N")]
    pub batches: Option<usize>,
}
