use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tarkeep::{DEFAULT_BLOCK_SIZE, SessionOptions};

/// Build, append to, and read single-file tar archives
#[derive(Debug, Parser)]
#[command(name = "tarkeep", version, about)]
pub struct Cli {
    /// Bytes copied per block between the archive and files
    #[arg(long, global = true, default_value_t = DEFAULT_BLOCK_SIZE)]
    pub block_size: usize,

    /// Do not restore stored modification times when extracting
    #[arg(long, global = true)]
    pub no_mtime: bool,

    /// Log debug output to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Append every file under DIR, named relative to DIR
    Create { archive: PathBuf, dir: PathBuf },

    /// Append files under their base names
    Append {
        archive: PathBuf,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Extract all entries, or only the named ones, below TARGET
    Extract {
        archive: PathBuf,
        target: PathBuf,
        names: Vec<String>,
    },

    /// Exit with status 0 if the entry is stored, 1 otherwise
    Exists { archive: PathBuf, name: String },

    /// Write an entry's bytes to stdout
    Cat { archive: PathBuf, name: String },

    /// List entries in archive order
    List {
        archive: PathBuf,
        /// Show mode, size and modification time
        #[arg(short, long)]
        long: bool,
    },

    /// Interactive shell over one archive at a time
    Shell {
        archive: Option<PathBuf>,
        /// Open ARCHIVE read-write
        #[arg(long)]
        rw: bool,
    },
}

impl Cli {
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions::default()
            .with_block_size(self.block_size)
            .with_preserve_mtime(!self.no_mtime)
    }
}
