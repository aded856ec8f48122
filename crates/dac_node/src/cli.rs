use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(about = "Data-availability committee node.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to the node's JSON configuration file.
    #[arg(short, long, global = true)]
    pub config: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the committee loop until a fatal error (default).
    Run,
    /// Stream every fact reachable from the committed root pointers into an archive file.
    DumpTrees {
        /// Destination for the newline-delimited JSON archive.
        archive_path: PathBuf,
    },
    /// Rehydrate a fresh storage backend from an archive produced by `dump-trees`.
    LoadTrees {
        /// Archive file to read.
        archive_path: PathBuf,
    },
}
