use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mediadex")]
#[command(author, version, about = "Media catalogue scanner and thumbnail generator")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a volume and regenerate the index and thumbnail tree
    Scan {
        /// Volume root to scan (overrides config)
        root: Option<PathBuf>,

        /// Output directory for the index and thumbnails (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Thumbnail target width in pixels (overrides config)
        #[arg(long)]
        width: Option<u32>,

        /// Preview frames per video (overrides config)
        #[arg(long)]
        frames: Option<u32>,

        /// Concurrent per-file workers (overrides config)
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Display version information
    Version,
}
