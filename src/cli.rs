//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "tabscribe",
    version,
    about = "Live on-device transcription of captured call audio",
    propagate_version = true
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the daemon socket
    #[arg(long, global = true)]
    pub socket: Option<PathBuf>,

    /// Suppress status messages
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the capture daemon
    Daemon,
    /// Toggle capture for a target (start when idle, stop when listening)
    Toggle {
        /// Capture target id
        #[arg(long)]
        target: u64,
    },
    /// Stop capture for a target
    Stop {
        /// Capture target id
        #[arg(long)]
        target: u64,
    },
    /// Notify the daemon that a target was closed
    TargetRemoved {
        /// Capture target id
        #[arg(long)]
        target: u64,
    },
    /// Show per-target session states
    Status,
    /// Stream live transcripts from the daemon
    Follow,
    /// Shut the daemon down
    Shutdown,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
