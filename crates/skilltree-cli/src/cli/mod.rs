//! CLI command definitions and dispatch for the `skilltree` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod layout;
pub mod merge;
pub mod progress;
pub mod ranks;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Merge, rank, lay out and track a calisthenics skill tree.
#[derive(Parser)]
#[command(name = "skilltree", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Data directory (defaults to ~/.skilltree).
    #[arg(long, global = true, env = "SKILLTREE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Primary feed file (defaults to {data_dir}/feeds/primary.json).
    #[arg(long, global = true)]
    pub primary: Option<PathBuf>,

    /// Secondary feed directory (defaults to {data_dir}/feeds/secondary).
    #[arg(long, global = true)]
    pub secondary: Option<PathBuf>,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true, env = "SKILLTREE_OTEL")]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Merge both feeds and report the repairs applied.
    Merge {
        /// Write the merged graph as a primary feed to this file.
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// Show the resolved rank of every skill.
    Ranks,

    /// Compute lanes, ordering and connectors.
    Layout {
        /// JSON object of measured boxes keyed by skill id.
        #[arg(long)]
        geometry: Option<PathBuf>,

        /// Style connectors by this user's progress.
        #[arg(long)]
        user: Option<String>,
    },

    /// Per-user unlock and completion state.
    Progress {
        #[command(subcommand)]
        action: progress::ProgressCommand,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

impl Cli {
    /// Log filter for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "warn",
            1 => "info,skilltree=debug",
            _ => "trace",
        }
    }
}
