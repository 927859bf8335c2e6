//! CLI parse: clap types for reclaim. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Reclaim CLI - rollback protection for space-reclaiming file operations
#[derive(Parser)]
#[command(name = "reclaim")]
#[command(about = "Snapshots, transaction ledger and rollback for destructive deduplication")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Rollback state directory (blobs, snapshots, ledger); overrides storage.base_dir
    #[arg(long, global = true)]
    pub base_dir: Option<PathBuf>,

    /// Configuration file path (layered over the global config file)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Snapshot, restore and undo operations
    Rollback {
        #[command(subcommand)]
        command: RollbackCommands,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum RollbackCommands {
    /// List snapshots and transactions (both unless one is selected)
    List {
        /// Only list snapshots
        #[arg(long)]
        snapshots: bool,
        /// Only list transactions
        #[arg(long)]
        transactions: bool,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Create a snapshot of files; directories are expanded recursively
    Create {
        /// Files or directories to capture
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Restore every file of a snapshot to its original path
    Restore {
        snapshot_id: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Delete a snapshot's metadata (stored content is kept)
    Delete {
        snapshot_id: String,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Undo the most recent committed transaction
    Undo {
        /// Also restore the files from the transaction's snapshot
        #[arg(long)]
        restore: bool,
    },
    /// Show the files captured in a snapshot
    Show {
        snapshot_id: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Re-hash every stored blob a snapshot references
    Verify {
        snapshot_id: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Report PENDING transactions older than the orphan threshold
    Pending {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
}
