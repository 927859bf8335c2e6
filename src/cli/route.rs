//! CLI route: single route table and run context. Dispatches to the rollback manager and presentation.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::cli::help::command_name;
use crate::cli::parse::{Commands, ConfigCommands, RollbackCommands};
use crate::cli::presentation::{
    format_created_text, format_pending_text, format_restore_report_text,
    format_snapshot_detail_text, format_snapshot_list_text, format_transaction_list_text,
    format_undo_text, format_verify_report_text, to_json_pretty,
};
use crate::config::{ConfigLoader, RollbackConfig};
use crate::error::RollbackError;
use crate::ledger::TransactionSummary;
use crate::rollback::RollbackManager;
use crate::snapshot::SnapshotSummary;

#[derive(Serialize)]
struct ListOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshots: Option<&'a [SnapshotSummary]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transactions: Option<&'a [TransactionSummary]>,
}

/// Runtime context for CLI execution: effective config, base directory and the manager.
pub struct RunContext {
    config: RollbackConfig,
    base_dir: PathBuf,
    manager: RollbackManager,
}

impl RunContext {
    /// Load configuration, resolve the base directory and open the rollback manager
    pub fn new(base_dir: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<Self, RollbackError> {
        let config = ConfigLoader::load(config_path.as_deref())?.validated()?;
        let base_dir = config.storage.resolve_base_dir(base_dir.as_deref())?;
        let manager = RollbackManager::open(&base_dir, &config)?;
        Ok(Self {
            config,
            base_dir,
            manager,
        })
    }

    pub fn manager(&self) -> &RollbackManager {
        &self.manager
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, RollbackError> {
        let name = command_name(command);
        info!(command = %name, "Executing command");
        let result = match command {
            Commands::Rollback { command } => self.handle_rollback_command(command),
            Commands::Config { command } => self.handle_config_command(command),
        };
        if let Err(e) = &result {
            warn!(command = %name, error = %e, "Command failed");
        }
        result
    }

    fn handle_rollback_command(&self, command: &RollbackCommands) -> Result<String, RollbackError> {
        match command {
            RollbackCommands::List {
                snapshots,
                transactions,
                format,
            } => {
                let both = !*snapshots && !*transactions;
                self.handle_list(both || *snapshots, both || *transactions, format)
            }
            RollbackCommands::Create { paths, format } => self.handle_create(paths, format),
            RollbackCommands::Restore {
                snapshot_id,
                format,
            } => self.handle_restore(snapshot_id, format),
            RollbackCommands::Delete { snapshot_id, yes } => self.handle_delete(snapshot_id, *yes),
            RollbackCommands::Undo { restore } => self.handle_undo(*restore),
            RollbackCommands::Show {
                snapshot_id,
                format,
            } => {
                let snapshot = self.manager.load_snapshot(snapshot_id)?;
                if format == "json" {
                    to_json_pretty(&snapshot)
                } else {
                    Ok(format_snapshot_detail_text(&snapshot))
                }
            }
            RollbackCommands::Verify {
                snapshot_id,
                format,
            } => self.handle_verify(snapshot_id, format),
            RollbackCommands::Pending { format } => {
                let pending = self.manager.pending_transactions()?;
                if format == "json" {
                    to_json_pretty(&pending)
                } else {
                    Ok(format_pending_text(
                        &pending,
                        self.config.recovery.orphan_after_secs,
                    ))
                }
            }
        }
    }

    fn handle_config_command(&self, command: &ConfigCommands) -> Result<String, RollbackError> {
        match command {
            ConfigCommands::Show => {
                let mut effective = self.config.clone();
                effective.storage.base_dir = Some(self.base_dir.clone());
                effective.to_toml()
            }
        }
    }

    fn handle_list(
        &self,
        include_snapshots: bool,
        include_transactions: bool,
        format: &str,
    ) -> Result<String, RollbackError> {
        let snapshots = if include_snapshots {
            Some(self.manager.list_snapshots()?)
        } else {
            None
        };
        let transactions = if include_transactions {
            Some(self.manager.list_transactions()?)
        } else {
            None
        };

        if format == "json" {
            return to_json_pretty(&ListOutput {
                snapshots: snapshots.as_deref(),
                transactions: transactions.as_deref(),
            });
        }

        let mut sections = Vec::new();
        if let Some(s) = &snapshots {
            sections.push(format_snapshot_list_text(s));
        }
        if let Some(t) = &transactions {
            sections.push(format_transaction_list_text(t));
        }
        Ok(sections.join("\n\n"))
    }

    fn handle_create(&self, paths: &[PathBuf], format: &str) -> Result<String, RollbackError> {
        let files = expand_paths(paths)?;
        let snapshot = self.manager.create_snapshot(&files)?;
        if format == "json" {
            to_json_pretty(&snapshot.summary())
        } else {
            Ok(format_created_text(&snapshot))
        }
    }

    fn handle_restore(&self, snapshot_id: &str, format: &str) -> Result<String, RollbackError> {
        let report = self
            .manager
            .restore_to_snapshot(snapshot_id)?
            .into_result()?;
        if format == "json" {
            to_json_pretty(&report)
        } else {
            Ok(format_restore_report_text(&report))
        }
    }

    fn handle_delete(&self, snapshot_id: &str, yes: bool) -> Result<String, RollbackError> {
        // Unknown ids fail before prompting
        self.manager.load_snapshot(snapshot_id)?;

        if !yes && std::io::stdin().is_terminal() {
            use dialoguer::Confirm;
            let confirmed = Confirm::new()
                .with_prompt(format!("Delete snapshot '{}'?", snapshot_id))
                .default(false)
                .interact()
                .map_err(|e| RollbackError::Config(format!("Failed to get user input: {}", e)))?;
            if !confirmed {
                return Ok("Deletion cancelled".to_string());
            }
        }

        if self.manager.delete_snapshot(snapshot_id)? {
            Ok(format!("Deleted snapshot {}", snapshot_id))
        } else {
            Err(RollbackError::SnapshotNotFound(snapshot_id.to_string()))
        }
    }

    fn handle_undo(&self, restore: bool) -> Result<String, RollbackError> {
        if !restore {
            return if self.manager.undo_last_operation()? {
                Ok("Marked the most recent committed transaction as rolled back (files unchanged; use --restore to restore them)".to_string())
            } else {
                Err(RollbackError::NothingToUndo)
            };
        }

        let outcome = self
            .manager
            .undo_last_operation_with_restore()?
            .ok_or(RollbackError::NothingToUndo)?;
        if let Some(report) = &outcome.restore {
            if !report.is_complete() {
                return Err(RollbackError::Restore {
                    snapshot_id: report.snapshot_id.clone(),
                    failed: report.failed_paths(),
                });
            }
        }
        Ok(format_undo_text(&outcome))
    }

    fn handle_verify(&self, snapshot_id: &str, format: &str) -> Result<String, RollbackError> {
        let report = self.manager.verify_snapshot(snapshot_id)?;
        if !report.is_intact() {
            let issues = report
                .missing
                .iter()
                .chain(report.corrupt.iter())
                .map(|i| {
                    format!(
                        "{} ({}, {}): {}",
                        i.original_path.display(),
                        i.algorithm,
                        i.backup_path.display(),
                        i.reason
                    )
                })
                .collect();
            return Err(RollbackError::Integrity {
                snapshot_id: report.snapshot_id,
                issues,
            });
        }
        if format == "json" {
            to_json_pretty(&report)
        } else {
            Ok(format_verify_report_text(&report))
        }
    }
}

/// Expand directories into the regular files beneath them; files are passed through as given
fn expand_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>, RollbackError> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        for entry in WalkDir::new(path).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|e| RollbackError::Capture {
                path: e.path().map(Path::to_path_buf).unwrap_or_else(|| path.clone()),
                source: e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
            })?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
    }
    Ok(files)
}
