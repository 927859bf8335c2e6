//! Ledger record schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Committed,
    RolledBack,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Committed => "committed",
            TransactionStatus::RolledBack => "rolled_back",
        }
    }

    pub fn is_final(self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of destructive filesystem operation recorded in a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Move,
    Delete,
    Copy,
    Symlink,
    Create,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Move => "move",
            OperationKind::Delete => "delete",
            OperationKind::Copy => "copy",
            OperationKind::Symlink => "symlink",
            OperationKind::Create => "create",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub operation_id: String,
    pub kind: OperationKind,
    pub source_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_path: Option<PathBuf>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    /// Ledger-wide monotonic counter; breaks ties between equal start times
    pub sequence: u64,
    pub status: TransactionStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    /// Set when a committed transaction is later undone
    #[serde(default)]
    pub undone_at: Option<DateTime<Utc>>,
    /// Snapshot captured before the transaction's operation ran
    #[serde(default)]
    pub snapshot_id: Option<String>,
    #[serde(default)]
    pub operations: Vec<Operation>,
}

impl Transaction {
    pub fn summary(&self) -> TransactionSummary {
        TransactionSummary {
            transaction_id: self.transaction_id.clone(),
            started_at: self.started_at,
            ended_at: self.ended_at,
            status: self.status,
            operation_count: self.operations.len(),
            snapshot_id: self.snapshot_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub transaction_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: TransactionStatus,
    pub operation_count: usize,
    pub snapshot_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEventKind {
    Begin,
    Operation,
    Commit,
    Rollback,
    Undo,
}

/// One append-only lifecycle entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub transaction_id: String,
    pub seq: u64,
    pub recorded_at: DateTime<Utc>,
    pub kind: LedgerEventKind,
    #[serde(default)]
    pub detail: serde_json::Value,
}
