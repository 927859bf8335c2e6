//! Transaction ledger: lifecycle records, operation lists and an append-only event stream.

pub mod store;
pub mod types;

use std::path::Path;

use crate::error::RollbackError;

pub use store::TransactionLog;
pub use types::{
    LedgerEvent, LedgerEventKind, Operation, OperationKind, Transaction, TransactionStatus,
    TransactionSummary,
};

/// Handle to the PENDING transaction a protected operation runs inside
///
/// Handed to the closure given to `RollbackManager::execute_recorded`; it can only append
/// operations, never finalize.
pub struct TransactionScope<'a> {
    log: &'a TransactionLog,
    transaction_id: String,
    snapshot_id: Option<String>,
}

impl<'a> TransactionScope<'a> {
    pub fn new(log: &'a TransactionLog, transaction_id: String, snapshot_id: Option<String>) -> Self {
        Self {
            log,
            transaction_id,
            snapshot_id,
        }
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    pub fn snapshot_id(&self) -> Option<&str> {
        self.snapshot_id.as_deref()
    }

    /// Append an operation to the transaction
    pub fn record(
        &self,
        kind: OperationKind,
        source: &Path,
        dest: Option<&Path>,
    ) -> Result<Operation, RollbackError> {
        self.log
            .record_operation(&self.transaction_id, kind, source, dest)
    }
}
