//! Durable sled-backed transaction ledger.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde_json::json;
use sled::{Db, Tree};
use tracing::{debug, info};

use crate::error::RollbackError;
use crate::ledger::types::{
    LedgerEvent, LedgerEventKind, Operation, OperationKind, Transaction, TransactionStatus,
    TransactionSummary,
};

const TREE_TRANSACTIONS: &str = "transactions";
const TREE_EVENTS: &str = "tx_events";
const EVENT_KEY_PAD: usize = 20;

/// Append-only ledger of transaction lifecycles
///
/// One record per transaction (with its operation list) plus an event stream keyed by
/// `{transaction_id}:{seq}`. Every mutation is flushed before the call returns.
pub struct TransactionLog {
    db: Db,
    transactions: Tree,
    events: Tree,
    write_lock: Mutex<()>,
}

impl TransactionLog {
    /// Open (creating if needed) a ledger at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RollbackError> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        let db = sled::open(path).map_err(|e| {
            RollbackError::Ledger(format!(
                "Failed to open ledger at {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::new(db)
    }

    pub fn new(db: Db) -> Result<Self, RollbackError> {
        let transactions = db.open_tree(TREE_TRANSACTIONS)?;
        let events = db.open_tree(TREE_EVENTS)?;
        Ok(Self {
            db,
            transactions,
            events,
            write_lock: Mutex::new(()),
        })
    }

    /// Create a PENDING transaction
    pub fn begin_transaction(&self) -> Result<String, RollbackError> {
        self.begin(None)
    }

    /// Create a PENDING transaction linked to the snapshot taken before it
    pub fn begin_for_snapshot(&self, snapshot_id: &str) -> Result<String, RollbackError> {
        self.begin(Some(snapshot_id.to_string()))
    }

    fn begin(&self, snapshot_id: Option<String>) -> Result<String, RollbackError> {
        let _guard = self.write_lock.lock();
        let sequence = self.db.generate_id()?;
        let started_at = Utc::now();
        let transaction_id = new_transaction_id(started_at, sequence);
        let record = Transaction {
            transaction_id: transaction_id.clone(),
            sequence,
            status: TransactionStatus::Pending,
            started_at,
            ended_at: None,
            undone_at: None,
            snapshot_id: snapshot_id.clone(),
            operations: Vec::new(),
        };
        self.put(&record)?;
        self.append_event(
            &transaction_id,
            LedgerEventKind::Begin,
            json!({ "snapshot_id": snapshot_id }),
        )?;
        self.flush()?;
        info!(transaction = %transaction_id, "Transaction started");
        Ok(transaction_id)
    }

    /// Append an operation to a PENDING transaction
    pub fn record_operation(
        &self,
        transaction_id: &str,
        kind: OperationKind,
        source_path: &Path,
        dest_path: Option<&Path>,
    ) -> Result<Operation, RollbackError> {
        let _guard = self.write_lock.lock();
        let mut record = self.require(transaction_id)?;
        if record.status != TransactionStatus::Pending {
            return Err(RollbackError::TransactionState {
                id: transaction_id.to_string(),
                status: record.status,
            });
        }

        let operation = Operation {
            operation_id: format!("{}/op-{}", transaction_id, record.operations.len() + 1),
            kind,
            source_path: source_path.to_path_buf(),
            dest_path: dest_path.map(Path::to_path_buf),
            recorded_at: Utc::now(),
        };
        record.operations.push(operation.clone());
        self.put(&record)?;
        self.append_event(
            transaction_id,
            LedgerEventKind::Operation,
            json!({
                "operation_id": operation.operation_id,
                "kind": kind.as_str(),
                "source": operation.source_path.display().to_string(),
                "dest": operation.dest_path.as_ref().map(|p| p.display().to_string()),
            }),
        )?;
        self.flush()?;
        debug!(
            transaction = %transaction_id,
            operation = %operation.operation_id,
            kind = %kind,
            "Operation recorded"
        );
        Ok(operation)
    }

    /// PENDING → COMMITTED
    pub fn commit_transaction(&self, transaction_id: &str) -> Result<(), RollbackError> {
        self.finalize(transaction_id, TransactionStatus::Committed)
    }

    /// PENDING → ROLLED_BACK
    ///
    /// Bookkeeping only: no file is touched here. Physical restoration is the caller's job.
    pub fn rollback_transaction(&self, transaction_id: &str) -> Result<(), RollbackError> {
        self.finalize(transaction_id, TransactionStatus::RolledBack)
    }

    fn finalize(
        &self,
        transaction_id: &str,
        status: TransactionStatus,
    ) -> Result<(), RollbackError> {
        let _guard = self.write_lock.lock();
        let mut record = self.require(transaction_id)?;
        if record.status != TransactionStatus::Pending {
            return Err(RollbackError::TransactionState {
                id: transaction_id.to_string(),
                status: record.status,
            });
        }
        record.status = status;
        record.ended_at = Some(Utc::now());
        self.put(&record)?;
        let kind = match status {
            TransactionStatus::Committed => LedgerEventKind::Commit,
            _ => LedgerEventKind::Rollback,
        };
        self.append_event(
            transaction_id,
            kind,
            json!({ "operation_count": record.operations.len() }),
        )?;
        self.flush()?;
        info!(transaction = %transaction_id, status = %status, "Transaction finalized");
        Ok(())
    }

    /// COMMITTED → ROLLED_BACK, used by undo
    ///
    /// The only transition allowed out of a final state; it is one-way like the others.
    pub fn mark_undone(&self, transaction_id: &str) -> Result<(), RollbackError> {
        let _guard = self.write_lock.lock();
        let mut record = self.require(transaction_id)?;
        if record.status != TransactionStatus::Committed {
            return Err(RollbackError::TransactionState {
                id: transaction_id.to_string(),
                status: record.status,
            });
        }
        record.status = TransactionStatus::RolledBack;
        record.undone_at = Some(Utc::now());
        self.put(&record)?;
        self.append_event(transaction_id, LedgerEventKind::Undo, json!({}))?;
        self.flush()?;
        info!(transaction = %transaction_id, "Transaction undone");
        Ok(())
    }

    pub fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Transaction>, RollbackError> {
        let Some(raw) = self.transactions.get(transaction_id.as_bytes())? else {
            return Ok(None);
        };
        let parsed = serde_json::from_slice(&raw).map_err(to_ledger_data)?;
        Ok(Some(parsed))
    }

    /// All transactions, most recent first
    pub fn transactions(&self) -> Result<Vec<Transaction>, RollbackError> {
        let mut out = Vec::new();
        for result in self.transactions.iter() {
            let (_, value) = result?;
            let record: Transaction = serde_json::from_slice(&value).map_err(to_ledger_data)?;
            out.push(record);
        }
        out.sort_by_key(|t| std::cmp::Reverse((t.started_at, t.sequence)));
        Ok(out)
    }

    /// Transaction summaries, most recent first
    pub fn list_transactions(&self) -> Result<Vec<TransactionSummary>, RollbackError> {
        Ok(self.transactions()?.iter().map(Transaction::summary).collect())
    }

    /// Most recent COMMITTED transaction, if any
    pub fn last_committed(&self) -> Result<Option<Transaction>, RollbackError> {
        Ok(self
            .transactions()?
            .into_iter()
            .find(|t| t.status == TransactionStatus::Committed))
    }

    /// PENDING transactions that started more than `age` before `now`
    ///
    /// Reported only; nothing is resolved automatically.
    pub fn pending_older_than(
        &self,
        age: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<TransactionSummary>, RollbackError> {
        Ok(self
            .transactions()?
            .iter()
            .filter(|t| t.status == TransactionStatus::Pending && now - t.started_at > age)
            .map(Transaction::summary)
            .collect())
    }

    /// Lifecycle events of one transaction, in append order
    pub fn events(&self, transaction_id: &str) -> Result<Vec<LedgerEvent>, RollbackError> {
        let prefix = format!("{transaction_id}:");
        let mut out = Vec::new();
        for result in self.events.scan_prefix(prefix.as_bytes()) {
            let (_, value) = result?;
            let parsed: LedgerEvent = serde_json::from_slice(&value).map_err(to_ledger_data)?;
            out.push(parsed);
        }
        out.sort_by_key(|e| e.seq);
        Ok(out)
    }

    pub fn flush(&self) -> Result<(), RollbackError> {
        self.db.flush()?;
        Ok(())
    }

    fn require(&self, transaction_id: &str) -> Result<Transaction, RollbackError> {
        self.get_transaction(transaction_id)?
            .ok_or_else(|| RollbackError::TransactionNotFound(transaction_id.to_string()))
    }

    fn put(&self, record: &Transaction) -> Result<(), RollbackError> {
        let value = serde_json::to_vec(record).map_err(to_ledger_data)?;
        self.transactions
            .insert(record.transaction_id.as_bytes(), value)?;
        Ok(())
    }

    fn append_event(
        &self,
        transaction_id: &str,
        kind: LedgerEventKind,
        detail: serde_json::Value,
    ) -> Result<(), RollbackError> {
        let seq = self.db.generate_id()?;
        let event = LedgerEvent {
            transaction_id: transaction_id.to_string(),
            seq,
            recorded_at: Utc::now(),
            kind,
            detail,
        };
        let value = serde_json::to_vec(&event).map_err(to_ledger_data)?;
        self.events
            .insert(encode_event_key(transaction_id, seq).as_bytes(), value)?;
        Ok(())
    }
}

fn new_transaction_id(started_at: DateTime<Utc>, sequence: u64) -> String {
    format!(
        "tx-{}-{}-{}",
        started_at.timestamp_millis(),
        std::process::id(),
        sequence
    )
}

fn encode_event_key(transaction_id: &str, seq: u64) -> String {
    format!("{transaction_id}:{seq:0EVENT_KEY_PAD$}")
}

fn to_ledger_data(err: serde_json::Error) -> RollbackError {
    RollbackError::Ledger(format!("Malformed ledger record: {}", err))
}
