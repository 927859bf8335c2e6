//! Reclaim: rollback core for a space-reclaiming deduplication tool
//!
//! Destructive file operations (move, delete, copy, symlink, create) run inside a
//! protected execution: the affected files are captured into a content-addressed
//! snapshot, the operation is tracked in a durable transaction ledger, and on failure the
//! snapshot is restored so the filesystem is left as it was.

pub mod atomic;
pub mod cli;
pub mod concurrency;
pub mod config;
pub mod content;
pub mod error;
pub mod fs_ops;
pub mod ledger;
pub mod logging;
pub mod rollback;
pub mod snapshot;

pub use content::{ContentHash, ContentStore, HashAlgorithm};
pub use error::{ContentStoreError, RollbackError};
pub use ledger::{TransactionLog, TransactionScope, TransactionStatus};
pub use rollback::{ProtectedError, RollbackManager, RollbackOutcome, UndoOutcome};
pub use snapshot::{RestorePolicy, RestoreReport, Snapshot, SnapshotManager};
