//! CLI presentation: text and json formatters per command family.

mod ledger;
mod shared;
mod snapshot;

pub use ledger::{format_pending_text, format_transaction_list_text, format_undo_text};
pub use shared::to_json_pretty;
pub use snapshot::{
    format_created_text, format_restore_report_text, format_snapshot_detail_text,
    format_snapshot_list_text, format_verify_report_text,
};
