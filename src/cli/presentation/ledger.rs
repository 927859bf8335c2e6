//! Ledger presentation: transaction list, orphan report and undo result.

use super::shared::{format_optional_timestamp, format_timestamp, heading, new_table};
use super::snapshot::format_restore_report_text;
use crate::ledger::{TransactionStatus, TransactionSummary};
use crate::rollback::UndoOutcome;
use comfy_table::{Cell, Color};

fn status_cell(status: TransactionStatus) -> Cell {
    let color = match status {
        TransactionStatus::Committed => Color::Green,
        TransactionStatus::RolledBack => Color::Yellow,
        TransactionStatus::Pending => Color::Red,
    };
    Cell::new(status.as_str()).fg(color)
}

pub fn format_transaction_list_text(transactions: &[TransactionSummary]) -> String {
    if transactions.is_empty() {
        return "No transactions.".to_string();
    }
    let mut table = new_table(vec![
        "Transaction",
        "Status",
        "Started",
        "Ended",
        "Ops",
        "Snapshot",
    ]);
    for t in transactions {
        table.add_row(vec![
            Cell::new(&t.transaction_id),
            status_cell(t.status),
            Cell::new(format_timestamp(&t.started_at)),
            Cell::new(format_optional_timestamp(t.ended_at.as_ref())),
            Cell::new(t.operation_count),
            Cell::new(t.snapshot_id.as_deref().unwrap_or("-")),
        ]);
    }
    format!(
        "{}\n{}",
        heading(&format!("Transactions ({})", transactions.len())),
        table
    )
}

pub fn format_pending_text(pending: &[TransactionSummary], threshold_secs: u64) -> String {
    if pending.is_empty() {
        return format!(
            "No orphaned transactions (PENDING for more than {}s).",
            threshold_secs
        );
    }
    let mut table = new_table(vec!["Transaction", "Started", "Ops", "Snapshot"]);
    for t in pending {
        table.add_row(vec![
            t.transaction_id.clone(),
            format_timestamp(&t.started_at),
            t.operation_count.to_string(),
            t.snapshot_id.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    }
    format!(
        "{}\n{}\nRestore a linked snapshot with `reclaim rollback restore <snapshot>` if the files need recovering.",
        heading(&format!(
            "Orphaned transactions ({}), PENDING for more than {}s",
            pending.len(),
            threshold_secs
        )),
        table
    )
}

pub fn format_undo_text(outcome: &UndoOutcome) -> String {
    match &outcome.restore {
        Some(report) => format!(
            "Undid transaction {}\n{}",
            outcome.transaction_id,
            format_restore_report_text(report)
        ),
        None => format!(
            "Undid transaction {} (no linked snapshot; files unchanged)",
            outcome.transaction_id
        ),
    }
}
