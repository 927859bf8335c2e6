//! Snapshot presentation: list, create, show, restore and verify formatters.

use super::shared::{format_bytes, format_timestamp, heading, new_table};
use crate::snapshot::{RestoreReport, Snapshot, SnapshotSummary, VerifyReport};
use comfy_table::{Cell, Color};

pub fn format_snapshot_list_text(snapshots: &[SnapshotSummary]) -> String {
    if snapshots.is_empty() {
        return "No snapshots.".to_string();
    }
    let mut table = new_table(vec!["Snapshot", "Created", "Files", "Size"]);
    for s in snapshots {
        table.add_row(vec![
            s.snapshot_id.clone(),
            format_timestamp(&s.created_at),
            s.file_count.to_string(),
            format_bytes(s.total_bytes),
        ]);
    }
    format!("{}\n{}", heading(&format!("Snapshots ({})", snapshots.len())), table)
}

pub fn format_created_text(snapshot: &Snapshot) -> String {
    format!(
        "Created snapshot {}\n  Files: {}\n  Size: {}",
        snapshot.snapshot_id,
        snapshot.files.len(),
        format_bytes(snapshot.total_bytes())
    )
}

pub fn format_snapshot_detail_text(snapshot: &Snapshot) -> String {
    let mut out = format!(
        "{}\n  Created: {}\n  Files: {}\n  Size: {}",
        heading(&format!("Snapshot {}", snapshot.snapshot_id)),
        format_timestamp(&snapshot.created_at),
        snapshot.files.len(),
        format_bytes(snapshot.total_bytes())
    );
    if snapshot.files.is_empty() {
        return out;
    }
    let mut table = new_table(vec!["Path", "Size", "Hash", "Mode"]);
    for file in &snapshot.files {
        let hex = &file.content_hash.hex;
        let short = format!(
            "{}:{}",
            file.content_hash.algorithm,
            hex.get(..16).unwrap_or(hex)
        );
        table.add_row(vec![
            file.original_path.display().to_string(),
            format_bytes(file.size),
            short,
            file.permissions
                .map(|m| format!("{:o}", m))
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    out.push('\n');
    out.push_str(&table.to_string());
    out
}

pub fn format_restore_report_text(report: &RestoreReport) -> String {
    let mut out = format!(
        "Restored {} file(s) from snapshot {}",
        report.restored.len(),
        report.snapshot_id
    );
    for path in &report.restored {
        out.push_str(&format!("\n  {}", path.display()));
    }
    if !report.failed.is_empty() {
        out.push_str(&format!("\n\nFailed ({}):", report.failed.len()));
        for failure in &report.failed {
            out.push_str(&format!("\n  - {}: {}", failure.path.display(), failure.reason));
        }
    }
    out
}

pub fn format_verify_report_text(report: &VerifyReport) -> String {
    if report.is_intact() {
        return format!(
            "Snapshot {} intact: {} blob(s) verified",
            report.snapshot_id, report.checked
        );
    }
    let mut table = new_table(vec!["File", "Algorithm", "Problem"]);
    for issue in report.missing.iter().chain(report.corrupt.iter()) {
        table.add_row(vec![
            Cell::new(issue.original_path.display()),
            Cell::new(&issue.algorithm),
            Cell::new(&issue.reason).fg(Color::Red),
        ]);
    }
    format!(
        "Snapshot {}: {} checked, {} missing, {} corrupt\n{}",
        report.snapshot_id,
        report.checked,
        report.missing.len(),
        report.corrupt.len(),
        table
    )
}
