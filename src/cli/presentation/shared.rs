//! Shared presentation helpers: timestamps, sizes, headings, json.

use crate::error::RollbackError;
use chrono::{DateTime, Utc};
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;

pub fn to_json_pretty<T: Serialize + ?Sized>(value: &T) -> Result<String, RollbackError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| RollbackError::Metadata(format!("Failed to render JSON: {}", e)))
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn format_optional_timestamp(ts: Option<&DateTime<Utc>>) -> String {
    ts.map(format_timestamp).unwrap_or_else(|| "-".to_string())
}

/// Byte count with a binary unit, e.g. `1.5 KiB`
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

pub fn heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

pub fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(header);
    table
}
