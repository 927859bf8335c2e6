//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::RollbackError;

/// Map domain errors to a string for stderr.
///
/// Errors carrying a list of paths get one line per path.
pub fn map_error(e: &RollbackError) -> String {
    match e {
        RollbackError::Restore {
            snapshot_id,
            failed,
        } => {
            let mut out = format!(
                "Error: restore of snapshot {} incomplete, {} file(s) not restored:",
                snapshot_id,
                failed.len()
            );
            for path in failed {
                out.push_str(&format!("\n  - {}", path.display()));
            }
            out
        }
        RollbackError::Integrity {
            snapshot_id,
            issues,
        } => {
            let mut out = format!(
                "Error: snapshot {} failed verification ({} problem(s)):",
                snapshot_id,
                issues.len()
            );
            for issue in issues {
                out.push_str(&format!("\n  - {}", issue));
            }
            out
        }
        other => format!("Error: {}", other),
    }
}
