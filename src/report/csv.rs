//! CSV rendering for session assignments.
//!
//! The table is small and the format fixed, so rows are rendered by hand.

use crate::models::SessionAssignment;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Column header for the session table.
const HEADER: &str = "subject_id,session,has_physio";

/// Quote a field when it contains a delimiter, quote, or newline.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render assignments into CSV text. The header row is always present,
/// even for an empty result set.
pub fn render_csv(assignments: &[SessionAssignment]) -> String {
    let mut out = String::with_capacity(HEADER.len() + 1 + assignments.len() * 24);
    out.push_str(HEADER);
    out.push('\n');

    for assignment in assignments {
        out.push_str(&csv_field(&assignment.subject_id));
        out.push(',');
        out.push_str(&csv_field(&assignment.session_label));
        out.push(',');
        out.push_str(if assignment.has_physio { "true" } else { "false" });
        out.push('\n');
    }

    out
}

/// Write the session table to disk.
pub fn write_summary(path: &Path, assignments: &[SessionAssignment]) -> Result<()> {
    let csv = render_csv(assignments);
    std::fs::write(path, csv)
        .with_context(|| format!("Failed to write session table: {}", path.display()))?;

    info!("wrote {} rows to {}", assignments.len(), path.display());
    Ok(())
}
