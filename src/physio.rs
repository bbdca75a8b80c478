//! Physio artifact detection.
//!
//! Decides, per session, whether any attached analysis produced one of the
//! configured physio output files (PPG/RESP traces). Output listings come
//! in three record shapes across gear versions; [`resolve_file_names`]
//! normalizes them behind ordered fallback strategies.

use crate::archive::{Analysis, Archive, FileEntry};
use tracing::{debug, warn};

/// Extract names from a listing, treating an empty listing as absent.
fn listed_names(entries: Option<&[FileEntry]>) -> Option<Vec<String>> {
    match entries {
        Some(entries) if !entries.is_empty() => {
            Some(entries.iter().map(|f| f.name.clone()).collect())
        }
        _ => None,
    }
}

/// Record-local strategies in order: eager `files`, then alternate `outputs`.
fn record_file_names(analysis: &Analysis) -> Option<Vec<String>> {
    listed_names(analysis.files.as_deref()).or_else(|| listed_names(analysis.outputs.as_deref()))
}

/// Normalize an analysis record into its output file names.
///
/// Record-local listings are tried first; a record carrying neither is
/// materialized with a detail fetch and re-read. A materialization failure
/// is scoped to this analysis: it logs a warning and yields no files.
pub async fn resolve_file_names<A: Archive>(archive: &A, analysis: &Analysis) -> Vec<String> {
    if let Some(names) = record_file_names(analysis) {
        return names;
    }

    debug!("analysis {} lists no files inline, fetching detail", analysis.id);
    match archive.analysis_detail(&analysis.id).await {
        Ok(detail) => record_file_names(&detail).unwrap_or_default(),
        Err(e) => {
            warn!(
                "could not materialize file listing for analysis {}: {}",
                analysis.id, e
            );
            Vec::new()
        }
    }
}

/// True when the file name equals a configured pattern, ignoring case.
///
/// Exact equality only: derivative names that merely contain a pattern
/// (backups, renamed copies) do not count.
pub fn is_physio_file(patterns: &[String], name: &str) -> bool {
    patterns.iter().any(|p| p.eq_ignore_ascii_case(name))
}

/// Does any analysis of this session expose a physio output file?
///
/// Analyses are checked in listing order, short-circuiting on the first
/// match.
pub async fn session_has_physio<A: Archive>(
    archive: &A,
    patterns: &[String],
    analyses: &[Analysis],
) -> bool {
    for analysis in analyses {
        let names = resolve_file_names(archive, analysis).await;
        debug!(
            "analysis {} ({}) exposes {} output files",
            analysis.id,
            analysis.label,
            names.len()
        );

        if let Some(name) = names.iter().find(|name| is_physio_file(patterns, name)) {
            debug!("physio artifact {} found in analysis {}", name, analysis.id);
            return true;
        }
    }

    false
}
