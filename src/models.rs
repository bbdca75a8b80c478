//! Core data model for a reconciliation run.
//!
//! These types carry a session from the archive traversal through
//! chronological relabeling to the exported summary row. Nothing here
//! outlives a single run.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// A remote subject paired with its canonical identity.
///
/// Re-scanned participants re-enter the archive under suffixed codes
/// (`s29-2` for a second pass of `s29`); the alias table folds those back
/// onto one canonical id so their sessions pool together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectIdentity {
    /// Subject code exactly as the archive reports it.
    pub raw_id: String,
    /// Alias-resolved id used as the grouping key.
    pub canonical_id: String,
}

impl SubjectIdentity {
    /// Resolve a raw archive subject code against the alias table.
    pub fn resolve(raw_id: &str, aliases: &HashMap<String, String>) -> Self {
        Self {
            raw_id: raw_id.to_string(),
            canonical_id: crate::subjects::normalize_subject_id(aliases, raw_id),
        }
    }

    /// Whether the alias table rewrote this id.
    pub fn is_aliased(&self) -> bool {
        self.raw_id != self.canonical_id
    }
}

/// One session as collected during traversal, before relabeling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// Archive id of the session.
    pub remote_id: String,
    /// Label the session carries in the archive (a visit name, usually).
    pub original_label: String,
    /// Acquisition time; `None` when the archive record omits it.
    pub timestamp: Option<DateTime<Utc>>,
    /// Whether any analysis of this session produced a physio trace file.
    pub has_physio: bool,
}

/// A finalized, relabeled row of the summary table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAssignment {
    /// Canonical subject id the session belongs to.
    pub subject_id: String,
    /// Rank-based label within the subject: `ses-01`, `ses-02`, ...
    pub session_label: String,
    /// Label the session carried before relabeling.
    pub original_label: String,
    /// Physio flag carried over from detection.
    pub has_physio: bool,
}
