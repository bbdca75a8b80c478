//! Subject identity handling: alias normalization and roster membership.
//!
//! Subjects are eligible for reconciliation when they appear in both the
//! validation and discovery rosters. Roster entries and archive subject
//! codes both pass through the alias table first, so a roster may list a
//! subject under either its raw or canonical id.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, warn};

/// Map a raw subject id to its canonical form.
///
/// Ids absent from the alias table pass through unchanged. Total and pure;
/// with a chain-free table (enforced at config load) it is idempotent.
pub fn normalize_subject_id(aliases: &HashMap<String, String>, subject_id: &str) -> String {
    aliases
        .get(subject_id)
        .cloned()
        .unwrap_or_else(|| subject_id.to_string())
}

/// Load one line-delimited subject roster, normalizing each entry.
///
/// A missing or unreadable file is not fatal: the roster degrades to an
/// empty set with a warning, which in turn empties the eligible
/// intersection.
pub fn load_roster(path: &Path, aliases: &HashMap<String, String>) -> HashSet<String> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(
                "subject roster {} unreadable ({}); treating as empty",
                path.display(),
                e
            );
            return HashSet::new();
        }
    };

    let roster: HashSet<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| normalize_subject_id(aliases, line))
        .collect();

    debug!("loaded {} subject ids from {}", roster.len(), path.display());
    roster
}

/// Subjects eligible for reconciliation: present in both rosters.
pub fn eligible_subjects(
    validation: &HashSet<String>,
    discovery: &HashSet<String>,
) -> HashSet<String> {
    validation.intersection(discovery).cloned().collect()
}
