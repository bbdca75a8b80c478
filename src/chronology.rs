//! Session chronology resolution.
//!
//! Orders one subject's sessions by acquisition time and assigns canonical
//! `ses-NN` labels by rank.

use crate::models::{SessionAssignment, SessionRecord};
use tracing::debug;

/// Canonical session label for a 1-based chronological rank.
///
/// Zero-padded to two digits; wider ranks keep all their digits, so rank
/// 100 becomes `ses-100` rather than colliding.
fn session_label(rank: usize) -> String {
    format!("ses-{:02}", rank)
}

/// Order a subject's sessions chronologically and relabel them by rank.
///
/// Sessions with real timestamps come first in time order; sessions
/// without one follow, ordered by original label. The original label also
/// breaks timestamp ties, so the assignment is reproducible regardless of
/// the order the archive listed the sessions in.
pub fn resolve_sessions(
    subject_id: &str,
    mut sessions: Vec<SessionRecord>,
) -> Vec<SessionAssignment> {
    sessions.sort_by(|a, b| {
        let key_a = (a.timestamp.is_none(), a.timestamp, a.original_label.as_str());
        let key_b = (b.timestamp.is_none(), b.timestamp, b.original_label.as_str());
        key_a.cmp(&key_b)
    });

    sessions
        .into_iter()
        .enumerate()
        .map(|(idx, session)| {
            let label = session_label(idx + 1);
            debug!(
                "{}: session {} ({}) ranked {}",
                subject_id, session.original_label, session.remote_id, label
            );
            SessionAssignment {
                subject_id: subject_id.to_string(),
                session_label: label,
                original_label: session.original_label,
                has_physio: session.has_physio,
            }
        })
        .collect()
}
