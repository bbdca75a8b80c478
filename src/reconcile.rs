//! Reconciliation orchestration.
//!
//! Walks the archive hierarchy (project → subjects → sessions → analyses),
//! filters subjects against the eligible set, runs physio detection, and
//! resolves each canonical subject's chronology into assignment rows.
//!
//! Failures scoped to one subject, session, or analysis degrade with a
//! warning and the traversal continues; project-level failures abort.

use crate::archive::Archive;
use crate::config::Config;
use crate::models::{SessionAssignment, SessionRecord, SubjectIdentity};
use crate::{chronology, physio};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

/// Reconcile the configured project into chronologically labeled rows.
///
/// Rows come out ordered by canonical subject id, then chronological rank.
/// Subjects outside the eligible set are skipped before any session fetch;
/// subjects that end up with zero sessions produce no rows.
pub async fn reconcile_project<A: Archive>(
    archive: &A,
    config: &Config,
    eligible: &HashSet<String>,
    show_progress: bool,
) -> Result<Vec<SessionAssignment>> {
    let project = archive
        .lookup_project(&config.archive.project_label)
        .await
        .with_context(|| {
            format!(
                "Failed to look up project '{}'",
                config.archive.project_label
            )
        })?;
    info!("found project {} ({})", project.label, project.id);

    let subjects = archive
        .project_subjects(&project.id)
        .await
        .context("Failed to list project subjects")?;

    println!(
        "🔎 Reconciling project '{}' ({} subjects, {} eligible)",
        project.label,
        subjects.len(),
        eligible.len()
    );

    let progress_bar = if show_progress {
        let pb = ProgressBar::new(subjects.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut grouped: BTreeMap<String, Vec<SessionRecord>> = BTreeMap::new();
    let mut skipped = 0usize;

    for subject in &subjects {
        if let Some(ref pb) = progress_bar {
            pb.set_message(subject.code.clone());
        }

        let identity = SubjectIdentity::resolve(&subject.code, &config.subjects.aliases);
        if identity.is_aliased() {
            debug!(
                "subject {} normalized to {}",
                identity.raw_id, identity.canonical_id
            );
        }

        if !eligible.contains(&identity.canonical_id) {
            debug!("subject {} not in both rosters, skipping", identity.canonical_id);
            skipped += 1;
            if let Some(ref pb) = progress_bar {
                pb.inc(1);
            }
            continue;
        }

        let sessions = match archive.subject_sessions(&subject.id).await {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!(
                    "could not list sessions for subject {}: {}",
                    identity.canonical_id, e
                );
                if let Some(ref pb) = progress_bar {
                    pb.inc(1);
                }
                continue;
            }
        };

        for session in sessions {
            let analyses = match archive.session_analyses(&session.id).await {
                Ok(analyses) => analyses,
                Err(e) => {
                    warn!(
                        "could not list analyses for session {} of {}: {}",
                        session.label, identity.canonical_id, e
                    );
                    Vec::new()
                }
            };
            debug!(
                "session {} of {} has {} analyses",
                session.label,
                identity.canonical_id,
                analyses.len()
            );

            let has_physio =
                physio::session_has_physio(archive, &config.physio.patterns, &analyses).await;

            grouped
                .entry(identity.canonical_id.clone())
                .or_default()
                .push(SessionRecord {
                    remote_id: session.id,
                    original_label: session.label,
                    timestamp: session.timestamp,
                    has_physio,
                });
        }

        if let Some(ref pb) = progress_bar {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress_bar {
        pb.finish_with_message("traversal complete");
    }
    info!(
        "traversal done: {} canonical subjects collected, {} subjects skipped by roster filter",
        grouped.len(),
        skipped
    );

    // BTreeMap iteration gives canonical-id order; ranks order within it
    let mut assignments = Vec::new();
    for (canonical_id, records) in grouped {
        assignments.extend(chronology::resolve_sessions(&canonical_id, records));
    }

    Ok(assignments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{Analysis, ArchiveError, FileEntry, Project, Session, Subject};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockArchive {
        project: Project,
        subjects: Vec<Subject>,
        /// Subject id → sessions.
        sessions: HashMap<String, Vec<Session>>,
        /// Session id → analyses.
        analyses: HashMap<String, Vec<Analysis>>,
        details: HashMap<String, Analysis>,
        fail_sessions_for: HashSet<String>,
        fail_analyses_for: HashSet<String>,
        session_calls: AtomicUsize,
    }

    impl Default for MockArchive {
        fn default() -> Self {
            Self {
                project: Project {
                    id: "proj-1".to_string(),
                    label: "r01network".to_string(),
                },
                subjects: Vec::new(),
                sessions: HashMap::new(),
                analyses: HashMap::new(),
                details: HashMap::new(),
                fail_sessions_for: HashSet::new(),
                fail_analyses_for: HashSet::new(),
                session_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Archive for MockArchive {
        async fn lookup_project(&self, label: &str) -> Result<Project, ArchiveError> {
            if label == self.project.label {
                Ok(self.project.clone())
            } else {
                Err(ArchiveError::NotFound(format!("project {}", label)))
            }
        }

        async fn project_subjects(&self, _project_id: &str) -> Result<Vec<Subject>, ArchiveError> {
            Ok(self.subjects.clone())
        }

        async fn subject_sessions(&self, subject_id: &str) -> Result<Vec<Session>, ArchiveError> {
            self.session_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_sessions_for.contains(subject_id) {
                return Err(ArchiveError::Api {
                    status: 500,
                    message: "session listing failed".to_string(),
                });
            }
            Ok(self.sessions.get(subject_id).cloned().unwrap_or_default())
        }

        async fn session_analyses(&self, session_id: &str) -> Result<Vec<Analysis>, ArchiveError> {
            if self.fail_analyses_for.contains(session_id) {
                return Err(ArchiveError::Api {
                    status: 500,
                    message: "analysis listing failed".to_string(),
                });
            }
            Ok(self.analyses.get(session_id).cloned().unwrap_or_default())
        }

        async fn analysis_detail(&self, analysis_id: &str) -> Result<Analysis, ArchiveError> {
            self.details
                .get(analysis_id)
                .cloned()
                .ok_or_else(|| ArchiveError::NotFound(analysis_id.to_string()))
        }
    }

    fn subject(id: &str, code: &str) -> Subject {
        Subject {
            id: id.to_string(),
            code: code.to_string(),
        }
    }

    fn session(id: &str, label: &str, timestamp: Option<&str>) -> Session {
        Session {
            id: id.to_string(),
            label: label.to_string(),
            timestamp: timestamp
                .map(|t| DateTime::parse_from_rfc3339(t).unwrap().with_timezone(&Utc)),
        }
    }

    fn physio_analysis(id: &str) -> Analysis {
        Analysis {
            id: id.to_string(),
            label: "physio-regressors".to_string(),
            files: Some(vec![FileEntry {
                name: "PPG_FItData.csv".to_string(),
            }]),
            outputs: None,
        }
    }

    fn plain_analysis(id: &str) -> Analysis {
        Analysis {
            id: id.to_string(),
            label: "motion-correction".to_string(),
            files: Some(vec![FileEntry {
                name: "motion.tsv".to_string(),
            }]),
            outputs: None,
        }
    }

    fn eligible(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn rows(assignments: &[SessionAssignment]) -> Vec<(String, String, bool)> {
        assignments
            .iter()
            .map(|a| {
                (
                    a.subject_id.clone(),
                    a.session_label.clone(),
                    a.has_physio,
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_full_traversal() {
        let mut archive = MockArchive::default();
        archive.subjects = vec![subject("sub-1", "s01")];
        archive.sessions.insert(
            "sub-1".to_string(),
            vec![
                session("ses-b", "visit_2", Some("2023-03-01T10:00:00Z")),
                session("ses-a", "visit_1", Some("2023-01-01T10:00:00Z")),
            ],
        );
        archive
            .analyses
            .insert("ses-a".to_string(), vec![physio_analysis("an-1")]);
        archive
            .analyses
            .insert("ses-b".to_string(), vec![plain_analysis("an-2")]);

        let config = Config::default();
        let assignments = reconcile_project(&archive, &config, &eligible(&["s01"]), false)
            .await
            .unwrap();

        assert_eq!(
            rows(&assignments),
            vec![
                ("s01".to_string(), "ses-01".to_string(), true),
                ("s01".to_string(), "ses-02".to_string(), false),
            ]
        );
        assert_eq!(assignments[0].original_label, "visit_1");
    }

    #[tokio::test]
    async fn test_aliased_subjects_pool_sessions() {
        let mut archive = MockArchive::default();
        archive.subjects = vec![subject("sub-1", "s29"), subject("sub-2", "s29-2")];
        archive.sessions.insert(
            "sub-1".to_string(),
            vec![session("ses-a", "baseline", Some("2023-01-01T00:00:00Z"))],
        );
        archive.sessions.insert(
            "sub-2".to_string(),
            vec![session("ses-b", "retest", Some("2023-06-01T00:00:00Z"))],
        );

        let config = Config::default();
        let assignments = reconcile_project(&archive, &config, &eligible(&["s29"]), false)
            .await
            .unwrap();

        assert_eq!(
            rows(&assignments),
            vec![
                ("s29".to_string(), "ses-01".to_string(), false),
                ("s29".to_string(), "ses-02".to_string(), false),
            ]
        );
        assert_eq!(assignments[0].original_label, "baseline");
        assert_eq!(assignments[1].original_label, "retest");
    }

    #[tokio::test]
    async fn test_ineligible_subject_skipped_before_session_fetch() {
        let mut archive = MockArchive::default();
        archive.subjects = vec![subject("sub-1", "s01"), subject("sub-2", "s99")];
        archive.sessions.insert(
            "sub-1".to_string(),
            vec![session("ses-a", "visit", Some("2023-01-01T00:00:00Z"))],
        );

        let config = Config::default();
        let assignments = reconcile_project(&archive, &config, &eligible(&["s01"]), false)
            .await
            .unwrap();

        assert_eq!(assignments.len(), 1);
        // Only the eligible subject's sessions were ever requested
        assert_eq!(archive.session_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_session_listing_failure_omits_subject() {
        let mut archive = MockArchive::default();
        archive.subjects = vec![subject("sub-1", "s01"), subject("sub-2", "s02")];
        archive.fail_sessions_for.insert("sub-1".to_string());
        archive.sessions.insert(
            "sub-2".to_string(),
            vec![session("ses-a", "visit", Some("2023-01-01T00:00:00Z"))],
        );

        let config = Config::default();
        let assignments = reconcile_project(&archive, &config, &eligible(&["s01", "s02"]), false)
            .await
            .unwrap();

        assert_eq!(
            rows(&assignments),
            vec![("s02".to_string(), "ses-01".to_string(), false)]
        );
    }

    #[tokio::test]
    async fn test_analysis_listing_failure_keeps_row_without_physio() {
        let mut archive = MockArchive::default();
        archive.subjects = vec![subject("sub-1", "s01")];
        archive.sessions.insert(
            "sub-1".to_string(),
            vec![session("ses-a", "visit", Some("2023-01-01T00:00:00Z"))],
        );
        archive.fail_analyses_for.insert("ses-a".to_string());

        let config = Config::default();
        let assignments = reconcile_project(&archive, &config, &eligible(&["s01"]), false)
            .await
            .unwrap();

        assert_eq!(
            rows(&assignments),
            vec![("s01".to_string(), "ses-01".to_string(), false)]
        );
    }

    #[tokio::test]
    async fn test_rows_ordered_by_subject_then_rank() {
        let mut archive = MockArchive::default();
        archive.subjects = vec![subject("sub-z", "s20"), subject("sub-a", "s03")];
        archive.sessions.insert(
            "sub-z".to_string(),
            vec![
                session("ses-z2", "late", Some("2023-05-01T00:00:00Z")),
                session("ses-z1", "early", Some("2023-02-01T00:00:00Z")),
            ],
        );
        archive.sessions.insert(
            "sub-a".to_string(),
            vec![session("ses-a1", "only", Some("2023-03-01T00:00:00Z"))],
        );

        let config = Config::default();
        let assignments = reconcile_project(&archive, &config, &eligible(&["s03", "s20"]), false)
            .await
            .unwrap();

        assert_eq!(
            rows(&assignments),
            vec![
                ("s03".to_string(), "ses-01".to_string(), false),
                ("s20".to_string(), "ses-01".to_string(), false),
                ("s20".to_string(), "ses-02".to_string(), false),
            ]
        );
    }

    #[tokio::test]
    async fn test_no_eligible_subjects_yields_no_rows() {
        let mut archive = MockArchive::default();
        archive.subjects = vec![subject("sub-1", "s01")];
        archive.sessions.insert(
            "sub-1".to_string(),
            vec![session("ses-a", "visit", Some("2023-01-01T00:00:00Z"))],
        );

        let config = Config::default();
        let assignments = reconcile_project(&archive, &config, &HashSet::new(), false)
            .await
            .unwrap();

        assert!(assignments.is_empty());
        assert_eq!(archive.session_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_project_is_an_error() {
        let archive = MockArchive::default();
        let mut config = Config::default();
        config.archive.project_label = "does-not-exist".to_string();

        let result = reconcile_project(&archive, &config, &eligible(&["s01"]), false).await;
        assert!(result.is_err());
    }
}
