//! Remote archive access.
//!
//! The reconciliation pipeline reads the archive through the [`Archive`]
//! trait so the traversal logic can be driven by an in-memory fake in
//! tests. [`ArchiveClient`] is the HTTPS implementation used in production.

pub mod client;
pub mod types;

pub use client::ArchiveClient;
pub use types::{Analysis, FileEntry, Project, Session, Subject};

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by archive access.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The API key is malformed or was rejected by the archive.
    #[error("Archive credential error: {0}")]
    Credential(String),

    /// Transport-level failure (connect, timeout, TLS).
    #[error("Archive network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The archive answered with a non-success status.
    #[error("Archive returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("Failed to decode archive response: {0}")]
    Decode(String),

    /// The requested container does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Read-only view of the archive hierarchy used by reconciliation.
#[async_trait]
pub trait Archive {
    /// Resolve a project container by its label.
    async fn lookup_project(&self, label: &str) -> Result<Project, ArchiveError>;

    /// List the subjects of a project.
    async fn project_subjects(&self, project_id: &str) -> Result<Vec<Subject>, ArchiveError>;

    /// List the scan sessions of a subject.
    async fn subject_sessions(&self, subject_id: &str) -> Result<Vec<Session>, ArchiveError>;

    /// List the analyses attached to a session.
    async fn session_analyses(&self, session_id: &str) -> Result<Vec<Analysis>, ArchiveError>;

    /// Fetch one analysis in full, materializing its file listing.
    async fn analysis_detail(&self, analysis_id: &str) -> Result<Analysis, ArchiveError>;
}
