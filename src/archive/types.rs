//! Wire types for archive REST responses.
//!
//! Only the fields reconciliation needs are modeled; unknown fields in
//! archive payloads are ignored.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A project container.
#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub id: String,
    pub label: String,
}

/// A subject container as listed under a project.
#[derive(Debug, Clone, Deserialize)]
pub struct Subject {
    pub id: String,
    /// Raw subject code as entered at the scanner; may be an alias.
    pub code: String,
}

/// A scan session as listed under a subject.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub id: String,
    pub label: String,
    /// Acquisition timestamp; absent on some legacy records.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// An analysis attached to a session.
///
/// The output listing is inconsistently shaped across gear versions: some
/// records carry it under `files`, some under `outputs`, and listing
/// endpoints may omit it entirely until the analysis detail is fetched.
#[derive(Debug, Clone, Deserialize)]
pub struct Analysis {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub files: Option<Vec<FileEntry>>,
    #[serde(default)]
    pub outputs: Option<Vec<FileEntry>>,
}

/// One output file attached to an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileEntry {
    pub name: String,
}
