//! HTTPS client for the archive REST API.

use super::types::{Analysis, Project, Session, Subject};
use super::{Archive, ArchiveError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Archive REST client with bearer-token auth baked into every request.
pub struct ArchiveClient {
    client: reqwest::Client,
    base_url: String,
}

impl ArchiveClient {
    /// Create a client for the given archive endpoint.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, ArchiveError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|_| {
            ArchiveError::Credential("API key contains characters not valid in a header".to_string())
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// GET a path relative to the base URL and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ArchiveError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ArchiveError::Credential(format!(
                "archive rejected the API key (HTTP {})",
                status.as_u16()
            )));
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ArchiveError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let message = Self::error_message(response).await;
            return Err(ArchiveError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ArchiveError::Decode(e.to_string()))
    }

    /// Best-effort extraction of the error body's `message` field.
    async fn error_message(response: reqwest::Response) -> String {
        match response.text().await {
            Ok(body) => match serde_json::from_str::<serde_json::Value>(&body) {
                Ok(value) => value
                    .get("message")
                    .and_then(|m| m.as_str())
                    .map(String::from)
                    .unwrap_or(body),
                Err(_) => body,
            },
            Err(_) => String::new(),
        }
    }
}

#[async_trait]
impl Archive for ArchiveClient {
    async fn lookup_project(&self, label: &str) -> Result<Project, ArchiveError> {
        self.get_json("/api/projects/lookup", &[("label", label)])
            .await
    }

    async fn project_subjects(&self, project_id: &str) -> Result<Vec<Subject>, ArchiveError> {
        self.get_json(&format!("/api/projects/{}/subjects", project_id), &[])
            .await
    }

    async fn subject_sessions(&self, subject_id: &str) -> Result<Vec<Session>, ArchiveError> {
        self.get_json(&format!("/api/subjects/{}/sessions", subject_id), &[])
            .await
    }

    async fn session_analyses(&self, session_id: &str) -> Result<Vec<Analysis>, ArchiveError> {
        self.get_json(&format!("/api/sessions/{}/analyses", session_id), &[])
            .await
    }

    async fn analysis_detail(&self, analysis_id: &str) -> Result<Analysis, ArchiveError> {
        self.get_json(&format!("/api/analyses/{}", analysis_id), &[])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client =
            ArchiveClient::new("http://localhost:8080/", "key", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_key_with_control_characters_rejected() {
        let result = ArchiveClient::new("http://localhost:8080", "bad\nkey", Duration::from_secs(5));
        assert!(matches!(result, Err(ArchiveError::Credential(_))));
    }
}
