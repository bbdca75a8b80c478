//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.physiomap.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Archive connection settings.
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Subject roster and identity settings.
    #[serde(default)]
    pub subjects: SubjectsConfig,

    /// Physio detection settings.
    #[serde(default)]
    pub physio: PhysioConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "physio_summary.csv".to_string()
}

/// Remote archive settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Base URL of the archive REST API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Label of the project to reconcile.
    #[serde(default = "default_project_label")]
    pub project_label: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            project_label: default_project_label(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_project_label() -> String {
    "r01network".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Subject roster and identity settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectsConfig {
    /// Path to the validation roster (one subject id per line).
    #[serde(default = "default_validation_roster")]
    pub validation_roster: String,

    /// Path to the discovery roster (one subject id per line).
    #[serde(default = "default_discovery_roster")]
    pub discovery_roster: String,

    /// Raw-to-canonical subject id aliases. Targets must be canonical:
    /// an alias whose target is itself aliased is rejected at validation.
    #[serde(default = "default_aliases")]
    pub aliases: HashMap<String, String>,
}

impl Default for SubjectsConfig {
    fn default() -> Self {
        Self {
            validation_roster: default_validation_roster(),
            discovery_roster: default_discovery_roster(),
            aliases: default_aliases(),
        }
    }
}

fn default_validation_roster() -> String {
    "validation_subjects.txt".to_string()
}

fn default_discovery_roster() -> String {
    "discovery_subjects.txt".to_string()
}

fn default_aliases() -> HashMap<String, String> {
    HashMap::from([
        ("s29-2".to_string(), "s29".to_string()),
        ("s19-2".to_string(), "s19".to_string()),
        ("s43-2".to_string(), "s43".to_string()),
    ])
}

/// Physio detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysioConfig {
    /// Output file names that mark a session as having physio data.
    /// Compared case-insensitively against exact file names.
    #[serde(default = "default_patterns")]
    pub patterns: Vec<String>,
}

impl Default for PhysioConfig {
    fn default() -> Self {
        Self {
            patterns: default_patterns(),
        }
    }
}

fn default_patterns() -> Vec<String> {
    vec![
        "PPG_FItData.csv",
        "PPG_FItTrig.csv",
        "RESP_FItData.csv",
        "RESP_FItTrig.csv",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".physiomap.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref project) = args.project {
            self.archive.project_label = project.clone();
        }
        if let Some(ref base_url) = args.base_url {
            self.archive.base_url = base_url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.archive.timeout_seconds = timeout;
        }

        if let Some(ref output) = args.output {
            self.general.output = output.clone();
        }
        if let Some(ref roster) = args.validation_roster {
            self.subjects.validation_roster = roster.clone();
        }
        if let Some(ref roster) = args.discovery_roster {
            self.subjects.discovery_roster = roster.clone();
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Validate cross-field invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        for (raw, canonical) in &self.subjects.aliases {
            if let Some(next) = self.subjects.aliases.get(canonical) {
                if next != canonical {
                    return Err(format!(
                        "Alias chain detected: '{}' -> '{}' -> '{}'. Alias targets must be canonical ids",
                        raw, canonical, next
                    ));
                }
            }
        }

        if self.physio.patterns.is_empty() {
            return Err("physio.patterns must list at least one file name".to_string());
        }

        if self.archive.project_label.trim().is_empty() {
            return Err("archive.project_label must not be empty".to_string());
        }

        if self.archive.timeout_seconds == 0 {
            return Err("archive.timeout_seconds must be greater than zero".to_string());
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
