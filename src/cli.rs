//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// Physiomap - canonical session table builder for research archives
///
/// Reconcile a project's subject/session metadata from a remote research
/// archive into one chronologically ordered CSV of subject/session pairs,
/// each flagged for the presence of physio-derived output files.
///
/// Examples:
///   physiomap --api-key <KEY>
///   physiomap --project r01network --output physio_summary.csv
///   physiomap --base-url https://archive.example.edu --verbose
///   physiomap --dry-run
///   physiomap --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Archive API key used for bearer authentication
    ///
    /// Required for any run that contacts the archive. Can also be set
    /// via the ARCHIVE_API_KEY env var.
    #[arg(short = 'k', long, env = "ARCHIVE_API_KEY", value_name = "KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Label of the archive project to reconcile
    ///
    /// Overrides the project configured in .physiomap.toml.
    #[arg(short, long, value_name = "LABEL")]
    pub project: Option<String>,

    /// Base URL of the archive REST API
    #[arg(long, env = "ARCHIVE_URL", value_name = "URL")]
    pub base_url: Option<String>,

    /// Output file path for the session table
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<String>,

    /// Path to the validation subject roster (one id per line)
    #[arg(long, value_name = "FILE")]
    pub validation_roster: Option<String>,

    /// Path to the discovery subject roster (one id per line)
    #[arg(long, value_name = "FILE")]
    pub discovery_roster: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .physiomap.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: load rosters and print the eligible subject set
    ///
    /// Resolves aliases and the roster intersection without contacting
    /// the archive, then exits.
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .physiomap.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Validate archive URL format if provided
        if let Some(ref base_url) = self.base_url {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err("Archive URL must start with 'http://' or 'https://'".to_string());
            }
        }

        // An explicitly passed key must not be blank
        if let Some(ref api_key) = self.api_key {
            if api_key.trim().is_empty() {
                return Err("API key must not be empty".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Validate timeout if provided
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
