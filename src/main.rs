//! Physiomap - Canonical Session Table Builder
//!
//! A CLI tool that reconciles subject/session metadata from a remote
//! research-data archive into one chronologically ordered CSV, flagging
//! each session for physio-derived output files.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (credentials, connection, config, write failure, etc.)

mod archive;
mod chronology;
mod cli;
mod config;
mod models;
mod physio;
mod reconcile;
mod report;
mod subjects;

use anyhow::{Context, Result};
use archive::ArchiveClient;
use cli::Args;
use config::Config;
use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("Physiomap v{}", env!("CARGO_PKG_VERSION"));

    // Run the reconciliation
    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Reconciliation failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .physiomap.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".physiomap.toml");

    if path.exists() {
        eprintln!("⚠️  .physiomap.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .physiomap.toml")?;

    println!("✅ Created .physiomap.toml with default settings.");
    println!("   Edit it to customize the project, rosters, aliases, and patterns.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete reconciliation workflow. Returns the exit code.
async fn run(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    if let Err(e) = config.validate() {
        anyhow::bail!("Invalid configuration: {}", e);
    }
    // The merged config never holds the API key, so this is safe to log
    debug!("Configuration: {:?}", config);

    // Step 1: Resolve the eligible subject set from the rosters
    let validation = subjects::load_roster(
        Path::new(&config.subjects.validation_roster),
        &config.subjects.aliases,
    );
    let discovery = subjects::load_roster(
        Path::new(&config.subjects.discovery_roster),
        &config.subjects.aliases,
    );
    let eligible = subjects::eligible_subjects(&validation, &discovery);

    println!(
        "📋 Rosters: {} validation, {} discovery, {} eligible",
        validation.len(),
        discovery.len(),
        eligible.len()
    );

    // Handle --dry-run: print the eligible set and exit
    if args.dry_run {
        return handle_dry_run(&eligible);
    }

    // Step 2: Connect to the archive
    let api_key = match args.api_key {
        Some(ref key) => key.clone(),
        None => anyhow::bail!("no archive API key: pass --api-key or set ARCHIVE_API_KEY"),
    };

    println!("🔌 Archive: {}", config.archive.base_url);
    let client = ArchiveClient::new(
        &config.archive.base_url,
        &api_key,
        Duration::from_secs(config.archive.timeout_seconds),
    )?;

    // Step 3: Traverse and reconcile
    let assignments = reconcile::reconcile_project(&client, &config, &eligible, !args.quiet).await?;

    // Step 4: Write the session table
    report::write_summary(Path::new(&config.general.output), &assignments)?;

    // Print summary
    let duration = start_time.elapsed().as_secs_f64();
    let subject_count = assignments
        .iter()
        .map(|a| a.subject_id.as_str())
        .collect::<HashSet<_>>()
        .len();
    let physio_count = assignments.iter().filter(|a| a.has_physio).count();

    println!("\n📊 Reconciliation Summary:");
    println!("   Subjects: {}", subject_count);
    println!("   Sessions: {}", assignments.len());
    println!("   Sessions with physio: {}", physio_count);
    println!("   Duration: {:.1}s", duration);
    println!("\n✅ Session table saved to: {}", config.general.output);

    Ok(0)
}

/// Handle --dry-run: print the eligible subject set, exit.
fn handle_dry_run(eligible: &HashSet<String>) -> Result<i32> {
    println!("\n🔍 Dry run: resolving rosters (no archive calls)...\n");

    if eligible.is_empty() {
        println!("   No subjects present in both rosters.");
    } else {
        let mut ids: Vec<&String> = eligible.iter().collect();
        ids.sort();

        println!("   {} subjects would be reconciled:\n", ids.len());
        for id in ids {
            println!("     🧑 {}", id);
        }
    }

    println!("\n✅ Dry run complete. No archive calls were made.");
    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .physiomap.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
