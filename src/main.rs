//! Northgate Harvest main entry point
//!
//! This is the command-line interface for the Northgate planning harvester.

use anyhow::Context;
use clap::Parser;
use northgate_harvest::config::{load_config, load_stats_config, Config, SearchWindow};
use northgate_harvest::crawler::{run_harvest, search_form_fields, DEFAULT_USER_AGENT};
use northgate_harvest::output::{load_statistics, print_run_summary, print_statistics};
use northgate_harvest::storage::open_store;
use northgate_harvest::HarvestError;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Default log filter when neither flags nor `MORPH_LOG_LEVEL` say otherwise
const DEFAULT_FILTER: &str = "northgate_harvest=info,warn";

/// Northgate Harvest: an incremental planning-application harvester
///
/// Searches a Northgate Planning Explorer portal for recently received
/// applications and keeps a local SQLite dataset of their details, key
/// dates and documents up to date. Settings come from an optional TOML
/// file and `MORPH_*` environment variables (a `.env` file is honoured).
#[derive(Parser, Debug)]
#[command(name = "northgate-harvest")]
#[command(version)]
#[command(about = "An incremental planning-application harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the search that would be run without any network access
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // .env is read before anything looks at the environment
    dotenvy::dotenv().ok();

    setup_logging(cli.verbose, cli.quiet);

    let loaded = if cli.stats {
        load_stats_config(cli.config.as_deref())
    } else {
        load_config(cli.config.as_deref())
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", HarvestError::from(e));
            return ExitCode::FAILURE;
        }
    };

    let result = if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_harvest(&config).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Sets up the logging/tracing subscriber
///
/// CLI flags win over `MORPH_LOG_LEVEL`, which accepts either the numeric
/// levels 0 (debug) to 4 (error) or a filter directive.
fn setup_logging(verbose: u8, quiet: bool) {
    let directive = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => std::env::var("MORPH_LOG_LEVEL")
                .ok()
                .and_then(|level| level_directive(&level))
                .unwrap_or_else(|| DEFAULT_FILTER.to_string()),
            1 => "northgate_harvest=debug,info".to_string(),
            _ => "northgate_harvest=trace,debug".to_string(),
        }
    };

    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();

    tracing::info!("Log level: {}", directive);
}

/// Maps a `MORPH_LOG_LEVEL` value to a filter directive
fn level_directive(level: &str) -> Option<String> {
    let level = level.trim();
    if level.is_empty() {
        return None;
    }

    let directive = match level {
        "0" => "northgate_harvest=debug,info",
        "1" => "northgate_harvest=info,warn",
        "2" => "warn",
        "3" | "4" => "error",
        other => other,
    };
    Some(directive.to_string())
}

/// Logs the effective settings the way every run starts
fn log_settings(config: &Config) {
    tracing::info!("Crawl delay: {}s", config.crawler.delay_seconds);
    tracing::info!(
        "User agent: {}",
        config.crawler.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    );

    if config.search.days.is_some() && config.search.months.is_some() {
        tracing::warn!("Both a day window and a month window are set; using the day window");
    }
    match config.search.window() {
        Some(SearchWindow::Days(days)) => tracing::info!("Searching the last {} days", days),
        Some(SearchWindow::Months(months)) => {
            tracing::info!("Searching the last {} months", months)
        }
        None => {}
    }

    tracing::info!("Form variables: {:?}", search_form_fields(&config.search));
}

/// Handles the --dry-run mode: validates config and shows the search
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let urls = config.portal.urls()?;

    println!("=== Northgate Harvest Dry Run ===\n");

    println!("Portal:");
    println!("  Search form: {}", urls.search);
    println!("  Generic pages: {}", urls.generic);
    println!("  Page size: {}", config.portal.page_size);

    println!("\nCouncil:");
    println!("  Name: {}", config.council.name);
    println!("  Slug: {}", config.council.slug);
    println!("  GSS: {}", config.council.gss);

    println!("\nCrawler:");
    println!("  Delay: {}s", config.crawler.delay_seconds);
    println!(
        "  User agent: {}",
        config.crawler.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    );
    println!("  Timeout: {}s", config.crawler.timeout_seconds);

    println!("\nSearch form variables:");
    for (name, value) in search_form_fields(&config.search) {
        println!("  {} = {:?}", name, value);
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let store = open_store(Path::new(&config.output.database_path))
        .with_context(|| format!("opening {}", config.output.database_path))?;
    let stats = load_statistics(&store, chrono::Local::now().date_naive())?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: &Config) -> anyhow::Result<()> {
    log_settings(config);

    match run_harvest(config).await {
        Ok(summary) => {
            tracing::info!("Harvest completed successfully");
            print_run_summary(&summary);
            Ok(())
        }
        Err(e) => {
            if e.is_setup_failure() {
                tracing::error!("Harvest could not start");
            }
            Err(e.into())
        }
    }
}
