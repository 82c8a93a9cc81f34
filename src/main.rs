//! CIAA crawler main entry point
//!
//! This is the command-line interface for the CIAA historical case crawler.

use anyhow::Context;
use ciaa_crawler::config::{effective_config_hash, load_config_with_hash, validate, Config};
use ciaa_crawler::crawler::{CancelToken, Coordinator};
use ciaa_crawler::output::{
    analyze, dedup_records, load_statistics, preflight, print_analysis, print_run_summary,
    print_statistics, read_records, write_all, write_markdown_summary, JsonFileSink, OutputSink,
    RunSummary, SqliteSink, DEFAULT_TOP_N,
};
use ciaa_crawler::storage::{import_records, SqliteStorage};
use ciaa_crawler::ConfigError;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Hash recorded for runs that use the built-in defaults
const DEFAULT_CONFIG_HASH: &str = "default";

/// CIAA crawler: a polite historical crawler for CIAA case listings
///
/// Walks every category and fiscal year of the CIAA press-release listings,
/// extracts case records and writes them to JSON and, optionally, SQLite.
#[derive(Parser, Debug)]
#[command(name = "ciaa-crawler")]
#[command(version)]
#[command(about = "A polite historical crawler for CIAA case listings", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults if omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Category key to crawl (charge, sting, appeal, others); repeatable
    #[arg(long = "category", value_name = "KEY")]
    categories: Vec<String>,

    /// Page ceiling per category and fiscal year
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Crawl the current listing only, without fiscal-year filters
    #[arg(long)]
    no_fiscal_years: bool,

    /// JSON output path
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// SQLite database path
    #[arg(long, value_name = "PATH")]
    database: Option<PathBuf>,

    /// Validate config and show what would be crawled without fetching
    #[arg(long, conflicts_with_all = ["stats", "import", "analyze"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "import", "analyze"])]
    stats: bool,

    /// Import a JSON record file into the database and exit
    #[arg(long, value_name = "JSON", conflicts_with_all = ["dry_run", "stats", "analyze"])]
    import: Option<PathBuf>,

    /// Analyze a JSON record file and exit
    #[arg(long, value_name = "JSON", conflicts_with_all = ["dry_run", "stats", "import"])]
    analyze: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load, override and validate configuration
    let (config, config_hash) = match load_effective_config(&cli) {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    let result = if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else if let Some(path) = &cli.import {
        handle_import(&config, &config_hash, path)
    } else if let Some(path) = &cli.analyze {
        handle_analyze(path)
    } else {
        handle_crawl(config, &config_hash).await
    };

    if let Err(e) = &result {
        tracing::error!("{:#}", e);
    }
    result
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ciaa_crawler=info,warn"),
            1 => EnvFilter::new("ciaa_crawler=debug,info"),
            2 => EnvFilter::new("ciaa_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file (or defaults) and applies command-line overrides
fn load_effective_config(cli: &Cli) -> Result<(Config, String), ConfigError> {
    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, hash)
        }
        None => {
            tracing::debug!("No configuration file given, using defaults");
            (Config::default(), DEFAULT_CONFIG_HASH.to_string())
        }
    };

    // Traversal overrides change which records a run produces
    let mut traversal_overridden = false;
    if !cli.categories.is_empty() {
        config.crawl.categories = cli.categories.clone();
        traversal_overridden = true;
    }
    if let Some(max_pages) = cli.max_pages {
        config.crawl.max_pages = max_pages;
        traversal_overridden = true;
    }
    if cli.no_fiscal_years && config.crawl.use_fiscal_years {
        config.crawl.use_fiscal_years = false;
        traversal_overridden = true;
    }
    if let Some(output) = &cli.output {
        config.output.json_path = output.display().to_string();
    }
    if let Some(database) = &cli.database {
        config.output.database_path = Some(database.display().to_string());
    }

    // Overrides can break what the file validated
    validate(&config)?;

    let config_hash = if traversal_overridden {
        let hash = effective_config_hash(&config)?;
        tracing::info!("Command-line overrides applied (effective hash: {})", hash);
        hash
    } else {
        config_hash
    };

    Ok((config, config_hash))
}

fn database_path(config: &Config) -> Result<&Path, ConfigError> {
    config
        .output
        .database_path
        .as_deref()
        .map(Path::new)
        .ok_or_else(|| {
            ConfigError::Validation(
                "no database configured; set output.database-path or pass --database".to_string(),
            )
        })
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let coordinator = Coordinator::new(config.clone())?;
    let plan = coordinator.plan();

    println!("=== CIAA Crawler Dry Run ===\n");

    println!("Source:");
    println!("  Base URL: {}", config.source.base_url);
    println!("  User agent: {}", config.source.user_agent);
    println!("  Timeout: {}ms", config.source.request_timeout_ms);
    println!("  Transport retries: {}", config.source.transport_retries);

    println!("\nPacing:");
    println!("  Max pages: {}", config.crawl.max_pages);
    println!("  Page delay: {}ms", config.crawl.page_delay_ms);
    println!("  Fiscal year delay: {}ms", config.crawl.fiscal_year_delay_ms);
    println!("  Category delay: {}ms", config.crawl.category_delay_ms);

    println!("\nOutput:");
    println!("  JSON: {}", config.output.json_path);
    if let Some(db) = &config.output.database_path {
        println!("  Database: {}", db);
    }
    if let Some(summary) = &config.output.summary_path {
        println!("  Summary: {}", summary);
    }

    println!("\nTraversal plan ({} listings):", plan.len());
    for (category, fiscal_year) in &plan {
        match fiscal_year.gregorian_label() {
            Some(gregorian) => println!(
                "  - {} / {} ({})",
                category.display_name(),
                fiscal_year.label(),
                gregorian
            ),
            None => println!("  - {} / {}", category.display_name(), fiscal_year.label()),
        }
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would fetch at most {} pages",
        plan.len() as u64 * u64::from(config.crawl.max_pages)
    );

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let path = database_path(config)?;
    println!("Database: {}\n", path.display());

    let storage = SqliteStorage::new(path)
        .with_context(|| format!("opening database {}", path.display()))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --import mode: upserts a JSON record file into the database
fn handle_import(
    config: &Config,
    config_hash: &str,
    json_path: &Path,
) -> anyhow::Result<()> {
    let db_path = database_path(config)?;

    tracing::info!("Reading records from {}", json_path.display());
    let records = read_records(json_path)
        .with_context(|| format!("reading records from {}", json_path.display()))?;
    let (records, duplicates) = dedup_records(records);

    let mut storage = SqliteStorage::new(db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;
    let source = json_path.display().to_string();
    let (run_id, counts) = import_records(&mut storage, &records, config_hash, &source)?;

    println!("=== Import Complete (run #{}) ===\n", run_id);
    println!("Records read: {}", records.len() + duplicates);
    println!("Duplicates skipped: {}", duplicates);
    println!("Inserted: {}", counts.inserted);
    println!("Updated: {}", counts.updated);
    println!("Errored: {}", counts.errored);

    Ok(())
}

/// Handles the --analyze mode: prints statistics over a JSON record file
fn handle_analyze(json_path: &Path) -> anyhow::Result<()> {
    let records = read_records(json_path)
        .with_context(|| format!("reading records from {}", json_path.display()))?;
    let analysis = analyze(&records, DEFAULT_TOP_N);
    print_analysis(&analysis);
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str) -> anyhow::Result<()> {
    // Fail on unwritable targets before any request goes out
    let mut sinks: Vec<Box<dyn OutputSink>> =
        vec![Box::new(JsonFileSink::new(&config.output.json_path))];
    if let Some(db) = &config.output.database_path {
        sinks.push(Box::new(SqliteSink::new(db, config_hash, "crawl")));
    }
    preflight(&mut sinks)?;

    let summary_path = config.output.summary_path.clone();
    let cancel = CancelToken::new();
    let mut coordinator = Coordinator::with_cancel_token(config, cancel.clone())?;

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, aborting the in-flight request");
            cancel.cancel();
        }
    });

    let outcome = coordinator.run().await;

    let (records, duplicates) = dedup_records(outcome.records);
    let reports = write_all(&mut sinks, &records).context("writing crawl results")?;
    let summary = RunSummary::from_records(&records, duplicates, DEFAULT_TOP_N);

    print_run_summary(&outcome.report, &summary, &reports);

    if let Some(path) = summary_path {
        write_markdown_summary(&outcome.report, &summary, &reports, Path::new(&path))
            .with_context(|| format!("writing summary to {}", path))?;
        tracing::info!("Summary written to {}", path);
    }

    Ok(())
}
