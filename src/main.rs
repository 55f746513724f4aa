//! Reader-Crawler main entry point
//!
//! This is the command-line interface for the reader-proxy crawler. Each
//! invocation loads the saved session, performs one operation, and saves the
//! session back, so a crawl can be driven step by step.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use reader_crawler::config::{
    load_config_or_default, load_config_with_hash, validate_concurrency_limit, Config,
};
use reader_crawler::crawler::{BatchReport, Coordinator, ReaderProxy};
use reader_crawler::output::{print_statistics, write_export, ExportFormat};
use reader_crawler::storage::{
    ResultStore, SessionStore, SettingsStore, SqliteStorage, MAX_CONCURRENT_REQUESTS_KEY,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Reader-Crawler: a bounded, same-domain crawler
///
/// Fetches readable renderings of pages through a reader proxy, collects the
/// links that stay on the seed's domain, and crawls the ones you select.
#[derive(Parser, Debug)]
#[command(name = "reader-crawler")]
#[command(version)]
#[command(about = "A bounded, same-domain crawler on top of a reader proxy", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a seed page and start a new session from its links
    Seed {
        /// The seed URL (http or https)
        url: String,
    },

    /// List the discovered links
    Links,

    /// Change which discovered links will be crawled
    Select {
        /// Select every link
        #[arg(long, conflicts_with = "none")]
        all: bool,

        /// Clear the selection (applied before the other options)
        #[arg(long)]
        none: bool,

        /// Toggle the link at this index
        #[arg(long, value_name = "N")]
        index: Vec<usize>,

        /// Select links whose URL contains this text
        #[arg(long, value_name = "TEXT")]
        matching: Vec<String>,
    },

    /// Crawl the selected links
    Crawl {
        /// Concurrency limit (1-10), stored for later runs
        #[arg(long, value_name = "N")]
        concurrency: Option<usize>,
    },

    /// Retry links whose last fetch failed
    Retry {
        /// Concurrency limit (1-10), stored for later runs
        #[arg(long, value_name = "N")]
        concurrency: Option<usize>,
    },

    /// Show session statistics
    Status,

    /// List stored results, or print one
    Results {
        /// Print the stored content for this URL
        url: Option<String>,
    },

    /// Export stored results to a file
    Export {
        /// json, md, or txt (defaults to the configured format)
        #[arg(short, long)]
        format: Option<ExportFormat>,

        /// Output path without extension (defaults to the configured path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete stored results
    Delete {
        /// Delete the result for this URL
        url: Option<String>,

        /// Delete every stored result
        #[arg(long, conflicts_with = "url")]
        all: bool,
    },

    /// Show or change stored settings
    Settings {
        /// Concurrency limit (1-10)
        #[arg(long, value_name = "N")]
        concurrency: Option<usize>,
    },

    /// Clear the current session
    Reset,

    /// Validate the configuration and show the effective values
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) = match cli.config.as_deref() {
        Some(path) => {
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded from {} (hash: {})", path.display(), hash);
            (config, Some(hash))
        }
        None => (
            load_config_or_default(None).context("Invalid default configuration")?,
            None,
        ),
    };

    let mut storage = SqliteStorage::new(Path::new(&config.output.database_path))
        .with_context(|| format!("Failed to open database {}", config.output.database_path))?;

    match cli.command {
        Command::Seed { url } => handle_seed(&config, &mut storage, &url).await,
        Command::Links => handle_links(&config, &storage),
        Command::Select {
            all,
            none,
            index,
            matching,
        } => handle_select(&config, &mut storage, all, none, &index, &matching),
        Command::Crawl { concurrency } => {
            handle_wave(&config, &mut storage, concurrency, Wave::Crawl).await
        }
        Command::Retry { concurrency } => {
            handle_wave(&config, &mut storage, concurrency, Wave::Retry).await
        }
        Command::Status => handle_status(&config, &storage),
        Command::Results { url } => handle_results(&storage, url.as_deref()),
        Command::Export { format, output } => handle_export(&config, &storage, format, output),
        Command::Delete { url, all } => handle_delete(&mut storage, url.as_deref(), all),
        Command::Settings { concurrency } => handle_settings(&config, &mut storage, concurrency),
        Command::Reset => handle_reset(&mut storage),
        Command::Config => handle_config(&config, cli.config.as_deref(), config_hash.as_deref()),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("reader_crawler=info,warn"),
            1 => EnvFilter::new("reader_crawler=debug,info"),
            2 => EnvFilter::new("reader_crawler=trace,debug"),
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

/// Resolves the concurrency limit: CLI override, then stored setting, then config
///
/// An override is validated and stored for later runs.
fn effective_concurrency(
    config: &Config,
    storage: &mut SqliteStorage,
    cli_override: Option<usize>,
) -> anyhow::Result<usize> {
    if let Some(limit) = cli_override {
        validate_concurrency_limit(limit)?;
        storage.put_setting(MAX_CONCURRENT_REQUESTS_KEY, &limit)?;
        return Ok(limit);
    }

    let stored = storage.get_setting(MAX_CONCURRENT_REQUESTS_KEY, config.crawler.concurrency_limit)?;
    if validate_concurrency_limit(stored).is_err() {
        tracing::warn!(
            "Ignoring stored concurrency limit {}, using {}",
            stored,
            config.crawler.concurrency_limit
        );
        return Ok(config.crawler.concurrency_limit);
    }
    Ok(stored)
}

/// Builds a coordinator around the saved session
fn load_coordinator(
    config: &Config,
    storage: &SqliteStorage,
) -> anyhow::Result<Coordinator<ReaderProxy>> {
    let session = storage
        .load_session()
        .context("Failed to load saved session")?
        .unwrap_or_default();
    Ok(Coordinator::from_config(config, session)?)
}

fn save_session(
    storage: &mut SqliteStorage,
    coordinator: &Coordinator<ReaderProxy>,
) -> anyhow::Result<()> {
    storage
        .save_session(&coordinator.snapshot())
        .context("Failed to save session")
}

/// Handles `seed`: fetches the seed and lists the new frontier
async fn handle_seed(
    config: &Config,
    storage: &mut SqliteStorage,
    url: &str,
) -> anyhow::Result<()> {
    let coordinator = load_coordinator(config, storage)?;

    let result = coordinator.fetch_initial_content(url).await;
    save_session(storage, &coordinator)?;
    let report = result?;

    println!(
        "Fetched {} ({} links on the same domain)\n",
        report.seed_url, report.links_found
    );
    print_links(&coordinator);
    Ok(())
}

fn print_links(coordinator: &Coordinator<ReaderProxy>) {
    let links = coordinator.frontier();
    if links.is_empty() {
        println!("No links discovered. Run `seed <URL>` first.");
        return;
    }

    for (index, link) in links.iter().enumerate() {
        let marker = if link.selected { "x" } else { " " };
        if link.text == link.url {
            println!("{:>4} [{}] {}", index, marker, link.url);
        } else {
            println!("{:>4} [{}] {} ({})", index, marker, link.url, link.text);
        }
    }

    println!(
        "\n{} links, {} selected",
        links.len(),
        coordinator.selected_count()
    );
}

/// Handles `links`
fn handle_links(config: &Config, storage: &SqliteStorage) -> anyhow::Result<()> {
    let coordinator = load_coordinator(config, storage)?;
    print_links(&coordinator);
    Ok(())
}

/// Handles `select`
fn handle_select(
    config: &Config,
    storage: &mut SqliteStorage,
    all: bool,
    none: bool,
    indexes: &[usize],
    patterns: &[String],
) -> anyhow::Result<()> {
    let coordinator = load_coordinator(config, storage)?;
    if coordinator.frontier().is_empty() {
        bail!("No links discovered yet; run `seed <URL>` first");
    }

    if none {
        coordinator.select_all(false);
    }
    if all {
        coordinator.select_all(true);
    }
    for &index in indexes {
        if coordinator.toggle_selection(index).is_none() {
            tracing::warn!("No link at index {}", index);
        }
    }
    for pattern in patterns {
        let matched = coordinator.select_matching(pattern);
        tracing::info!("Selected {} links matching '{}'", matched, pattern);
    }

    save_session(storage, &coordinator)?;
    print_links(&coordinator);
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum Wave {
    Crawl,
    Retry,
}

/// Handles `crawl` and `retry`: runs the wave, then persists completed results
async fn handle_wave(
    config: &Config,
    storage: &mut SqliteStorage,
    concurrency: Option<usize>,
    wave: Wave,
) -> anyhow::Result<()> {
    let limit = effective_concurrency(config, storage, concurrency)?;
    let mut coordinator = load_coordinator(config, storage)?;
    coordinator.set_concurrency_limit(limit);

    let result = match wave {
        Wave::Crawl => coordinator.crawl_selected().await,
        Wave::Retry => coordinator.retry_failed().await,
    };
    save_session(storage, &coordinator)?;
    let report = result?;

    if report.is_noop() {
        println!("No failed URLs to retry.");
        return Ok(());
    }
    print_report(&report, wave);

    let written = coordinator
        .persist_completed(storage)
        .context("Failed to save results; the session still holds them")?;
    println!("Saved {} completed pages to {}", written, config.output.database_path);
    Ok(())
}

fn print_report(report: &BatchReport, wave: Wave) {
    match wave {
        Wave::Crawl => println!(
            "Crawled {} URLs: {} succeeded ({} already done), {} failed",
            report.attempted, report.succeeded, report.skipped, report.failed
        ),
        Wave::Retry => println!(
            "Retried {} URLs: {} recovered, {} still failing",
            report.attempted, report.succeeded, report.failed
        ),
    }
}

/// Handles `status`
fn handle_status(config: &Config, storage: &SqliteStorage) -> anyhow::Result<()> {
    let coordinator = load_coordinator(config, storage)?;

    match coordinator.seed_url() {
        Some(seed) => println!("Seed: {}", seed),
        None => println!("Seed: (none)"),
    }
    println!("Phase: {}", coordinator.phase());
    println!(
        "Links: {} discovered, {} selected\n",
        coordinator.frontier().len(),
        coordinator.selected_count()
    );
    print_statistics(&coordinator.snapshot_stats(), coordinator.progress());
    Ok(())
}

/// Handles `results`
fn handle_results(storage: &SqliteStorage, url: Option<&str>) -> anyhow::Result<()> {
    if let Some(url) = url {
        let Some(page) = storage.get_page(url)? else {
            bail!("No stored result for {}", url);
        };
        println!("{}", page.content);
        return Ok(());
    }

    let pages = storage.get_all_pages()?;
    if pages.is_empty() {
        println!("No stored results.");
        return Ok(());
    }

    for page in &pages {
        println!(
            "{}  {:>8} chars  {}",
            page.stored_at.format("%Y-%m-%d %H:%M:%S"),
            page.content.chars().count(),
            page.url
        );
    }
    println!("\n{} stored pages", pages.len());
    Ok(())
}

/// Handles `export`
fn handle_export(
    config: &Config,
    storage: &SqliteStorage,
    format: Option<ExportFormat>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let format = format.unwrap_or(config.output.download_format);
    let base = output.unwrap_or_else(|| PathBuf::from(&config.output.export_path));

    let pages = storage.get_all_pages()?;
    let path = write_export(&pages, format, &base)?;

    println!("✓ Exported {} pages to {}", pages.len(), path.display());
    Ok(())
}

/// Handles `delete`
fn handle_delete(storage: &mut SqliteStorage, url: Option<&str>, all: bool) -> anyhow::Result<()> {
    if all {
        let deleted = storage.delete_all_pages()?;
        println!("Deleted {} stored pages", deleted);
        return Ok(());
    }

    let Some(url) = url else {
        bail!("Specify a URL to delete, or --all");
    };
    if storage.delete_page(url)? {
        println!("Deleted {}", url);
    } else {
        println!("No stored result for {}", url);
    }
    Ok(())
}

/// Handles `settings`
fn handle_settings(
    config: &Config,
    storage: &mut SqliteStorage,
    concurrency: Option<usize>,
) -> anyhow::Result<()> {
    let limit = effective_concurrency(config, storage, concurrency)?;
    println!("Concurrency limit: {}", limit);
    Ok(())
}

/// Handles `reset`
fn handle_reset(storage: &mut SqliteStorage) -> anyhow::Result<()> {
    storage.clear_session()?;
    tracing::info!("Session reset");
    println!("Session cleared. Stored results are kept.");
    Ok(())
}

/// Handles `config`: validates config and shows the effective values
fn handle_config(config: &Config, path: Option<&Path>, hash: Option<&str>) -> anyhow::Result<()> {
    println!("=== Reader-Crawler Configuration ===\n");

    match (path, hash) {
        (Some(path), Some(hash)) => println!("File: {} ({})", path.display(), hash),
        (Some(path), None) => println!("File: {}", path.display()),
        (None, _) => println!("File: (none, defaults)"),
    }

    println!("\nCrawler:");
    println!("  Concurrency limit: {}", config.crawler.concurrency_limit);
    println!("  Max retries: {}", config.crawler.max_retries);
    println!("  Retry delay: {}ms", config.crawler.retry_delay_ms);

    println!("\nProxy:");
    println!("  Base URL: {}", config.proxy.base_url);
    println!("  Request timeout: {}s", config.proxy.request_timeout_secs);
    println!("  User agent: {}", config.proxy.user_agent);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Download format: {}", config.output.download_format);
    println!("  Export path: {}", config.output.export_path);

    println!("\n✓ Configuration is valid");
    Ok(())
}
