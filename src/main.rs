//! tld-crawler main entry point
//!
//! This is the command-line interface for the domain-partitioned crawler.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tld_crawler::config::{load_config_with_hash, Config};
use tld_crawler::crawler::Coordinator;
use tld_crawler::output::{load_statistics, print_statistics, print_tree_statistics};
use tracing_subscriber::EnvFilter;

/// tld-crawler: a polite, domain-partitioned web crawler
///
/// Crawls outward from a seed set while honoring robots.txt and per-domain
/// rate limits, recording one file per distinct page under
/// `domains/<tld>/<root-domain>/`.
#[derive(Parser, Debug)]
#[command(name = "tld-crawler")]
#[command(version)]
#[command(about = "A polite, domain-partitioned web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config, TLD table and seeds and show the planned record paths
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Summarize an existing domains/ tree and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = run(cli).await;
    if let Err(e) = &result {
        tracing::error!("{:#}", e);
    }
    tracing::info!("done");

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.stats {
        handle_stats(&config)
    } else if cli.dry_run {
        handle_dry_run(config)
    } else {
        handle_crawl(config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tld_crawler=info,warn"),
            1 => EnvFilter::new("tld_crawler=debug,info"),
            2 => EnvFilter::new("tld_crawler=trace,debug"),
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

/// Handles the --dry-run mode: validates inputs and shows the planned paths
fn handle_dry_run(config: Config) -> anyhow::Result<()> {
    println!("=== tld-crawler Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.max_workers);
    println!("  Per-domain concurrency: {}", config.crawler.max_domain_concurrency);
    println!("  Politeness delay: {}ms", config.crawler.politeness_delay_ms);
    println!(
        "  Retries: {} ({}ms apart)",
        config.crawler.max_retries, config.crawler.retry_delay_ms
    );
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Max body size: {} bytes", config.crawler.max_body_bytes);
    println!("  Follow relative links: {}", config.crawler.follow_relative_links);
    println!("  Respect Crawl-delay: {}", config.crawler.respect_crawl_delay);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Domains directory: {}", config.output.domains_dir);
    println!("  TLD table: {}", config.output.tld_table);
    println!("  Persist body: {}", config.output.persist_body);

    println!("\nIdentity:");
    println!("  Keep query: {}", config.identity.keep_query);
    println!("  Keep port: {}", config.identity.keep_port);

    let coordinator = Coordinator::new(config).context("Failed to prepare crawl")?;
    let planned = coordinator.planned_paths();

    println!("\nSeeds ({}):", planned.len());
    for (url, path) in &planned {
        println!("  - {}", url);
        println!("    -> {}", path.display());
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling with {} seed URLs", planned.len());

    Ok(())
}

/// Handles the --stats mode: summarizes the domains/ tree
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let root = Path::new(&config.output.domains_dir);
    println!("Domains directory: {}\n", root.display());

    let stats = load_statistics(root)
        .with_context(|| format!("Failed to read {}", root.display()))?;
    print_tree_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    let coordinator = Coordinator::new(config).context("Failed to prepare crawl")?;
    tracing::info!("Seed URLs: {}", coordinator.seeds().len());

    let stop = coordinator.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping crawl");
            stop.stop();
        }
    });

    let stats = coordinator.run().await.context("Crawl failed")?;
    println!();
    print_statistics(&stats);

    Ok(())
}
