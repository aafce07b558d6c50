//! Sitesurge main entry point
//!
//! This is the command-line interface for the Sitesurge load tester and page
//! archiver.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sitesurge::config::{
    load_config_with_hash, validate, validate_archive_config, validate_load_config, Config,
};
use sitesurge::crawler::{
    archive, build_http_client, normalize_targets, require_targets, run_load_test, HttpFetcher,
    SitemapFrontier,
};
use sitesurge::output::{print_archive_summary, print_load_summary, write_url_list};
use sitesurge::url::{infer_primary_domain, UriNormalizer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Sitesurge: sitemap-driven load testing and page archiving
///
/// Resolves URLs from a sitemap (local or remote, nested indexes included) or
/// a plain list file, then either hammers them with concurrent requests or
/// saves their HTML, optionally spidering local links.
#[derive(Parser, Debug)]
#[command(name = "sitesurge")]
#[command(version = "1.0.0")]
#[command(about = "Sitemap-driven load tester and page archiver", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Save the sitemap as a list of URLs; speeds up repeat runs
    #[command(alias = "ml")]
    SaveUrls {
        /// Sitemap URL, local sitemap .xml file or URL list file
        #[arg(short, long)]
        path: String,

        /// File that receives one URL per line
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        http: HttpArgs,
    },

    /// Run a load test
    #[command(alias = "r")]
    Load {
        /// Sitemap URL, local sitemap .xml file or URL list file
        #[arg(short, long)]
        path: String,

        /// Number of concurrent workers
        #[arg(short, long)]
        threads: Option<usize>,

        /// Seconds to run; 0 requests every URL exactly once
        #[arg(short, long)]
        seconds: Option<u64>,

        /// Percent chance (0-100) of requesting a deliberately missing page
        #[arg(short = 'e', long = "chance-404")]
        chance_of_404: Option<u8>,

        /// Pause 500ms between requests on each worker
        #[arg(short, long)]
        delay: bool,

        /// Request method, GET or HEAD
        #[arg(short, long)]
        method: Option<String>,

        /// Log every request
        #[arg(long)]
        verbose: bool,

        #[command(flatten)]
        http: HttpArgs,
    },

    /// Save the HTML of pages
    #[command(alias = "ap")]
    Archive(ArchiveArgs),
}

/// Request options shared by every command
#[derive(Args, Debug)]
struct HttpArgs {
    /// User-Agent header sent with every request
    #[arg(long)]
    user_agent: Option<String>,

    /// Extra request header as "Key: Value"; repeatable
    #[arg(long = "header", value_name = "HEADER")]
    headers: Vec<String>,
}

#[derive(Args, Debug)]
struct ArchiveArgs {
    /// Sitemap URL, local sitemap .xml file or URL list file
    #[arg(short, long)]
    path: String,

    /// Output folder for HTML and results.csv
    #[arg(short, long)]
    output: Option<String>,

    /// Number of concurrent workers
    #[arg(short, long)]
    threads: Option<usize>,

    /// Pause 500ms between requests on each worker
    #[arg(short, long)]
    delay: bool,

    /// Log every request
    #[arg(long)]
    verbose: bool,

    /// Follow local links found on archived pages
    #[arg(long)]
    spider: bool,

    /// Primary domain; inferred from the first URL when spidering
    #[arg(long)]
    domain: Option<String>,

    /// Hosts equivalent to the primary domain
    #[arg(long, value_delimiter = ',')]
    domain_alts: Vec<String>,

    /// Path patterns excluded from spidering: exact, "prefix*" or "*contains*"
    #[arg(long, value_delimiter = ',')]
    exclude_urls: Vec<String>,

    /// Scan pages that redirected to another domain
    #[arg(long)]
    cross_domain: bool,

    /// Archive responses regardless of their Content-Type
    #[arg(long)]
    ignore_content_type: bool,

    /// CSS selector limiting the searched content
    #[arg(long)]
    content_search_include: Option<String>,

    /// CSS selector removed from the searched content
    #[arg(long)]
    content_search_exclude: Option<String>,

    /// Terms searched for in each page
    #[arg(long, value_delimiter = ',')]
    content_search_terms: Vec<String>,

    /// Only save HTML when a search term was found
    #[arg(long)]
    only_save_if_term_found: bool,

    #[command(flatten)]
    http: HttpArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let result = match cli.command {
        Command::SaveUrls { path, output, http } => {
            apply_http_args(&mut config, http);
            handle_save_urls(&config, &path, &output, cancel).await
        }
        Command::Load {
            path,
            threads,
            seconds,
            chance_of_404,
            delay,
            method,
            verbose,
            http,
        } => {
            apply_http_args(&mut config, http);
            let load = &mut config.load;
            if let Some(threads) = threads {
                load.threads = threads;
            }
            if let Some(seconds) = seconds {
                load.seconds = seconds;
            }
            if let Some(chance) = chance_of_404 {
                load.chance_of_404 = chance;
            }
            if let Some(method) = method {
                load.method = method;
            }
            load.delay |= delay;
            load.verbose |= verbose;
            handle_load(&config, &path, cancel).await
        }
        Command::Archive(args) => {
            let path = args.path.clone();
            apply_archive_args(&mut config, args);
            handle_archive(&config, &path, cancel).await
        }
    };

    if let Err(e) = &result {
        tracing::error!("{:#}", e);
    }
    result
}

/// Sets up the logging/tracing subscriber
///
/// `RUST_LOG` wins when set.
fn setup_logging(quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sitesurge=info,warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Cancels the job on Ctrl+C; workers return their partial results
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping workers");
            cancel.cancel();
        }
    });
}

fn apply_http_args(config: &mut Config, http: HttpArgs) {
    if http.user_agent.is_some() {
        config.http.user_agent = http.user_agent;
    }
    config.http.headers.extend(http.headers);
}

fn apply_archive_args(config: &mut Config, args: ArchiveArgs) {
    apply_http_args(config, args.http);

    let archive = &mut config.archive;
    if let Some(output) = args.output {
        archive.output = output;
    }
    if let Some(threads) = args.threads {
        archive.threads = threads;
    }
    if args.domain.is_some() {
        archive.domain = args.domain;
    }
    if args.content_search_include.is_some() {
        archive.content_search_include = args.content_search_include;
    }
    if args.content_search_exclude.is_some() {
        archive.content_search_exclude = args.content_search_exclude;
    }
    archive.domain_alts.extend(args.domain_alts);
    archive.exclude_urls.extend(args.exclude_urls);
    archive.content_search_terms.extend(args.content_search_terms);
    archive.delay |= args.delay;
    archive.verbose |= args.verbose;
    archive.spider |= args.spider;
    archive.cross_domain |= args.cross_domain;
    archive.ignore_content_type |= args.ignore_content_type;
    archive.only_save_if_term_found |= args.only_save_if_term_found;
}

/// Handles the save-urls command: resolves the path and writes the list
async fn handle_save_urls(
    config: &Config,
    path: &str,
    output: &Path,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    validate(config)?;

    let frontier = SitemapFrontier::new(build_http_client(&config.http)?, cancel.clone());
    let Some(urls) = require_targets(frontier.resolve(path).await, path, &cancel)? else {
        println!("Cancelled.");
        return Ok(());
    };

    write_url_list(output, &urls)?;
    println!("Saved {} URLs to {}", urls.len(), output.display());

    Ok(())
}

/// Handles the load command
async fn handle_load(config: &Config, path: &str, cancel: CancellationToken) -> anyhow::Result<()> {
    validate(config)?;
    validate_load_config(&config.load)?;

    let fetcher = HttpFetcher::from_config(&config.http)?;
    let frontier = SitemapFrontier::new(fetcher.client().clone(), cancel.clone());
    let Some(targets) = require_targets(frontier.resolve(path).await, path, &cancel)? else {
        println!("Cancelled.");
        return Ok(());
    };

    println!("Running load test. Press Ctrl+C to stop.");
    let metrics = run_load_test(&config.load, targets, Arc::new(fetcher), cancel).await?;
    print_load_summary(&metrics);

    Ok(())
}

/// Handles the archive command
async fn handle_archive(
    config: &Config,
    path: &str,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    validate(config)?;
    validate_archive_config(&config.archive)?;

    let fetcher = HttpFetcher::from_config(&config.http)?;
    let frontier = SitemapFrontier::new(fetcher.client().clone(), cancel.clone());

    let (normalizer, targets) = match &config.archive.domain {
        Some(_) => {
            let normalizer = UriNormalizer::new(
                config.archive.domain.clone(),
                config.archive.domain_alts.clone(),
            );
            let targets = frontier.resolve_normalized(path, &normalizer).await;
            (normalizer, targets)
        }
        None => {
            let raw = frontier.resolve(path).await;

            // Without a primary domain, the first URL decides it.
            let primary_domain = if config.archive.spider {
                let inferred = infer_primary_domain(raw.iter().map(String::as_str));
                if let Some(domain) = &inferred {
                    tracing::info!("Using {} as the primary domain", domain);
                }
                inferred
            } else {
                None
            };

            let normalizer =
                UriNormalizer::new(primary_domain, config.archive.domain_alts.clone());
            let targets = normalize_targets(raw, &normalizer);
            (normalizer, targets)
        }
    };

    let Some(targets) = require_targets(targets, path, &cancel)? else {
        println!("Cancelled.");
        return Ok(());
    };

    println!("Archiving pages. Press Ctrl+C to stop.");
    let metrics = archive(config, normalizer, targets, Arc::new(fetcher), cancel).await?;
    print_archive_summary(&metrics);

    Ok(())
}
