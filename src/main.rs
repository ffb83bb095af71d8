//! Mongo-Crawl-Store main entry point
//!
//! Command-line access to the crawler state kept in MongoDB, for checking a
//! deployment or inspecting individual records.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use mongo_crawl_store::config::{load_config, ResolvedConfig};
use mongo_crawl_store::storage::{MongoStorage, Storage, StorageError};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Mongo-Crawl-Store: crawler cookies and visited requests in MongoDB
#[derive(Parser, Debug)]
#[command(name = "mongo-crawl-store")]
#[command(version)]
#[command(about = "Inspect and update crawler state stored in MongoDB", long_about = None)]
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

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect and report whether the store is reachable
    Ping,

    /// Print the cookies stored for a host
    Cookies {
        /// Host key, e.g. "example.com" or "localhost:8080"
        host: String,
    },

    /// Store cookies for a host, replacing any previous value
    SetCookies {
        host: String,
        cookies: String,
    },

    /// Print whether a request ID has been marked visited
    IsVisited {
        request_id: u64,
    },

    /// Mark a request ID as visited
    MarkVisited {
        request_id: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = load_config(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    let storage = MongoStorage::new(config.mongo);
    storage
        .init()
        .await
        .map_err(|e| describe(storage.settings(), e))
        .with_context(|| format!("failed to connect to {}", storage.settings().redacted_uri()))?;

    run(&storage, cli.command).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("mongo_crawl_store=info,warn"),
            1 => EnvFilter::new("mongo_crawl_store=debug,info"),
            2 => EnvFilter::new("mongo_crawl_store=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(storage: &MongoStorage, command: Command) -> anyhow::Result<()> {
    let settings = storage.settings();

    match command {
        Command::Ping => {
            println!(
                "✓ Connected to {} (database '{}')",
                settings.redacted_uri(),
                settings.database
            );
        }
        Command::Cookies { host } => {
            let cookies = storage.cookies(&host).await;
            check_slot(storage)?;
            println!("{}", cookies);
        }
        Command::SetCookies { host, cookies } => {
            storage.set_cookies(&host, &cookies).await;
            check_slot(storage)?;
            tracing::info!("Stored cookies for {}", host);
        }
        Command::IsVisited { request_id } => {
            let visited = storage
                .is_visited(request_id)
                .await
                .map_err(|e| describe(settings, e))?;
            println!("{}", visited);
        }
        Command::MarkVisited { request_id } => {
            storage
                .mark_visited(request_id)
                .await
                .map_err(|e| describe(settings, e))?;
            tracing::info!("Marked request {} as visited", request_id);
        }
    }

    Ok(())
}

/// Turns an error captured by a cookie operation into a failure
fn check_slot(storage: &MongoStorage) -> anyhow::Result<()> {
    if let Some(e) = storage.take_last_error() {
        return Err(describe(storage.settings(), e).context("cookie operation failed"));
    }
    Ok(())
}

/// Adds a hint to timeouts, which usually mean the budget is too small
fn describe(settings: &ResolvedConfig, error: StorageError) -> anyhow::Error {
    if error.is_timeout() {
        anyhow!(
            "{} (MongoDB at {} did not answer in time; raise the *-timeout-ms settings if it is slow)",
            error,
            settings.redacted_uri()
        )
    } else {
        anyhow::Error::new(error)
    }
}
