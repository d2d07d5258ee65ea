//! expensetrail - command-line front end for the offline-first expense store.
//!
//! Every command works offline: reads fall back to the local cache, and new
//! expenses are queued and replayed on the next run that can reach the
//! server.

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use expensetrail_core::dashboard::Period;
use expensetrail_core::storage::{LogObserver, PersistenceObserver};
use expensetrail_core::validation::{ExpenseForm, Receipt};
use expensetrail_core::{
    ApiClient, CachedResourceStore, Clock, Config, ConnectivityFlag, FileStore, KeyValueStore,
    OutboxQueue, ResourceCache, SystemClock,
};

#[derive(Parser)]
#[command(name = "expensetrail", version, about = "Track expenses, online or not")]
struct Cli {
    /// Treat the network as unreachable
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List expenses, newest first
    List {
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Summary and first page for a period
    Dashboard {
        /// "Last 7 Days", "This Month", "This Year" or "All Time"
        #[arg(long)]
        period: Option<String>,
    },
    /// List expense categories
    Categories,
    /// Show the exchange rates table
    Rates,
    /// Record a new expense
    Add {
        #[arg(long)]
        category: String,
        #[arg(long)]
        amount: f64,
        #[arg(long, default_value = "USD")]
        currency: String,
        /// YYYY-MM-DD, defaults to today
        #[arg(long)]
        date: Option<String>,
        /// Receipt image as a data URL
        #[arg(long)]
        receipt: Option<String>,
    },
    /// Replay queued writes now
    Sync,
    /// Show or clear the queue of pending writes
    Outbox {
        #[arg(long)]
        clear: bool,
    },
    /// Show the saved configuration, updating any field given
    Config {
        #[arg(long)]
        api_url: Option<String>,
        #[arg(long)]
        rates_url: Option<String>,
        #[arg(long)]
        page_size: Option<usize>,
        #[arg(long)]
        log_to_file: Option<bool>,
    },
}

/// Initialize the tracing subscriber for logging.
/// Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug).
fn init_tracing(config: &Config) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr_layer = fmt::layer().with_writer(io::stderr);

    if config.log_to_file {
        let log_dir = config.data_dir()?.join("logs");
        let appender = tracing_appender::rolling::daily(log_dir, "expensetrail.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .with(fmt::layer().with_ansi(false).with_writer(writer))
            .init();
        Ok(Some(guard))
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .init();
        Ok(None)
    }
}

/// Construct the stores once and wire them together.
fn build_store(config: &Config, online: bool) -> Result<Arc<CachedResourceStore>> {
    let data_dir = config.data_dir()?;
    let kv: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(data_dir)?);
    let observer: Arc<dyn PersistenceObserver> = Arc::new(LogObserver);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let http = Arc::new(
        ApiClient::new(config.request_timeout()).context("Failed to build HTTP client")?,
    );

    let outbox = Arc::new(OutboxQueue::new(kv.clone(), observer.clone(), clock.clone()));
    Ok(Arc::new(CachedResourceStore::new(
        ResourceCache::new(kv, observer),
        outbox,
        http,
        Arc::new(ConnectivityFlag::new(online)),
        clock,
        config.endpoints(),
    )))
}

/// Apply the given fields to the saved configuration and write it back.
/// Environment overrides are not persisted.
fn update_config(
    mut config: Config,
    api_url: Option<String>,
    rates_url: Option<String>,
    page_size: Option<usize>,
    log_to_file: Option<bool>,
) -> Result<()> {
    let changed = api_url.is_some()
        || rates_url.is_some()
        || page_size.is_some()
        || log_to_file.is_some();
    if let Some(url) = api_url {
        config.api_base_url = url;
    }
    if let Some(url) = rates_url {
        config.rates_url = url;
    }
    if let Some(size) = page_size {
        config.page_size = size;
    }
    if let Some(enabled) = log_to_file {
        config.log_to_file = enabled;
    }
    if changed {
        config.save().context("Failed to save config")?;
    }
    print_json(&config)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let saved_config = Config::load()?;
    let mut config = saved_config.clone();
    config.apply_env();
    let _log_guard = init_tracing(&config)?;
    info!(api = %config.api_base_url, offline = cli.offline, "expensetrail starting");

    let store = build_store(&config, !cli.offline)?;

    // Replay anything left over from earlier offline runs
    if store.is_online() && !matches!(cli.command, Command::Sync | Command::Config { .. }) {
        let report = store.sync_outbox().await;
        if report.halted_at.is_some() {
            warn!(remaining = report.remaining, "Some queued writes are still pending");
        }
    }

    match cli.command {
        Command::List { page, limit } => {
            let limit = limit.unwrap_or(config.page_size);
            print_json(&store.fetch_expenses(page, limit).await)?;
        }
        Command::Dashboard { period } => {
            let period = match period {
                Some(label) => {
                    let period: Period = label.parse().map_err(anyhow::Error::msg)?;
                    store.select_period(period);
                    period
                }
                None => store.selected_period(),
            };
            let view = store.dashboard(period, config.page_size).await;
            print_json(&serde_json::json!({
                "period": view.period.label(),
                "summary": view.summary,
                "expenses": view.feed.displayed(),
                "hasMore": view.feed.has_more(),
            }))?;
        }
        Command::Categories => {
            print_json(&store.fetch_categories().await)?;
        }
        Command::Rates => match store.fetch_rates().await {
            Some(table) => print_json(&table)?,
            None => println!("No exchange rates available"),
        },
        Command::Add {
            category,
            amount,
            currency,
            date,
            receipt,
        } => {
            let receipt = match receipt {
                Some(url) => Some(
                    Receipt::from_data_url(&url)
                        .ok_or_else(|| anyhow::anyhow!("Receipt must be a data URL"))?,
                ),
                None => None,
            };
            let form = ExpenseForm {
                category: Some(category),
                amount: Some(amount),
                currency: Some(currency),
                date: Some(
                    date.unwrap_or_else(|| SystemClock.today().format("%Y-%m-%d").to_string()),
                ),
                receipt,
            };

            let prepared = store.prepare_expense(&form).await?;
            if let Some(notice) = &prepared.notice {
                eprintln!("{}", notice);
            }
            if let Some(preview) = &prepared.preview {
                eprintln!(
                    "{:.2} {} = {:.2} USD (rate {})",
                    prepared.draft.amount,
                    prepared.draft.currency.as_deref().unwrap_or_default(),
                    preview.amount_usd,
                    preview.rate
                );
            }

            let saved = store.add_expense(prepared.draft).await;
            if saved.is_local() {
                eprintln!("Saved offline, will sync when the server is reachable");
            }
            print_json(&saved)?;
        }
        Command::Sync => {
            print_json(&store.sync_outbox().await)?;
        }
        Command::Outbox { clear } => {
            if clear {
                store.outbox().clear();
            }
            print_json(&store.outbox().list())?;
        }
        Command::Config {
            api_url,
            rates_url,
            page_size,
            log_to_file,
        } => {
            update_config(saved_config, api_url, rates_url, page_size, log_to_file)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add_defaults() {
        let cli = Cli::try_parse_from([
            "expensetrail",
            "--offline",
            "add",
            "--category",
            "gas",
            "--amount",
            "50",
        ])
        .unwrap();
        assert!(cli.offline);
        match cli.command {
            Command::Add {
                currency, date, ..
            } => {
                assert_eq!(currency, "USD");
                assert!(date.is_none());
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn test_parse_config_updates() {
        let cli = Cli::try_parse_from([
            "expensetrail",
            "config",
            "--api-url",
            "http://example.test",
            "--log-to-file",
            "true",
        ])
        .unwrap();
        match cli.command {
            Command::Config {
                api_url,
                rates_url,
                log_to_file,
                ..
            } => {
                assert_eq!(api_url.as_deref(), Some("http://example.test"));
                assert!(rates_url.is_none());
                assert_eq!(log_to_file, Some(true));
            }
            _ => panic!("expected config"),
        }
    }
}
