//! loglens - structured log viewer and ingest server
//!
//! `loglens serve` runs the ingest pipeline: a TCP line listener feeding the
//! normalizer and accumulator, with size-triggered and periodic flushes to
//! the data directory.
//!
//! `loglens query` evaluates a query against the last persisted batch and
//! prints the matching records.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Data: $XDG_DATA_HOME/loglens/ (~/.local/share/loglens/)
//! - Config: $XDG_CONFIG_HOME/loglens/config.toml (~/.config/loglens/config.toml)

mod tcp;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use loglens_core::accumulator::Accumulator;
use loglens_core::classify::classify_level;
use loglens_core::normalize::normalize;
use loglens_core::query::{evaluate, FieldFilter, FilterOperator, QuerySpec, SortDirection};
use loglens_core::settings::RuleSettings;
use loglens_core::store::{FsStore, Store};
use loglens_core::transport::Transport;
use loglens_core::types::FieldKey;
use loglens_core::Config;
use std::path::PathBuf;
use std::time::Duration;
use tcp::TcpLineTransport;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "loglens")]
#[command(about = "Structured log viewer and ingest server")]
#[command(version)]
struct Args {
    /// Data directory (default: XDG data dir)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the ingest server
    Serve {
        /// Listen address (default: from config)
        #[arg(short, long)]
        addr: Option<String>,
    },

    /// Query the last persisted batch
    Query {
        /// Full-text search over messages, file:line, and function
        #[arg(short, long, default_value = "")]
        search: String,

        /// Field filter as field:operator:value, repeatable
        /// (e.g. role:equals:admin, messages:contains:error)
        #[arg(short, long)]
        filter: Vec<String>,

        /// Sort field
        #[arg(long, default_value = "time")]
        sort: String,

        /// Sort ascending instead of descending
        #[arg(long)]
        asc: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load().context("failed to load configuration")?;
    let data_dir = args.data_dir.unwrap_or_else(Config::data_dir);

    let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
    match args.command {
        Command::Serve { addr } => {
            let _log_guard = loglens_core::logging::init(&config.logging)
                .context("failed to initialize logging")?;
            let addr = addr.unwrap_or_else(|| config.server.listen_addr.clone());
            runtime.block_on(cmd_serve(&config, data_dir, &addr))
        }
        Command::Query {
            search,
            filter,
            sort,
            asc,
        } => runtime.block_on(cmd_query(data_dir, search, filter, sort, asc)),
    }
}

async fn cmd_serve(config: &Config, data_dir: PathBuf, addr: &str) -> Result<()> {
    let store = FsStore::new(data_dir);

    // Settings load before anything can mutate them, so startup defaults
    // never overwrite saved configuration
    let settings = RuleSettings::load(&store).await;
    tracing::info!(
        level_rule_sets = settings.level_rules.len(),
        highlight_rules = settings.highlight_rules.len(),
        "Settings loaded"
    );

    let mut accumulator =
        Accumulator::with_threshold(store.clone(), config.accumulator.flush_threshold);
    let restored = accumulator
        .hydrate()
        .await
        .context("failed to load persisted records")?;
    if restored > 0 {
        tracing::info!(records = restored, "Restored persisted batch");
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut transport = TcpLineTransport::new();
    transport.register(tx);
    let status = transport
        .start(addr)
        .await
        .context("failed to start ingest listener")?;
    println!("{}", status);

    let mut flush_timer =
        tokio::time::interval(Duration::from_secs(config.accumulator.flush_interval_secs));
    flush_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    flush_timer.tick().await; // first tick completes immediately

    // Flushes run on their own task so appends keep landing while the
    // Store write is outstanding; outcomes come back through this channel
    let (flush_done_tx, mut flush_done_rx) = mpsc::unbounded_channel();

    loop {
        tokio::select! {
            payload = rx.recv() => {
                match payload {
                    Some(payload) => {
                        if accumulator.append(normalize(&payload)) {
                            spawn_flush(&mut accumulator, &store, &flush_done_tx);
                        }
                    }
                    None => break,
                }
            }
            Some(ok) = flush_done_rx.recv() => {
                accumulator.finish_flush(ok);
            }
            _ = flush_timer.tick() => {
                if accumulator.needs_periodic_flush() && !accumulator.flush_in_flight() {
                    spawn_flush(&mut accumulator, &store, &flush_done_tx);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    transport.stop().await.context("failed to stop listener")?;

    // Wait out any outstanding write, then flush whatever arrived during it
    while accumulator.flush_in_flight() {
        match flush_done_rx.recv().await {
            Some(ok) => {
                accumulator.finish_flush(ok);
            }
            None => break,
        }
    }
    if accumulator.needs_periodic_flush() {
        accumulator.flush().await;
    }

    let stats = accumulator.stats();
    println!(
        "Ingested {} records ({} flushes, {} failed)",
        accumulator.len(),
        stats.flushes,
        stats.flush_failures
    );
    Ok(())
}

/// Hand the accumulator's current batch to a background Store write. The
/// outcome arrives on `results` and must be fed to `finish_flush`.
fn spawn_flush(
    accumulator: &mut Accumulator<FsStore>,
    store: &FsStore,
    results: &mpsc::UnboundedSender<bool>,
) {
    let Some(batch) = accumulator.begin_flush() else {
        return;
    };
    let store = store.clone();
    let results = results.clone();
    tokio::spawn(async move {
        let ok = match store.save_batch(&batch).await {
            Ok(()) => {
                tracing::debug!(records = batch.len(), "Flushed record batch");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, records = batch.len(), "Failed to persist record batch");
                false
            }
        };
        let _ = results.send(ok);
    });
}

async fn cmd_query(
    data_dir: PathBuf,
    search: String,
    filters: Vec<String>,
    sort: String,
    asc: bool,
) -> Result<()> {
    let store = FsStore::new(data_dir);
    let settings = RuleSettings::load(&store).await;

    let mut accumulator = Accumulator::new(store);
    accumulator
        .hydrate()
        .await
        .context("failed to load persisted records")?;

    let spec = QuerySpec {
        search_text: search,
        filters: filters
            .iter()
            .map(|raw| parse_filter(raw))
            .collect::<Result<Vec<_>>>()?,
        sort_field: sort
            .parse::<FieldKey>()
            .map_err(|e| anyhow::anyhow!("invalid sort field: {}", e))?,
        sort_direction: if asc {
            SortDirection::Asc
        } else {
            SortDirection::Desc
        },
    };

    let records = evaluate(accumulator.snapshot(), &spec);
    for record in &records {
        let style = classify_level(record.level, &settings.level_rules);
        println!(
            "{} [{}] {} {}:{} {}",
            record.formatted_time(),
            style.name,
            record.role,
            record.file_name(),
            record.line,
            record.joined_messages()
        );
    }
    println!("{} of {} records", records.len(), accumulator.len());
    Ok(())
}

/// Parse a `field:operator:value` filter argument. The value may itself
/// contain colons.
fn parse_filter(raw: &str) -> Result<FieldFilter> {
    let mut parts = raw.splitn(3, ':');
    let (Some(field), Some(operator), Some(value)) = (parts.next(), parts.next(), parts.next())
    else {
        anyhow::bail!("invalid filter {:?}, expected field:operator:value", raw);
    };

    Ok(FieldFilter {
        field: field
            .parse::<FieldKey>()
            .map_err(|e| anyhow::anyhow!("invalid filter field: {}", e))?,
        operator: operator
            .parse::<FilterOperator>()
            .map_err(|e| anyhow::anyhow!("invalid filter operator: {}", e))?,
        value: value.to_string(),
    })
}
