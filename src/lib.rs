// src/lib.rs

pub mod cli;
pub mod config;
pub mod detect;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod metadata;
pub mod notify;
pub mod store;
pub mod types;
pub mod watch;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{default_config_path, load_and_validate, ConfigFile};
use crate::engine::{spawn_ticker, PollCycle, Runtime, RuntimeEvent, RuntimeOptions};
use crate::errors::Result;
use crate::metadata::HttpMetadataClient;
use crate::notify::template::unknown_tokens;
use crate::notify::HttpDispatcher;
use crate::store::{FileWatchStore, MemoryWatchStore, WatchStore};
use crate::types::StoreMode;
use crate::watch::WatchEntry;

/// High-level entry point used by `main.rs`.
///
/// Wires together config loading, the watch store, the HTTP adapters, the
/// poll cycle, the scheduler ticker and Ctrl-C handling.
pub async fn run(args: CliArgs) -> anyhow::Result<()> {
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let cfg = load_and_validate(&config_path)?;
    info!(path = %config_path.display(), watches = cfg.watch.len(), "config loaded");

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let store = open_store(&cfg)?;

    if args.list {
        print_entries(&store.list_all().await?);
        return Ok(());
    }

    let cycle = build_cycle(&cfg, store)?;

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    // The first cycle runs right away; with --force it dispatches
    // unconditionally. The ticker then takes over.
    rt_tx
        .send(RuntimeEvent::RunRequested { force: args.force })
        .await?;

    let _ticker = if args.once {
        None
    } else {
        info!(interval = ?cfg.poll_interval(), "scheduling poll cycles");
        Some(spawn_ticker(cfg.poll_interval(), rt_tx.clone(), true))
    };

    let options = RuntimeOptions {
        exit_when_idle: args.once,
    };

    let reports = Runtime::new(cycle, rt_rx, options).run().await?;
    debug!(cycles = reports.len(), "runtime finished");
    Ok(())
}

/// Build the configured store, merging persisted cursors in file mode.
pub fn open_store(cfg: &ConfigFile) -> Result<Arc<dyn WatchStore>> {
    match cfg.config.store {
        StoreMode::Memory => {
            info!("cursors kept in memory; they reset on restart");
            Ok(Arc::new(MemoryWatchStore::new(cfg.entries())))
        }
        StoreMode::File => {
            let store = FileWatchStore::open(&cfg.config.state_path, cfg.entries())?;
            info!(path = %store.path().display(), "using cursor state file");
            Ok(Arc::new(store))
        }
    }
}

/// Build the HTTP adapters and the poll cycle over `store`.
pub fn build_cycle(cfg: &ConfigFile, store: Arc<dyn WatchStore>) -> Result<PollCycle> {
    let client = HttpMetadataClient::new(cfg.metadata.endpoint.clone(), cfg.config.fetch_timeout)?;
    let dispatcher = HttpDispatcher::new(cfg.config.dispatch_timeout)?;
    Ok(PollCycle::new(
        Arc::new(client),
        Arc::new(dispatcher),
        store,
        cfg.poll_settings(),
    ))
}

fn print_dry_run(cfg: &ConfigFile) {
    println!("watchhook dry-run");
    println!("  config.poll_interval = {:?}", cfg.config.poll_interval);
    println!("  config.fetch_timeout = {:?}", cfg.config.fetch_timeout);
    println!("  config.dispatch_timeout = {:?}", cfg.config.dispatch_timeout);
    println!("  config.max_concurrency = {}", cfg.config.max_concurrency);
    println!("  config.store = {:?}", cfg.config.store);
    if cfg.config.store == StoreMode::File {
        println!("  config.state_path = {}", cfg.config.state_path.display());
    }
    println!("  metadata.endpoint = {}", cfg.metadata.endpoint);
    println!();

    println!("watches ({}):", cfg.watch.len());
    for (id, watch) in cfg.watch.iter() {
        println!("  - {id}");
        println!("      repo_id: {}", watch.repo_id);
        println!("      project_id: {}", watch.project_id);
        if watch.webhook_url.trim().is_empty() {
            println!("      webhook_url: (none)");
        } else {
            println!("      webhook_url: {}", watch.webhook_url);
            let unknown = unknown_tokens(&watch.webhook_url);
            if !unknown.is_empty() {
                println!("      unknown placeholders (left as-is): {unknown:?}");
            }
        }
        if !watch.enabled {
            println!("      enabled: false");
        }
    }

    debug!("dry-run complete (no polling)");
}

fn print_entries(entries: &[WatchEntry]) {
    for entry in entries {
        let cursor = entry
            .last_observed_modified
            .map(|ts| ts.to_string())
            .unwrap_or_else(|| "-".to_string());
        let polled = entry
            .last_poll_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        let notified = entry
            .last_notify_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        let status = if entry.enabled { "" } else { " (disabled)" };

        println!("{entry}{status}");
        println!("    webhook: {}", entry.webhook_url_template);
        println!("    last modified: {cursor}");
        println!("    last poll: {polled}");
        println!("    last notify: {notified}");
    }
}
