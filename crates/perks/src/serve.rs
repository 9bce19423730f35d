// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `perks serve` command implementation.
//!
//! Opens the database, sweeps expired sessions once at startup, then keeps the
//! sweeper running on its interval until SIGINT or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use perks_config::PerksConfig;
use perks_core::{PerksError, SystemClock};
use perks_session::{SessionStore, SessionSweeper};
use perks_storage::Database;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runs the `perks serve` command.
pub async fn run_serve(config: PerksConfig) -> Result<(), PerksError> {
    init_tracing(&config.bot.log_level);

    info!(name = %config.bot.name, "starting perks serve");

    let db = Database::open_with(&config.storage).await?;
    let store = SessionStore::from_config(db.clone(), &config.session, Arc::new(SystemClock));
    let sweeper = SessionSweeper::new(
        store,
        Duration::from_secs(config.session.sweep_interval_secs),
    );

    // Sessions left over from the previous run.
    let removed = sweeper.sweep_once().await;
    info!(
        removed,
        interval_secs = config.session.sweep_interval_secs,
        ttl_secs = config.session.ttl_secs,
        "session sweeper started"
    );

    let cancel = install_signal_handler();
    let handle = tokio::spawn(sweeper.run(cancel.clone()));

    cancel.cancelled().await;
    if let Err(e) = handle.await {
        warn!(error = %e, "session sweeper task ended abnormally");
    }

    log_heap_usage();
    db.close().await?;
    info!("perks serve shutdown complete");
    Ok(())
}

/// Cancel the returned token on SIGINT or SIGTERM.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => {
                            info!("received SIGINT (Ctrl+C), initiating shutdown");
                        }
                        _ = sigterm.recv() => {
                            info!("received SIGTERM, initiating shutdown");
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "SIGTERM handler unavailable, waiting for Ctrl+C only");
                    let _ = ctrl_c.await;
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

#[cfg(not(target_env = "msvc"))]
fn log_heap_usage() {
    let _ = tikv_jemalloc_ctl::epoch::advance();
    let allocated = tikv_jemalloc_ctl::stats::allocated::read().unwrap_or(0);
    let resident = tikv_jemalloc_ctl::stats::resident::read().unwrap_or(0);
    debug!(
        allocated_kb = allocated / 1024,
        resident_kb = resident / 1024,
        "heap usage at shutdown"
    );
}

#[cfg(target_env = "msvc")]
fn log_heap_usage() {}

/// Initializes the tracing subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

/// Workspace crates log at `log_level`, everything else at warn.
fn default_directives(log_level: &str) -> String {
    ["perks", "perks_access", "perks_bot", "perks_ledger", "perks_session", "perks_storage"]
        .iter()
        .map(|target| format!("{target}={log_level}"))
        .chain(std::iter::once("warn".to_string()))
        .collect::<Vec<_>>()
        .join(",")
}
