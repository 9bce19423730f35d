// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic deletion of expired sessions.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::store::SessionStore;

/// Runs [`SessionStore::cleanup_expired`] on a fixed interval.
pub struct SessionSweeper {
    store: SessionStore,
    interval: Duration,
}

impl SessionSweeper {
    pub fn new(store: SessionStore, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// One sweep. Failures are logged and reported as zero removals.
    pub async fn sweep_once(&self) -> usize {
        match self.store.cleanup_expired().await {
            Ok(0) => {
                debug!("session sweep found nothing to remove");
                0
            }
            Ok(removed) => {
                info!(removed, "expired sessions removed");
                removed
            }
            Err(e) => {
                warn!(error = %e, "session sweep failed (non-fatal)");
                0
            }
        }
    }

    /// Sweep until `cancel` fires. The first sweep happens one interval in.
    pub async fn run(self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        // Skip the first immediate tick.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.sweep_once().await;
                }
                _ = cancel.cancelled() => {
                    info!("session sweeper shutting down");
                    break;
                }
            }
        }
    }
}
