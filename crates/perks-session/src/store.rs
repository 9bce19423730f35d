// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed session store with sliding expiry.
//!
//! Reads never fail: a missing, expired, unreadable or unreachable session is
//! a fresh default state. Writes report errors so callers can log them.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use perks_config::model::SessionConfig;
use perks_core::types::format_timestamp;
use perks_core::{Clock, PerksError};
use perks_storage::queries::sessions;
use perks_storage::{Database, SessionRow};
use tracing::{debug, warn};

use crate::state::{SessionField, SessionState};

/// Default idle lifetime of a session, in seconds.
pub const DEFAULT_TTL_SECS: i64 = 2 * 60 * 60;

pub fn default_ttl() -> Duration {
    Duration::seconds(DEFAULT_TTL_SECS)
}

#[derive(Clone)]
pub struct SessionStore {
    db: Database,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(db: Database, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { db, clock, ttl }
    }

    /// Store with the configured TTL, reading time from `clock`.
    pub fn from_config(db: Database, config: &SessionConfig, clock: Arc<dyn Clock>) -> Self {
        let secs = i64::try_from(config.ttl_secs).unwrap_or(i64::MAX);
        let ttl = Duration::try_seconds(secs).unwrap_or_else(default_ttl);
        Self::new(db, clock, ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current state for `user_key`, sliding its expiry to `now + ttl`.
    pub async fn get(&self, user_key: &str) -> SessionState {
        let row = match sessions::get_session(&self.db, user_key).await {
            Ok(Some(row)) => row,
            Ok(None) => return SessionState::default(),
            Err(e) => {
                warn!(user_key, error = %e, "session read failed, starting fresh");
                return SessionState::default();
            }
        };

        let now = self.clock.now();
        let Some(expires_at) = parse_timestamp(&row.expires_at) else {
            warn!(user_key, expires_at = %row.expires_at, "unreadable session expiry, discarding");
            self.discard(user_key).await;
            return SessionState::default();
        };
        if now >= expires_at {
            debug!(user_key, "session expired");
            self.discard(user_key).await;
            return SessionState::default();
        }

        let mut state: SessionState = match serde_json::from_str(&row.state) {
            Ok(state) => state,
            Err(e) => {
                warn!(user_key, error = %e, "corrupt session state, discarding");
                self.discard(user_key).await;
                return SessionState::default();
            }
        };

        let slid = now + self.ttl;
        if let Err(e) = sessions::touch_session(
            &self.db,
            user_key,
            &format_timestamp(slid),
            &format_timestamp(now),
        )
        .await
        {
            warn!(user_key, error = %e, "failed to extend session expiry");
        }
        state.last_activity = Some(now);
        state.expires_at = Some(slid);
        state
    }

    /// Store `state`, or delete the row if the state is idle.
    pub async fn set(&self, user_key: &str, state: &SessionState) -> Result<(), PerksError> {
        if state.is_idle() {
            return sessions::delete_session(&self.db, user_key).await;
        }
        let now = self.clock.now();
        let mut stored = state.clone();
        stored.last_activity = Some(now);
        stored.expires_at = Some(now + self.ttl);
        let json = serde_json::to_string(&stored)
            .map_err(|e| PerksError::Internal(format!("session serialization failed: {e}")))?;
        sessions::upsert_session(
            &self.db,
            &SessionRow {
                user_key: user_key.to_string(),
                state: json,
                expires_at: format_timestamp(now + self.ttl),
                updated_at: format_timestamp(now),
            },
        )
        .await
    }

    /// Read, modify and write back. Not atomic across processes.
    pub async fn update<F>(&self, user_key: &str, apply: F) -> Result<SessionState, PerksError>
    where
        F: FnOnce(&mut SessionState),
    {
        let mut state = self.get(user_key).await;
        apply(&mut state);
        self.set(user_key, &state).await?;
        Ok(state)
    }

    pub async fn clear_field(
        &self,
        user_key: &str,
        field: SessionField,
    ) -> Result<SessionState, PerksError> {
        self.update(user_key, |state| state.clear_field(field)).await
    }

    /// Drop the session entirely.
    pub async fn clear(&self, user_key: &str) -> Result<(), PerksError> {
        sessions::delete_session(&self.db, user_key).await
    }

    /// Whether a live session exists. Does not extend it.
    pub async fn exists(&self, user_key: &str) -> bool {
        match sessions::get_session(&self.db, user_key).await {
            Ok(Some(row)) => {
                parse_timestamp(&row.expires_at).is_some_and(|at| self.clock.now() < at)
            }
            Ok(None) => false,
            Err(e) => {
                warn!(user_key, error = %e, "session lookup failed");
                false
            }
        }
    }

    /// Delete every expired session. Returns how many were removed.
    pub async fn cleanup_expired(&self) -> Result<usize, PerksError> {
        sessions::delete_expired(&self.db, &format_timestamp(self.clock.now())).await
    }

    async fn discard(&self, user_key: &str) {
        if let Err(e) = sessions::delete_session(&self.db, user_key).await {
            warn!(user_key, error = %e, "failed to delete stale session");
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|at| at.with_timezone(&Utc))
}
