// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation session rows.
//!
//! The state column is opaque JSON here; `perks-session` owns its shape.

use perks_core::PerksError;
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};
use crate::models::{session_from_row, SessionRow};

/// Get a session row regardless of expiry.
pub async fn get_session(db: &Database, user_key: &str) -> Result<Option<SessionRow>, PerksError> {
    let user_key = user_key.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT user_key, state, expires_at, updated_at FROM sessions WHERE user_key = ?1",
                params![user_key],
                session_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert or replace a session row.
pub async fn upsert_session(db: &Database, row: &SessionRow) -> Result<(), PerksError> {
    let row = row.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO sessions (user_key, state, expires_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_key) DO UPDATE SET
                     state = excluded.state,
                     expires_at = excluded.expires_at,
                     updated_at = excluded.updated_at",
                params![row.user_key, row.state, row.expires_at, row.updated_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Move a session's expiry without rewriting its state.
pub async fn touch_session(
    db: &Database,
    user_key: &str,
    expires_at: &str,
    updated_at: &str,
) -> Result<(), PerksError> {
    let user_key = user_key.to_string();
    let expires_at = expires_at.to_string();
    let updated_at = updated_at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE sessions SET expires_at = ?1, updated_at = ?2 WHERE user_key = ?3",
                params![expires_at, updated_at, user_key],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn delete_session(db: &Database, user_key: &str) -> Result<(), PerksError> {
    let user_key = user_key.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM sessions WHERE user_key = ?1", params![user_key])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Delete every session whose expiry is strictly before `now`.
///
/// Returns the number of rows removed.
pub async fn delete_expired(db: &Database, now: &str) -> Result<usize, PerksError> {
    let now = now.to_string();
    db.connection()
        .call(move |conn| conn.execute("DELETE FROM sessions WHERE expires_at < ?1", params![now]))
        .await
        .map_err(map_tr_err)
}
