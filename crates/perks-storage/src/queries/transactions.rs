// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Point ledger rows.
//!
//! The table is append-only: there is an insert and there are reads, and
//! triggers reject UPDATE and DELETE.

use perks_core::types::{Transaction, TransactionKind};
use perks_core::PerksError;
use rusqlite::{params, Connection, OptionalExtension};

use crate::database::{map_tr_err, Database};
use crate::models::{transaction_from_row, TRANSACTION_COLUMNS};

/// Insert a ledger row inside the caller's transaction.
pub fn insert_in(conn: &Connection, txn: &Transaction) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO transactions (id, client_id, operator_id, kind, points, amount, description, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            txn.id,
            txn.client_id,
            txn.operator_id,
            txn.kind.to_string(),
            txn.points,
            txn.amount,
            txn.description,
            txn.created_at,
        ],
    )?;
    Ok(())
}

/// Sum of all points recorded for a client.
pub fn sum_for_client_in(conn: &Connection, client_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COALESCE(SUM(points), 0) FROM transactions WHERE client_id = ?1",
        params![client_id],
        |row| row.get(0),
    )
}

/// A client's transactions, newest first.
pub async fn list_for_client(
    db: &Database,
    client_id: i64,
    limit: usize,
) -> Result<Vec<Transaction>, PerksError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TRANSACTION_COLUMNS} FROM transactions
                 WHERE client_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![client_id, limit], transaction_from_row)?;
            let mut txns = Vec::new();
            for row in rows {
                txns.push(row?);
            }
            Ok(txns)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn sum_for_client(db: &Database, client_id: i64) -> Result<i64, PerksError> {
    db.connection()
        .call(move |conn| sum_for_client_in(conn, client_id))
        .await
        .map_err(map_tr_err)
}

/// Number of ledger rows for a client.
pub async fn count_for_client(db: &Database, client_id: i64) -> Result<i64, PerksError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM transactions WHERE client_id = ?1",
                params![client_id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Whether the client has a row of `kind` created at or after `since`.
pub async fn has_kind_since(
    db: &Database,
    client_id: i64,
    kind: TransactionKind,
    since: &str,
) -> Result<bool, PerksError> {
    let since = since.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT 1 FROM transactions
                 WHERE client_id = ?1 AND kind = ?2 AND created_at >= ?3
                 LIMIT 1",
                params![client_id, kind.to_string(), since],
                |_| Ok(()),
            )
            .optional()
            .map(|hit| hit.is_some())
        })
        .await
        .map_err(map_tr_err)
}
