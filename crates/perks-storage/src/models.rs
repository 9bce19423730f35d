// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping between SQLite rows and domain types.
//!
//! The canonical domain types live in `perks-core::types`. This module holds
//! the column lists and `FromRow`-style mappers shared by the query modules,
//! plus storage-only row types.

use std::str::FromStr;

use perks_core::types::{Client, Role, StaffUser, Transaction, TransactionKind};
use rusqlite::types::Type;
use rusqlite::Row;

/// Column list matching [`client_from_row`].
pub const CLIENT_COLUMNS: &str = "id, external_id, card_number, name, phone, birth_date, notes, \
     balance, visit_count, last_visit, is_active, created_at, updated_at";

/// Column list matching [`staff_from_row`].
pub const STAFF_COLUMNS: &str = "id, external_id, name, role, is_active, created_at, updated_at";

/// Column list matching [`transaction_from_row`].
pub const TRANSACTION_COLUMNS: &str =
    "id, client_id, operator_id, kind, points, amount, description, created_at";

/// A persisted conversation session, with its state still serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRow {
    pub user_key: String,
    /// JSON-encoded session state.
    pub state: String,
    pub expires_at: String,
    pub updated_at: String,
}

pub fn client_from_row(row: &Row<'_>) -> rusqlite::Result<Client> {
    Ok(Client {
        id: row.get(0)?,
        external_id: row.get(1)?,
        card_number: row.get(2)?,
        name: row.get(3)?,
        phone: row.get(4)?,
        birth_date: row.get(5)?,
        notes: row.get(6)?,
        balance: row.get(7)?,
        visit_count: row.get(8)?,
        last_visit: row.get(9)?,
        is_active: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

pub fn staff_from_row(row: &Row<'_>) -> rusqlite::Result<StaffUser> {
    Ok(StaffUser {
        id: row.get(0)?,
        external_id: row.get(1)?,
        name: row.get(2)?,
        role: parse_column::<Role>(row, 3)?,
        is_active: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

pub fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        client_id: row.get(1)?,
        operator_id: row.get(2)?,
        kind: parse_column::<TransactionKind>(row, 3)?,
        points: row.get(4)?,
        amount: row.get(5)?,
        description: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub fn session_from_row(row: &Row<'_>) -> rusqlite::Result<SessionRow> {
    Ok(SessionRow {
        user_key: row.get(0)?,
        state: row.get(1)?,
        expires_at: row.get(2)?,
        updated_at: row.get(3)?,
    })
}

/// Read a TEXT column and parse it with `FromStr` (strum enums).
fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
