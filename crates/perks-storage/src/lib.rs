// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Perks loyalty bot.
//!
//! All access goes through one [`Database`] handle wrapping a tokio-rusqlite
//! connection. Query modules expose typed async functions; the point ledger
//! uses the synchronous `*_in` helpers to compose its own transactions.

pub mod database;
pub mod directory;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::{map_call_err, map_tr_err, sql_err, Database};
pub use directory::SqliteDirectory;
pub use models::SessionRow;
