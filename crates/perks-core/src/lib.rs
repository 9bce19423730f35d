// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Perks loyalty bot.
//!
//! This crate provides the domain types, error taxonomy, and directory traits
//! used throughout the Perks workspace. Storage backends implement the traits
//! defined here; the ledger, session, and bot crates consume them.

pub mod clock;
pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ErrorKind, PerksError};
pub use traits::{ClientDirectory, SettingsStore, StaffDirectory};
pub use types::{
    Client, ClientField, ClientFieldValue, NewClient, NewStaff, Role, SettingKey, StaffField,
    StaffUser, Transaction, TransactionKind,
};
