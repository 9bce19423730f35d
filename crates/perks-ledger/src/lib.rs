// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Point ledger for the Perks loyalty bot.
//!
//! Every balance change is an immutable, attributable transaction row written
//! in the same SQLite transaction as the relative update to the client's
//! balance.

pub mod ledger;
pub mod operator;

pub use ledger::{PointLedger, Reconciliation};
pub use operator::SystemOperatorPolicy;
