// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation handling for the Perks loyalty bot.
//!
//! [`Bot`] is the entry point for transports: it resolves the caller,
//! short-circuits quick commands, and otherwise drives the
//! [`OperationStateMachine`] over the caller's persisted session.

pub mod bot;
pub mod input;
pub mod interaction;
pub mod machine;
pub mod quick;

pub use bot::Bot;
pub use interaction::{Action, Input, Reply, Transition};
pub use machine::{Limits, OperationStateMachine, Services};
pub use quick::{QuickCommand, QuickCommandParser, QuickParse, QuickRejection};
