// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation sessions for the Perks loyalty bot.
//!
//! A session records which conversational step, if any, is waiting for the
//! user's next message. Sessions are persisted in SQLite, slide their expiry
//! on every read, and are swept periodically once idle.

pub mod state;
pub mod store;
pub mod sweeper;

pub use state::{EditTarget, Operation, RegistrationDraft, SessionField, SessionState, WaitingFor};
pub use store::SessionStore;
pub use sweeper::SessionSweeper;
