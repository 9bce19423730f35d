// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the bot core and its persistence backends.
//!
//! All traits use `#[async_trait]` for dynamic dispatch compatibility.

pub mod directory;
pub mod settings;

pub use directory::{ClientDirectory, StaffDirectory};
pub use settings::SettingsStore;
