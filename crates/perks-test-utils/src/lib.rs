// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for the Perks workspace.

pub mod harness;

pub use harness::{TestHarness, TestHarnessBuilder};
