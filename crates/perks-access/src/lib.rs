// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Access resolution for the Perks loyalty bot.
//!
//! Maps an external contact id to a staff account or client, and answers
//! every role question through one ordering ([`role_level`]).

pub mod permission;
pub mod resolver;
pub mod roles;

pub use permission::{authorize, authorize_manage, authorize_role_change, Permission};
pub use resolver::{AccessResolver, Identity};
pub use roles::{can_manage, has_role, role_level};
