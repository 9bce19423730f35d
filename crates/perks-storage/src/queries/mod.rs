// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for CRUD operations on storage entities.

pub mod clients;
pub mod sessions;
pub mod settings;
pub mod staff;
pub mod transactions;
