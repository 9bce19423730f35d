// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attribution of system-initiated ledger entries.

use perks_config::model::LedgerConfig;
use serde::{Deserialize, Serialize};

/// How to pick the staff account a system-initiated entry is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemOperatorPolicy {
    /// The highest-role active staff member (admin before manager), lowest id
    /// first. Baristas never qualify.
    HighestRole,
    /// A fixed staff account, identified by external id. Must be active.
    ExternalId(String),
}

impl SystemOperatorPolicy {
    pub fn from_config(config: &LedgerConfig) -> Self {
        match &config.system_operator_external_id {
            Some(id) => SystemOperatorPolicy::ExternalId(id.clone()),
            None => SystemOperatorPolicy::HighestRole,
        }
    }
}
