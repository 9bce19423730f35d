// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Perks loyalty bot.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Perks configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PerksConfig {
    /// Bot identity and logging.
    #[serde(default)]
    pub bot: BotConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Conversation session persistence and expiry.
    #[serde(default)]
    pub session: SessionConfig,

    /// Point ledger policy.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Single-message quick point commands.
    #[serde(default)]
    pub quick: QuickCommandConfig,
}

/// Bot identity and behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Display name of the bot.
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Maximum number of clients returned by a card search.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            log_level: default_log_level(),
            search_limit: default_search_limit(),
        }
    }
}

fn default_bot_name() -> String {
    "perks".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_search_limit() -> usize {
    10
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("perks").join("perks.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("perks.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Conversation session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Idle time after which a pending flow is discarded. Every read slides it.
    #[serde(default = "default_session_ttl_secs")]
    pub ttl_secs: u64,

    /// Interval between background sweeps of expired session rows.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_session_ttl_secs() -> u64 {
    2 * 60 * 60
}

fn default_sweep_interval_secs() -> u64 {
    30 * 60
}

/// Point ledger configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// Staff account that system-initiated bonuses are attributed to.
    ///
    /// `None` attributes them to the highest-role active staff member.
    #[serde(default)]
    pub system_operator_external_id: Option<String>,

    /// Default ceiling for amounts typed into the earn and spend steps.
    /// Overridable at runtime through the `manual_amount_limit` setting.
    #[serde(default = "default_manual_amount_limit")]
    pub manual_amount_limit: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            system_operator_external_id: None,
            manual_amount_limit: default_manual_amount_limit(),
        }
    }
}

fn default_manual_amount_limit() -> i64 {
    100_000
}

/// Quick command configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QuickCommandConfig {
    /// Whether staff may use single-message `<card> <amount>` commands.
    #[serde(default = "default_quick_enabled")]
    pub enabled: bool,

    /// Default ceiling for one quick command.
    /// Overridable at runtime through the `quick_command_limit` setting.
    #[serde(default = "default_quick_max_points")]
    pub max_points: i64,
}

impl Default for QuickCommandConfig {
    fn default() -> Self {
        Self {
            enabled: default_quick_enabled(),
            max_points: default_quick_max_points(),
        }
    }
}

fn default_quick_enabled() -> bool {
    true
}

fn default_quick_max_points() -> i64 {
    1000
}
