// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./perks.toml` > `~/.config/perks/perks.toml` > `/etc/perks/perks.toml`
//! with environment variable overrides via `PERKS_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::PerksConfig;

/// Config file name looked up in every directory of the hierarchy.
pub const CONFIG_FILE_NAME: &str = "perks.toml";

/// System-wide config location.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/perks/perks.toml";

/// Sections that `PERKS_<SECTION>_<KEY>` env vars map onto.
const ENV_SECTIONS: &[&str] = &["bot", "storage", "session", "ledger", "quick"];

/// User XDG config location, if the platform has one.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("perks").join(CONFIG_FILE_NAME))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/perks/perks.toml` (system-wide)
/// 3. `~/.config/perks/perks.toml` (user XDG config)
/// 4. `./perks.toml` (local directory)
/// 5. `PERKS_*` environment variables
pub fn load_config() -> Result<PerksConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<PerksConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PerksConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<PerksConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PerksConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for hierarchy loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(PerksConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(CONFIG_FILE_NAME))
        .merge(env_provider())
}

/// Create the environment variable provider.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `PERKS_SESSION_TTL_SECS` must map to `session.ttl_secs`,
/// not `session.ttl.secs`.
fn env_provider() -> Env {
    Env::prefixed("PERKS_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name onto a dotted config path.
fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
