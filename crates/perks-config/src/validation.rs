// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-empty paths, positive limits, and known log levels.

use crate::diagnostic::ConfigError;
use crate::model::PerksConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Same ceiling the bot applies to limits changed at runtime.
const POINT_LIMIT_MAX: i64 = 1_000_000;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &PerksConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.bot.log_level.to_ascii_lowercase().as_str()) {
        fail(format!(
            "bot.log_level `{}` must be one of {}",
            config.bot.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.bot.search_limit == 0 {
        fail("bot.search_limit must be at least 1".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.session.ttl_secs == 0 {
        fail("session.ttl_secs must be greater than 0".to_string());
    }

    if config.session.sweep_interval_secs == 0 {
        fail("session.sweep_interval_secs must be greater than 0".to_string());
    }

    if !(1..=POINT_LIMIT_MAX).contains(&config.quick.max_points) {
        fail(format!(
            "quick.max_points must be between 1 and {POINT_LIMIT_MAX}, got {}",
            config.quick.max_points
        ));
    }

    if !(1..=POINT_LIMIT_MAX).contains(&config.ledger.manual_amount_limit) {
        fail(format!(
            "ledger.manual_amount_limit must be between 1 and {POINT_LIMIT_MAX}, got {}",
            config.ledger.manual_amount_limit
        ));
    }

    if let Some(id) = &config.ledger.system_operator_external_id
        && id.trim().is_empty()
    {
        fail("ledger.system_operator_external_id must not be empty when set".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
