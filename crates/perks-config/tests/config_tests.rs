// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Perks configuration system.

use perks_config::diagnostic::ConfigError;
use perks_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_perks_config() {
    let toml = r#"
[bot]
name = "cafe"
log_level = "debug"
search_limit = 5

[storage]
database_path = "/tmp/perks-test.db"
wal_mode = false

[session]
ttl_secs = 600
sweep_interval_secs = 60

[ledger]
system_operator_external_id = "1001"
manual_amount_limit = 5000

[quick]
enabled = false
max_points = 250
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.bot.name, "cafe");
    assert_eq!(config.bot.log_level, "debug");
    assert_eq!(config.bot.search_limit, 5);
    assert_eq!(config.storage.database_path, "/tmp/perks-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.session.ttl_secs, 600);
    assert_eq!(config.session.sweep_interval_secs, 60);
    assert_eq!(
        config.ledger.system_operator_external_id.as_deref(),
        Some("1001")
    );
    assert_eq!(config.ledger.manual_amount_limit, 5000);
    assert!(!config.quick.enabled);
    assert_eq!(config.quick.max_points, 250);
}

#[test]
fn empty_toml_uses_defaults() {
    let config = load_and_validate_str("").expect("defaults are valid");
    assert_eq!(config.session.ttl_secs, 7200);
    assert_eq!(config.quick.max_points, 1000);
}

#[test]
fn unknown_key_produces_suggestion() {
    let toml = r#"
[quick]
max_pionts = 10
"#;
    let errors = load_and_validate_str(toml).expect_err("unknown key must be rejected");
    let suggestion = errors.iter().find_map(|e| match e {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } if key == "max_pionts" => suggestion.clone(),
        _ => None,
    });
    assert_eq!(suggestion.as_deref(), Some("max_points"));
}

#[test]
fn unknown_section_is_rejected() {
    let toml = r#"
[telegram]
bot_token = "abc"
"#;
    let errors = load_and_validate_str(toml).expect_err("unknown section must be rejected");
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::UnknownKey { key, .. } if key == "telegram")));
}

#[test]
fn wrong_type_produces_invalid_type() {
    let toml = r#"
[session]
ttl_secs = "two hours"
"#;
    let errors = load_and_validate_str(toml).expect_err("string ttl must be rejected");
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("ttl_secs"))));
}

#[test]
fn semantic_validation_runs_after_parse() {
    let toml = r#"
[session]
ttl_secs = 0
"#;
    let errors = load_and_validate_str(toml).expect_err("zero ttl must be rejected");
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("ttl_secs"))));
}

#[test]
fn env_vars_override_file_values() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "custom.toml",
            r#"
[session]
ttl_secs = 600

[quick]
max_points = 50
"#,
        )?;
        jail.set_env("PERKS_QUICK_MAX_POINTS", "75");
        jail.set_env("PERKS_LEDGER_SYSTEM_OPERATOR_EXTERNAL_ID", "owner-account");

        let config = load_and_validate_path(std::path::Path::new("custom.toml"))
            .map_err(|errors| format!("{errors:?}"))?;
        assert_eq!(config.session.ttl_secs, 600);
        assert_eq!(config.quick.max_points, 75);
        assert_eq!(
            config.ledger.system_operator_external_id.as_deref(),
            Some("owner-account")
        );
        Ok(())
    });
}
