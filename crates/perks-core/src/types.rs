// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the ledger, session, and directory layers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Timestamp format used for every persisted timestamp.
///
/// Fixed width with millisecond precision, so lexical order equals time order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Maximum number of digits in a card number.
pub const CARD_NUMBER_MAX_DIGITS: usize = 10;

/// Upper bound for any configurable per-operation point limit.
pub const POINT_LIMIT_MAX: i64 = 1_000_000;

/// Formats a UTC instant in the persisted timestamp format.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Returns `true` if `token` is a well-formed card number: 1 to 10 ASCII
/// digits without a leading zero.
pub fn is_card_number(token: &str) -> bool {
    !token.is_empty()
        && token.len() <= CARD_NUMBER_MAX_DIGITS
        && !token.starts_with('0')
        && token.bytes().all(|b| b.is_ascii_digit())
}

/// Access role. Ordered: client < barista < manager < admin.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Barista,
    Manager,
    Admin,
}

impl Role {
    /// Numeric level in the role hierarchy.
    pub fn level(self) -> u8 {
        match self {
            Role::Client => 0,
            Role::Barista => 1,
            Role::Manager => 2,
            Role::Admin => 3,
        }
    }

    /// Whether this role belongs to an operator account.
    pub fn is_staff(self) -> bool {
        self != Role::Client
    }
}

/// Kind of a point ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Points earned by a purchase. Counts as a visit.
    Earn,
    /// Points redeemed. Stored with negative points. Counts as a visit.
    Spend,
    /// Manual correction of either sign.
    Adjust,
    /// Promotional credit (birthday and similar), reported separately.
    Bonus,
}

/// A loyalty-program member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    /// Chat-transport identifier, absent for staff-created walk-in clients.
    pub external_id: Option<String>,
    /// Sequential card number, issued once.
    pub card_number: String,
    pub name: String,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub notes: Option<String>,
    /// Current point balance. Only the ledger writes this.
    pub balance: i64,
    pub visit_count: i64,
    pub last_visit: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields required to register a new client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewClient {
    pub external_id: Option<String>,
    pub name: String,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// An operator account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffUser {
    pub id: i64,
    pub external_id: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields required to create a staff account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStaff {
    pub external_id: String,
    pub name: String,
    pub role: Role,
}

/// An immutable point ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique record identifier (UUID v4).
    pub id: String,
    pub client_id: i64,
    /// Staff member the entry is attributed to. Always present.
    pub operator_id: i64,
    pub kind: TransactionKind,
    /// Signed, never zero.
    pub points: i64,
    /// Purchase amount, kept for records only.
    pub amount: Option<f64>,
    pub description: Option<String>,
    pub created_at: String,
}

/// Editable client attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ClientField {
    Name,
    Phone,
    BirthDate,
    Notes,
}

/// A validated new value for a [`ClientField`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFieldValue {
    Name(String),
    Phone(Option<String>),
    BirthDate(Option<NaiveDate>),
    Notes(Option<String>),
}

impl ClientFieldValue {
    pub fn field(&self) -> ClientField {
        match self {
            ClientFieldValue::Name(_) => ClientField::Name,
            ClientFieldValue::Phone(_) => ClientField::Phone,
            ClientFieldValue::BirthDate(_) => ClientField::BirthDate,
            ClientFieldValue::Notes(_) => ClientField::Notes,
        }
    }
}

/// Editable staff attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StaffField {
    Name,
    Role,
}

/// Integer settings adjustable at runtime by administrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    /// Ceiling for the amount of a single quick command.
    QuickCommandLimit,
    /// Ceiling for amounts typed into the earn and spend steps.
    ManualAmountLimit,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn role_levels_are_totally_ordered() {
        let roles = [Role::Client, Role::Barista, Role::Manager, Role::Admin];
        for pair in roles.windows(2) {
            assert!(pair[0].level() < pair[1].level());
            assert!(pair[0] < pair[1]);
        }
        assert!(!Role::Client.is_staff());
        assert!(Role::Barista.is_staff());
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!(Role::from_str("Manager").unwrap(), Role::Manager);
        assert_eq!(Role::from_str("ADMIN").unwrap(), Role::Admin);
        assert_eq!(Role::Barista.to_string(), "barista");
        assert!(Role::from_str("owner").is_err());
    }

    #[test]
    fn transaction_kind_display_and_parse() {
        assert_eq!(TransactionKind::Earn.to_string(), "earn");
        assert_eq!(
            TransactionKind::from_str("bonus").unwrap(),
            TransactionKind::Bonus
        );
    }

    #[test]
    fn card_number_format() {
        assert!(is_card_number("7"));
        assert!(is_card_number("42"));
        assert!(is_card_number("1234567890"));
        assert!(!is_card_number(""));
        assert!(!is_card_number("042"));
        assert!(!is_card_number("12345678901"));
        assert!(!is_card_number("4a"));
        assert!(!is_card_number("+5"));
    }

    #[test]
    fn timestamps_sort_lexically() {
        let earlier = DateTime::parse_from_rfc3339("2026-01-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let later = earlier + chrono::Duration::milliseconds(1);
        assert!(format_timestamp(earlier) < format_timestamp(later));
        assert_eq!(format_timestamp(earlier), "2026-01-01T09:00:00.000Z");
    }

    #[test]
    fn setting_key_names() {
        assert_eq!(SettingKey::QuickCommandLimit.to_string(), "quick_command_limit");
        assert_eq!(
            SettingKey::from_str("manual_amount_limit").unwrap(),
            SettingKey::ManualAmountLimit
        );
    }
}
