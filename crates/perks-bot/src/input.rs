// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Validation of free-text answers to conversation steps.

use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use perks_core::types::POINT_LIMIT_MAX;
use perks_core::{NewStaff, PerksError, Role};

const NAME_MAX_CHARS: usize = 100;
const NOTE_MAX_CHARS: usize = 500;
const PHONE_MIN_DIGITS: usize = 10;
const PHONE_MAX_DIGITS: usize = 15;

/// Words that leave an optional field empty.
pub fn is_skip(text: &str) -> bool {
    matches!(text.trim().to_ascii_lowercase().as_str(), "skip" | "-")
}

/// A person's name: trimmed, inner whitespace collapsed, at least one letter.
pub fn parse_name(text: &str) -> Result<String, PerksError> {
    let name = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.chars().count() < 2 {
        return Err(PerksError::invalid("name", "too short"));
    }
    if name.chars().count() > NAME_MAX_CHARS {
        return Err(PerksError::invalid("name", "too long"));
    }
    if !name.chars().any(char::is_alphabetic) {
        return Err(PerksError::invalid("name", "must contain letters"));
    }
    Ok(name)
}

/// Normalize a phone number to `+<digits>`.
///
/// Spaces, dashes, dots and parentheses are ignored. Anything else is an error.
pub fn normalize_phone(text: &str) -> Result<String, PerksError> {
    let trimmed = text.trim();
    let body = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let mut digits = String::with_capacity(body.len());
    for c in body.chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '.' | '(' | ')' => {}
            _ => return Err(PerksError::invalid("phone", "only digits are allowed")),
        }
    }
    if digits.len() < PHONE_MIN_DIGITS || digits.len() > PHONE_MAX_DIGITS {
        return Err(PerksError::invalid(
            "phone",
            format!("expected {PHONE_MIN_DIGITS}-{PHONE_MAX_DIGITS} digits"),
        ));
    }
    Ok(format!("+{digits}"))
}

/// A birth date as `YYYY-MM-DD` or `DD.MM.YYYY`, or `skip` for none.
pub fn parse_birth_date(text: &str, today: NaiveDate) -> Result<Option<NaiveDate>, PerksError> {
    if is_skip(text) {
        return Ok(None);
    }
    let text = text.trim();
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(text, "%d.%m.%Y"))
        .map_err(|_| PerksError::invalid("birth date", "use YYYY-MM-DD or DD.MM.YYYY"))?;
    if date > today {
        return Err(PerksError::invalid("birth date", "is in the future"));
    }
    if date.year() < 1900 {
        return Err(PerksError::invalid("birth date", "is too far in the past"));
    }
    Ok(Some(date))
}

/// A positive whole number of points, at most `limit`.
pub fn parse_points(text: &str, limit: i64) -> Result<i64, PerksError> {
    let text = text.trim();
    let points = text
        .strip_prefix('+')
        .unwrap_or(text)
        .parse::<i64>()
        .map_err(|_| PerksError::invalid("amount", "enter a whole number"))?;
    if points <= 0 || points > limit {
        return Err(PerksError::InvalidAmount { amount: points });
    }
    Ok(points)
}

/// A signed, non-zero number of points with magnitude at most `limit`.
pub fn parse_delta(text: &str, limit: i64) -> Result<i64, PerksError> {
    let text = text.trim();
    let delta = text
        .strip_prefix('+')
        .unwrap_or(text)
        .parse::<i64>()
        .map_err(|_| PerksError::invalid("amount", "enter a whole number like 10 or -10"))?;
    if delta == 0 || delta.unsigned_abs() > limit.unsigned_abs() {
        return Err(PerksError::InvalidAmount { amount: delta });
    }
    Ok(delta)
}

/// Non-empty free text of bounded length.
pub fn parse_note(text: &str) -> Result<String, PerksError> {
    let note = text.trim();
    if note.is_empty() {
        return Err(PerksError::invalid("note", "must not be empty"));
    }
    if note.chars().count() > NOTE_MAX_CHARS {
        return Err(PerksError::invalid("note", "too long"));
    }
    Ok(note.to_string())
}

/// A positive integer setting value no larger than [`POINT_LIMIT_MAX`].
pub fn parse_setting_value(text: &str) -> Result<i64, PerksError> {
    let value = text
        .trim()
        .parse::<i64>()
        .map_err(|_| PerksError::invalid("value", "enter a whole number"))?;
    if value <= 0 || value > POINT_LIMIT_MAX {
        return Err(PerksError::InvalidAmount { amount: value });
    }
    Ok(value)
}

/// A staff role name. Clients are not a staff role.
pub fn parse_staff_role(text: &str) -> Result<Role, PerksError> {
    let role = Role::from_str(text.trim())
        .map_err(|_| PerksError::invalid("role", "expected barista, manager or admin"))?;
    if !role.is_staff() {
        return Err(PerksError::invalid("role", "expected barista, manager or admin"));
    }
    Ok(role)
}

/// `<external id> <role> <display name...>`.
pub fn parse_staff_payload(text: &str) -> Result<NewStaff, PerksError> {
    let mut parts = text.split_whitespace();
    let (Some(external_id), Some(role)) = (parts.next(), parts.next()) else {
        return Err(PerksError::invalid(
            "staff",
            "expected: <contact id> <role> <name>",
        ));
    };
    let role = parse_staff_role(role)?;
    let name = parse_name(&parts.collect::<Vec<_>>().join(" "))?;
    Ok(NewStaff {
        external_id: external_id.to_string(),
        name,
        role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    #[test]
    fn names_are_collapsed_and_checked() {
        assert_eq!(parse_name("  Ann   Lee ").unwrap(), "Ann Lee");
        assert!(parse_name("A").is_err());
        assert!(parse_name("12345").is_err());
        assert!(parse_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn phones_normalize() {
        assert_eq!(normalize_phone("+1 (555) 000-1111").unwrap(), "+15550001111");
        assert_eq!(normalize_phone("5550001111").unwrap(), "+5550001111");
        assert!(normalize_phone("abc").is_err());
        assert!(normalize_phone("12345").is_err());
        assert!(normalize_phone("+1234567890123456").is_err());
    }

    #[test]
    fn birth_dates() {
        let expected = NaiveDate::from_ymd_opt(1990, 4, 12);
        assert_eq!(parse_birth_date("1990-04-12", today()).unwrap(), expected);
        assert_eq!(parse_birth_date("12.04.1990", today()).unwrap(), expected);
        assert_eq!(parse_birth_date("Skip", today()).unwrap(), None);
        assert!(parse_birth_date("2030-01-01", today()).is_err());
        assert!(parse_birth_date("1850-01-01", today()).is_err());
        assert!(parse_birth_date("31.02.1990", today()).is_err());
        assert!(parse_birth_date("yesterday", today()).is_err());
    }

    #[test]
    fn points_and_deltas() {
        assert_eq!(parse_points("15", 100).unwrap(), 15);
        assert_eq!(parse_points("+15", 100).unwrap(), 15);
        assert!(matches!(parse_points("0", 100), Err(PerksError::InvalidAmount { .. })));
        assert!(matches!(parse_points("101", 100), Err(PerksError::InvalidAmount { .. })));
        assert!(matches!(parse_points("ten", 100), Err(PerksError::InvalidInput { .. })));

        assert_eq!(parse_delta("-20", 100).unwrap(), -20);
        assert_eq!(parse_delta("+20", 100).unwrap(), 20);
        assert!(parse_delta("0", 100).is_err());
        assert!(parse_delta("-101", 100).is_err());
    }

    #[test]
    fn staff_payload() {
        let staff = parse_staff_payload("tg-77 Manager Dana  Ray").unwrap();
        assert_eq!(staff.external_id, "tg-77");
        assert_eq!(staff.role, Role::Manager);
        assert_eq!(staff.name, "Dana Ray");
        assert!(parse_staff_payload("tg-77 client Dana").is_err());
        assert!(parse_staff_payload("tg-77 barista").is_err());
        assert!(parse_staff_payload("tg-77").is_err());
    }

    #[test]
    fn notes_and_settings() {
        assert_eq!(parse_note("  oat milk ").unwrap(), "oat milk");
        assert!(parse_note("   ").is_err());
        assert_eq!(parse_setting_value(" 250 ").unwrap(), 250);
        assert!(parse_setting_value("-1").is_err());
        assert!(parse_setting_value("lots").is_err());
        assert_eq!(parse_setting_value("1000000").unwrap(), POINT_LIMIT_MAX);
        assert!(matches!(
            parse_setting_value("1000001"),
            Err(PerksError::InvalidAmount { amount: 1_000_001 })
        ));
        assert!(parse_setting_value("9223372036854775807").is_err());
    }
}
