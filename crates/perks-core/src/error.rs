// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Perks loyalty bot.

use thiserror::Error;

use crate::types::Role;

/// Coarse classification of a [`PerksError`], used by handlers to decide
/// whether to re-prompt, deny, or report a generic failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad amount, bad format, bad date. Recoverable by re-entering the value.
    Validation,
    /// Role too low or target not manageable. Terminal for the current action.
    Authorization,
    /// Insufficient balance, inactive client, duplicates. Terminal for the
    /// current action, recoverable with different input.
    BusinessRule,
    /// Storage unavailable, misconfiguration, bugs.
    Infrastructure,
}

/// The primary error type used across all Perks crates.
#[derive(Debug, Error)]
pub enum PerksError {
    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A point amount was zero, negative where it must be positive, or over a limit.
    #[error("invalid amount: {amount}")]
    InvalidAmount { amount: i64 },

    /// A free-text value failed validation.
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    /// A spend or negative adjustment exceeds the current balance.
    #[error("insufficient balance: requested {requested}, available {balance}")]
    InsufficientBalance { balance: i64, requested: i64 },

    /// No client matches the given reference.
    #[error("client not found: {0}")]
    ClientNotFound(String),

    /// The client exists but has been deactivated.
    #[error("client {0} is inactive")]
    ClientInactive(i64),

    /// No active staff user matches the given reference.
    #[error("staff user not found: {0}")]
    StaffNotFound(String),

    /// A unique attribute (phone, card, external id) is already taken.
    #[error("{entity} already exists: {value}")]
    Duplicate { entity: String, value: String },

    /// The caller's role does not allow the action.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Staff-on-staff action against a peer or higher role.
    #[error("{actor} cannot manage {target}")]
    NotManageable { actor: Role, target: Role },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PerksError {
    /// Shorthand for [`PerksError::InvalidInput`].
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`PerksError::Duplicate`].
    pub fn duplicate(entity: &str, value: impl Into<String>) -> Self {
        Self::Duplicate {
            entity: entity.to_string(),
            value: value.into(),
        }
    }

    /// Classifies this error for handler-level translation.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PerksError::InvalidAmount { .. } | PerksError::InvalidInput { .. } => {
                ErrorKind::Validation
            }
            PerksError::AccessDenied(_) | PerksError::NotManageable { .. } => {
                ErrorKind::Authorization
            }
            PerksError::InsufficientBalance { .. }
            | PerksError::ClientNotFound(_)
            | PerksError::ClientInactive(_)
            | PerksError::StaffNotFound(_)
            | PerksError::Duplicate { .. } => ErrorKind::BusinessRule,
            PerksError::Config(_) | PerksError::Storage { .. } | PerksError::Internal(_) => {
                ErrorKind::Infrastructure
            }
        }
    }

    /// Returns `true` for errors the end user can resolve by changing input.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Validation | ErrorKind::BusinessRule
        )
    }
}
