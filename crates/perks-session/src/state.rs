// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session state: the pending step plus the data collected so far.

use chrono::{DateTime, NaiveDate, Utc};
use perks_core::{ClientField, SettingKey, StaffField};
use serde::{Deserialize, Serialize};

/// The step currently expecting input.
///
/// Serialized with an internal `step` tag so stored rows stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum WaitingFor {
    FullName,
    Phone,
    BirthDate,
    CardSearch,
    EarnAmount,
    SpendAmount,
    AdjustAmount,
    AdjustReason,
    NoteText,
    StaffPayload,
    SettingValue { key: SettingKey },
    FieldEdit { target: EditTarget },
}

impl WaitingFor {
    /// Every step tag, with placeholder parameters where a tag takes any.
    pub fn all() -> Vec<WaitingFor> {
        vec![
            WaitingFor::FullName,
            WaitingFor::Phone,
            WaitingFor::BirthDate,
            WaitingFor::CardSearch,
            WaitingFor::EarnAmount,
            WaitingFor::SpendAmount,
            WaitingFor::AdjustAmount,
            WaitingFor::AdjustReason,
            WaitingFor::NoteText,
            WaitingFor::StaffPayload,
            WaitingFor::SettingValue {
                key: SettingKey::QuickCommandLimit,
            },
            WaitingFor::SettingValue {
                key: SettingKey::ManualAmountLimit,
            },
            WaitingFor::FieldEdit {
                target: EditTarget::Client {
                    id: 0,
                    field: ClientField::Phone,
                },
            },
            WaitingFor::FieldEdit {
                target: EditTarget::Staff {
                    id: 0,
                    field: StaffField::Role,
                },
            },
        ]
    }

    /// Whether the step accepts arbitrary text. Only steps that take a single
    /// number leave room for a quick command while they are pending.
    pub fn takes_free_text(self) -> bool {
        match self {
            WaitingFor::EarnAmount
            | WaitingFor::SpendAmount
            | WaitingFor::AdjustAmount
            | WaitingFor::SettingValue { .. } => false,
            WaitingFor::FullName
            | WaitingFor::Phone
            | WaitingFor::BirthDate
            | WaitingFor::CardSearch
            | WaitingFor::AdjustReason
            | WaitingFor::NoteText
            | WaitingFor::StaffPayload
            | WaitingFor::FieldEdit { .. } => true,
        }
    }
}

/// Entity and attribute a field edit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum EditTarget {
    Client { id: i64, field: ClientField },
    Staff { id: i64, field: StaffField },
}

/// Registration fields collected across the name, phone and birth-date steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationDraft {
    /// Transport id of a self-registering client. Absent for walk-ins
    /// registered by staff.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
}

/// Data carried between steps of one flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Client the flow acts on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<RegistrationDraft>,
    /// Signed delta collected by the adjust-amount step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjust_delta: Option<i64>,
}

impl Operation {
    pub fn is_empty(&self) -> bool {
        *self == Operation::default()
    }

    pub fn for_client(client_id: i64) -> Self {
        Self {
            client_id: Some(client_id),
            ..Self::default()
        }
    }
}

/// Parts of a session that can be cleared individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionField {
    WaitingFor,
    Operation,
    Client,
    Draft,
    AdjustDelta,
}

/// Per-user conversation state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// `None` means no pending step.
    #[serde(default)]
    pub waiting_for: Option<WaitingFor>,
    #[serde(default)]
    pub operation: Operation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionState {
    /// A state waiting at `step` with the given payload.
    pub fn waiting(step: WaitingFor, operation: Operation) -> Self {
        Self {
            waiting_for: Some(step),
            operation,
            ..Self::default()
        }
    }

    /// No pending step and nothing collected. Idle states are not stored.
    pub fn is_idle(&self) -> bool {
        self.waiting_for.is_none() && self.operation.is_empty()
    }

    pub fn clear(&mut self) {
        self.waiting_for = None;
        self.operation = Operation::default();
    }

    pub fn clear_field(&mut self, field: SessionField) {
        match field {
            SessionField::WaitingFor => self.waiting_for = None,
            SessionField::Operation => self.operation = Operation::default(),
            SessionField::Client => self.operation.client_id = None,
            SessionField::Draft => self.operation.draft = None,
            SessionField::AdjustDelta => self.operation.adjust_delta = None,
        }
    }
}
