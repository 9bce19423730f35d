// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inputs the bot accepts and replies it produces.
//!
//! Transports render [`Reply`] values; this crate never formats user-facing text
//! beyond short problem descriptions.

use perks_core::{Client, SettingKey, StaffUser, Transaction};
use perks_session::{EditTarget, SessionState, WaitingFor};

/// One inbound interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Free text typed by the user.
    Text(String),
    /// A selected menu action.
    Action(Action),
}

impl Input {
    pub fn text(text: impl Into<String>) -> Self {
        Input::Text(text.into())
    }
}

/// Menu actions. Flow-starting actions replace any pending flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Self-registration by an unknown contact.
    Register,
    /// Staff registering a walk-in client.
    CreateClient,
    Search,
    /// `None` shows the caller's own card.
    ShowBalance { client_id: Option<i64> },
    /// `None` shows the caller's own history.
    ShowHistory { client_id: Option<i64> },
    SelectClient { client_id: i64 },
    Earn { client_id: i64 },
    Spend { client_id: i64 },
    Adjust { client_id: i64 },
    AddNote { client_id: i64 },
    EditField { target: EditTarget },
    DeactivateClient { client_id: i64 },
    CreateStaff,
    DeactivateStaff { staff_id: i64 },
    ReactivateStaff { staff_id: i64 },
    EditSetting { key: SettingKey },
    Cancel,
}

/// What the user should see next.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Ask for the input of `step`. `problem` explains a rejected answer.
    Prompt {
        step: WaitingFor,
        problem: Option<String>,
    },
    ClientCard(Client),
    SearchResults(Vec<Client>),
    Registered(Client),
    /// The caller already has a loyalty card.
    AlreadyRegistered(Client),
    /// A committed ledger entry and the client as it is now.
    Recorded {
        client: Client,
        transaction: Transaction,
    },
    History {
        client: Client,
        transactions: Vec<Transaction>,
    },
    ClientUpdated(Client),
    StaffCreated(StaffUser),
    StaffUpdated(StaffUser),
    SettingStored {
        key: SettingKey,
        value: i64,
    },
    Cancelled,
    /// Main menu for the caller's role.
    Menu,
    /// Quick-shaped text that was not a valid command, or unexpected text
    /// from staff.
    QuickUsage {
        problem: Option<String>,
    },
    Denied(String),
    /// A business rule stopped the action.
    Rejected(String),
    /// Infrastructure failure. Details are in the logs.
    Failed,
}

/// Result of handling one input: the state to store and the reply to send.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: SessionState,
    pub reply: Reply,
}

impl Transition {
    /// End the flow.
    pub fn end(reply: Reply) -> Self {
        Self {
            next: SessionState::default(),
            reply,
        }
    }

    /// Wait at `step`, carrying `state.operation`.
    pub fn prompt(state: SessionState) -> Self {
        let reply = match state.waiting_for {
            Some(step) => Reply::Prompt {
                step,
                problem: None,
            },
            None => Reply::Menu,
        };
        Self { next: state, reply }
    }
}
