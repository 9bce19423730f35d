// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The conversation state machine.
//!
//! [`OperationStateMachine::handle`] maps `(actor, input, session)` to the next
//! session and a reply. Free text goes to the step named by the session's
//! [`WaitingFor`] tag; every tag has exactly one step function, selected by a
//! single exhaustive match. A step either ends the flow, advances to another
//! tag, or re-prompts the same tag with the data collected so far.

use std::sync::Arc;

use perks_access::{
    authorize, authorize_manage, authorize_role_change, can_manage, Identity, Permission,
};
use perks_core::{
    Client, ClientDirectory, ClientField, ClientFieldValue, Clock, ErrorKind, NewClient,
    PerksError, SettingKey, SettingsStore, StaffDirectory, StaffField, StaffUser, Transaction,
};
use perks_ledger::PointLedger;
use perks_session::{EditTarget, Operation, RegistrationDraft, SessionState, WaitingFor};
use tracing::{debug, warn};

use crate::input;
use crate::interaction::{Action, Input, Reply, Transition};

/// Limits used when no runtime setting overrides them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub quick_command: i64,
    pub manual_amount: i64,
    pub search_results: usize,
    pub history_entries: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            quick_command: 1000,
            manual_amount: 100_000,
            search_results: 10,
            history_entries: 10,
        }
    }
}

/// Collaborators the state machine acts through.
#[derive(Clone)]
pub struct Services {
    pub clients: Arc<dyn ClientDirectory>,
    pub staff: Arc<dyn StaffDirectory>,
    pub settings: Arc<dyn SettingsStore>,
    pub ledger: PointLedger,
    pub clock: Arc<dyn Clock>,
}

#[derive(Clone)]
pub struct OperationStateMachine {
    services: Services,
    limits: Limits,
}

impl OperationStateMachine {
    pub fn new(services: Services, limits: Limits) -> Self {
        Self { services, limits }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Effective value of a runtime setting.
    pub async fn limit(&self, key: SettingKey) -> Result<i64, PerksError> {
        let fallback = match key {
            SettingKey::QuickCommandLimit => self.limits.quick_command,
            SettingKey::ManualAmountLimit => self.limits.manual_amount,
        };
        Ok(self
            .services
            .settings
            .get_setting(key)
            .await?
            .unwrap_or(fallback))
    }

    /// Handle one input.
    ///
    /// Only infrastructure failures are returned as errors; every other
    /// failure becomes a reply and a well-defined next state.
    pub async fn handle(
        &self,
        actor: &Identity,
        user_key: &str,
        input: Input,
        session: SessionState,
    ) -> Result<Transition, PerksError> {
        match input {
            Input::Action(Action::Cancel) => {
                debug!(user_key, "flow cancelled");
                Ok(Transition::end(Reply::Cancelled))
            }
            Input::Action(action) => {
                let result = self.start(actor, user_key, action).await;
                settle_action(result)
            }
            Input::Text(text) => match session.waiting_for {
                None => Ok(Transition {
                    reply: idle_reply(actor),
                    next: session,
                }),
                Some(step) => {
                    let operation = session.operation;
                    let result = self.step(actor, step, &operation, &text).await;
                    if let Ok(transition) = &result {
                        debug!(user_key, from = ?step, to = ?transition.next.waiting_for, "step transition");
                    }
                    settle_step(step, operation, result)
                }
            },
        }
    }

    async fn step(
        &self,
        actor: &Identity,
        step: WaitingFor,
        op: &Operation,
        text: &str,
    ) -> Result<Transition, PerksError> {
        match step {
            WaitingFor::FullName => self.full_name(actor, op, text),
            WaitingFor::Phone => self.phone(actor, op, text).await,
            WaitingFor::BirthDate => self.birth_date(actor, op, text).await,
            WaitingFor::CardSearch => self.card_search(actor, text).await,
            WaitingFor::EarnAmount => self.earn_amount(actor, op, text).await,
            WaitingFor::SpendAmount => self.spend_amount(actor, op, text).await,
            WaitingFor::AdjustAmount => self.adjust_amount(actor, op, text).await,
            WaitingFor::AdjustReason => self.adjust_reason(actor, op, text).await,
            WaitingFor::NoteText => self.note_text(actor, op, text).await,
            WaitingFor::StaffPayload => self.staff_payload(actor, text).await,
            WaitingFor::SettingValue { key } => self.setting_value(actor, key, text).await,
            WaitingFor::FieldEdit { target } => self.field_edit(actor, target, text).await,
        }
    }

    // Registration steps.

    fn full_name(
        &self,
        actor: &Identity,
        op: &Operation,
        text: &str,
    ) -> Result<Transition, PerksError> {
        let mut draft = authorize_registration(actor, op)?;
        draft.name = Some(input::parse_name(text)?);
        Ok(Transition::prompt(SessionState::waiting(
            WaitingFor::Phone,
            Operation {
                draft: Some(draft),
                ..op.clone()
            },
        )))
    }

    async fn phone(
        &self,
        actor: &Identity,
        op: &Operation,
        text: &str,
    ) -> Result<Transition, PerksError> {
        let mut draft = authorize_registration(actor, op)?;
        let phone = if input::is_skip(text) {
            None
        } else {
            let phone = input::normalize_phone(text)?;
            if self.services.clients.find_client_by_phone(&phone).await?.is_some() {
                return Err(PerksError::duplicate("phone", phone));
            }
            Some(phone)
        };
        draft.phone = phone;
        Ok(Transition::prompt(SessionState::waiting(
            WaitingFor::BirthDate,
            Operation {
                draft: Some(draft),
                ..op.clone()
            },
        )))
    }

    async fn birth_date(
        &self,
        actor: &Identity,
        op: &Operation,
        text: &str,
    ) -> Result<Transition, PerksError> {
        let draft = authorize_registration(actor, op)?;
        let today = self.services.clock.now().date_naive();
        let birth_date = input::parse_birth_date(text, today)?;
        let Some(name) = draft.name.clone() else {
            return Ok(Transition::prompt(SessionState::waiting(
                WaitingFor::FullName,
                op.clone(),
            )));
        };
        let client = self
            .services
            .clients
            .create_client(&NewClient {
                external_id: draft.external_id,
                name,
                phone: draft.phone,
                birth_date,
                notes: None,
            })
            .await?;
        Ok(Transition::end(Reply::Registered(client)))
    }

    // Client lookup and points.

    async fn card_search(&self, actor: &Identity, text: &str) -> Result<Transition, PerksError> {
        authorize(actor, Permission::SearchClients)?;
        let query = text.trim();
        if query.is_empty() {
            return Err(PerksError::invalid("search", "enter a card number, phone or name"));
        }
        let mut hits = self
            .services
            .clients
            .search_clients(query, self.limits.search_results)
            .await?;
        match hits.len() {
            0 => Err(PerksError::ClientNotFound(query.to_string())),
            1 => Ok(Transition::end(Reply::ClientCard(hits.remove(0)))),
            _ => Ok(Transition::end(Reply::SearchResults(hits))),
        }
    }

    async fn earn_amount(
        &self,
        actor: &Identity,
        op: &Operation,
        text: &str,
    ) -> Result<Transition, PerksError> {
        let operator = staff_with(actor, Permission::EarnPoints)?;
        let client_id = selected_client(op)?;
        let limit = self.limit(SettingKey::ManualAmountLimit).await?;
        let points = input::parse_points(text, limit)?;
        let before = self.require_client(client_id).await?;
        let txn = self
            .services
            .ledger
            .earn(client_id, operator.id, points, None, None)
            .await?;
        Ok(Transition::end(self.recorded(before, txn).await))
    }

    async fn spend_amount(
        &self,
        actor: &Identity,
        op: &Operation,
        text: &str,
    ) -> Result<Transition, PerksError> {
        let operator = staff_with(actor, Permission::SpendPoints)?;
        let client_id = selected_client(op)?;
        let limit = self.limit(SettingKey::ManualAmountLimit).await?;
        let points = input::parse_points(text, limit)?;
        let before = self.require_client(client_id).await?;
        let txn = self
            .services
            .ledger
            .spend(client_id, operator.id, points, None)
            .await?;
        Ok(Transition::end(self.recorded(before, txn).await))
    }

    async fn adjust_amount(
        &self,
        actor: &Identity,
        op: &Operation,
        text: &str,
    ) -> Result<Transition, PerksError> {
        staff_with(actor, Permission::AdjustPoints)?;
        selected_client(op)?;
        let limit = self.limit(SettingKey::ManualAmountLimit).await?;
        let delta = input::parse_delta(text, limit)?;
        Ok(Transition::prompt(SessionState::waiting(
            WaitingFor::AdjustReason,
            Operation {
                adjust_delta: Some(delta),
                ..op.clone()
            },
        )))
    }

    async fn adjust_reason(
        &self,
        actor: &Identity,
        op: &Operation,
        text: &str,
    ) -> Result<Transition, PerksError> {
        let operator = staff_with(actor, Permission::AdjustPoints)?;
        let client_id = selected_client(op)?;
        let Some(delta) = op.adjust_delta else {
            return Ok(Transition::prompt(SessionState::waiting(
                WaitingFor::AdjustAmount,
                op.clone(),
            )));
        };
        let reason = input::parse_note(text)?;
        let before = self.require_client(client_id).await?;
        let txn = self
            .services
            .ledger
            .adjust(client_id, operator.id, delta, &reason)
            .await?;
        Ok(Transition::end(self.recorded(before, txn).await))
    }

    async fn note_text(
        &self,
        actor: &Identity,
        op: &Operation,
        text: &str,
    ) -> Result<Transition, PerksError> {
        authorize(actor, Permission::AddNote)?;
        let client_id = selected_client(op)?;
        let note = input::parse_note(text)?;
        let client = self
            .services
            .clients
            .append_client_note(client_id, &note)
            .await?;
        Ok(Transition::end(Reply::ClientUpdated(client)))
    }

    // Administration.

    async fn staff_payload(&self, actor: &Identity, text: &str) -> Result<Transition, PerksError> {
        let manager = staff_with(actor, Permission::ManageStaff)?;
        let new = input::parse_staff_payload(text)?;
        if !can_manage(manager.role, new.role) {
            return Err(PerksError::NotManageable {
                actor: manager.role,
                target: new.role,
            });
        }
        let created = self.services.staff.create_staff(&new).await?;
        Ok(Transition::end(Reply::StaffCreated(created)))
    }

    async fn setting_value(
        &self,
        actor: &Identity,
        key: SettingKey,
        text: &str,
    ) -> Result<Transition, PerksError> {
        let admin = staff_with(actor, Permission::EditSettings)?;
        let value = input::parse_setting_value(text)?;
        self.services.settings.set_setting(key, value, admin.id).await?;
        Ok(Transition::end(Reply::SettingStored { key, value }))
    }

    async fn field_edit(
        &self,
        actor: &Identity,
        target: EditTarget,
        text: &str,
    ) -> Result<Transition, PerksError> {
        match target {
            EditTarget::Client { id, field } => {
                authorize(actor, Permission::EditClient)?;
                let value = self.client_field_value(field, text).await?;
                let client = self.services.clients.update_client_field(id, &value).await?;
                Ok(Transition::end(Reply::ClientUpdated(client)))
            }
            EditTarget::Staff { id, field } => {
                let manager = staff_of(actor)?;
                let target = self.require_staff(id).await?;
                let updated = match field {
                    StaffField::Name => {
                        authorize_manage(manager, &target, Permission::ManageStaff)?;
                        let name = input::parse_name(text)?;
                        self.services.staff.rename_staff(id, &name).await?
                    }
                    StaffField::Role => {
                        let role = input::parse_staff_role(text)?;
                        authorize_role_change(manager, &target, role)?;
                        self.services.staff.set_staff_role(id, role).await?
                    }
                };
                Ok(Transition::end(Reply::StaffUpdated(updated)))
            }
        }
    }

    async fn client_field_value(
        &self,
        field: ClientField,
        text: &str,
    ) -> Result<ClientFieldValue, PerksError> {
        Ok(match field {
            ClientField::Name => ClientFieldValue::Name(input::parse_name(text)?),
            ClientField::Phone if input::is_skip(text) => ClientFieldValue::Phone(None),
            ClientField::Phone => ClientFieldValue::Phone(Some(input::normalize_phone(text)?)),
            ClientField::BirthDate => {
                let today = self.services.clock.now().date_naive();
                ClientFieldValue::BirthDate(input::parse_birth_date(text, today)?)
            }
            ClientField::Notes if input::is_skip(text) => ClientFieldValue::Notes(None),
            ClientField::Notes => ClientFieldValue::Notes(Some(input::parse_note(text)?)),
        })
    }

    // Actions.

    async fn start(
        &self,
        actor: &Identity,
        user_key: &str,
        action: Action,
    ) -> Result<Transition, PerksError> {
        debug!(user_key, ?action, "action");
        match action {
            Action::Register => match actor {
                Identity::Unknown => Ok(Transition::prompt(SessionState::waiting(
                    WaitingFor::FullName,
                    Operation {
                        draft: Some(RegistrationDraft {
                            external_id: Some(user_key.to_string()),
                            ..RegistrationDraft::default()
                        }),
                        ..Operation::default()
                    },
                ))),
                Identity::Client(client) => {
                    Ok(Transition::end(Reply::AlreadyRegistered(client.clone())))
                }
                Identity::Staff(_) => Err(PerksError::AccessDenied(
                    "staff accounts cannot register as clients".into(),
                )),
            },
            Action::CreateClient => {
                authorize(actor, Permission::CreateClient)?;
                Ok(Transition::prompt(SessionState::waiting(
                    WaitingFor::FullName,
                    Operation {
                        draft: Some(RegistrationDraft::default()),
                        ..Operation::default()
                    },
                )))
            }
            Action::Search => {
                authorize(actor, Permission::SearchClients)?;
                Ok(Transition::prompt(SessionState::waiting(
                    WaitingFor::CardSearch,
                    Operation::default(),
                )))
            }
            Action::ShowBalance { client_id } => {
                let client = self.visible_client(actor, client_id).await?;
                Ok(Transition::end(Reply::ClientCard(client)))
            }
            Action::ShowHistory { client_id } => {
                let client = self.visible_client(actor, client_id).await?;
                let transactions = self
                    .services
                    .ledger
                    .history(client.id, self.limits.history_entries)
                    .await?;
                Ok(Transition::end(Reply::History {
                    client,
                    transactions,
                }))
            }
            Action::SelectClient { client_id } => {
                authorize(actor, Permission::ViewClient)?;
                let client = self.require_client(client_id).await?;
                Ok(Transition::end(Reply::ClientCard(client)))
            }
            Action::Earn { client_id } => {
                let step = WaitingFor::EarnAmount;
                self.begin_client_flow(actor, Permission::EarnPoints, client_id, step)
                    .await
            }
            Action::Spend { client_id } => {
                let step = WaitingFor::SpendAmount;
                self.begin_client_flow(actor, Permission::SpendPoints, client_id, step)
                    .await
            }
            Action::Adjust { client_id } => {
                let step = WaitingFor::AdjustAmount;
                self.begin_client_flow(actor, Permission::AdjustPoints, client_id, step)
                    .await
            }
            Action::AddNote { client_id } => {
                let step = WaitingFor::NoteText;
                self.begin_client_flow(actor, Permission::AddNote, client_id, step)
                    .await
            }
            Action::EditField { target } => match target {
                EditTarget::Client { id, .. } => {
                    let step = WaitingFor::FieldEdit { target };
                    self.begin_client_flow(actor, Permission::EditClient, id, step)
                        .await
                }
                EditTarget::Staff { id, field } => {
                    let manager = staff_of(actor)?;
                    let staff = self.require_staff(id).await?;
                    let permission = match field {
                        StaffField::Name => Permission::ManageStaff,
                        StaffField::Role => Permission::ChangeRole,
                    };
                    authorize_manage(manager, &staff, permission)?;
                    Ok(Transition::prompt(SessionState::waiting(
                        WaitingFor::FieldEdit { target },
                        Operation::default(),
                    )))
                }
            },
            Action::DeactivateClient { client_id } => {
                authorize(actor, Permission::DeactivateClient)?;
                self.require_client(client_id).await?;
                let client = self
                    .services
                    .clients
                    .set_client_active(client_id, false)
                    .await?;
                Ok(Transition::end(Reply::ClientUpdated(client)))
            }
            Action::CreateStaff => {
                authorize(actor, Permission::ManageStaff)?;
                Ok(Transition::prompt(SessionState::waiting(
                    WaitingFor::StaffPayload,
                    Operation::default(),
                )))
            }
            Action::DeactivateStaff { staff_id } => {
                self.set_staff_active(actor, staff_id, false).await
            }
            Action::ReactivateStaff { staff_id } => {
                self.set_staff_active(actor, staff_id, true).await
            }
            Action::EditSetting { key } => {
                authorize(actor, Permission::EditSettings)?;
                Ok(Transition::prompt(SessionState::waiting(
                    WaitingFor::SettingValue { key },
                    Operation::default(),
                )))
            }
            Action::Cancel => Ok(Transition::end(Reply::Cancelled)),
        }
    }

    async fn begin_client_flow(
        &self,
        actor: &Identity,
        permission: Permission,
        client_id: i64,
        step: WaitingFor,
    ) -> Result<Transition, PerksError> {
        authorize(actor, permission)?;
        let client = self.require_client(client_id).await?;
        if !client.is_active {
            return Err(PerksError::ClientInactive(client.id));
        }
        Ok(Transition::prompt(SessionState::waiting(
            step,
            Operation::for_client(client.id),
        )))
    }

    async fn set_staff_active(
        &self,
        actor: &Identity,
        staff_id: i64,
        active: bool,
    ) -> Result<Transition, PerksError> {
        let manager = staff_of(actor)?;
        let target = self.require_staff(staff_id).await?;
        authorize_manage(manager, &target, Permission::ManageStaff)?;
        let updated = self.services.staff.set_staff_active(staff_id, active).await?;
        Ok(Transition::end(Reply::StaffUpdated(updated)))
    }

    /// The client a caller may look at: their own card, or any card for staff.
    async fn visible_client(
        &self,
        actor: &Identity,
        client_id: Option<i64>,
    ) -> Result<Client, PerksError> {
        match (actor, client_id) {
            (Identity::Client(own), None) => {
                authorize(actor, Permission::ViewOwnAccount)?;
                self.require_client(own.id).await
            }
            (Identity::Client(own), Some(id)) if own.id == id => {
                authorize(actor, Permission::ViewOwnAccount)?;
                self.require_client(id).await
            }
            (_, Some(id)) => {
                authorize(actor, Permission::ViewClient)?;
                self.require_client(id).await
            }
            (_, None) => Err(PerksError::AccessDenied("no loyalty card for this account".into())),
        }
    }

    async fn require_client(&self, id: i64) -> Result<Client, PerksError> {
        self.services
            .clients
            .get_client(id)
            .await?
            .ok_or_else(|| PerksError::ClientNotFound(format!("id {id}")))
    }

    async fn require_staff(&self, id: i64) -> Result<StaffUser, PerksError> {
        self.services
            .staff
            .get_staff(id)
            .await?
            .ok_or_else(|| PerksError::StaffNotFound(format!("id {id}")))
    }

    /// Reply for a committed ledger entry. Never fails: if the client cannot
    /// be re-read, the reply is built from `before` and the posted points.
    pub(crate) async fn recorded(&self, before: Client, transaction: Transaction) -> Reply {
        let client = match self.services.clients.get_client(transaction.client_id).await {
            Ok(Some(client)) => client,
            reread => {
                let error = reread.err().map(|e| e.to_string()).unwrap_or_default();
                warn!(
                    txn_id = %transaction.id,
                    client_id = transaction.client_id,
                    error,
                    "client re-read failed after ledger commit"
                );
                Client {
                    balance: before.balance.saturating_add(transaction.points),
                    ..before
                }
            }
        };
        Reply::Recorded {
            client,
            transaction,
        }
    }
}

/// Whether a business-rule rejection at `step` asks again instead of ending.
fn retries_on_rejection(step: WaitingFor) -> bool {
    match step {
        WaitingFor::Phone
        | WaitingFor::CardSearch
        | WaitingFor::SpendAmount
        | WaitingFor::StaffPayload
        | WaitingFor::FieldEdit { .. } => true,
        WaitingFor::FullName
        | WaitingFor::BirthDate
        | WaitingFor::EarnAmount
        | WaitingFor::AdjustAmount
        | WaitingFor::AdjustReason
        | WaitingFor::NoteText
        | WaitingFor::SettingValue { .. } => false,
    }
}

fn settle_step(
    step: WaitingFor,
    operation: Operation,
    result: Result<Transition, PerksError>,
) -> Result<Transition, PerksError> {
    let err = match result {
        Ok(transition) => return Ok(transition),
        Err(err) => err,
    };
    match err.kind() {
        ErrorKind::Validation => Ok(reprompt(step, operation, &err)),
        ErrorKind::BusinessRule if retries_on_rejection(step) => Ok(reprompt(step, operation, &err)),
        ErrorKind::BusinessRule => Ok(Transition::end(Reply::Rejected(err.to_string()))),
        ErrorKind::Authorization => Ok(Transition::end(Reply::Denied(err.to_string()))),
        ErrorKind::Infrastructure => Err(err),
    }
}

fn settle_action(result: Result<Transition, PerksError>) -> Result<Transition, PerksError> {
    let err = match result {
        Ok(transition) => return Ok(transition),
        Err(err) => err,
    };
    match err.kind() {
        ErrorKind::Validation | ErrorKind::BusinessRule => {
            Ok(Transition::end(Reply::Rejected(err.to_string())))
        }
        ErrorKind::Authorization => Ok(Transition::end(Reply::Denied(err.to_string()))),
        ErrorKind::Infrastructure => Err(err),
    }
}

fn reprompt(step: WaitingFor, operation: Operation, err: &PerksError) -> Transition {
    Transition {
        next: SessionState::waiting(step, operation),
        reply: Reply::Prompt {
            step,
            problem: Some(err.to_string()),
        },
    }
}

fn idle_reply(actor: &Identity) -> Reply {
    match actor {
        Identity::Staff(_) => Reply::QuickUsage { problem: None },
        Identity::Client(_) | Identity::Unknown => Reply::Menu,
    }
}

fn staff_of(actor: &Identity) -> Result<&StaffUser, PerksError> {
    actor
        .as_staff()
        .ok_or_else(|| PerksError::AccessDenied("staff only".into()))
}

fn staff_with(actor: &Identity, permission: Permission) -> Result<&StaffUser, PerksError> {
    authorize(actor, permission)?;
    staff_of(actor)
}

fn selected_client(op: &Operation) -> Result<i64, PerksError> {
    op.client_id
        .ok_or_else(|| PerksError::ClientNotFound("no client selected".into()))
}

/// Registration may be self-service (draft carries the caller's contact id and
/// the caller is not yet known) or a walk-in registered by staff.
fn authorize_registration(
    actor: &Identity,
    op: &Operation,
) -> Result<RegistrationDraft, PerksError> {
    let draft = op.draft.clone().unwrap_or_default();
    match (&draft.external_id, actor) {
        (Some(_), Identity::Unknown) => Ok(draft),
        (Some(_), _) => Err(PerksError::AccessDenied(
            "this account is already registered".into(),
        )),
        (None, _) => {
            authorize(actor, Permission::CreateClient)?;
            Ok(draft)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use perks_core::{ManualClock, NewStaff, Role};
    use perks_storage::{Database, SqliteDirectory};

    struct Fixture {
        machine: OperationStateMachine,
        dir: SqliteDirectory,
        admin: Identity,
        barista: Identity,
        client_id: i64,
    }

    async fn fixture() -> Fixture {
        let db = Database::open_in_memory().await.unwrap();
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap(),
        ));
        let dir = SqliteDirectory::with_clock(db.clone(), clock.clone());
        let services = Services {
            clients: Arc::new(dir.clone()),
            staff: Arc::new(dir.clone()),
            settings: Arc::new(dir.clone()),
            ledger: PointLedger::with_clock(db, clock.clone()),
            clock,
        };
        let admin = dir
            .create_staff(&NewStaff {
                external_id: "admin".into(),
                name: "Ada".into(),
                role: Role::Admin,
            })
            .await
            .unwrap();
        let barista = dir
            .create_staff(&NewStaff {
                external_id: "barista".into(),
                name: "Bea".into(),
                role: Role::Barista,
            })
            .await
            .unwrap();
        let client = dir
            .create_client(&NewClient {
                name: "Ann".into(),
                phone: Some("+15550001111".into()),
                ..NewClient::default()
            })
            .await
            .unwrap();
        Fixture {
            machine: OperationStateMachine::new(services, Limits::default()),
            dir,
            admin: Identity::Staff(admin),
            barista: Identity::Staff(barista),
            client_id: client.id,
        }
    }

    async fn text(f: &Fixture, actor: &Identity, state: SessionState, text: &str) -> Transition {
        f.machine
            .handle(actor, "user", Input::text(text), state)
            .await
            .unwrap()
    }

    async fn act(f: &Fixture, actor: &Identity, action: Action) -> Transition {
        f.machine
            .handle(actor, "user", Input::Action(action), SessionState::default())
            .await
            .unwrap()
    }

    /// Tags a step may move to besides itself and the end of the flow.
    fn successors(step: WaitingFor) -> Vec<WaitingFor> {
        match step {
            WaitingFor::FullName => vec![WaitingFor::Phone],
            WaitingFor::Phone => vec![WaitingFor::BirthDate],
            WaitingFor::BirthDate => vec![WaitingFor::FullName],
            WaitingFor::AdjustAmount => vec![WaitingFor::AdjustReason],
            WaitingFor::AdjustReason => vec![WaitingFor::AdjustAmount],
            _ => vec![],
        }
    }

    #[tokio::test]
    async fn every_step_is_total_for_valid_and_invalid_input() {
        let f = fixture().await;
        let inputs = ["", "abc", "-1", "0", "15", "skip", "Ann Lee", "+15550002222", "1990-01-01", "tg-50 barista Dana"];

        for actor in [&f.admin, &f.barista] {
            for step in WaitingFor::all() {
                for input in inputs {
                    let operation = Operation {
                        client_id: Some(f.client_id),
                        draft: Some(RegistrationDraft {
                            name: Some("Ann".into()),
                            ..RegistrationDraft::default()
                        }),
                        adjust_delta: Some(1),
                    };
                    let state = SessionState::waiting(step, operation.clone());
                    let t = text(&f, actor, state, input).await;
                    match t.next.waiting_for {
                        None => {}
                        Some(next) if next == step => {
                            assert_eq!(t.next.operation, operation, "re-prompt lost data at {step:?}");
                            assert!(matches!(t.reply, Reply::Prompt { .. }));
                        }
                        Some(next) => assert!(
                            successors(step).contains(&next),
                            "{step:?} moved to unexpected {next:?} on {input:?}"
                        ),
                    }
                }
            }
        }
    }

    #[tokio::test]
    async fn cancel_clears_any_step() {
        let f = fixture().await;
        for step in WaitingFor::all() {
            let state = SessionState::waiting(step, Operation::for_client(f.client_id));
            let t = f
                .machine
                .handle(&f.admin, "user", Input::Action(Action::Cancel), state)
                .await
                .unwrap();
            assert!(t.next.is_idle());
            assert_eq!(t.reply, Reply::Cancelled);
        }
    }

    #[tokio::test]
    async fn earn_flow_records_points() {
        let f = fixture().await;
        let t = act(&f, &f.barista, Action::Earn { client_id: f.client_id }).await;
        assert_eq!(t.next.waiting_for, Some(WaitingFor::EarnAmount));

        let bad = text(&f, &f.barista, t.next.clone(), "lots").await;
        assert_eq!(bad.next, t.next);

        let done = text(&f, &f.barista, t.next, "25").await;
        assert!(done.next.is_idle());
        match done.reply {
            Reply::Recorded { client, transaction } => {
                assert_eq!(client.balance, 25);
                assert_eq!(transaction.points, 25);
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }

    /// Serves `reads` client lookups, then fails every later one.
    struct FailingReads {
        inner: SqliteDirectory,
        reads: AtomicUsize,
    }

    #[async_trait]
    impl ClientDirectory for FailingReads {
        async fn get_client(&self, id: i64) -> Result<Option<Client>, PerksError> {
            if self
                .reads
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_err()
            {
                return Err(PerksError::Internal("read failed".into()));
            }
            self.inner.get_client(id).await
        }

        async fn find_client_by_card(&self, card: &str) -> Result<Option<Client>, PerksError> {
            self.inner.find_client_by_card(card).await
        }

        async fn find_client_by_phone(&self, phone: &str) -> Result<Option<Client>, PerksError> {
            self.inner.find_client_by_phone(phone).await
        }

        async fn find_client_by_external_id(
            &self,
            external_id: &str,
        ) -> Result<Option<Client>, PerksError> {
            self.inner.find_client_by_external_id(external_id).await
        }

        async fn search_clients(&self, query: &str, limit: usize) -> Result<Vec<Client>, PerksError> {
            self.inner.search_clients(query, limit).await
        }

        async fn create_client(&self, client: &NewClient) -> Result<Client, PerksError> {
            self.inner.create_client(client).await
        }

        async fn update_client_field(
            &self,
            id: i64,
            value: &ClientFieldValue,
        ) -> Result<Client, PerksError> {
            self.inner.update_client_field(id, value).await
        }

        async fn append_client_note(&self, id: i64, note: &str) -> Result<Client, PerksError> {
            self.inner.append_client_note(id, note).await
        }

        async fn set_client_active(&self, id: i64, active: bool) -> Result<Client, PerksError> {
            self.inner.set_client_active(id, active).await
        }
    }

    #[tokio::test]
    async fn earn_ends_the_flow_when_the_client_reread_fails() {
        let f = fixture().await;
        let mut services = f.machine.services().clone();
        services.clients = Arc::new(FailingReads {
            inner: f.dir.clone(),
            reads: AtomicUsize::new(1),
        });
        let machine = OperationStateMachine::new(services, Limits::default());

        let state = SessionState::waiting(WaitingFor::EarnAmount, Operation::for_client(f.client_id));
        let t = machine
            .handle(&f.barista, "user", Input::text("25"), state)
            .await
            .unwrap();
        assert!(t.next.is_idle());
        let Reply::Recorded { client, transaction } = t.reply else {
            panic!("expected a recorded entry");
        };
        assert_eq!(client.balance, 25);
        assert_eq!(transaction.points, 25);
        assert_eq!(f.machine.services().ledger.balance(f.client_id).await.unwrap(), 25);
    }

    #[tokio::test]
    async fn overdrawn_spend_reprompts() {
        let f = fixture().await;
        let t = act(&f, &f.barista, Action::Spend { client_id: f.client_id }).await;
        let again = text(&f, &f.barista, t.next.clone(), "10").await;
        assert_eq!(again.next.waiting_for, Some(WaitingFor::SpendAmount));
        assert!(matches!(again.reply, Reply::Prompt { problem: Some(_), .. }));
    }

    #[tokio::test]
    async fn adjust_is_denied_to_baristas() {
        let f = fixture().await;
        let t = act(&f, &f.barista, Action::Adjust { client_id: f.client_id }).await;
        assert!(t.next.is_idle());
        assert!(matches!(t.reply, Reply::Denied(_)));
    }

    #[tokio::test]
    async fn adjust_collects_delta_then_reason() {
        let f = fixture().await;
        let t = act(&f, &f.admin, Action::Adjust { client_id: f.client_id }).await;
        let t = text(&f, &f.admin, t.next, "+40").await;
        assert_eq!(t.next.waiting_for, Some(WaitingFor::AdjustReason));
        assert_eq!(t.next.operation.adjust_delta, Some(40));
        let t = text(&f, &f.admin, t.next, "paper card migration").await;
        assert!(t.next.is_idle());
        let Reply::Recorded { client, transaction } = t.reply else {
            panic!("expected a recorded entry");
        };
        assert_eq!(client.balance, 40);
        assert_eq!(client.visit_count, 0);
        assert_eq!(transaction.description.as_deref(), Some("paper card migration"));
    }

    #[tokio::test]
    async fn search_with_no_hits_reprompts() {
        let f = fixture().await;
        let t = act(&f, &f.barista, Action::Search).await;
        let miss = text(&f, &f.barista, t.next.clone(), "Zelda").await;
        assert_eq!(miss.next.waiting_for, Some(WaitingFor::CardSearch));
        let hit = text(&f, &f.barista, t.next, "ann").await;
        assert!(matches!(hit.reply, Reply::ClientCard(_)));
        assert!(hit.next.is_idle());
    }

    #[tokio::test]
    async fn staff_creation_respects_hierarchy() {
        let f = fixture().await;
        let t = act(&f, &f.admin, Action::CreateStaff).await;
        let denied = text(&f, &f.admin, t.next.clone(), "tg-60 admin Other Admin").await;
        assert!(matches!(denied.reply, Reply::Denied(_)));

        let created = text(&f, &f.admin, t.next.clone(), "tg-60 manager Max").await;
        assert!(matches!(created.reply, Reply::StaffCreated(ref s) if s.role == Role::Manager));

        let duplicate = text(&f, &f.admin, t.next, "tg-60 barista Max Two").await;
        assert_eq!(duplicate.next.waiting_for, Some(WaitingFor::StaffPayload));
    }

    #[tokio::test]
    async fn settings_change_the_manual_limit() {
        let f = fixture().await;
        let t = act(&f, &f.admin, Action::EditSetting { key: SettingKey::ManualAmountLimit }).await;
        let t = text(&f, &f.admin, t.next, "50").await;
        assert_eq!(t.reply, Reply::SettingStored { key: SettingKey::ManualAmountLimit, value: 50 });

        let t = act(&f, &f.barista, Action::Earn { client_id: f.client_id }).await;
        let over = text(&f, &f.barista, t.next, "51").await;
        assert_eq!(over.next.waiting_for, Some(WaitingFor::EarnAmount));
        assert_eq!(f.machine.limit(SettingKey::ManualAmountLimit).await.unwrap(), 50);
    }

    #[tokio::test]
    async fn role_edit_goes_through_hierarchy() {
        let f = fixture().await;
        let barista_id = f.barista.as_staff().unwrap().id;
        let target = EditTarget::Staff { id: barista_id, field: StaffField::Role };

        let t = act(&f, &f.admin, Action::EditField { target }).await;
        assert_eq!(t.next.waiting_for, Some(WaitingFor::FieldEdit { target }));
        let t = text(&f, &f.admin, t.next, "manager").await;
        assert!(matches!(t.reply, Reply::StaffUpdated(ref s) if s.role == Role::Manager));

        let denied = act(&f, &f.barista, Action::EditField { target }).await;
        assert!(matches!(denied.reply, Reply::Denied(_)));
    }

    #[tokio::test]
    async fn deactivated_clients_cannot_start_point_flows() {
        let f = fixture().await;
        let t = act(&f, &f.admin, Action::DeactivateClient { client_id: f.client_id }).await;
        assert!(matches!(t.reply, Reply::ClientUpdated(ref c) if !c.is_active));
        let t = act(&f, &f.barista, Action::Earn { client_id: f.client_id }).await;
        assert!(matches!(t.reply, Reply::Rejected(_)));
        assert!(f.dir.get_client(f.client_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn staff_cannot_self_register() {
        let f = fixture().await;
        let t = act(&f, &f.barista, Action::Register).await;
        assert!(matches!(t.reply, Reply::Denied(_)));
        let t = act(&f, &Identity::Unknown, Action::Register).await;
        assert_eq!(t.next.waiting_for, Some(WaitingFor::FullName));
        assert_eq!(
            t.next.operation.draft.unwrap().external_id.as_deref(),
            Some("user")
        );
    }
}
