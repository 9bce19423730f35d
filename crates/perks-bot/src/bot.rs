// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound interaction dispatch.
//!
//! Order: resolve the caller and load the session, try staff text as a quick
//! command unless a free-text step is pending, then run the state machine and
//! store the next session.

use std::sync::Arc;

use perks_access::{authorize, AccessResolver, Identity, Permission};
use perks_config::PerksConfig;
use perks_core::{Clock, ErrorKind, PerksError, SettingKey, StaffUser, SystemClock};
use perks_ledger::PointLedger;
use perks_session::SessionStore;
use perks_storage::{Database, SqliteDirectory};
use tracing::{error, info, warn};

use crate::interaction::{Input, Reply};
use crate::machine::{Limits, OperationStateMachine, Services};
use crate::quick::{QuickCommand, QuickCommandParser, QuickParse};

/// The assembled bot core.
#[derive(Clone)]
pub struct Bot {
    access: AccessResolver,
    sessions: SessionStore,
    machine: OperationStateMachine,
    quick_enabled: bool,
}

impl Bot {
    pub fn new(
        access: AccessResolver,
        sessions: SessionStore,
        machine: OperationStateMachine,
        quick_enabled: bool,
    ) -> Self {
        Self {
            access,
            sessions,
            machine,
            quick_enabled,
        }
    }

    /// Wire every component over one database.
    pub fn from_database(db: Database, config: &PerksConfig, clock: Arc<dyn Clock>) -> Self {
        let directory = SqliteDirectory::with_clock(db.clone(), clock.clone());
        let access = AccessResolver::new(Arc::new(directory.clone()), Arc::new(directory.clone()));
        let sessions = SessionStore::from_config(db.clone(), &config.session, clock.clone());
        let services = Services {
            clients: Arc::new(directory.clone()),
            staff: Arc::new(directory.clone()),
            settings: Arc::new(directory),
            ledger: PointLedger::with_clock(db, clock.clone()),
            clock,
        };
        let limits = Limits {
            quick_command: config.quick.max_points,
            manual_amount: config.ledger.manual_amount_limit,
            search_results: config.bot.search_limit,
            ..Limits::default()
        };
        Self::new(
            access,
            sessions,
            OperationStateMachine::new(services, limits),
            config.quick.enabled,
        )
    }

    /// [`Bot::from_database`] with the wall clock.
    pub fn with_system_clock(db: Database, config: &PerksConfig) -> Self {
        Self::from_database(db, config, Arc::new(SystemClock))
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn access(&self) -> &AccessResolver {
        &self.access
    }

    /// Handle one interaction from `user_key` and return the reply.
    pub async fn handle(&self, user_key: &str, input: Input) -> Reply {
        let identity = self.access.identify(user_key).await;
        let session = self.sessions.get(user_key).await;

        // A pending step that takes free text owns the message.
        let quick_allowed = session
            .waiting_for
            .is_none_or(|step| !step.takes_free_text());
        if let (Input::Text(text), Identity::Staff(staff)) = (&input, &identity)
            && self.quick_enabled
            && quick_allowed
        {
            match self.classify_quick(text).await {
                Ok(QuickParse::Command(cmd)) => return self.run_quick(staff, &identity, cmd).await,
                Ok(QuickParse::Rejected(reason)) if session.waiting_for.is_none() => {
                    return Reply::QuickUsage {
                        problem: Some(reason.to_string()),
                    };
                }
                Ok(QuickParse::Rejected(_) | QuickParse::NotQuick) => {}
                Err(e) => {
                    error!(user_key, error = %e, "quick command limit lookup failed");
                    return Reply::Failed;
                }
            }
        }

        match self.machine.handle(&identity, user_key, input, session).await {
            Ok(transition) => {
                if let Err(e) = self.sessions.set(user_key, &transition.next).await {
                    error!(user_key, error = %e, "session write failed, dropping session");
                    if let Err(e) = self.sessions.clear(user_key).await {
                        warn!(user_key, error = %e, "session cleanup failed");
                    }
                }
                transition.reply
            }
            Err(e) => {
                error!(user_key, error = %e, "interaction failed");
                Reply::Failed
            }
        }
    }

    async fn classify_quick(&self, text: &str) -> Result<QuickParse, PerksError> {
        let ceiling = self.machine.limit(SettingKey::QuickCommandLimit).await?;
        Ok(QuickCommandParser::new(ceiling).classify(text))
    }

    /// Quick commands go straight to the ledger. The session is not touched.
    async fn run_quick(&self, staff: &StaffUser, identity: &Identity, cmd: QuickCommand) -> Reply {
        let result = self.execute_quick(staff, identity, &cmd).await;
        match result {
            Ok(reply) => reply,
            Err(e) => match e.kind() {
                ErrorKind::Authorization => Reply::Denied(e.to_string()),
                ErrorKind::Validation | ErrorKind::BusinessRule => Reply::Rejected(e.to_string()),
                ErrorKind::Infrastructure => {
                    error!(staff_id = staff.id, card = %cmd.card, error = %e, "quick command failed");
                    Reply::Failed
                }
            },
        }
    }

    async fn execute_quick(
        &self,
        staff: &StaffUser,
        identity: &Identity,
        cmd: &QuickCommand,
    ) -> Result<Reply, PerksError> {
        let services = self.machine.services();
        let client = services
            .clients
            .find_client_by_card(&cmd.card)
            .await?
            .ok_or_else(|| PerksError::ClientNotFound(format!("card {}", cmd.card)))?;

        let transaction = if cmd.delta > 0 {
            authorize(identity, Permission::EarnPoints)?;
            services
                .ledger
                .earn(client.id, staff.id, cmd.delta, None, None)
                .await?
        } else {
            authorize(identity, Permission::SpendPoints)?;
            services
                .ledger
                .spend(client.id, staff.id, -cmd.delta, None)
                .await?
        };
        info!(staff_id = staff.id, card = %cmd.card, delta = cmd.delta, "quick command applied");
        Ok(self.machine.recorded(client, transaction).await)
    }
}
