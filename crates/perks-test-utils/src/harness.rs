// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end conversation tests.
//!
//! `TestHarness` assembles the whole bot over a temp SQLite file with a manual
//! clock, seeds one staff member per role, and drives interactions through
//! [`Bot::handle`].

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use perks_bot::{Action, Bot, Input, Reply};
use perks_config::PerksConfig;
use perks_core::{
    Client, ClientDirectory, ManualClock, NewClient, NewStaff, PerksError, Role, StaffDirectory,
    StaffUser,
};
use perks_ledger::PointLedger;
use perks_session::SessionState;
use perks_storage::{Database, SqliteDirectory};

/// Contact ids of the seeded staff accounts.
pub const ADMIN: &str = "admin-1";
pub const MANAGER: &str = "manager-1";
pub const BARISTA: &str = "barista-1";

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: PerksConfig,
    start: DateTime<Utc>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: PerksConfig::default(),
            start: Utc
                .with_ymd_and_hms(2026, 6, 1, 9, 0, 0)
                .single()
                .unwrap_or_else(Utc::now),
        }
    }

    /// Per-command ceiling for quick commands.
    pub fn with_quick_limit(mut self, limit: i64) -> Self {
        self.config.quick.max_points = limit;
        self
    }

    pub fn with_quick_commands(mut self, enabled: bool) -> Self {
        self.config.quick.enabled = enabled;
        self
    }

    /// Initial instant of the manual clock.
    pub fn starting_at(mut self, start: DateTime<Utc>) -> Self {
        self.start = start;
        self
    }

    /// Build the harness: temp database, seeded staff, assembled bot.
    pub async fn build(mut self) -> Result<TestHarness, PerksError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| PerksError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");
        self.config.storage.database_path = db_path.to_string_lossy().to_string();

        let db = Database::open_with(&self.config.storage).await?;
        let clock = Arc::new(ManualClock::new(self.start));
        let directory = SqliteDirectory::with_clock(db.clone(), clock.clone());

        let mut staff = Vec::new();
        for (external_id, name, role) in [
            (ADMIN, "Ada Admin", Role::Admin),
            (MANAGER, "Max Manager", Role::Manager),
            (BARISTA, "Bea Barista", Role::Barista),
        ] {
            staff.push(
                directory
                    .create_staff(&NewStaff {
                        external_id: external_id.to_string(),
                        name: name.to_string(),
                        role,
                    })
                    .await?,
            );
        }

        let bot = Bot::from_database(db.clone(), &self.config, clock.clone());
        let ledger = PointLedger::with_clock(db.clone(), clock.clone());

        Ok(TestHarness {
            bot,
            ledger,
            directory,
            db,
            clock,
            staff,
            config: self.config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete bot over a temp database.
pub struct TestHarness {
    pub bot: Bot,
    /// Ledger over the same database, for setup and assertions.
    pub ledger: PointLedger,
    pub directory: SqliteDirectory,
    pub db: Database,
    pub clock: Arc<ManualClock>,
    /// Seeded admin, manager and barista, in that order.
    pub staff: Vec<StaffUser>,
    pub config: PerksConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with default configuration.
    pub async fn new() -> Result<Self, PerksError> {
        Self::builder().build().await
    }

    /// Seeded staff member with `role`.
    pub fn staff(&self, role: Role) -> Option<&StaffUser> {
        self.staff.iter().find(|s| s.role == role)
    }

    /// Register a walk-in client and give them an opening balance.
    pub async fn client_with_balance(&self, name: &str, balance: i64) -> Result<Client, PerksError> {
        let client = self
            .directory
            .create_client(&NewClient {
                name: name.to_string(),
                ..NewClient::default()
            })
            .await?;
        if balance > 0 {
            let admin = self
                .staff(Role::Admin)
                .ok_or_else(|| PerksError::StaffNotFound("seeded admin".into()))?;
            self.ledger
                .adjust(client.id, admin.id, balance, "opening balance")
                .await?;
        }
        self.client(client.id).await
    }

    pub async fn client(&self, id: i64) -> Result<Client, PerksError> {
        self.directory
            .get_client(id)
            .await?
            .ok_or_else(|| PerksError::ClientNotFound(format!("id {id}")))
    }

    /// Send free text as `user_key`.
    pub async fn send(&self, user_key: &str, text: &str) -> Reply {
        self.bot.handle(user_key, Input::text(text)).await
    }

    /// Select a menu action as `user_key`.
    pub async fn act(&self, user_key: &str, action: Action) -> Reply {
        self.bot.handle(user_key, Input::Action(action)).await
    }

    /// Stored session of `user_key`. Reading slides its expiry.
    pub async fn session(&self, user_key: &str) -> SessionState {
        self.bot.sessions().get(user_key).await
    }
}
