// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the directory and settings traits.

use std::sync::Arc;

use async_trait::async_trait;
use perks_core::types::format_timestamp;
use perks_core::{
    Client, ClientDirectory, ClientFieldValue, Clock, NewClient, NewStaff, PerksError, Role,
    SettingKey, SettingsStore, StaffDirectory, StaffUser, SystemClock,
};

use crate::database::Database;
use crate::queries::{clients, settings, staff};

/// Directory backed by the shared [`Database`] handle.
#[derive(Clone)]
pub struct SqliteDirectory {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl SqliteDirectory {
    pub fn new(db: Database) -> Self {
        Self::with_clock(db, Arc::new(SystemClock))
    }

    pub fn with_clock(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn now(&self) -> String {
        format_timestamp(self.clock.now())
    }
}

#[async_trait]
impl ClientDirectory for SqliteDirectory {
    async fn get_client(&self, id: i64) -> Result<Option<Client>, PerksError> {
        clients::get(&self.db, id).await
    }

    async fn find_client_by_card(&self, card_number: &str) -> Result<Option<Client>, PerksError> {
        clients::find_by_card(&self.db, card_number).await
    }

    async fn find_client_by_phone(&self, phone: &str) -> Result<Option<Client>, PerksError> {
        clients::find_by_phone(&self.db, phone).await
    }

    async fn find_client_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Client>, PerksError> {
        clients::find_by_external_id(&self.db, external_id).await
    }

    async fn search_clients(&self, query: &str, limit: usize) -> Result<Vec<Client>, PerksError> {
        clients::search(&self.db, query, limit).await
    }

    async fn create_client(&self, client: &NewClient) -> Result<Client, PerksError> {
        let created = clients::create(&self.db, client, &self.now()).await?;
        tracing::info!(client_id = created.id, card = %created.card_number, "client registered");
        Ok(created)
    }

    async fn update_client_field(
        &self,
        id: i64,
        value: &ClientFieldValue,
    ) -> Result<Client, PerksError> {
        let updated = clients::update_field(&self.db, id, value, &self.now()).await?;
        tracing::debug!(client_id = id, field = %value.field(), "client field updated");
        Ok(updated)
    }

    async fn append_client_note(&self, id: i64, note: &str) -> Result<Client, PerksError> {
        clients::append_note(&self.db, id, note, &self.now()).await
    }

    async fn set_client_active(&self, id: i64, active: bool) -> Result<Client, PerksError> {
        let client = clients::set_active(&self.db, id, active, &self.now()).await?;
        tracing::info!(client_id = id, active, "client activity changed");
        Ok(client)
    }
}

#[async_trait]
impl StaffDirectory for SqliteDirectory {
    async fn get_staff(&self, id: i64) -> Result<Option<StaffUser>, PerksError> {
        staff::get(&self.db, id).await
    }

    async fn find_staff_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<StaffUser>, PerksError> {
        staff::find_by_external_id(&self.db, external_id).await
    }

    async fn create_staff(&self, new: &NewStaff) -> Result<StaffUser, PerksError> {
        let created = staff::create(&self.db, new, &self.now()).await?;
        tracing::info!(staff_id = created.id, role = %created.role, "staff account created");
        Ok(created)
    }

    async fn rename_staff(&self, id: i64, name: &str) -> Result<StaffUser, PerksError> {
        staff::rename(&self.db, id, name, &self.now()).await
    }

    async fn set_staff_role(&self, id: i64, role: Role) -> Result<StaffUser, PerksError> {
        let updated = staff::set_role(&self.db, id, role, &self.now()).await?;
        tracing::info!(staff_id = id, %role, "staff role changed");
        Ok(updated)
    }

    async fn set_staff_active(&self, id: i64, active: bool) -> Result<StaffUser, PerksError> {
        let updated = staff::set_active(&self.db, id, active, &self.now()).await?;
        tracing::info!(staff_id = id, active, "staff activity changed");
        Ok(updated)
    }

    async fn list_active_staff(&self) -> Result<Vec<StaffUser>, PerksError> {
        staff::list_active(&self.db).await
    }
}

#[async_trait]
impl SettingsStore for SqliteDirectory {
    async fn get_setting(&self, key: SettingKey) -> Result<Option<i64>, PerksError> {
        settings::get_setting(&self.db, key).await
    }

    async fn set_setting(
        &self,
        key: SettingKey,
        value: i64,
        updated_by: i64,
    ) -> Result<(), PerksError> {
        settings::set_setting(&self.db, key, value, updated_by, &self.now()).await?;
        tracing::info!(%key, value, updated_by, "setting stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use perks_core::ManualClock;

    #[tokio::test]
    async fn timestamps_come_from_the_clock() {
        let db = Database::open_in_memory().await.unwrap();
        let at = Utc.with_ymd_and_hms(2026, 4, 1, 8, 30, 0).unwrap();
        let dir = SqliteDirectory::with_clock(db, Arc::new(ManualClock::new(at)));

        let client = dir
            .create_client(&NewClient {
                name: "Ann".into(),
                ..NewClient::default()
            })
            .await
            .unwrap();
        assert_eq!(client.created_at, "2026-04-01T08:30:00.000Z");
    }

    #[tokio::test]
    async fn trait_objects_share_one_database() {
        let db = Database::open_in_memory().await.unwrap();
        let dir = SqliteDirectory::new(db);
        let clients: Arc<dyn ClientDirectory> = Arc::new(dir.clone());
        let staff: Arc<dyn StaffDirectory> = Arc::new(dir.clone());

        staff
            .create_staff(&NewStaff {
                external_id: "tg-9".into(),
                name: "Op".into(),
                role: Role::Manager,
            })
            .await
            .unwrap();
        let err = clients
            .create_client(&NewClient {
                external_id: Some("tg-9".into()),
                name: "Ann".into(),
                ..NewClient::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PerksError::Duplicate { .. }));
    }
}
