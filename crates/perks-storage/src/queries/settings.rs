// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime setting overrides.

use perks_core::types::SettingKey;
use perks_core::PerksError;
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};

pub async fn get_setting(db: &Database, key: SettingKey) -> Result<Option<i64>, PerksError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key.to_string()],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_setting(
    db: &Database,
    key: SettingKey,
    value: i64,
    updated_by: i64,
    now: &str,
) -> Result<(), PerksError> {
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO settings (key, value, updated_by, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     updated_by = excluded.updated_by,
                     updated_at = excluded.updated_at",
                params![key.to_string(), value, updated_by, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::staff;
    use perks_core::{NewStaff, Role};

    #[tokio::test]
    async fn set_then_get_overrides() {
        let db = Database::open_in_memory().await.unwrap();
        let admin = staff::create(
            &db,
            &NewStaff {
                external_id: "admin".into(),
                name: "Admin".into(),
                role: Role::Admin,
            },
            "2026-01-01T00:00:00.000Z",
        )
        .await
        .unwrap();

        assert_eq!(get_setting(&db, SettingKey::QuickCommandLimit).await.unwrap(), None);
        set_setting(&db, SettingKey::QuickCommandLimit, 500, admin.id, "2026-01-01T00:00:00.000Z")
            .await
            .unwrap();
        set_setting(&db, SettingKey::QuickCommandLimit, 750, admin.id, "2026-01-02T00:00:00.000Z")
            .await
            .unwrap();
        assert_eq!(get_setting(&db, SettingKey::QuickCommandLimit).await.unwrap(), Some(750));
        assert_eq!(get_setting(&db, SettingKey::ManualAmountLimit).await.unwrap(), None);
    }
}
