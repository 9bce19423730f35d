// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Staff account CRUD operations.

use perks_core::types::{NewStaff, Role, StaffUser};
use perks_core::PerksError;
use rusqlite::{params, Connection, OptionalExtension};

use crate::database::{map_call_err, map_tr_err, sql_err, Database};
use crate::models::{staff_from_row, STAFF_COLUMNS};

/// Load a staff member inside an open connection or transaction.
pub fn get_in(conn: &Connection, id: i64) -> rusqlite::Result<Option<StaffUser>> {
    conn.query_row(
        &format!("SELECT {STAFF_COLUMNS} FROM staff WHERE id = ?1"),
        params![id],
        staff_from_row,
    )
    .optional()
}

pub async fn get(db: &Database, id: i64) -> Result<Option<StaffUser>, PerksError> {
    db.connection()
        .call(move |conn| get_in(conn, id))
        .await
        .map_err(map_tr_err)
}

/// Get a staff member by transport identifier, active or not.
pub async fn find_by_external_id(
    db: &Database,
    external_id: &str,
) -> Result<Option<StaffUser>, PerksError> {
    let external_id = external_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {STAFF_COLUMNS} FROM staff WHERE external_id = ?1"),
                params![external_id],
                staff_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Create a staff account.
///
/// Client accounts cannot be staff: the role must be barista or above, and
/// the external id must not belong to a client.
pub async fn create(db: &Database, new: &NewStaff, now: &str) -> Result<StaffUser, PerksError> {
    if !new.role.is_staff() {
        return Err(PerksError::invalid("role", "staff accounts need a staff role"));
    }
    let new = new.clone();
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction().map_err(sql_err)?;
            let taken: Option<i64> = tx
                .query_row(
                    "SELECT id FROM staff WHERE external_id = ?1
                     UNION ALL
                     SELECT id FROM clients WHERE external_id = ?1
                     LIMIT 1",
                    params![new.external_id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(sql_err)?;
            if taken.is_some() {
                return Err(PerksError::duplicate("external id", new.external_id.as_str()));
            }

            tx.execute(
                "INSERT INTO staff (external_id, name, role, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![new.external_id, new.name, new.role.to_string(), now],
            )
            .map_err(sql_err)?;
            let id = tx.last_insert_rowid();
            let staff = get_in(&tx, id)
                .map_err(sql_err)?
                .ok_or_else(|| PerksError::Internal(format!("staff {id} vanished after insert")))?;
            tx.commit().map_err(sql_err)?;
            Ok(staff)
        })
        .await
        .map_err(map_call_err)
}

pub async fn rename(db: &Database, id: i64, name: &str, now: &str) -> Result<StaffUser, PerksError> {
    let name = name.to_string();
    update(db, id, now, move |conn, now| {
        conn.execute(
            "UPDATE staff SET name = ?1, updated_at = ?2 WHERE id = ?3",
            params![name, now, id],
        )
    })
    .await
}

pub async fn set_role(db: &Database, id: i64, role: Role, now: &str) -> Result<StaffUser, PerksError> {
    if !role.is_staff() {
        return Err(PerksError::invalid("role", "staff accounts need a staff role"));
    }
    update(db, id, now, move |conn, now| {
        conn.execute(
            "UPDATE staff SET role = ?1, updated_at = ?2 WHERE id = ?3",
            params![role.to_string(), now, id],
        )
    })
    .await
}

pub async fn set_active(
    db: &Database,
    id: i64,
    active: bool,
    now: &str,
) -> Result<StaffUser, PerksError> {
    update(db, id, now, move |conn, now| {
        conn.execute(
            "UPDATE staff SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
            params![active, now, id],
        )
    })
    .await
}

/// All active staff, highest role first, then lowest id.
pub async fn list_active(db: &Database) -> Result<Vec<StaffUser>, PerksError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {STAFF_COLUMNS} FROM staff
                 WHERE is_active = 1
                 ORDER BY CASE role WHEN 'admin' THEN 3 WHEN 'manager' THEN 2 ELSE 1 END DESC,
                          id ASC"
            ))?;
            let rows = stmt.query_map([], staff_from_row)?;
            let mut staff = Vec::new();
            for row in rows {
                staff.push(row?);
            }
            Ok(staff)
        })
        .await
        .map_err(map_tr_err)
}

async fn update<F>(db: &Database, id: i64, now: &str, apply: F) -> Result<StaffUser, PerksError>
where
    F: FnOnce(&Connection, &str) -> rusqlite::Result<usize> + Send + 'static,
{
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            let changed = apply(conn, &now).map_err(sql_err)?;
            if changed == 0 {
                return Err(PerksError::StaffNotFound(format!("id {id}")));
            }
            get_in(conn, id)
                .map_err(sql_err)?
                .ok_or_else(|| PerksError::StaffNotFound(format!("id {id}")))
        })
        .await
        .map_err(map_call_err)
}
