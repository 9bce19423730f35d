// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client CRUD operations.
//!
//! Nothing here writes `balance`, `visit_count`, or `last_visit`; those are
//! owned by the point ledger.

use perks_core::types::{Client, ClientFieldValue, NewClient};
use perks_core::PerksError;
use rusqlite::{params, Connection, OptionalExtension};

use crate::database::{map_call_err, map_tr_err, sql_err, Database};
use crate::models::{client_from_row, CLIENT_COLUMNS};

/// Load a client inside an open connection or transaction.
pub fn get_in(conn: &Connection, id: i64) -> rusqlite::Result<Option<Client>> {
    conn.query_row(
        &format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1"),
        params![id],
        client_from_row,
    )
    .optional()
}

/// Get a client by internal id.
pub async fn get(db: &Database, id: i64) -> Result<Option<Client>, PerksError> {
    db.connection()
        .call(move |conn| get_in(conn, id))
        .await
        .map_err(map_tr_err)
}

/// Get a client by card number.
pub async fn find_by_card(db: &Database, card_number: &str) -> Result<Option<Client>, PerksError> {
    find_by(db, "card_number", card_number).await
}

/// Get a client by normalized phone number.
pub async fn find_by_phone(db: &Database, phone: &str) -> Result<Option<Client>, PerksError> {
    find_by(db, "phone", phone).await
}

/// Get a client by chat-transport identifier.
pub async fn find_by_external_id(
    db: &Database,
    external_id: &str,
) -> Result<Option<Client>, PerksError> {
    find_by(db, "external_id", external_id).await
}

async fn find_by(
    db: &Database,
    column: &'static str,
    value: &str,
) -> Result<Option<Client>, PerksError> {
    let value = value.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE {column} = ?1"),
                params![value],
                client_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Search active clients by exact card number, phone digits, or name substring.
///
/// Exact card matches sort first, then by name.
pub async fn search(db: &Database, query: &str, limit: usize) -> Result<Vec<Client>, PerksError> {
    let query = query.trim().to_string();
    if query.is_empty() {
        return Ok(Vec::new());
    }
    let digits: String = query.chars().filter(char::is_ascii_digit).collect();
    // Short digit runs would match half the phone book.
    let phone_digits = if digits.len() >= 4 { digits } else { String::new() };
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CLIENT_COLUMNS} FROM clients
                 WHERE is_active = 1 AND (
                     card_number = ?1
                     OR (?2 <> '' AND REPLACE(REPLACE(phone, '+', ''), ' ', '') LIKE '%' || ?2 || '%')
                     OR LOWER(name) LIKE '%' || LOWER(?1) || '%'
                 )
                 ORDER BY (card_number = ?1) DESC, name ASC, id ASC
                 LIMIT ?3"
            ))?;
            let rows = stmt.query_map(params![query, phone_digits, limit], client_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Ids of every client, active or not, in id order.
pub async fn list_ids(db: &Database) -> Result<Vec<i64>, PerksError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM clients ORDER BY id")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<Vec<i64>>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a client and issue the next sequential card number.
///
/// The phone must be unused, and the external id must belong to neither a
/// client nor a staff member.
pub async fn create(db: &Database, new: &NewClient, now: &str) -> Result<Client, PerksError> {
    let new = new.clone();
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction().map_err(sql_err)?;

            if let Some(phone) = &new.phone
                && exists(&tx, "SELECT 1 FROM clients WHERE phone = ?1", phone)?
            {
                return Err(PerksError::duplicate("phone", phone.as_str()));
            }
            if let Some(external_id) = &new.external_id
                && (exists(&tx, "SELECT 1 FROM clients WHERE external_id = ?1", external_id)?
                    || exists(&tx, "SELECT 1 FROM staff WHERE external_id = ?1", external_id)?)
            {
                return Err(PerksError::duplicate("external id", external_id.as_str()));
            }

            tx.execute(
                "INSERT INTO clients
                     (external_id, card_number, name, phone, birth_date, notes, created_at, updated_at)
                 VALUES (
                     ?1,
                     (SELECT CAST(COALESCE(MAX(CAST(card_number AS INTEGER)), 0) + 1 AS TEXT) FROM clients),
                     ?2, ?3, ?4, ?5, ?6, ?6
                 )",
                params![
                    new.external_id,
                    new.name,
                    new.phone,
                    new.birth_date,
                    new.notes,
                    now,
                ],
            )
            .map_err(sql_err)?;
            let id = tx.last_insert_rowid();
            let client = get_in(&tx, id)
                .map_err(sql_err)?
                .ok_or_else(|| PerksError::Internal(format!("client {id} vanished after insert")))?;
            tx.commit().map_err(sql_err)?;
            Ok(client)
        })
        .await
        .map_err(map_call_err)
}

/// Replace one profile attribute. A new phone must not belong to another client.
pub async fn update_field(
    db: &Database,
    id: i64,
    value: &ClientFieldValue,
    now: &str,
) -> Result<Client, PerksError> {
    let value = value.clone();
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction().map_err(sql_err)?;
            let changed = match &value {
                ClientFieldValue::Name(name) => tx.execute(
                    "UPDATE clients SET name = ?1, updated_at = ?2 WHERE id = ?3",
                    params![name, now, id],
                ),
                ClientFieldValue::Phone(phone) => {
                    if let Some(phone) = phone {
                        let taken: Option<i64> = tx
                            .query_row(
                                "SELECT id FROM clients WHERE phone = ?1 AND id <> ?2",
                                params![phone, id],
                                |row| row.get(0),
                            )
                            .optional()
                            .map_err(sql_err)?;
                        if taken.is_some() {
                            return Err(PerksError::duplicate("phone", phone.as_str()));
                        }
                    }
                    tx.execute(
                        "UPDATE clients SET phone = ?1, updated_at = ?2 WHERE id = ?3",
                        params![phone, now, id],
                    )
                }
                ClientFieldValue::BirthDate(date) => tx.execute(
                    "UPDATE clients SET birth_date = ?1, updated_at = ?2 WHERE id = ?3",
                    params![date, now, id],
                ),
                ClientFieldValue::Notes(notes) => tx.execute(
                    "UPDATE clients SET notes = ?1, updated_at = ?2 WHERE id = ?3",
                    params![notes, now, id],
                ),
            }
            .map_err(sql_err)?;

            if changed == 0 {
                return Err(PerksError::ClientNotFound(format!("id {id}")));
            }
            let client = get_in(&tx, id)
                .map_err(sql_err)?
                .ok_or_else(|| PerksError::ClientNotFound(format!("id {id}")))?;
            tx.commit().map_err(sql_err)?;
            Ok(client)
        })
        .await
        .map_err(map_call_err)
}

/// Append a line to the client's notes.
pub async fn append_note(
    db: &Database,
    id: i64,
    note: &str,
    now: &str,
) -> Result<Client, PerksError> {
    let note = note.to_string();
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE clients SET
                         notes = CASE WHEN notes IS NULL OR notes = '' THEN ?1
                                      ELSE notes || char(10) || ?1 END,
                         updated_at = ?2
                     WHERE id = ?3",
                    params![note, now, id],
                )
                .map_err(sql_err)?;
            if changed == 0 {
                return Err(PerksError::ClientNotFound(format!("id {id}")));
            }
            get_in(conn, id)
                .map_err(sql_err)?
                .ok_or_else(|| PerksError::ClientNotFound(format!("id {id}")))
        })
        .await
        .map_err(map_call_err)
}

/// Soft-delete (`active = false`) or restore a client.
pub async fn set_active(
    db: &Database,
    id: i64,
    active: bool,
    now: &str,
) -> Result<Client, PerksError> {
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE clients SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
                    params![active, now, id],
                )
                .map_err(sql_err)?;
            if changed == 0 {
                return Err(PerksError::ClientNotFound(format!("id {id}")));
            }
            get_in(conn, id)
                .map_err(sql_err)?
                .ok_or_else(|| PerksError::ClientNotFound(format!("id {id}")))
        })
        .await
        .map_err(map_call_err)
}

fn exists(conn: &Connection, sql: &str, value: &str) -> Result<bool, PerksError> {
    conn.query_row(sql, params![value], |_| Ok(()))
        .optional()
        .map(|row| row.is_some())
        .map_err(sql_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: &str = "2026-03-01T10:00:00.000Z";

    fn new_client(name: &str, phone: Option<&str>) -> NewClient {
        NewClient {
            name: name.to_string(),
            phone: phone.map(str::to_string),
            ..NewClient::default()
        }
    }

    #[tokio::test]
    async fn card_numbers_are_sequential() {
        let db = Database::open_in_memory().await.unwrap();
        let a = create(&db, &new_client("Ann", None), NOW).await.unwrap();
        let b = create(&db, &new_client("Bob", None), NOW).await.unwrap();
        let c = create(&db, &new_client("Cat", None), NOW).await.unwrap();
        assert_eq!(a.card_number, "1");
        assert_eq!(b.card_number, "2");
        assert_eq!(c.card_number, "3");
        assert_eq!(a.balance, 0);
        assert!(a.is_active);
    }

    #[tokio::test]
    async fn duplicate_phone_is_rejected() {
        let db = Database::open_in_memory().await.unwrap();
        create(&db, &new_client("Ann", Some("+15550001111")), NOW)
            .await
            .unwrap();
        let err = create(&db, &new_client("Bob", Some("+15550001111")), NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, PerksError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn external_id_of_staff_is_rejected() {
        let db = Database::open_in_memory().await.unwrap();
        crate::queries::staff::create(
            &db,
            &perks_core::NewStaff {
                external_id: "tg-1".into(),
                name: "Barista".into(),
                role: perks_core::Role::Barista,
            },
            NOW,
        )
        .await
        .unwrap();

        let mut client = new_client("Ann", None);
        client.external_id = Some("tg-1".into());
        let err = create(&db, &client, NOW).await.unwrap_err();
        assert!(matches!(err, PerksError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn search_prefers_exact_card_then_name() {
        let db = Database::open_in_memory().await.unwrap();
        create(&db, &new_client("Zed", None), NOW).await.unwrap(); // card 1
        create(&db, &new_client("Anna 1", None), NOW).await.unwrap(); // card 2
        let hits = search(&db, "1", 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].card_number, "1");

        let by_name = search(&db, "anna", 10).await.unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].name, "Anna 1");
    }

    #[tokio::test]
    async fn search_matches_phone_digits_and_skips_inactive() {
        let db = Database::open_in_memory().await.unwrap();
        let ann = create(&db, &new_client("Ann", Some("+15550001111")), NOW)
            .await
            .unwrap();
        let hits = search(&db, "0001111", 10).await.unwrap();
        assert_eq!(hits.len(), 1);

        set_active(&db, ann.id, false, NOW).await.unwrap();
        assert!(search(&db, "0001111", 10).await.unwrap().is_empty());
        assert!(get(&db, ann.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn update_phone_to_taken_number_fails() {
        let db = Database::open_in_memory().await.unwrap();
        create(&db, &new_client("Ann", Some("+100000001")), NOW)
            .await
            .unwrap();
        let bob = create(&db, &new_client("Bob", Some("+100000002")), NOW)
            .await
            .unwrap();
        let err = update_field(
            &db,
            bob.id,
            &ClientFieldValue::Phone(Some("+100000001".into())),
            NOW,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PerksError::Duplicate { .. }));

        let renamed = update_field(&db, bob.id, &ClientFieldValue::Name("Robert".into()), NOW)
            .await
            .unwrap();
        assert_eq!(renamed.name, "Robert");
    }

    #[tokio::test]
    async fn append_note_joins_lines() {
        let db = Database::open_in_memory().await.unwrap();
        let ann = create(&db, &new_client("Ann", None), NOW).await.unwrap();
        append_note(&db, ann.id, "oat milk", NOW).await.unwrap();
        let ann = append_note(&db, ann.id, "no sugar", NOW).await.unwrap();
        assert_eq!(ann.notes.as_deref(), Some("oat milk\nno sugar"));
    }

    #[tokio::test]
    async fn missing_client_updates_report_not_found() {
        let db = Database::open_in_memory().await.unwrap();
        let err = set_active(&db, 42, false, NOW).await.unwrap_err();
        assert!(matches!(err, PerksError::ClientNotFound(_)));
    }
}
