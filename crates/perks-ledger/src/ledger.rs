// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Earn, spend, adjust and bonus operations.
//!
//! Each write runs as one IMMEDIATE SQLite transaction on the storage writer
//! thread: validate the client and operator, update the balance relatively,
//! insert the ledger row, commit. Decrements are conditional on the balance
//! staying non-negative, so the check and the write cannot be separated by a
//! concurrent spend.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use perks_core::types::format_timestamp;
use perks_core::{Clock, PerksError, Role, StaffUser, SystemClock, Transaction, TransactionKind};
use perks_storage::queries::{clients, staff, transactions};
use perks_storage::{map_call_err, sql_err, Database};
use rusqlite::{params, TransactionBehavior};
use serde::Serialize;
use tracing::info;

use crate::operator::SystemOperatorPolicy;

/// Stored balance compared with the sum of the client's ledger rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub client_id: i64,
    pub balance: i64,
    pub ledger_sum: i64,
    pub transaction_count: i64,
}

impl Reconciliation {
    pub fn is_consistent(&self) -> bool {
        self.balance == self.ledger_sum
    }
}

/// A ledger write before it is committed.
struct Posting {
    client_id: i64,
    operator_id: i64,
    kind: TransactionKind,
    points: i64,
    amount: Option<f64>,
    description: Option<String>,
}

impl Posting {
    fn counts_visit(&self) -> bool {
        matches!(self.kind, TransactionKind::Earn | TransactionKind::Spend)
    }
}

/// The point ledger.
#[derive(Clone)]
pub struct PointLedger {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl PointLedger {
    pub fn new(db: Database) -> Self {
        Self::with_clock(db, Arc::new(SystemClock))
    }

    pub fn with_clock(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Credit a purchase. Counts as a visit.
    pub async fn earn(
        &self,
        client_id: i64,
        operator_id: i64,
        points: i64,
        amount: Option<f64>,
        comment: Option<&str>,
    ) -> Result<Transaction, PerksError> {
        require_positive(points)?;
        self.post(Posting {
            client_id,
            operator_id,
            kind: TransactionKind::Earn,
            points,
            amount,
            description: optional_comment(comment),
        })
        .await
    }

    /// Redeem points. Stored with negated points. Counts as a visit.
    pub async fn spend(
        &self,
        client_id: i64,
        operator_id: i64,
        points: i64,
        comment: Option<&str>,
    ) -> Result<Transaction, PerksError> {
        require_positive(points)?;
        self.post(Posting {
            client_id,
            operator_id,
            kind: TransactionKind::Spend,
            points: -points,
            amount: None,
            description: optional_comment(comment),
        })
        .await
    }

    /// Manual correction of either sign. Does not count as a visit.
    pub async fn adjust(
        &self,
        client_id: i64,
        operator_id: i64,
        delta: i64,
        comment: &str,
    ) -> Result<Transaction, PerksError> {
        if delta == 0 {
            return Err(PerksError::InvalidAmount { amount: delta });
        }
        self.post(Posting {
            client_id,
            operator_id,
            kind: TransactionKind::Adjust,
            points: delta,
            amount: None,
            description: Some(required_comment(comment)?),
        })
        .await
    }

    /// Promotional credit, reported separately from adjustments.
    pub async fn bonus(
        &self,
        client_id: i64,
        operator_id: i64,
        points: i64,
        comment: &str,
    ) -> Result<Transaction, PerksError> {
        require_positive(points)?;
        self.post(Posting {
            client_id,
            operator_id,
            kind: TransactionKind::Bonus,
            points,
            amount: None,
            description: Some(required_comment(comment)?),
        })
        .await
    }

    /// Current balance of a client, active or not.
    pub async fn balance(&self, client_id: i64) -> Result<i64, PerksError> {
        clients::get(&self.db, client_id)
            .await?
            .map(|c| c.balance)
            .ok_or_else(|| PerksError::ClientNotFound(format!("id {client_id}")))
    }

    /// Newest-first transactions of a client.
    pub async fn history(
        &self,
        client_id: i64,
        limit: usize,
    ) -> Result<Vec<Transaction>, PerksError> {
        transactions::list_for_client(&self.db, client_id, limit).await
    }

    /// Compare the stored balance with the ledger rows.
    pub async fn reconcile(&self, client_id: i64) -> Result<Reconciliation, PerksError> {
        let balance = self.balance(client_id).await?;
        let ledger_sum = transactions::sum_for_client(&self.db, client_id).await?;
        let transaction_count = transactions::count_for_client(&self.db, client_id).await?;
        Ok(Reconciliation {
            client_id,
            balance,
            ledger_sum,
            transaction_count,
        })
    }

    /// Whether a bonus was recorded for the client at or after `since`.
    pub async fn has_bonus_since(
        &self,
        client_id: i64,
        since: DateTime<Utc>,
    ) -> Result<bool, PerksError> {
        transactions::has_kind_since(
            &self.db,
            client_id,
            TransactionKind::Bonus,
            &format_timestamp(since),
        )
        .await
    }

    /// Staff account that system-initiated entries are attributed to.
    pub async fn system_operator(
        &self,
        policy: &SystemOperatorPolicy,
    ) -> Result<StaffUser, PerksError> {
        match policy {
            SystemOperatorPolicy::HighestRole => staff::list_active(&self.db)
                .await?
                .into_iter()
                .find(|s| s.role >= Role::Manager)
                .ok_or_else(|| PerksError::StaffNotFound("no active admin or manager".into())),
            SystemOperatorPolicy::ExternalId(external_id) => {
                staff::find_by_external_id(&self.db, external_id)
                    .await?
                    .filter(|s| s.is_active)
                    .ok_or_else(|| PerksError::StaffNotFound(external_id.clone()))
            }
        }
    }

    async fn post(&self, posting: Posting) -> Result<Transaction, PerksError> {
        let now = format_timestamp(self.clock.now());
        let txn = Transaction {
            id: uuid::Uuid::new_v4().to_string(),
            client_id: posting.client_id,
            operator_id: posting.operator_id,
            kind: posting.kind,
            points: posting.points,
            amount: posting.amount,
            description: posting.description.clone(),
            created_at: now.clone(),
        };
        let counts_visit = posting.counts_visit();

        let record = txn.clone();
        let balance = self
            .db
            .connection()
            .call(move |conn| {
                let tx = conn
                    .transaction_with_behavior(TransactionBehavior::Immediate)
                    .map_err(sql_err)?;

                let client = clients::get_in(&tx, record.client_id)
                    .map_err(sql_err)?
                    .ok_or_else(|| PerksError::ClientNotFound(format!("id {}", record.client_id)))?;
                if !client.is_active {
                    return Err(PerksError::ClientInactive(client.id));
                }
                let operator = staff::get_in(&tx, record.operator_id)
                    .map_err(sql_err)?
                    .filter(|s| s.is_active)
                    .ok_or_else(|| PerksError::StaffNotFound(format!("id {}", record.operator_id)))?;

                let insufficient = |balance: i64| PerksError::InsufficientBalance {
                    balance,
                    requested: record.points.saturating_neg(),
                };
                let balance = client
                    .balance
                    .checked_add(record.points)
                    .ok_or(PerksError::InvalidAmount {
                        amount: record.points,
                    })?;
                if balance < 0 {
                    return Err(insufficient(client.balance));
                }

                let changed = tx
                    .execute(
                        "UPDATE clients SET
                             balance = balance + ?1,
                             visit_count = visit_count + ?2,
                             last_visit = CASE WHEN ?2 = 1 THEN ?3 ELSE last_visit END,
                             updated_at = ?3
                         WHERE id = ?4 AND balance + ?1 >= 0",
                        params![record.points, i64::from(counts_visit), now, client.id],
                    )
                    .map_err(sql_err)?;
                if changed == 0 {
                    return Err(insufficient(client.balance));
                }

                transactions::insert_in(&tx, &record).map_err(sql_err)?;
                tx.commit().map_err(sql_err)?;
                tracing::debug!(operator = %operator.name, "ledger entry attributed");
                Ok(balance)
            })
            .await
            .map_err(map_call_err)?;

        info!(
            txn_id = %txn.id,
            client_id = txn.client_id,
            operator_id = txn.operator_id,
            kind = %txn.kind,
            points = txn.points,
            balance,
            "ledger entry committed"
        );
        Ok(txn)
    }
}

fn require_positive(points: i64) -> Result<(), PerksError> {
    if points <= 0 {
        return Err(PerksError::InvalidAmount { amount: points });
    }
    Ok(())
}

fn optional_comment(comment: Option<&str>) -> Option<String> {
    comment
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

fn required_comment(comment: &str) -> Result<String, PerksError> {
    let comment = comment.trim();
    if comment.is_empty() {
        return Err(PerksError::invalid("comment", "a reason is required"));
    }
    Ok(comment.to_string())
}
