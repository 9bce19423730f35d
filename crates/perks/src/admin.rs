// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Administrative commands that work directly on the database.
//!
//! These run with the operator's shell access and bypass chat authorization.

use std::sync::Arc;

use chrono::Duration;
use colored::Colorize;
use perks_config::PerksConfig;
use perks_core::{
    ClientDirectory, Clock, NewStaff, PerksError, Role, StaffDirectory, StaffUser, SystemClock,
    Transaction,
};
use perks_ledger::{PointLedger, Reconciliation, SystemOperatorPolicy};
use perks_session::SessionStore;
use perks_storage::queries::clients;
use perks_storage::{Database, SqliteDirectory};
use tracing::info;

/// Result of a bonus request.
#[derive(Debug)]
pub enum BonusOutcome {
    Credited(Transaction),
    /// A bonus was already credited inside the cooldown window.
    Skipped,
}

/// Runs `perks sweep`.
pub async fn run_sweep(config: &PerksConfig) -> Result<(), PerksError> {
    let db = Database::open_with(&config.storage).await?;
    let store = SessionStore::from_config(db.clone(), &config.session, Arc::new(SystemClock));
    let removed = store.cleanup_expired().await?;
    db.close().await?;
    println!("removed {removed} expired session(s)");
    Ok(())
}

/// Runs `perks staff add`.
pub async fn run_staff_add(
    config: &PerksConfig,
    external_id: &str,
    name: &str,
    role: Role,
) -> Result<(), PerksError> {
    let db = Database::open_with(&config.storage).await?;
    let staff = add_staff(&db, external_id, name, role).await?;
    db.close().await?;
    println!(
        "{} {} ({}, id {})",
        "created".green(),
        staff.name.bold(),
        staff.role,
        staff.id
    );
    Ok(())
}

/// Runs `perks bonus`.
pub async fn run_bonus(
    config: &PerksConfig,
    card: &str,
    points: i64,
    comment: &str,
    cooldown_days: Option<u32>,
) -> Result<(), PerksError> {
    let db = Database::open_with(&config.storage).await?;
    let policy = SystemOperatorPolicy::from_config(&config.ledger);
    let outcome = credit_bonus(
        &db,
        Arc::new(SystemClock),
        &policy,
        card,
        points,
        comment,
        cooldown_days,
    )
    .await?;
    db.close().await?;
    match outcome {
        BonusOutcome::Credited(txn) => println!(
            "{} {} points to card {card} ({})",
            "credited".green(),
            txn.points,
            txn.id.dimmed()
        ),
        BonusOutcome::Skipped => println!(
            "{} card {card} already received a bonus in the last {} day(s)",
            "skipped".yellow(),
            cooldown_days.unwrap_or_default()
        ),
    }
    Ok(())
}

/// Runs `perks audit`. Fails if any balance disagrees with its ledger.
pub async fn run_audit(config: &PerksConfig) -> Result<(), PerksError> {
    let db = Database::open_with(&config.storage).await?;
    let reports = audit(&db).await?;
    db.close().await?;

    let broken: Vec<&Reconciliation> = reports.iter().filter(|r| !r.is_consistent()).collect();
    for report in &broken {
        println!(
            "{} client {}: balance {} but ledger sums to {} over {} entries",
            "mismatch".red(),
            report.client_id,
            report.balance,
            report.ledger_sum,
            report.transaction_count
        );
    }
    if broken.is_empty() {
        println!("{} {} client(s) reconciled", "ok".green(), reports.len());
        Ok(())
    } else {
        Err(PerksError::Internal(format!(
            "{} of {} client balances disagree with the ledger",
            broken.len(),
            reports.len()
        )))
    }
}

pub async fn add_staff(
    db: &Database,
    external_id: &str,
    name: &str,
    role: Role,
) -> Result<StaffUser, PerksError> {
    let directory = SqliteDirectory::new(db.clone());
    let staff = directory
        .create_staff(&NewStaff {
            external_id: external_id.trim().to_string(),
            name: name.trim().to_string(),
            role,
        })
        .await?;
    info!(staff_id = staff.id, role = %staff.role, "staff account created from the command line");
    Ok(staff)
}

/// Credit a bonus to `card`, attributed per `policy`, unless one was credited
/// within `cooldown_days`.
pub async fn credit_bonus(
    db: &Database,
    clock: Arc<dyn Clock>,
    policy: &SystemOperatorPolicy,
    card: &str,
    points: i64,
    comment: &str,
    cooldown_days: Option<u32>,
) -> Result<BonusOutcome, PerksError> {
    let directory = SqliteDirectory::with_clock(db.clone(), clock.clone());
    let client = directory
        .find_client_by_card(card)
        .await?
        .ok_or_else(|| PerksError::ClientNotFound(format!("card {card}")))?;

    let ledger = PointLedger::with_clock(db.clone(), clock.clone());
    if let Some(days) = cooldown_days {
        let since = clock.now() - Duration::days(i64::from(days));
        if ledger.has_bonus_since(client.id, since).await? {
            info!(client_id = client.id, days, "bonus skipped inside cooldown");
            return Ok(BonusOutcome::Skipped);
        }
    }

    let operator = ledger.system_operator(policy).await?;
    let txn = ledger.bonus(client.id, operator.id, points, comment).await?;
    Ok(BonusOutcome::Credited(txn))
}

/// Reconcile every client, active or not.
pub async fn audit(db: &Database) -> Result<Vec<Reconciliation>, PerksError> {
    let ledger = PointLedger::new(db.clone());
    let mut reports = Vec::new();
    for id in clients::list_ids(db).await? {
        reports.push(ledger.reconcile(id).await?);
    }
    Ok(reports)
}
