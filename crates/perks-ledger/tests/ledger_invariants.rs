// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Balance invariants of the point ledger against a real SQLite file.

use perks_core::{NewClient, NewStaff, PerksError, Role, TransactionKind};
use perks_ledger::PointLedger;
use perks_storage::queries::{clients, staff};
use perks_storage::Database;
use proptest::prelude::*;
use tempfile::TempDir;

const NOW: &str = "2026-03-01T10:00:00.000Z";

async fn setup(opening_balance: i64) -> (PointLedger, i64, i64, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("ledger.db").to_str().unwrap())
        .await
        .unwrap();
    let client = clients::create(
        &db,
        &NewClient {
            name: "Ann".into(),
            ..NewClient::default()
        },
        NOW,
    )
    .await
    .unwrap();
    let operator = staff::create(
        &db,
        &NewStaff {
            external_id: "mgr".into(),
            name: "Max".into(),
            role: Role::Manager,
        },
        NOW,
    )
    .await
    .unwrap();
    let ledger = PointLedger::new(db);
    if opening_balance > 0 {
        ledger
            .adjust(client.id, operator.id, opening_balance, "opening balance")
            .await
            .unwrap();
    }
    (ledger, client.id, operator.id, dir)
}

#[tokio::test]
async fn earn_on_balance_100_gives_115() {
    let (ledger, client, operator, _dir) = setup(100).await;
    let before = ledger.history(client, 100).await.unwrap().len();

    let txn = ledger.earn(client, operator, 15, None, None).await.unwrap();

    assert_eq!(ledger.balance(client).await.unwrap(), 115);
    assert_eq!(txn.kind, TransactionKind::Earn);
    assert_eq!(txn.points, 15);
    let history = ledger.history(client, 100).await.unwrap();
    assert_eq!(history.len(), before + 1);
    assert_eq!(history[0].id, txn.id);
}

#[tokio::test]
async fn overdrawn_spend_changes_nothing() {
    let (ledger, client, operator, _dir) = setup(10).await;
    let before = ledger.history(client, 100).await.unwrap().len();

    let err = ledger.spend(client, operator, 50, None).await.unwrap_err();

    assert!(matches!(
        err,
        PerksError::InsufficientBalance {
            balance: 10,
            requested: 50
        }
    ));
    assert_eq!(ledger.balance(client).await.unwrap(), 10);
    assert_eq!(ledger.history(client, 100).await.unwrap().len(), before);
}

#[tokio::test]
async fn spend_of_exact_balance_reaches_zero() {
    let (ledger, client, operator, _dir) = setup(7).await;
    let txn = ledger.spend(client, operator, 7, Some("free coffee")).await.unwrap();
    assert_eq!(txn.points, -7);
    assert_eq!(ledger.balance(client).await.unwrap(), 0);
    assert!(ledger.reconcile(client).await.unwrap().is_consistent());
}

#[tokio::test]
async fn concurrent_spends_never_overdraw() {
    let (ledger, client, operator, _dir) = setup(10).await;
    let mut handles = Vec::new();
    for _ in 0..5 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            ledger.spend(client, operator, 4, None).await
        }));
    }
    let mut committed = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            committed += 1;
        }
    }
    assert_eq!(committed, 2);
    assert_eq!(ledger.balance(client).await.unwrap(), 2);
    assert!(ledger.reconcile(client).await.unwrap().is_consistent());
}

#[derive(Debug, Clone)]
enum Op {
    Earn(i64),
    Spend(i64),
    Adjust(i64),
    Bonus(i64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1i64..500).prop_map(Op::Earn),
        (1i64..500).prop_map(Op::Spend),
        (-300i64..300)
            .prop_filter("adjust delta must be non-zero", |d| *d != 0)
            .prop_map(Op::Adjust),
        (1i64..200).prop_map(Op::Bonus),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn balance_always_equals_ledger_sum(ops in proptest::collection::vec(op(), 1..25)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, client, operator, _dir) = setup(0).await;
            let mut expected = 0i64;
            let mut rows = 0i64;

            for op in ops {
                let result = match op {
                    Op::Earn(p) => ledger.earn(client, operator, p, None, None).await.map(|_| p),
                    Op::Spend(p) => ledger.spend(client, operator, p, None).await.map(|_| -p),
                    Op::Adjust(d) => ledger.adjust(client, operator, d, "fix").await.map(|_| d),
                    Op::Bonus(p) => ledger.bonus(client, operator, p, "promo").await.map(|_| p),
                };
                match result {
                    Ok(delta) => {
                        expected += delta;
                        rows += 1;
                    }
                    Err(PerksError::InsufficientBalance { balance, requested }) => {
                        assert_eq!(balance, expected);
                        assert!(requested > balance);
                    }
                    Err(other) => panic!("unexpected ledger error: {other}"),
                }

                let rec = ledger.reconcile(client).await.unwrap();
                assert!(rec.is_consistent(), "{rec:?}");
                assert_eq!(rec.balance, expected);
                assert!(rec.balance >= 0);
                assert_eq!(rec.transaction_count, rows);
            }
        });
    }
}
