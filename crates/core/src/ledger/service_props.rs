//! Property-based tests for LedgerService.
//!
//! - Random operation sequences never leave an audit finding behind
//! - Every successful money movement adds exactly one log record
//! - Rejected operations change nothing

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::audit::audit_account;
use super::memory::InMemoryLedgerStore;
use super::service::LedgerService;
use super::types::{AccountType, CreatePocketInput, NewAccount};
use pocketbook_shared::types::{PocketId, UserId};

/// One step of a generated scenario. Pocket indices wrap around the
/// account's current pockets.
#[derive(Debug, Clone)]
enum Op {
    Deposit(i64),
    Transfer(usize, usize, i64),
    Withdraw(usize, i64),
    Reconcile(i64),
    CreatePocket,
    DeletePocket(usize),
}

/// Strategy to generate amounts in cents, including zero and negatives.
fn cents() -> impl Strategy<Value = i64> {
    prop_oneof![
        8 => 1i64..50_000i64,
        1 => Just(0i64),
        1 => -5_000i64..0i64,
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => cents().prop_map(Op::Deposit),
        3 => (0usize..8, 0usize..8, cents()).prop_map(|(a, b, c)| Op::Transfer(a, b, c)),
        2 => (0usize..8, cents()).prop_map(|(a, c)| Op::Withdraw(a, c)),
        1 => (0i64..20_000i64).prop_map(Op::Reconcile),
        1 => Just(Op::CreatePocket),
        1 => (0usize..8).prop_map(Op::DeletePocket),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn pick(pockets: &[PocketId], index: usize) -> PocketId {
    pockets[index % pockets.len()]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Invariants hold after any sequence of operations, and the log grows
    /// by exactly one record per successful money movement.
    #[test]
    fn prop_random_operations_keep_ledger_consistent(
        ops in prop::collection::vec(op_strategy(), 1..40)
    ) {
        let rt = runtime();
        rt.block_on(async {
            let svc = LedgerService::new(InMemoryLedgerStore::new());
            let user = UserId::new();
            let created = svc
                .create_account(user, NewAccount {
                    account_type: AccountType::Saving,
                    name: "Main".into(),
                    bank: "BCA".into(),
                })
                .await
                .unwrap();
            let account = created.account.id;
            let mut expected_log = 0usize;

            for op in ops {
                let pockets: Vec<PocketId> = svc
                    .get_pockets(user, account)
                    .await
                    .unwrap()
                    .iter()
                    .map(|p| p.id)
                    .collect();
                let before = svc.store().snapshot().await;

                let moved = match op {
                    Op::Deposit(c) => svc
                        .deposit(user, account, Decimal::new(c, 2))
                        .await
                        .is_ok(),
                    Op::Transfer(a, b, c) => svc
                        .transfer(user, pick(&pockets, a), pick(&pockets, b), Decimal::new(c, 2))
                        .await
                        .is_ok(),
                    Op::Withdraw(a, c) => svc
                        .withdraw(user, pick(&pockets, a), Decimal::new(c, 2))
                        .await
                        .is_ok(),
                    Op::Reconcile(extra) => {
                        let current = svc.get_account(user, account).await.unwrap().balance;
                        matches!(
                            svc.reconcile_balance(user, account, current + Decimal::new(extra, 2)).await,
                            Ok(Some(_))
                        )
                    }
                    Op::CreatePocket => {
                        svc.create_pocket(user, CreatePocketInput {
                            account_id: account,
                            name: "Pocket".into(),
                        })
                        .await
                        .unwrap();
                        false
                    }
                    Op::DeletePocket(a) => {
                        let _ = svc.delete_pocket(user, pick(&pockets, a)).await;
                        false
                    }
                };

                let after = svc.store().snapshot().await;
                if moved {
                    expected_log += 1;
                } else {
                    prop_assert_eq!(&after.accounts, &before.accounts);
                    prop_assert_eq!(&after.transactions, &before.transactions);
                }

                for acc in &after.accounts {
                    prop_assert!(acc.balance >= Decimal::ZERO);
                    let findings = audit_account(acc, &after.pockets);
                    prop_assert!(findings.is_empty(), "findings: {:?}", findings);
                }
                for pocket in &after.pockets {
                    prop_assert!(pocket.balance >= Decimal::ZERO);
                }
                prop_assert_eq!(after.transactions.len(), expected_log);
            }
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Transfers between two pockets of one account conserve their sum.
    #[test]
    fn prop_transfer_conserves_pair_total(
        deposit in 1i64..1_000_000i64,
        transfer in 1i64..1_000_000i64,
    ) {
        let rt = runtime();
        rt.block_on(async {
            let svc = LedgerService::new(InMemoryLedgerStore::new());
            let user = UserId::new();
            let created = svc
                .create_account(user, NewAccount {
                    account_type: AccountType::Fcd,
                    name: "Main".into(),
                    bank: "BNI".into(),
                })
                .await
                .unwrap();
            let account = created.account.id;
            let cashbox = created.pockets[0].id;
            let target = svc
                .create_pocket(user, CreatePocketInput { account_id: account, name: "Target".into() })
                .await
                .unwrap()
                .id;
            svc.deposit(user, account, Decimal::new(deposit, 2)).await.unwrap();

            let result = svc.transfer(user, cashbox, target, Decimal::new(transfer, 2)).await;
            prop_assert_eq!(result.is_ok(), transfer <= deposit);

            let pockets = svc.get_pockets(user, account).await.unwrap();
            let total: Decimal = pockets.iter().map(|p| p.balance).sum();
            prop_assert_eq!(total, Decimal::new(deposit, 2));
            Ok::<(), TestCaseError>(())
        })?;
    }
}
