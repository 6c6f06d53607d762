//! Orchestrator tests against the in-memory store.

use pocketbook_shared::config::LedgerConfig;
use pocketbook_shared::types::{AccountId, PocketId, UserId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::audit::audit_account;
use super::error::ErrorKind;
use super::memory::{FailPoint, InMemoryLedgerStore, MemoryState};
use super::service::{DEFAULT_CASHBOX_NAME, LedgerService};
use super::types::{
    AccountType, AccountWithPockets, CreatePocketInput, NewAccount, PocketType, TransactionKind,
    UpdateAccountInput, UpdatePocketInput,
};

fn service() -> LedgerService<InMemoryLedgerStore> {
    LedgerService::new(InMemoryLedgerStore::new())
}

fn saving(name: &str) -> NewAccount {
    NewAccount {
        account_type: AccountType::Saving,
        name: name.to_string(),
        bank: "BCA".to_string(),
    }
}

async fn open_account(svc: &LedgerService<InMemoryLedgerStore>, user: UserId) -> (AccountId, PocketId) {
    let created = svc.create_account(user, saving("Main")).await.unwrap();
    (created.account.id, created.pockets[0].id)
}

async fn add_pocket(
    svc: &LedgerService<InMemoryLedgerStore>,
    user: UserId,
    account_id: AccountId,
    name: &str,
) -> PocketId {
    svc.create_pocket(
        user,
        CreatePocketInput {
            account_id,
            name: name.to_string(),
        },
    )
    .await
    .unwrap()
    .id
}

fn assert_consistent(state: &MemoryState) {
    for account in &state.accounts {
        let findings = audit_account(account, &state.pockets);
        assert!(findings.is_empty(), "unexpected findings: {findings:?}");
    }
}

fn balance_of(view: &AccountWithPockets, pocket: PocketId) -> Decimal {
    view.pockets
        .iter()
        .find(|p| p.id == pocket)
        .map(|p| p.balance)
        .unwrap()
}

// ============================================================================
// Scenario
// ============================================================================

#[tokio::test]
async fn test_deposit_transfer_overdraw_scenario() {
    let svc = service();
    let user = UserId::new();
    let (account, cashbox) = open_account(&svc, user).await;
    let p = add_pocket(&svc, user, account, "Rent").await;

    svc.deposit(user, account, dec!(100.00)).await.unwrap();
    svc.transfer(user, cashbox, p, dec!(40.00)).await.unwrap();
    let err = svc.withdraw(user, p, dec!(50.00)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientBalance);

    let view = svc.get_account_with_pockets(user, account).await.unwrap();
    assert_eq!(view.account.balance, dec!(100.00));
    assert_eq!(balance_of(&view, cashbox), dec!(60.00));
    assert_eq!(balance_of(&view, p), dec!(40.00));

    let log = svc.get_transactions(user, account).await.unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].kind, TransactionKind::Transfer { from: cashbox, to: p });
    assert_eq!(log[0].amount.value(), dec!(40.00));
    assert_eq!(log[1].kind, TransactionKind::Deposit { to: cashbox });
    assert_eq!(log[1].amount.value(), dec!(100.00));

    assert_consistent(&svc.store().snapshot().await);
}

// ============================================================================
// Accounts
// ============================================================================

#[tokio::test]
async fn test_create_account_creates_single_cashbox() {
    let svc = service();
    let user = UserId::new();
    let created = svc.create_account(user, saving("Main")).await.unwrap();

    assert_eq!(created.account.balance, Decimal::ZERO);
    assert_eq!(created.pockets.len(), 1);
    assert_eq!(created.pockets[0].pocket_type, PocketType::Cashbox);
    assert_eq!(created.pockets[0].name, "Cashbox");

    let view = svc.get_account_with_pockets(user, created.account.id).await.unwrap();
    assert_eq!(view, created);
}

#[tokio::test]
async fn test_cashbox_name_is_configurable() {
    let svc = service().with_cashbox_name("Wallet");
    let created = svc.create_account(UserId::new(), saving("Main")).await.unwrap();
    assert_eq!(created.pockets[0].name, "Wallet");
}

#[tokio::test]
async fn test_default_cashbox_name_matches_config_default() {
    let configured = LedgerConfig::default().cashbox_name;
    let created = service().create_account(UserId::new(), saving("Main")).await.unwrap();
    assert_eq!(created.pockets[0].name, configured);
    assert_eq!(configured, DEFAULT_CASHBOX_NAME);
}

#[tokio::test]
async fn test_create_account_requires_name_and_bank() {
    let svc = service();
    let input = NewAccount {
        account_type: AccountType::Stock,
        name: "  ".into(),
        bank: "BCA".into(),
    };
    let err = svc.create_account(UserId::new(), input).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(svc.store().snapshot().await.accounts.is_empty());
}

#[tokio::test]
async fn test_create_account_rolls_back_when_cashbox_fails() {
    let svc = service();
    let user = UserId::new();
    svc.store().fail_on(FailPoint::CreatePocket);

    let err = svc.create_account(user, saving("Main")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);

    svc.store().clear_failure();
    assert!(svc.get_accounts(user).await.unwrap().is_empty());
    assert_eq!(svc.store().snapshot().await, MemoryState::default());
}

#[tokio::test]
async fn test_accounts_are_private_to_their_owner() {
    let svc = service();
    let owner = UserId::new();
    let stranger = UserId::new();
    let (account, cashbox) = open_account(&svc, owner).await;

    assert_eq!(
        svc.get_account(stranger, account).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        svc.deposit(stranger, account, dec!(1)).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        svc.get_pocket(stranger, cashbox).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        svc.get_transactions(stranger, account).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        svc.delete_account(stranger, account).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert!(svc.get_accounts(stranger).await.unwrap().is_empty());
    assert_eq!(svc.get_accounts(owner).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_account_ignores_blank_fields() {
    let svc = service();
    let user = UserId::new();
    let (account, _) = open_account(&svc, user).await;

    let updated = svc
        .update_account(
            user,
            account,
            UpdateAccountInput {
                account_type: Some(AccountType::MutualFund),
                name: Some(String::new()),
                bank: Some("Mandiri".into()),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.account_type, AccountType::MutualFund);
    assert_eq!(updated.name, "Main");
    assert_eq!(updated.bank, "Mandiri");
}

#[tokio::test]
async fn test_delete_account_cascades() {
    let svc = service();
    let user = UserId::new();
    let (account, _) = open_account(&svc, user).await;
    add_pocket(&svc, user, account, "Rent").await;
    svc.deposit(user, account, dec!(10)).await.unwrap();

    svc.delete_account(user, account).await.unwrap();

    assert_eq!(svc.store().snapshot().await, MemoryState::default());
    assert_eq!(
        svc.get_account(user, account).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

// ============================================================================
// Deposits & Reconciliation
// ============================================================================

#[tokio::test]
async fn test_deposit_updates_account_and_cashbox() {
    let svc = service();
    let user = UserId::new();
    let (account, cashbox) = open_account(&svc, user).await;

    let txn = svc.deposit(user, account, dec!(25.50)).await.unwrap();
    assert_eq!(txn.kind, TransactionKind::Deposit { to: cashbox });
    assert_eq!(txn.account_id, account);

    let view = svc.get_account_with_pockets(user, account).await.unwrap();
    assert_eq!(view.account.balance, dec!(25.50));
    assert_eq!(balance_of(&view, cashbox), dec!(25.50));
    assert_eq!(svc.get_transactions(user, account).await.unwrap(), vec![txn]);
}

#[tokio::test]
async fn test_deposit_rejects_non_positive_amount() {
    let svc = service();
    let user = UserId::new();
    let (account, _) = open_account(&svc, user).await;

    for amount in [dec!(0), dec!(-5)] {
        let err = svc.deposit(user, account, amount).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
    assert!(svc.get_transactions(user, account).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_deposit_rolls_back_when_log_append_fails() {
    let svc = service();
    let user = UserId::new();
    let (account, cashbox) = open_account(&svc, user).await;
    let before = svc.store().snapshot().await;

    svc.store().fail_on(FailPoint::AppendTransaction);
    let err = svc.deposit(user, account, dec!(10)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    svc.store().clear_failure();

    assert_eq!(svc.store().snapshot().await, before);
    let view = svc.get_account_with_pockets(user, account).await.unwrap();
    assert_eq!(view.account.balance, Decimal::ZERO);
    assert_eq!(balance_of(&view, cashbox), Decimal::ZERO);
}

#[tokio::test]
async fn test_deposit_past_decimal_range_changes_nothing() {
    let svc = service();
    let user = UserId::new();
    let (account, cashbox) = open_account(&svc, user).await;
    svc.deposit(user, account, Decimal::MAX).await.unwrap();
    let before = svc.store().snapshot().await;

    let err = svc.deposit(user, account, dec!(1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    assert_eq!(svc.store().snapshot().await, before);
    let view = svc.get_account_with_pockets(user, account).await.unwrap();
    assert_eq!(view.account.balance, Decimal::MAX);
    assert_eq!(balance_of(&view, cashbox), Decimal::MAX);
    assert_eq!(svc.get_transactions(user, account).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_deposit_without_cashbox_is_inconsistent() {
    let svc = service();
    let user = UserId::new();
    let (account, cashbox) = open_account(&svc, user).await;

    let mut state = svc.store().snapshot().await;
    state.pockets.retain(|p| p.id != cashbox);
    let svc = LedgerService::new(InMemoryLedgerStore::with_state(state));

    let err = svc.deposit(user, account, dec!(5)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InconsistentState);
    assert_eq!(err.error_code(), "INCONSISTENT_STATE");
}

#[tokio::test]
async fn test_reconcile_deposits_difference_into_cashbox() {
    let svc = service();
    let user = UserId::new();
    let (account, cashbox) = open_account(&svc, user).await;
    svc.deposit(user, account, dec!(100)).await.unwrap();

    let txn = svc
        .reconcile_balance(user, account, dec!(130.25))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(txn.kind, TransactionKind::Deposit { to: cashbox });
    assert_eq!(txn.amount.value(), dec!(30.25));

    let view = svc.get_account_with_pockets(user, account).await.unwrap();
    assert_eq!(view.account.balance, dec!(130.25));
    assert_eq!(balance_of(&view, cashbox), dec!(130.25));
}

#[tokio::test]
async fn test_reconcile_to_same_balance_is_noop() {
    let svc = service();
    let user = UserId::new();
    let (account, _) = open_account(&svc, user).await;
    svc.deposit(user, account, dec!(50)).await.unwrap();

    let result = svc.reconcile_balance(user, account, dec!(50)).await.unwrap();
    assert!(result.is_none());
    assert_eq!(svc.get_transactions(user, account).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_reconcile_rejects_decrease_and_negative() {
    let svc = service();
    let user = UserId::new();
    let (account, _) = open_account(&svc, user).await;
    svc.deposit(user, account, dec!(50)).await.unwrap();

    let err = svc.reconcile_balance(user, account, dec!(49.99)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidBalanceDecrease);

    let err = svc.reconcile_balance(user, account, dec!(-1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let account = svc.get_account(user, account).await.unwrap();
    assert_eq!(account.balance, dec!(50));
}

// ============================================================================
// Pockets
// ============================================================================

#[tokio::test]
async fn test_created_pockets_are_normal() {
    let svc = service();
    let user = UserId::new();
    let (account, _) = open_account(&svc, user).await;
    let pocket = add_pocket(&svc, user, account, "Holiday").await;

    let pockets = svc.get_pockets(user, account).await.unwrap();
    assert_eq!(pockets.len(), 2);
    assert_eq!(pockets[0].pocket_type, PocketType::Cashbox);
    assert_eq!(pockets[1].id, pocket);
    assert_eq!(pockets[1].pocket_type, PocketType::Normal);
}

#[tokio::test]
async fn test_create_pocket_requires_name_and_owned_account() {
    let svc = service();
    let user = UserId::new();
    let (account, _) = open_account(&svc, user).await;

    let err = svc
        .create_pocket(
            user,
            CreatePocketInput {
                account_id: account,
                name: String::new(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = svc
        .create_pocket(
            UserId::new(),
            CreatePocketInput {
                account_id: account,
                name: "Stolen".into(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_update_pocket_renames() {
    let svc = service();
    let user = UserId::new();
    let (account, _) = open_account(&svc, user).await;
    let pocket = add_pocket(&svc, user, account, "Holiday").await;

    let renamed = svc
        .update_pocket(user, pocket, UpdatePocketInput { name: Some("Trip".into()) })
        .await
        .unwrap();
    assert_eq!(renamed.name, "Trip");

    let unchanged = svc
        .update_pocket(user, pocket, UpdatePocketInput { name: Some(" ".into()) })
        .await
        .unwrap();
    assert_eq!(unchanged.name, "Trip");
}

#[tokio::test]
async fn test_deposit_into_normal_pocket_is_rejected_by_store() {
    use super::store::{LedgerStore, PocketStore};
    use super::validation::positive_amount;

    let svc = service();
    let user = UserId::new();
    let (account, _) = open_account(&svc, user).await;
    let pocket = add_pocket(&svc, user, account, "Rent").await;

    let mut unit = svc.store().begin().await.unwrap();
    let err = unit
        .deposit_to_pocket(pocket, positive_amount(dec!(1)).unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPocketOperation);
}

#[tokio::test]
async fn test_delete_pocket_rules() {
    let svc = service();
    let user = UserId::new();
    let (account, cashbox) = open_account(&svc, user).await;
    let pocket = add_pocket(&svc, user, account, "Rent").await;
    svc.deposit(user, account, dec!(10)).await.unwrap();
    svc.transfer(user, cashbox, pocket, dec!(10)).await.unwrap();

    let err = svc.delete_pocket(user, cashbox).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPocketOperation);

    let err = svc.delete_pocket(user, pocket).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPocketOperation);

    svc.transfer(user, pocket, cashbox, dec!(10)).await.unwrap();
    svc.delete_pocket(user, pocket).await.unwrap();

    let pockets = svc.get_pockets(user, account).await.unwrap();
    assert_eq!(pockets.len(), 1);
    // History survives the pocket.
    assert_eq!(svc.get_transactions(user, account).await.unwrap().len(), 3);
}

// ============================================================================
// Transfers & Withdrawals
// ============================================================================

#[tokio::test]
async fn test_transfer_conserves_funds() {
    let svc = service();
    let user = UserId::new();
    let (account, cashbox) = open_account(&svc, user).await;
    let pocket = add_pocket(&svc, user, account, "Rent").await;
    svc.deposit(user, account, dec!(80)).await.unwrap();

    svc.transfer(user, cashbox, pocket, dec!(80)).await.unwrap();

    let view = svc.get_account_with_pockets(user, account).await.unwrap();
    assert_eq!(balance_of(&view, cashbox), dec!(0));
    assert_eq!(balance_of(&view, pocket), dec!(80));
    assert_eq!(view.account.balance, dec!(80));
}

#[tokio::test]
async fn test_transfer_rejections() {
    let svc = service();
    let user = UserId::new();
    let (account, cashbox) = open_account(&svc, user).await;
    let pocket = add_pocket(&svc, user, account, "Rent").await;
    let (_, other_cashbox) = open_account(&svc, user).await;
    svc.deposit(user, account, dec!(10)).await.unwrap();

    let same = svc.transfer(user, cashbox, cashbox, dec!(1)).await.unwrap_err();
    assert_eq!(same.kind(), ErrorKind::InvalidInput);

    let cross = svc
        .transfer(user, cashbox, other_cashbox, dec!(1))
        .await
        .unwrap_err();
    assert_eq!(cross.kind(), ErrorKind::InvalidInput);

    let short = svc.transfer(user, cashbox, pocket, dec!(10.01)).await.unwrap_err();
    assert_eq!(short.kind(), ErrorKind::InsufficientBalance);

    let foreign = svc
        .transfer(UserId::new(), cashbox, pocket, dec!(1))
        .await
        .unwrap_err();
    assert_eq!(foreign.kind(), ErrorKind::NotFound);

    assert_eq!(svc.get_transactions(user, account).await.unwrap().len(), 1);
    assert_consistent(&svc.store().snapshot().await);
}

#[tokio::test]
async fn test_withdraw_debits_pocket_and_account() {
    let svc = service();
    let user = UserId::new();
    let (account, cashbox) = open_account(&svc, user).await;
    svc.deposit(user, account, dec!(100)).await.unwrap();

    let txn = svc.withdraw(user, cashbox, dec!(35.75)).await.unwrap();
    assert_eq!(txn.kind, TransactionKind::Withdraw { from: cashbox });

    let view = svc.get_account_with_pockets(user, account).await.unwrap();
    assert_eq!(view.account.balance, dec!(64.25));
    assert_eq!(balance_of(&view, cashbox), dec!(64.25));
}

#[tokio::test]
async fn test_withdraw_rolls_back_when_account_debit_fails() {
    let svc = service();
    let user = UserId::new();
    let (account, cashbox) = open_account(&svc, user).await;
    svc.deposit(user, account, dec!(20)).await.unwrap();
    let before = svc.store().snapshot().await;

    svc.store().fail_on(FailPoint::WithdrawFromAccount);
    let err = svc.withdraw(user, cashbox, dec!(5)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    svc.store().clear_failure();

    assert_eq!(svc.store().snapshot().await, before);
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deposits_sum_exactly() {
    let svc = std::sync::Arc::new(service());
    let user = UserId::new();
    let (account, cashbox) = open_account(&svc, user).await;

    let deposits = (1..=50).map(|i| {
        let svc = std::sync::Arc::clone(&svc);
        tokio::spawn(async move { svc.deposit(user, account, Decimal::from(i)).await })
    });
    for result in futures::future::join_all(deposits).await {
        result.unwrap().unwrap();
    }

    let view = svc.get_account_with_pockets(user, account).await.unwrap();
    assert_eq!(view.account.balance, dec!(1275));
    assert_eq!(balance_of(&view, cashbox), dec!(1275));
    assert_eq!(svc.get_transactions(user, account).await.unwrap().len(), 50);
}
