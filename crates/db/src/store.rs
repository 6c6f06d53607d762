//! PostgreSQL implementation of the ledger storage contracts.
//!
//! A [`PgLedgerUnit`] wraps one database transaction. Dropping it without
//! calling `commit` rolls the transaction back.

use async_trait::async_trait;
use pocketbook_core::ledger::{
    Account, AccountStore, LedgerResult, LedgerStore, LedgerUnit, NewAccount, NewPocket,
    NewTransaction, Pocket, PocketStore, Transaction, TransactionLog, UpdateAccountInput,
    UpdatePocketInput,
};
use pocketbook_shared::types::{AccountId, Amount, PocketId, UserId};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use tracing::debug;

use crate::repositories::convert::db_err;
use crate::repositories::{AccountRepository, PocketRepository, TransactionRepository};

/// Ledger store backed by a connection pool.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    db: DatabaseConnection,
}

impl PgLedgerStore {
    /// Creates a store over `db`.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    type Unit = PgLedgerUnit;

    async fn begin(&self) -> LedgerResult<Self::Unit> {
        let txn = self.db.begin().await.map_err(db_err)?;
        Ok(PgLedgerUnit { txn })
    }
}

/// One database transaction exposing all three stores.
pub struct PgLedgerUnit {
    txn: DatabaseTransaction,
}

impl std::fmt::Debug for PgLedgerUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgLedgerUnit").finish_non_exhaustive()
    }
}

impl PgLedgerUnit {
    fn accounts(&self) -> AccountRepository<'_, DatabaseTransaction> {
        AccountRepository::new(&self.txn)
    }

    fn pockets(&self) -> PocketRepository<'_, DatabaseTransaction> {
        PocketRepository::new(&self.txn)
    }

    fn transactions(&self) -> TransactionRepository<'_, DatabaseTransaction> {
        TransactionRepository::new(&self.txn)
    }
}

#[async_trait]
impl AccountStore for PgLedgerUnit {
    async fn list_accounts(&mut self, user: UserId) -> LedgerResult<Vec<Account>> {
        self.accounts().list_by_user(user).await
    }

    async fn get_account(&mut self, user: UserId, id: AccountId) -> LedgerResult<Account> {
        self.accounts().find_owned(user, id).await
    }

    async fn create_account(&mut self, user: UserId, input: NewAccount) -> LedgerResult<Account> {
        self.accounts().create(user, input).await
    }

    async fn update_account(
        &mut self,
        user: UserId,
        id: AccountId,
        input: UpdateAccountInput,
    ) -> LedgerResult<Account> {
        self.accounts().update(user, id, input).await
    }

    async fn delete_account(&mut self, user: UserId, id: AccountId) -> LedgerResult<()> {
        self.accounts().delete(user, id).await
    }

    async fn lock_account(&mut self, id: AccountId) -> LedgerResult<Account> {
        debug!(account_id = %id, "Locking account row");
        self.accounts().lock(id).await
    }

    async fn deposit_to_account(
        &mut self,
        id: AccountId,
        amount: Amount,
    ) -> LedgerResult<Account> {
        self.accounts().deposit(id, amount).await
    }

    async fn withdraw_from_account(
        &mut self,
        id: AccountId,
        amount: Amount,
    ) -> LedgerResult<Account> {
        self.accounts().withdraw(id, amount).await
    }

    async fn reconcile_account_balance(
        &mut self,
        id: AccountId,
        target: Decimal,
    ) -> LedgerResult<Decimal> {
        self.accounts().reconcile(id, target).await
    }
}

#[async_trait]
impl PocketStore for PgLedgerUnit {
    async fn list_pockets(&mut self, account: AccountId) -> LedgerResult<Vec<Pocket>> {
        self.pockets().list_by_account(account).await
    }

    async fn get_pocket(&mut self, user: UserId, id: PocketId) -> LedgerResult<Pocket> {
        self.pockets().find_owned(user, id).await
    }

    async fn create_pocket(&mut self, input: NewPocket) -> LedgerResult<Pocket> {
        self.pockets().create(input).await
    }

    async fn update_pocket(
        &mut self,
        id: PocketId,
        input: UpdatePocketInput,
    ) -> LedgerResult<Pocket> {
        self.pockets().update(id, input).await
    }

    async fn delete_pocket(&mut self, id: PocketId) -> LedgerResult<()> {
        self.pockets().delete(id).await
    }

    async fn deposit_to_pocket(&mut self, id: PocketId, amount: Amount) -> LedgerResult<Pocket> {
        self.pockets().deposit(id, amount).await
    }

    async fn withdraw_from_pocket(
        &mut self,
        id: PocketId,
        amount: Amount,
    ) -> LedgerResult<Pocket> {
        self.pockets().withdraw(id, amount).await
    }

    async fn transfer_between_pockets(
        &mut self,
        from: PocketId,
        to: PocketId,
        amount: Amount,
    ) -> LedgerResult<(Pocket, Pocket)> {
        self.pockets().transfer(from, to, amount).await
    }
}

#[async_trait]
impl TransactionLog for PgLedgerUnit {
    async fn list_transactions(
        &mut self,
        user: UserId,
        account: AccountId,
    ) -> LedgerResult<Vec<Transaction>> {
        self.transactions().list_by_account(user, account).await
    }

    async fn append_transaction(&mut self, input: NewTransaction) -> LedgerResult<Transaction> {
        self.transactions().append(input).await
    }
}

#[async_trait]
impl LedgerUnit for PgLedgerUnit {
    async fn commit(self) -> LedgerResult<()> {
        self.txn.commit().await.map_err(db_err)
    }
}
