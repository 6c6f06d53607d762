//! Storage contracts for the ledger.
//!
//! A [`LedgerStore`] opens units of work. Each [`LedgerUnit`] exposes the
//! account, pocket and transaction stores over one underlying transaction:
//! everything done through a unit becomes visible together on
//! [`LedgerUnit::commit`], and a unit dropped without committing rolls back.
//!
//! Method names differ across the three traits because every unit
//! implements all of them.

use async_trait::async_trait;
use pocketbook_shared::types::{AccountId, Amount, PocketId, UserId};
use rust_decimal::Decimal;

use super::error::LedgerResult;
use super::types::{
    Account, NewAccount, NewPocket, NewTransaction, Pocket, Transaction, UpdateAccountInput,
    UpdatePocketInput,
};

/// Durable account records and their balance primitives.
#[async_trait]
pub trait AccountStore {
    /// Lists the user's accounts, oldest first.
    async fn list_accounts(&mut self, user: UserId) -> LedgerResult<Vec<Account>>;

    /// Fetches one account owned by `user`.
    ///
    /// # Errors
    ///
    /// `NotFound` when the account does not exist or belongs to someone else.
    async fn get_account(&mut self, user: UserId, id: AccountId) -> LedgerResult<Account>;

    /// Inserts an account with a zero balance.
    async fn create_account(&mut self, user: UserId, input: NewAccount) -> LedgerResult<Account>;

    /// Overwrites the supplied fields of an owned account.
    async fn update_account(
        &mut self,
        user: UserId,
        id: AccountId,
        input: UpdateAccountInput,
    ) -> LedgerResult<Account>;

    /// Removes an owned account together with its pockets and transactions.
    async fn delete_account(&mut self, user: UserId, id: AccountId) -> LedgerResult<()>;

    /// Acquires the account's row lock for the rest of the unit.
    ///
    /// Every balance-changing operation takes this lock before touching
    /// pockets, which fixes the lock order at account, then pockets.
    async fn lock_account(&mut self, id: AccountId) -> LedgerResult<Account>;

    /// Adds `amount` to the account balance.
    async fn deposit_to_account(&mut self, id: AccountId, amount: Amount)
        -> LedgerResult<Account>;

    /// Subtracts `amount` from the account balance.
    ///
    /// # Errors
    ///
    /// `InconsistentState` if the balance is below `amount`. Callers only
    /// debit an account after debiting one of its pockets, so a shortfall
    /// here means the account no longer matches its pockets.
    async fn withdraw_from_account(
        &mut self,
        id: AccountId,
        amount: Amount,
    ) -> LedgerResult<Account>;

    /// Sets the balance to `target` and returns `target - current`.
    ///
    /// # Errors
    ///
    /// `InvalidBalanceDecrease` if `target` is below the current balance.
    async fn reconcile_account_balance(
        &mut self,
        id: AccountId,
        target: Decimal,
    ) -> LedgerResult<Decimal>;
}

/// Durable pocket records and their balance primitives.
#[async_trait]
pub trait PocketStore {
    /// Lists an account's pockets in creation order.
    async fn list_pockets(&mut self, account: AccountId) -> LedgerResult<Vec<Pocket>>;

    /// Fetches one pocket whose account is owned by `user`.
    async fn get_pocket(&mut self, user: UserId, id: PocketId) -> LedgerResult<Pocket>;

    /// Inserts a pocket with a zero balance.
    async fn create_pocket(&mut self, input: NewPocket) -> LedgerResult<Pocket>;

    /// Applies the supplied fields.
    async fn update_pocket(&mut self, id: PocketId, input: UpdatePocketInput)
        -> LedgerResult<Pocket>;

    /// Removes a pocket.
    async fn delete_pocket(&mut self, id: PocketId) -> LedgerResult<()>;

    /// Credits the pocket.
    ///
    /// # Errors
    ///
    /// `InvalidPocketOperation` unless the pocket is the Cashbox.
    async fn deposit_to_pocket(&mut self, id: PocketId, amount: Amount) -> LedgerResult<Pocket>;

    /// Debits the pocket.
    ///
    /// # Errors
    ///
    /// `InsufficientBalance` if the balance is below `amount`.
    async fn withdraw_from_pocket(&mut self, id: PocketId, amount: Amount)
        -> LedgerResult<Pocket>;

    /// Moves `amount` from one pocket to another, returning both updated.
    ///
    /// Pocket rows are locked in ascending id order.
    ///
    /// # Errors
    ///
    /// `InsufficientBalance` if `from` holds less than `amount`.
    async fn transfer_between_pockets(
        &mut self,
        from: PocketId,
        to: PocketId,
        amount: Amount,
    ) -> LedgerResult<(Pocket, Pocket)>;
}

/// Append-only record of money movements.
#[async_trait]
pub trait TransactionLog {
    /// Lists an owned account's transactions, newest first.
    ///
    /// Accounts not owned by `user` yield an empty list.
    async fn list_transactions(
        &mut self,
        user: UserId,
        account: AccountId,
    ) -> LedgerResult<Vec<Transaction>>;

    /// Appends one record.
    async fn append_transaction(&mut self, input: NewTransaction) -> LedgerResult<Transaction>;
}

/// One atomic unit of work over all three stores.
#[async_trait]
pub trait LedgerUnit: AccountStore + PocketStore + TransactionLog + Send {
    /// Makes every change done through this unit durable.
    async fn commit(self) -> LedgerResult<()>;
}

/// Opens units of work.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Unit type produced by [`LedgerStore::begin`].
    type Unit: LedgerUnit;

    /// Starts a unit of work.
    async fn begin(&self) -> LedgerResult<Self::Unit>;
}
