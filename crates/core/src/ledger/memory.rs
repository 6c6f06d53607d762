//! In-memory ledger store.
//!
//! Used by tests and anywhere a database is unavailable. A unit of work
//! holds the store-wide lock for its whole lifetime and mutates a private
//! copy of the state; `commit` publishes the copy, dropping discards it.
//! Units therefore run one at a time, unlike the row-level locking of the
//! relational store.

use std::sync::{Arc, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use pocketbook_shared::types::{AccountId, Amount, PocketId, TransactionId, UserId};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::error::{LedgerError, LedgerResult};
use super::store::{AccountStore, LedgerStore, LedgerUnit, PocketStore, TransactionLog};
use super::types::{
    Account, NewAccount, NewPocket, NewTransaction, Pocket, Transaction, UpdateAccountInput,
    UpdatePocketInput,
};
use super::validation::credited;

/// Store operations that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    /// `create_account`.
    CreateAccount,
    /// `create_pocket`.
    CreatePocket,
    /// `deposit_to_account`.
    DepositToAccount,
    /// `deposit_to_pocket`.
    DepositToPocket,
    /// `withdraw_from_pocket`.
    WithdrawFromPocket,
    /// `withdraw_from_account`.
    WithdrawFromAccount,
    /// `transfer_between_pockets`.
    TransferBetweenPockets,
    /// `append_transaction`.
    AppendTransaction,
    /// `commit`.
    Commit,
}

/// Full contents of an in-memory store, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryState {
    /// Accounts.
    pub accounts: Vec<Account>,
    /// Pockets.
    pub pockets: Vec<Pocket>,
    /// Transactions.
    pub transactions: Vec<Transaction>,
}

type SharedFailPoint = Arc<std::sync::Mutex<Option<FailPoint>>>;

/// In-memory [`LedgerStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<Mutex<MemoryState>>,
    fail_point: SharedFailPoint,
}

impl InMemoryLedgerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `state`.
    #[must_use]
    pub fn with_state(state: MemoryState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            fail_point: SharedFailPoint::default(),
        }
    }

    /// Makes every later call of `point` fail with a storage error.
    pub fn fail_on(&self, point: FailPoint) {
        *self
            .fail_point
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(point);
    }

    /// Removes any injected failure.
    pub fn clear_failure(&self) {
        *self
            .fail_point
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Returns a copy of the committed state.
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    type Unit = InMemoryUnit;

    async fn begin(&self) -> LedgerResult<Self::Unit> {
        let committed = Arc::clone(&self.state).lock_owned().await;
        let working = committed.clone();
        Ok(InMemoryUnit {
            committed,
            working,
            fail_point: Arc::clone(&self.fail_point),
        })
    }
}

/// Unit of work over an [`InMemoryLedgerStore`].
#[derive(Debug)]
pub struct InMemoryUnit {
    committed: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    fail_point: SharedFailPoint,
}

impl InMemoryUnit {
    fn check(&self, point: FailPoint) -> LedgerResult<()> {
        let armed = *self
            .fail_point
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if armed == Some(point) {
            return Err(LedgerError::Database(format!("injected failure at {point:?}")));
        }
        Ok(())
    }

    fn owns_account(&self, user: UserId, id: AccountId) -> bool {
        self.working
            .accounts
            .iter()
            .any(|a| a.id == id && a.user_id == user)
    }

    fn account_mut(&mut self, id: AccountId) -> LedgerResult<&mut Account> {
        self.working
            .accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| LedgerError::account_not_found(id))
    }

    fn owned_account_mut(&mut self, user: UserId, id: AccountId) -> LedgerResult<&mut Account> {
        self.working
            .accounts
            .iter_mut()
            .find(|a| a.id == id && a.user_id == user)
            .ok_or_else(|| LedgerError::account_not_found(id))
    }

    fn pocket_mut(&mut self, id: PocketId) -> LedgerResult<&mut Pocket> {
        self.working
            .pockets
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| LedgerError::pocket_not_found(id))
    }
}

fn debit_pocket(pocket: &mut Pocket, amount: Amount) -> LedgerResult<()> {
    if pocket.balance < amount.value() {
        return Err(LedgerError::InsufficientBalance {
            pocket_id: pocket.id,
            available: pocket.balance,
            requested: amount.value(),
        });
    }
    pocket.balance -= amount.value();
    pocket.updated_at = Utc::now();
    Ok(())
}

fn credit_pocket(pocket: &mut Pocket, amount: Amount) -> LedgerResult<()> {
    pocket.balance = credited(pocket.balance, amount)?;
    pocket.updated_at = Utc::now();
    Ok(())
}

#[async_trait]
impl AccountStore for InMemoryUnit {
    async fn list_accounts(&mut self, user: UserId) -> LedgerResult<Vec<Account>> {
        Ok(self
            .working
            .accounts
            .iter()
            .filter(|a| a.user_id == user)
            .cloned()
            .collect())
    }

    async fn get_account(&mut self, user: UserId, id: AccountId) -> LedgerResult<Account> {
        self.owned_account_mut(user, id).map(|a| a.clone())
    }

    async fn create_account(&mut self, user: UserId, input: NewAccount) -> LedgerResult<Account> {
        self.check(FailPoint::CreateAccount)?;
        let now = Utc::now();
        let account = Account {
            id: AccountId::new(),
            user_id: user,
            account_type: input.account_type,
            name: input.name,
            bank: input.bank,
            balance: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };
        self.working.accounts.push(account.clone());
        Ok(account)
    }

    async fn update_account(
        &mut self,
        user: UserId,
        id: AccountId,
        input: UpdateAccountInput,
    ) -> LedgerResult<Account> {
        let account = self.owned_account_mut(user, id)?;
        if let Some(account_type) = input.account_type {
            account.account_type = account_type;
        }
        if let Some(name) = input.name {
            account.name = name;
        }
        if let Some(bank) = input.bank {
            account.bank = bank;
        }
        account.updated_at = Utc::now();
        Ok(account.clone())
    }

    async fn delete_account(&mut self, user: UserId, id: AccountId) -> LedgerResult<()> {
        if !self.owns_account(user, id) {
            return Err(LedgerError::account_not_found(id));
        }
        self.working.accounts.retain(|a| a.id != id);
        self.working.pockets.retain(|p| p.account_id != id);
        self.working.transactions.retain(|t| t.account_id != id);
        Ok(())
    }

    async fn lock_account(&mut self, id: AccountId) -> LedgerResult<Account> {
        // The unit already holds the store-wide lock.
        self.account_mut(id).map(|a| a.clone())
    }

    async fn deposit_to_account(
        &mut self,
        id: AccountId,
        amount: Amount,
    ) -> LedgerResult<Account> {
        self.check(FailPoint::DepositToAccount)?;
        let account = self.account_mut(id)?;
        account.balance = credited(account.balance, amount)?;
        account.updated_at = Utc::now();
        Ok(account.clone())
    }

    async fn withdraw_from_account(
        &mut self,
        id: AccountId,
        amount: Amount,
    ) -> LedgerResult<Account> {
        self.check(FailPoint::WithdrawFromAccount)?;
        let account = self.account_mut(id)?;
        if account.balance < amount.value() {
            return Err(LedgerError::InconsistentState(format!(
                "account {id} holds {} but its pockets released {amount}",
                account.balance
            )));
        }
        account.balance -= amount.value();
        account.updated_at = Utc::now();
        Ok(account.clone())
    }

    async fn reconcile_account_balance(
        &mut self,
        id: AccountId,
        target: Decimal,
    ) -> LedgerResult<Decimal> {
        let account = self.account_mut(id)?;
        if target < account.balance {
            return Err(LedgerError::InvalidBalanceDecrease {
                current: account.balance,
                target,
            });
        }
        let delta = target - account.balance;
        if !delta.is_zero() {
            account.balance = target;
            account.updated_at = Utc::now();
        }
        Ok(delta)
    }
}

#[async_trait]
impl PocketStore for InMemoryUnit {
    async fn list_pockets(&mut self, account: AccountId) -> LedgerResult<Vec<Pocket>> {
        Ok(self
            .working
            .pockets
            .iter()
            .filter(|p| p.account_id == account)
            .cloned()
            .collect())
    }

    async fn get_pocket(&mut self, user: UserId, id: PocketId) -> LedgerResult<Pocket> {
        let pocket = self
            .working
            .pockets
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| LedgerError::pocket_not_found(id))?;
        if !self.owns_account(user, pocket.account_id) {
            return Err(LedgerError::pocket_not_found(id));
        }
        Ok(pocket.clone())
    }

    async fn create_pocket(&mut self, input: NewPocket) -> LedgerResult<Pocket> {
        self.check(FailPoint::CreatePocket)?;
        self.account_mut(input.account_id)?;
        if input.pocket_type.is_cashbox()
            && self
                .working
                .pockets
                .iter()
                .any(|p| p.account_id == input.account_id && p.pocket_type.is_cashbox())
        {
            return Err(LedgerError::InvalidPocketOperation(format!(
                "account {} already has a Cashbox pocket",
                input.account_id
            )));
        }

        let now = Utc::now();
        let pocket = Pocket {
            id: PocketId::new(),
            account_id: input.account_id,
            name: input.name,
            pocket_type: input.pocket_type,
            balance: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };
        self.working.pockets.push(pocket.clone());
        Ok(pocket)
    }

    async fn update_pocket(
        &mut self,
        id: PocketId,
        input: UpdatePocketInput,
    ) -> LedgerResult<Pocket> {
        let pocket = self.pocket_mut(id)?;
        if let Some(name) = input.name {
            pocket.name = name;
            pocket.updated_at = Utc::now();
        }
        Ok(pocket.clone())
    }

    async fn delete_pocket(&mut self, id: PocketId) -> LedgerResult<()> {
        self.pocket_mut(id)?;
        self.working.pockets.retain(|p| p.id != id);
        Ok(())
    }

    async fn deposit_to_pocket(&mut self, id: PocketId, amount: Amount) -> LedgerResult<Pocket> {
        self.check(FailPoint::DepositToPocket)?;
        let pocket = self.pocket_mut(id)?;
        if !pocket.pocket_type.is_cashbox() {
            return Err(LedgerError::InvalidPocketOperation(
                "deposits are only allowed into the Cashbox pocket".to_string(),
            ));
        }
        credit_pocket(pocket, amount)?;
        Ok(pocket.clone())
    }

    async fn withdraw_from_pocket(
        &mut self,
        id: PocketId,
        amount: Amount,
    ) -> LedgerResult<Pocket> {
        self.check(FailPoint::WithdrawFromPocket)?;
        let pocket = self.pocket_mut(id)?;
        debit_pocket(pocket, amount)?;
        Ok(pocket.clone())
    }

    async fn transfer_between_pockets(
        &mut self,
        from: PocketId,
        to: PocketId,
        amount: Amount,
    ) -> LedgerResult<(Pocket, Pocket)> {
        self.check(FailPoint::TransferBetweenPockets)?;
        if from == to {
            return Err(LedgerError::InvalidInput(
                "cannot transfer to the same pocket".to_string(),
            ));
        }
        let mut target = self.pocket_mut(to)?.clone();
        credit_pocket(&mut target, amount)?;

        let source = self.pocket_mut(from)?;
        debit_pocket(source, amount)?;
        let source = source.clone();

        *self.pocket_mut(to)? = target.clone();
        Ok((source, target))
    }
}

#[async_trait]
impl TransactionLog for InMemoryUnit {
    async fn list_transactions(
        &mut self,
        user: UserId,
        account: AccountId,
    ) -> LedgerResult<Vec<Transaction>> {
        if !self.owns_account(user, account) {
            return Ok(Vec::new());
        }
        Ok(self
            .working
            .transactions
            .iter()
            .rev()
            .filter(|t| t.account_id == account)
            .cloned()
            .collect())
    }

    async fn append_transaction(&mut self, input: NewTransaction) -> LedgerResult<Transaction> {
        self.check(FailPoint::AppendTransaction)?;
        self.account_mut(input.account_id)?;
        let now = Utc::now();
        let transaction = Transaction {
            id: TransactionId::new(),
            account_id: input.account_id,
            kind: input.kind,
            amount: input.amount,
            created_at: now,
            updated_at: now,
        };
        self.working.transactions.push(transaction.clone());
        Ok(transaction)
    }
}

#[async_trait]
impl LedgerUnit for InMemoryUnit {
    async fn commit(mut self) -> LedgerResult<()> {
        self.check(FailPoint::Commit)?;
        *self.committed = std::mem::take(&mut self.working);
        Ok(())
    }
}
