//! Account repository.
//!
//! Balance updates read the row under `SELECT ... FOR UPDATE` first, so they
//! must run inside a database transaction to hold the lock until commit.

use chrono::Utc;
use pocketbook_core::ledger::{
    Account, LedgerError, LedgerResult, NewAccount, UpdateAccountInput, credited,
};
use pocketbook_shared::types::{AccountId, Amount, UserId};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use super::convert::db_err;
use crate::entities::accounts;

/// Account repository for CRUD and balance operations.
#[derive(Debug, Clone, Copy)]
pub struct AccountRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> AccountRepository<'a, C> {
    /// Creates a repository over `conn`.
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Lists a user's accounts, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_by_user(&self, user: UserId) -> LedgerResult<Vec<Account>> {
        let models = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user.into_inner()))
            .order_by_asc(accounts::Column::CreatedAt)
            .order_by_asc(accounts::Column::Id)
            .all(self.conn)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(Account::from).collect())
    }

    /// Lists every account, for auditing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_all(&self) -> LedgerResult<Vec<Account>> {
        let models = accounts::Entity::find()
            .order_by_asc(accounts::Column::CreatedAt)
            .order_by_asc(accounts::Column::Id)
            .all(self.conn)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(Account::from).collect())
    }

    /// Finds an account owned by `user`.
    ///
    /// # Errors
    ///
    /// `NotFound` if the account does not exist or belongs to another user.
    pub async fn find_owned(&self, user: UserId, id: AccountId) -> LedgerResult<Account> {
        self.find_owned_model(user, id).await.map(Account::from)
    }

    /// Inserts an account with a zero balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create(&self, user: UserId, input: NewAccount) -> LedgerResult<Account> {
        let now = Utc::now().into();
        let account = accounts::ActiveModel {
            id: Set(AccountId::new().into_inner()),
            user_id: Set(user.into_inner()),
            account_type: Set(input.account_type.into()),
            name: Set(input.name),
            bank: Set(input.bank),
            balance: Set(Decimal::ZERO),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = account.insert(self.conn).await.map_err(db_err)?;
        Ok(model.into())
    }

    /// Overwrites the supplied fields of an owned account.
    ///
    /// # Errors
    ///
    /// `NotFound` if the account does not exist or belongs to another user.
    pub async fn update(
        &self,
        user: UserId,
        id: AccountId,
        input: UpdateAccountInput,
    ) -> LedgerResult<Account> {
        let model = self.find_owned_model(user, id).await?;
        let mut account: accounts::ActiveModel = model.into();

        if let Some(account_type) = input.account_type {
            account.account_type = Set(account_type.into());
        }
        if let Some(name) = input.name {
            account.name = Set(name);
        }
        if let Some(bank) = input.bank {
            account.bank = Set(bank);
        }
        account.updated_at = Set(Utc::now().into());

        let model = account.update(self.conn).await.map_err(db_err)?;
        Ok(model.into())
    }

    /// Deletes an owned account; pockets and transactions cascade.
    ///
    /// # Errors
    ///
    /// `NotFound` if the account does not exist or belongs to another user.
    pub async fn delete(&self, user: UserId, id: AccountId) -> LedgerResult<()> {
        let result = accounts::Entity::delete_many()
            .filter(accounts::Column::Id.eq(id.into_inner()))
            .filter(accounts::Column::UserId.eq(user.into_inner()))
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(LedgerError::account_not_found(id));
        }
        Ok(())
    }

    /// Locks the account row until the surrounding transaction ends.
    ///
    /// # Errors
    ///
    /// `NotFound` if the account does not exist.
    pub async fn lock(&self, id: AccountId) -> LedgerResult<Account> {
        self.lock_model(id).await.map(Account::from)
    }

    /// Adds `amount` to the balance.
    ///
    /// # Errors
    ///
    /// `NotFound` if the account does not exist.
    pub async fn deposit(&self, id: AccountId, amount: Amount) -> LedgerResult<Account> {
        let model = self.lock_model(id).await?;
        let balance = credited(model.balance, amount)?;
        self.set_balance(model, balance).await
    }

    /// Subtracts `amount` from the balance.
    ///
    /// # Errors
    ///
    /// `InconsistentState` if the balance is below `amount`.
    pub async fn withdraw(&self, id: AccountId, amount: Amount) -> LedgerResult<Account> {
        let model = self.lock_model(id).await?;
        if model.balance < amount.value() {
            return Err(LedgerError::InconsistentState(format!(
                "account {id} holds {} but its pockets released {amount}",
                model.balance
            )));
        }
        let balance = model.balance - amount.value();
        self.set_balance(model, balance).await
    }

    /// Sets the balance to `target` and returns the increase.
    ///
    /// # Errors
    ///
    /// `InvalidBalanceDecrease` if `target` is below the current balance.
    pub async fn reconcile(&self, id: AccountId, target: Decimal) -> LedgerResult<Decimal> {
        let model = self.lock_model(id).await?;
        if target < model.balance {
            return Err(LedgerError::InvalidBalanceDecrease {
                current: model.balance,
                target,
            });
        }

        let delta = target - model.balance;
        if !delta.is_zero() {
            self.set_balance(model, target).await?;
        }
        Ok(delta)
    }

    async fn find_owned_model(&self, user: UserId, id: AccountId) -> LedgerResult<accounts::Model> {
        accounts::Entity::find_by_id(id.into_inner())
            .filter(accounts::Column::UserId.eq(user.into_inner()))
            .one(self.conn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| LedgerError::account_not_found(id))
    }

    async fn lock_model(&self, id: AccountId) -> LedgerResult<accounts::Model> {
        accounts::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(self.conn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| LedgerError::account_not_found(id))
    }

    async fn set_balance(&self, model: accounts::Model, balance: Decimal) -> LedgerResult<Account> {
        let mut account: accounts::ActiveModel = model.into();
        account.balance = Set(balance);
        account.updated_at = Set(Utc::now().into());

        let model = account.update(self.conn).await.map_err(db_err)?;
        Ok(model.into())
    }
}
