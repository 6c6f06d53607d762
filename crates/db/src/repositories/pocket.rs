//! Pocket repository.

use chrono::Utc;
use pocketbook_core::ledger::{
    LedgerError, LedgerResult, NewPocket, Pocket, UpdatePocketInput, credited,
};
use pocketbook_shared::types::{AccountId, Amount, PocketId, UserId};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use super::convert::db_err;
use crate::entities::{accounts, pockets, sea_orm_active_enums::PocketType};

/// Pocket repository for CRUD and balance operations.
#[derive(Debug, Clone, Copy)]
pub struct PocketRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> PocketRepository<'a, C> {
    /// Creates a repository over `conn`.
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Lists an account's pockets in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_by_account(&self, account: AccountId) -> LedgerResult<Vec<Pocket>> {
        let models = pockets::Entity::find()
            .filter(pockets::Column::AccountId.eq(account.into_inner()))
            .order_by_asc(pockets::Column::CreatedAt)
            .order_by_asc(pockets::Column::Id)
            .all(self.conn)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(Pocket::from).collect())
    }

    /// Lists every pocket, for auditing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_all(&self) -> LedgerResult<Vec<Pocket>> {
        let models = pockets::Entity::find()
            .order_by_asc(pockets::Column::CreatedAt)
            .order_by_asc(pockets::Column::Id)
            .all(self.conn)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(Pocket::from).collect())
    }

    /// Finds a pocket whose account is owned by `user`.
    ///
    /// # Errors
    ///
    /// `NotFound` if the pocket does not exist or belongs to another user.
    pub async fn find_owned(&self, user: UserId, id: PocketId) -> LedgerResult<Pocket> {
        pockets::Entity::find_by_id(id.into_inner())
            .inner_join(accounts::Entity)
            .filter(accounts::Column::UserId.eq(user.into_inner()))
            .one(self.conn)
            .await
            .map_err(db_err)?
            .map(Pocket::from)
            .ok_or_else(|| LedgerError::pocket_not_found(id))
    }

    /// Inserts a pocket with a zero balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails, including a second Cashbox
    /// for the same account.
    pub async fn create(&self, input: NewPocket) -> LedgerResult<Pocket> {
        let now = Utc::now().into();
        let pocket = pockets::ActiveModel {
            id: Set(PocketId::new().into_inner()),
            account_id: Set(input.account_id.into_inner()),
            name: Set(input.name),
            pocket_type: Set(input.pocket_type.into()),
            balance: Set(Decimal::ZERO),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = pocket.insert(self.conn).await.map_err(db_err)?;
        Ok(model.into())
    }

    /// Applies the supplied fields.
    ///
    /// # Errors
    ///
    /// `NotFound` if the pocket does not exist.
    pub async fn update(&self, id: PocketId, input: UpdatePocketInput) -> LedgerResult<Pocket> {
        let model = self.find_model(id).await?;
        let Some(name) = input.name else {
            return Ok(model.into());
        };

        let mut pocket: pockets::ActiveModel = model.into();
        pocket.name = Set(name);
        pocket.updated_at = Set(Utc::now().into());

        let model = pocket.update(self.conn).await.map_err(db_err)?;
        Ok(model.into())
    }

    /// Deletes a pocket.
    ///
    /// # Errors
    ///
    /// `NotFound` if the pocket does not exist.
    pub async fn delete(&self, id: PocketId) -> LedgerResult<()> {
        let result = pockets::Entity::delete_by_id(id.into_inner())
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(LedgerError::pocket_not_found(id));
        }
        Ok(())
    }

    /// Credits a Cashbox pocket.
    ///
    /// # Errors
    ///
    /// `InvalidPocketOperation` if the pocket is not a Cashbox.
    pub async fn deposit(&self, id: PocketId, amount: Amount) -> LedgerResult<Pocket> {
        let model = self.lock_model(id).await?;
        if model.pocket_type != PocketType::Cashbox {
            return Err(LedgerError::InvalidPocketOperation(
                "deposits are only allowed into the Cashbox pocket".to_string(),
            ));
        }
        let balance = credited(model.balance, amount)?;
        self.set_balance(model, balance).await
    }

    /// Debits a pocket.
    ///
    /// # Errors
    ///
    /// `InsufficientBalance` if the pocket holds less than `amount`.
    pub async fn withdraw(&self, id: PocketId, amount: Amount) -> LedgerResult<Pocket> {
        let model = self.lock_model(id).await?;
        let balance = debited(&model, amount)?;
        self.set_balance(model, balance).await
    }

    /// Moves `amount` between two pockets.
    ///
    /// Rows are locked in ascending id order so concurrent transfers in
    /// opposite directions cannot deadlock.
    ///
    /// # Errors
    ///
    /// `InsufficientBalance` if `from` holds less than `amount`.
    pub async fn transfer(
        &self,
        from: PocketId,
        to: PocketId,
        amount: Amount,
    ) -> LedgerResult<(Pocket, Pocket)> {
        if from == to {
            return Err(LedgerError::InvalidInput(
                "cannot transfer to the same pocket".to_string(),
            ));
        }

        let (source, target) = if from < to {
            let source = self.lock_model(from).await?;
            (source, self.lock_model(to).await?)
        } else {
            let target = self.lock_model(to).await?;
            (self.lock_model(from).await?, target)
        };

        let source_balance = debited(&source, amount)?;
        let target_balance = credited(target.balance, amount)?;

        let source = self.set_balance(source, source_balance).await?;
        let target = self.set_balance(target, target_balance).await?;
        Ok((source, target))
    }

    async fn find_model(&self, id: PocketId) -> LedgerResult<pockets::Model> {
        pockets::Entity::find_by_id(id.into_inner())
            .one(self.conn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| LedgerError::pocket_not_found(id))
    }

    async fn lock_model(&self, id: PocketId) -> LedgerResult<pockets::Model> {
        pockets::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(self.conn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| LedgerError::pocket_not_found(id))
    }

    async fn set_balance(&self, model: pockets::Model, balance: Decimal) -> LedgerResult<Pocket> {
        let mut pocket: pockets::ActiveModel = model.into();
        pocket.balance = Set(balance);
        pocket.updated_at = Set(Utc::now().into());

        let model = pocket.update(self.conn).await.map_err(db_err)?;
        Ok(model.into())
    }
}

fn debited(model: &pockets::Model, amount: Amount) -> LedgerResult<Decimal> {
    if model.balance < amount.value() {
        return Err(LedgerError::InsufficientBalance {
            pocket_id: PocketId::from_uuid(model.id),
            available: model.balance,
            requested: amount.value(),
        });
    }
    Ok(model.balance - amount.value())
}
