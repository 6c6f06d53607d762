//! Transaction log repository.
//!
//! Records are insert-only; the schema rejects updates.

use chrono::Utc;
use pocketbook_core::ledger::{LedgerResult, NewTransaction, Transaction};
use pocketbook_shared::types::{AccountId, PocketId, TransactionId, UserId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};

use super::convert::db_err;
use crate::entities::{accounts, transactions};

/// Transaction log repository.
#[derive(Debug, Clone, Copy)]
pub struct TransactionRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> TransactionRepository<'a, C> {
    /// Creates a repository over `conn`.
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Lists an owned account's transactions, newest first.
    ///
    /// Accounts not owned by `user` yield an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored row is malformed.
    pub async fn list_by_account(
        &self,
        user: UserId,
        account: AccountId,
    ) -> LedgerResult<Vec<Transaction>> {
        let models = transactions::Entity::find()
            .inner_join(accounts::Entity)
            .filter(transactions::Column::AccountId.eq(account.into_inner()))
            .filter(accounts::Column::UserId.eq(user.into_inner()))
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .all(self.conn)
            .await
            .map_err(db_err)?;

        models.into_iter().map(Transaction::try_from).collect()
    }

    /// Appends one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn append(&self, input: NewTransaction) -> LedgerResult<Transaction> {
        let now = Utc::now().into();
        let transaction = transactions::ActiveModel {
            id: Set(TransactionId::new().into_inner()),
            account_id: Set(input.account_id.into_inner()),
            transaction_type: Set(input.kind.transaction_type().into()),
            from_pocket_id: Set(input.kind.from_pocket().map(PocketId::into_inner)),
            to_pocket_id: Set(input.kind.to_pocket().map(PocketId::into_inner)),
            amount: Set(input.amount.value()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = transaction.insert(self.conn).await.map_err(db_err)?;
        Transaction::try_from(model)
    }
}
