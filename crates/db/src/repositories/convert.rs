//! Conversions between database models and ledger domain types.

use chrono::Utc;
use pocketbook_core::ledger::{
    Account, AccountType, LedgerError, Pocket, PocketType, Transaction, TransactionKind,
    TransactionType,
};
use pocketbook_shared::types::{AccountId, Amount, PocketId, TransactionId, UserId};
use sea_orm::DbErr;

use crate::entities::{accounts, pockets, sea_orm_active_enums as db_enums, transactions};

/// Maps a database error into the ledger error space.
#[must_use]
pub fn db_err(err: DbErr) -> LedgerError {
    LedgerError::Database(err.to_string())
}

impl From<AccountType> for db_enums::AccountType {
    fn from(value: AccountType) -> Self {
        match value {
            AccountType::Saving => Self::Saving,
            AccountType::FixedDeposit => Self::FixedDeposit,
            AccountType::Fcd => Self::Fcd,
            AccountType::MutualFund => Self::MutualFund,
            AccountType::Stock => Self::Stock,
        }
    }
}

impl From<db_enums::AccountType> for AccountType {
    fn from(value: db_enums::AccountType) -> Self {
        match value {
            db_enums::AccountType::Saving => Self::Saving,
            db_enums::AccountType::FixedDeposit => Self::FixedDeposit,
            db_enums::AccountType::Fcd => Self::Fcd,
            db_enums::AccountType::MutualFund => Self::MutualFund,
            db_enums::AccountType::Stock => Self::Stock,
        }
    }
}

impl From<PocketType> for db_enums::PocketType {
    fn from(value: PocketType) -> Self {
        match value {
            PocketType::Cashbox => Self::Cashbox,
            PocketType::Normal => Self::Normal,
        }
    }
}

impl From<db_enums::PocketType> for PocketType {
    fn from(value: db_enums::PocketType) -> Self {
        match value {
            db_enums::PocketType::Cashbox => Self::Cashbox,
            db_enums::PocketType::Normal => Self::Normal,
        }
    }
}

impl From<TransactionType> for db_enums::TransactionType {
    fn from(value: TransactionType) -> Self {
        match value {
            TransactionType::Deposit => Self::Deposit,
            TransactionType::Withdraw => Self::Withdraw,
            TransactionType::Transfer => Self::Transfer,
        }
    }
}

impl From<db_enums::TransactionType> for TransactionType {
    fn from(value: db_enums::TransactionType) -> Self {
        match value {
            db_enums::TransactionType::Deposit => Self::Deposit,
            db_enums::TransactionType::Withdraw => Self::Withdraw,
            db_enums::TransactionType::Transfer => Self::Transfer,
        }
    }
}

impl From<accounts::Model> for Account {
    fn from(model: accounts::Model) -> Self {
        Self {
            id: AccountId::from_uuid(model.id),
            user_id: UserId::from_uuid(model.user_id),
            account_type: model.account_type.into(),
            name: model.name,
            bank: model.bank,
            balance: model.balance,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<pockets::Model> for Pocket {
    fn from(model: pockets::Model) -> Self {
        Self {
            id: PocketId::from_uuid(model.id),
            account_id: AccountId::from_uuid(model.account_id),
            name: model.name,
            pocket_type: model.pocket_type.into(),
            balance: model.balance,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl TryFrom<transactions::Model> for Transaction {
    type Error = LedgerError;

    fn try_from(model: transactions::Model) -> Result<Self, Self::Error> {
        let kind = TransactionKind::from_parts(
            model.transaction_type.into(),
            model.from_pocket_id.map(PocketId::from_uuid),
            model.to_pocket_id.map(PocketId::from_uuid),
        )?;
        let amount = Amount::new(model.amount).map_err(|err| {
            LedgerError::InconsistentState(format!("transaction {} amount: {err}", model.id))
        })?;

        Ok(Self {
            id: TransactionId::from_uuid(model.id),
            account_id: AccountId::from_uuid(model.account_id),
            kind,
            amount,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        })
    }
}
