//! Ledger domain types.
//!
//! Accounts hold money, pockets subdivide an account's money, and
//! transactions record every movement between them.

use chrono::{DateTime, Utc};
use pocketbook_shared::types::{AccountId, Amount, PocketId, TransactionId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;

/// Kind of financial account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    /// Savings account.
    Saving,
    /// Fixed-term deposit.
    FixedDeposit,
    /// Foreign currency deposit.
    Fcd,
    /// Mutual fund holding.
    MutualFund,
    /// Stock portfolio.
    Stock,
}

impl AccountType {
    /// All account types.
    pub const ALL: [Self; 5] = [
        Self::Saving,
        Self::FixedDeposit,
        Self::Fcd,
        Self::MutualFund,
        Self::Stock,
    ];

    /// Returns the canonical code for this type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Saving => "SAVING",
            Self::FixedDeposit => "FIXED_DEPOSIT",
            Self::Fcd => "FCD",
            Self::MutualFund => "MUTUAL_FUND",
            Self::Stock => "STOCK",
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| LedgerError::InvalidInput(format!("unknown account type '{s}'")))
    }
}

/// Pocket classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PocketType {
    /// The account's mandatory pocket; the only one accepting direct deposits.
    Cashbox,
    /// A user-created pocket, funded by transfers.
    Normal,
}

impl PocketType {
    /// Returns true for the Cashbox pocket.
    #[must_use]
    pub const fn is_cashbox(&self) -> bool {
        matches!(self, Self::Cashbox)
    }
}

/// A financial account owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account ID.
    pub id: AccountId,
    /// Owning user.
    pub user_id: UserId,
    /// Account type.
    pub account_type: AccountType,
    /// Display name.
    pub name: String,
    /// Bank or institution code.
    pub bank: String,
    /// Current balance, never negative.
    pub balance: Decimal,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// A sub-allocation of an account's funds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pocket {
    /// Pocket ID.
    pub id: PocketId,
    /// Account this pocket belongs to.
    pub account_id: AccountId,
    /// Display name.
    pub name: String,
    /// Cashbox or normal pocket.
    pub pocket_type: PocketType,
    /// Current balance, never negative.
    pub balance: Decimal,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Transaction type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Money entering the Cashbox from outside.
    Deposit,
    /// Money leaving a pocket to outside.
    Withdraw,
    /// Money moving between two pockets.
    Transfer,
}

/// Direction of a money movement.
///
/// Each variant carries exactly the pockets its type requires, so a deposit
/// without a target or a transfer missing one side cannot be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    /// Deposit into a pocket.
    Deposit {
        /// Receiving pocket.
        to: PocketId,
    },
    /// Withdrawal from a pocket.
    Withdraw {
        /// Source pocket.
        from: PocketId,
    },
    /// Transfer between pockets.
    Transfer {
        /// Source pocket.
        from: PocketId,
        /// Receiving pocket.
        to: PocketId,
    },
}

impl TransactionKind {
    /// Rebuilds a kind from its flat storage form.
    ///
    /// # Errors
    ///
    /// Returns `InconsistentState` if the pocket columns do not match the type.
    pub fn from_parts(
        transaction_type: TransactionType,
        from: Option<PocketId>,
        to: Option<PocketId>,
    ) -> Result<Self, LedgerError> {
        match (transaction_type, from, to) {
            (TransactionType::Deposit, None, Some(to)) => Ok(Self::Deposit { to }),
            (TransactionType::Withdraw, Some(from), None) => Ok(Self::Withdraw { from }),
            (TransactionType::Transfer, Some(from), Some(to)) => Ok(Self::Transfer { from, to }),
            (transaction_type, from, to) => Err(LedgerError::InconsistentState(format!(
                "{transaction_type:?} transaction stored with from={from:?} to={to:?}"
            ))),
        }
    }

    /// Returns the flat transaction type.
    #[must_use]
    pub const fn transaction_type(&self) -> TransactionType {
        match self {
            Self::Deposit { .. } => TransactionType::Deposit,
            Self::Withdraw { .. } => TransactionType::Withdraw,
            Self::Transfer { .. } => TransactionType::Transfer,
        }
    }

    /// Returns the debited pocket, if any.
    #[must_use]
    pub const fn from_pocket(&self) -> Option<PocketId> {
        match self {
            Self::Deposit { .. } => None,
            Self::Withdraw { from } | Self::Transfer { from, .. } => Some(*from),
        }
    }

    /// Returns the credited pocket, if any.
    #[must_use]
    pub const fn to_pocket(&self) -> Option<PocketId> {
        match self {
            Self::Withdraw { .. } => None,
            Self::Deposit { to } | Self::Transfer { to, .. } => Some(*to),
        }
    }
}

/// An immutable record of one money movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction ID.
    pub id: TransactionId,
    /// Account the movement happened in.
    pub account_id: AccountId,
    /// Direction and pockets involved.
    pub kind: TransactionKind,
    /// Amount moved.
    pub amount: Amount,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time (equal to `created_at`; records never change).
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Account type.
    pub account_type: AccountType,
    /// Display name (required).
    pub name: String,
    /// Bank or institution code (required).
    pub bank: String,
}

/// Partial update of an account. `None` and empty strings leave the field as is.
#[derive(Debug, Clone, Default)]
pub struct UpdateAccountInput {
    /// New account type.
    pub account_type: Option<AccountType>,
    /// New name.
    pub name: Option<String>,
    /// New bank.
    pub bank: Option<String>,
}

/// Input for creating a pocket in the store.
#[derive(Debug, Clone)]
pub struct NewPocket {
    /// Owning account.
    pub account_id: AccountId,
    /// Display name.
    pub name: String,
    /// Pocket type.
    pub pocket_type: PocketType,
}

/// User-facing input for creating a normal pocket.
#[derive(Debug, Clone)]
pub struct CreatePocketInput {
    /// Owning account.
    pub account_id: AccountId,
    /// Display name (required).
    pub name: String,
}

/// Partial update of a pocket.
#[derive(Debug, Clone, Default)]
pub struct UpdatePocketInput {
    /// New name.
    pub name: Option<String>,
}

/// Input for appending to the transaction log.
#[derive(Debug, Clone, Copy)]
pub struct NewTransaction {
    /// Account the movement happened in.
    pub account_id: AccountId,
    /// Direction and pockets involved.
    pub kind: TransactionKind,
    /// Amount moved.
    pub amount: Amount,
}

/// An account together with its pockets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountWithPockets {
    /// The account.
    pub account: Account,
    /// Its pockets in creation order; the Cashbox comes first.
    pub pockets: Vec<Pocket>,
}
