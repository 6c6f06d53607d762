//! Ledger error types.
//!
//! Store implementations and the orchestrator share one error type so a
//! rule rejected deep inside a repository reaches the caller unchanged.

use pocketbook_shared::AppError;
use pocketbook_shared::types::{AmountError, PocketId};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Lookup Errors ==========
    /// Entity does not exist or is not owned by the caller.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity name ("account", "pocket").
        entity: &'static str,
        /// Requested ID.
        id: Uuid,
    },

    // ========== Validation Errors ==========
    /// Malformed or disallowed input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========== Business Rule Errors ==========
    /// Not enough funds to debit.
    #[error("Insufficient balance in pocket {pocket_id}: available {available}, requested {requested}")]
    InsufficientBalance {
        /// Pocket being debited.
        pocket_id: PocketId,
        /// Balance at the time of the request.
        available: Decimal,
        /// Amount requested.
        requested: Decimal,
    },

    /// Operation not allowed on this pocket.
    #[error("Invalid pocket operation: {0}")]
    InvalidPocketOperation(String),

    /// Reconciliation target below the current balance.
    #[error("Balance cannot decrease from {current} to {target}")]
    InvalidBalanceDecrease {
        /// Current account balance.
        current: Decimal,
        /// Requested balance.
        target: Decimal,
    },

    // ========== Integrity Errors ==========
    /// Stored data violates a ledger invariant.
    #[error("Inconsistent ledger state: {0}")]
    InconsistentState(String),

    /// Storage failure.
    #[error("Database error: {0}")]
    Database(String),

    /// An error annotated with the operation that produced it.
    #[error("{operation} failed: {source}")]
    Operation {
        /// Operation name.
        operation: &'static str,
        /// Underlying error.
        #[source]
        source: Box<LedgerError>,
    },
}

/// Classification of a [`LedgerError`], independent of added context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing or not owned.
    NotFound,
    /// Bad input.
    InvalidInput,
    /// Not enough funds.
    InsufficientBalance,
    /// Pocket rule violated.
    InvalidPocketOperation,
    /// Reconciliation would decrease the balance.
    InvalidBalanceDecrease,
    /// Invariant violated in stored data.
    InconsistentState,
    /// Storage failure.
    Storage,
}

impl LedgerError {
    /// Builds a `NotFound` for an account.
    #[must_use]
    pub fn account_not_found(id: impl Into<Uuid>) -> Self {
        Self::NotFound {
            entity: "account",
            id: id.into(),
        }
    }

    /// Builds a `NotFound` for a pocket.
    #[must_use]
    pub fn pocket_not_found(id: impl Into<Uuid>) -> Self {
        Self::NotFound {
            entity: "pocket",
            id: id.into(),
        }
    }

    /// Wraps this error with the name of the failing operation.
    #[must_use]
    pub fn context(self, operation: &'static str) -> Self {
        Self::Operation {
            operation,
            source: Box::new(self),
        }
    }

    /// Returns the kind of the innermost error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Self::InvalidPocketOperation(_) => ErrorKind::InvalidPocketOperation,
            Self::InvalidBalanceDecrease { .. } => ErrorKind::InvalidBalanceDecrease,
            Self::InconsistentState(_) => ErrorKind::InconsistentState,
            Self::Database(_) => ErrorKind::Storage,
            Self::Operation { source, .. } => source.kind(),
        }
    }

    /// Returns the innermost error, skipping context layers.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Operation { source, .. } => source.root(),
            other => other,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::InvalidInput => "INVALID_INPUT",
            ErrorKind::InsufficientBalance => "INSUFFICIENT_BALANCE",
            ErrorKind::InvalidPocketOperation => "INVALID_POCKET_OPERATION",
            ErrorKind::InvalidBalanceDecrease => "INVALID_BALANCE_DECREASE",
            ErrorKind::InconsistentState => "INCONSISTENT_STATE",
            ErrorKind::Storage => "DATABASE_ERROR",
        }
    }

    /// Returns true for errors caused by the caller rather than the system.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self.kind(),
            ErrorKind::InconsistentState | ErrorKind::Storage
        )
    }
}

impl From<AmountError> for LedgerError {
    fn from(err: AmountError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::InvalidInput => Self::Validation(message),
            ErrorKind::InsufficientBalance
            | ErrorKind::InvalidPocketOperation
            | ErrorKind::InvalidBalanceDecrease => Self::BusinessRule(message),
            ErrorKind::InconsistentState => Self::Internal(message),
            ErrorKind::Storage => Self::Database(message),
        }
    }
}

/// Adds operation context to ledger results.
pub trait LedgerResultExt<T> {
    /// Wraps the error, if any, with the operation name.
    ///
    /// # Errors
    ///
    /// Returns the original error wrapped in `LedgerError::Operation`.
    fn context(self, operation: &'static str) -> LedgerResult<T>;
}

impl<T> LedgerResultExt<T> for LedgerResult<T> {
    fn context(self, operation: &'static str) -> LedgerResult<T> {
        self.map_err(|err| err.context(operation))
    }
}
