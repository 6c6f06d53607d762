//! Account, pocket and transaction ledger.
//!
//! This module implements the ledger consistency engine:
//! - Domain types for accounts, pockets and transactions
//! - Error types for ledger operations
//! - Storage contracts and a unit of work grouping them
//! - The orchestrator that turns user operations into atomic units
//! - Invariant auditing over stored data
//! - An in-memory store for tests

pub mod audit;
pub mod error;
pub mod memory;
pub mod service;
pub mod store;
pub mod types;
pub mod validation;

#[cfg(test)]
mod service_props;
#[cfg(test)]
mod tests;

pub use audit::{AuditFinding, audit_account};
pub use error::{ErrorKind, LedgerError, LedgerResult, LedgerResultExt};
pub use memory::{FailPoint, InMemoryLedgerStore, InMemoryUnit, MemoryState};
pub use service::{DEFAULT_CASHBOX_NAME, LedgerService};
pub use store::{AccountStore, LedgerStore, LedgerUnit, PocketStore, TransactionLog};
pub use types::{
    Account, AccountType, AccountWithPockets, CreatePocketInput, NewAccount, NewPocket,
    NewTransaction, Pocket, PocketType, Transaction, TransactionKind, TransactionType,
    UpdateAccountInput, UpdatePocketInput,
};
pub use validation::credited;
