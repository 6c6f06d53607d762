//! Core business logic for Pocketbook.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Domain types, validation rules, storage contracts and the ledger
//! orchestrator live here; `pocketbook-db` supplies the Postgres store.
//!
//! # Modules
//!
//! - `ledger` - Accounts, pockets and the transaction log
pub mod ledger;
