//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Each one borrows a connection, so the same code runs on the pool or
//! inside a [`sea_orm::DatabaseTransaction`].

pub mod account;
pub mod convert;
pub mod pocket;
pub mod transaction;

pub use account::AccountRepository;
pub use pocket::PocketRepository;
pub use transaction::TransactionRepository;
