//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Repositories for accounts, pockets and the transaction log
//! - The PostgreSQL ledger store and its unit of work
//! - A database-wide invariant audit
//! - Database migrations

pub mod audit;
pub mod entities;
pub mod migration;
pub mod repositories;
pub mod store;

pub use audit::audit_all;
pub use repositories::{AccountRepository, PocketRepository, TransactionRepository};
pub use store::{PgLedgerStore, PgLedgerUnit};

use std::time::Duration;

use pocketbook_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Establishes a pooled connection using the configured pool limits.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .sqlx_logging(false);

    Database::connect(options).await
}
