//! Database seeder for Pocketbook development and testing.
//!
//! Seeds a demo user with one account, a spending pocket, a deposit, a
//! transfer and a withdrawal. Every write goes through `LedgerService`, so
//! the seeded ledger satisfies the same invariants as real traffic.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use rust_decimal_macros::dec;
use tracing::info;
use uuid::Uuid;

use pocketbook_core::ledger::{AccountType, CreatePocketInput, LedgerService, NewAccount};
use pocketbook_db::{PgLedgerStore, connect_with};
use pocketbook_shared::types::UserId;
use pocketbook_shared::{AppConfig, telemetry};

/// Demo user ID (consistent for all seeds)
const DEMO_USER_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0002);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    telemetry::init(&config.log).context("failed to initialise tracing")?;

    info!("Connecting to database...");
    let db = connect_with(&config.database)
        .await
        .context("failed to connect to database")?;

    let ledger = LedgerService::new(PgLedgerStore::new(db))
        .with_cashbox_name(config.ledger.cashbox_name.clone());
    let user = UserId::from_uuid(DEMO_USER_ID);

    if !ledger.get_accounts(user).await?.is_empty() {
        info!(%user, "Demo user already has accounts, skipping...");
        return Ok(());
    }

    let created = ledger
        .create_account(
            user,
            NewAccount {
                account_type: AccountType::Saving,
                name: "Daily".to_string(),
                bank: "Demo Bank".to_string(),
            },
        )
        .await?;
    let account = created.account.id;
    let cashbox = created
        .pockets
        .first()
        .map(|pocket| pocket.id)
        .context("new account has no Cashbox")?;
    info!(%account, "Seeded account");

    let groceries = ledger
        .create_pocket(
            user,
            CreatePocketInput {
                account_id: account,
                name: "Groceries".to_string(),
            },
        )
        .await?;

    ledger.deposit(user, account, dec!(1000.00)).await?;
    ledger.transfer(user, cashbox, groceries.id, dec!(250.00)).await?;
    ledger.withdraw(user, groceries.id, dec!(42.50)).await?;

    let summary = ledger.get_account_with_pockets(user, account).await?;
    for pocket in &summary.pockets {
        info!(pocket = %pocket.name, balance = %pocket.balance, "Seeded pocket");
    }
    info!(balance = %summary.account.balance, "Seeding complete!");
    Ok(())
}
