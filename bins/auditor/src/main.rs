//! Pocketbook ledger auditor.
//!
//! Checks every account for a single Cashbox, non-negative balances and an
//! account balance equal to the sum of its pockets. Exits with status 1
//! when any violation is found.

use std::process::ExitCode;

use anyhow::Context;
use tracing::{error, info};

use pocketbook_db::{audit_all, connect_with};
use pocketbook_shared::{AppConfig, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    telemetry::init(&config.log).context("failed to initialise tracing")?;

    let db = connect_with(&config.database)
        .await
        .context("failed to connect to database")?;
    info!("Connected to database");

    let findings = audit_all(&db).await.context("ledger audit failed")?;
    if findings.is_empty() {
        info!("No ledger invariant violations found");
        return Ok(ExitCode::SUCCESS);
    }

    for finding in &findings {
        error!(account_id = %finding.account_id(), %finding, "Ledger invariant violated");
    }
    error!(count = findings.len(), "Ledger audit found violations");
    Ok(ExitCode::FAILURE)
}
