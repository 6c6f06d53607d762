//! Database-wide invariant scan.

use std::collections::HashMap;

use pocketbook_core::ledger::{AuditFinding, LedgerResult, Pocket, audit_account};
use pocketbook_shared::types::AccountId;
use sea_orm::{AccessMode, DatabaseConnection, IsolationLevel, TransactionTrait};
use tracing::info;

use crate::repositories::convert::db_err;
use crate::repositories::{AccountRepository, PocketRepository};

/// Checks every account against its pockets.
///
/// Reads run in one read-only, repeatable-read transaction so accounts and
/// pockets come from the same snapshot.
///
/// # Errors
///
/// Returns an error if the database cannot be read.
pub async fn audit_all(db: &DatabaseConnection) -> LedgerResult<Vec<AuditFinding>> {
    let txn = db
        .begin_with_config(
            Some(IsolationLevel::RepeatableRead),
            Some(AccessMode::ReadOnly),
        )
        .await
        .map_err(db_err)?;

    let accounts = AccountRepository::new(&txn).list_all().await?;
    let pockets = PocketRepository::new(&txn).list_all().await?;
    txn.commit().await.map_err(db_err)?;

    let mut by_account: HashMap<AccountId, Vec<Pocket>> = HashMap::new();
    for pocket in pockets {
        by_account.entry(pocket.account_id).or_default().push(pocket);
    }

    let findings: Vec<AuditFinding> = accounts
        .iter()
        .flat_map(|account| {
            let pockets = by_account.get(&account.id).map_or(&[][..], Vec::as_slice);
            audit_account(account, pockets)
        })
        .collect();

    info!(
        accounts = accounts.len(),
        findings = findings.len(),
        "Ledger audit finished"
    );
    Ok(findings)
}
