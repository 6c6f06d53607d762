//! Invariant checks over stored ledger data.
//!
//! The orchestrator never patches broken data; these checks let an operator
//! find it.

use pocketbook_shared::types::{AccountId, PocketId};
use rust_decimal::Decimal;
use serde::Serialize;

use super::types::{Account, Pocket};

/// One invariant violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "finding", rename_all = "snake_case")]
pub enum AuditFinding {
    /// The account has no Cashbox pocket.
    MissingCashbox {
        /// Account checked.
        account_id: AccountId,
    },
    /// The account has more than one Cashbox pocket.
    MultipleCashboxes {
        /// Account checked.
        account_id: AccountId,
        /// Number of Cashbox pockets found.
        count: usize,
    },
    /// The account balance is negative.
    NegativeAccountBalance {
        /// Account checked.
        account_id: AccountId,
        /// Stored balance.
        balance: Decimal,
    },
    /// A pocket balance is negative.
    NegativePocketBalance {
        /// Account checked.
        account_id: AccountId,
        /// Offending pocket.
        pocket_id: PocketId,
        /// Stored balance.
        balance: Decimal,
    },
    /// The account balance differs from the sum of its pockets.
    BalanceMismatch {
        /// Account checked.
        account_id: AccountId,
        /// Stored account balance.
        account_balance: Decimal,
        /// Sum of pocket balances.
        pockets_total: Decimal,
    },
}

impl AuditFinding {
    /// Returns the account the finding concerns.
    #[must_use]
    pub const fn account_id(&self) -> AccountId {
        match self {
            Self::MissingCashbox { account_id }
            | Self::MultipleCashboxes { account_id, .. }
            | Self::NegativeAccountBalance { account_id, .. }
            | Self::NegativePocketBalance { account_id, .. }
            | Self::BalanceMismatch { account_id, .. } => *account_id,
        }
    }
}

impl std::fmt::Display for AuditFinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingCashbox { account_id } => {
                write!(f, "account {account_id} has no Cashbox pocket")
            }
            Self::MultipleCashboxes { account_id, count } => {
                write!(f, "account {account_id} has {count} Cashbox pockets")
            }
            Self::NegativeAccountBalance {
                account_id,
                balance,
            } => write!(f, "account {account_id} has negative balance {balance}"),
            Self::NegativePocketBalance {
                account_id,
                pocket_id,
                balance,
            } => write!(
                f,
                "pocket {pocket_id} of account {account_id} has negative balance {balance}"
            ),
            Self::BalanceMismatch {
                account_id,
                account_balance,
                pockets_total,
            } => write!(
                f,
                "account {account_id} balance {account_balance} does not match pocket total {pockets_total}"
            ),
        }
    }
}

/// Checks one account against its pockets.
///
/// `pockets` must be every pocket of `account`; pockets of other accounts
/// are ignored.
#[must_use]
pub fn audit_account(account: &Account, pockets: &[Pocket]) -> Vec<AuditFinding> {
    let mut findings = Vec::new();
    let pockets: Vec<&Pocket> = pockets
        .iter()
        .filter(|p| p.account_id == account.id)
        .collect();

    match pockets.iter().filter(|p| p.pocket_type.is_cashbox()).count() {
        0 => findings.push(AuditFinding::MissingCashbox {
            account_id: account.id,
        }),
        1 => {}
        count => findings.push(AuditFinding::MultipleCashboxes {
            account_id: account.id,
            count,
        }),
    }

    if account.balance.is_sign_negative() && !account.balance.is_zero() {
        findings.push(AuditFinding::NegativeAccountBalance {
            account_id: account.id,
            balance: account.balance,
        });
    }

    for pocket in &pockets {
        if pocket.balance.is_sign_negative() && !pocket.balance.is_zero() {
            findings.push(AuditFinding::NegativePocketBalance {
                account_id: account.id,
                pocket_id: pocket.id,
                balance: pocket.balance,
            });
        }
    }

    let pockets_total: Decimal = pockets.iter().map(|p| p.balance).sum();
    if pockets_total != account.balance {
        findings.push(AuditFinding::BalanceMismatch {
            account_id: account.id,
            account_balance: account.balance,
            pockets_total,
        });
    }

    findings
}
