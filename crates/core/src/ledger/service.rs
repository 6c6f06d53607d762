//! Ledger orchestrator.
//!
//! [`LedgerService`] turns user-facing operations into units of work over a
//! [`LedgerStore`]. Ownership checks, cross-entity rules and the pairing of
//! every balance change with exactly one transaction record live here; the
//! stores only enforce single-entity rules.

use pocketbook_shared::types::{AccountId, Amount, PocketId, UserId};
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use super::error::{LedgerError, LedgerResult, LedgerResultExt};
use super::store::{AccountStore, LedgerStore, LedgerUnit, PocketStore, TransactionLog};
use super::types::{
    Account, AccountWithPockets, CreatePocketInput, NewAccount, NewPocket, NewTransaction,
    Pocket, PocketType, Transaction, TransactionKind, UpdateAccountInput, UpdatePocketInput,
};
use super::validation::{
    normalize_account_update, normalize_pocket_update, positive_amount, required,
    validate_balance_target, validate_new_account,
};

pub use pocketbook_shared::config::DEFAULT_CASHBOX_NAME;

/// Ledger orchestrator.
#[derive(Debug, Clone)]
pub struct LedgerService<S> {
    store: S,
    cashbox_name: String,
}

impl<S: LedgerStore> LedgerService<S> {
    /// Creates a service over `store`.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            cashbox_name: DEFAULT_CASHBOX_NAME.to_string(),
        }
    }

    /// Overrides the name given to new Cashbox pockets.
    #[must_use]
    pub fn with_cashbox_name(mut self, name: impl Into<String>) -> Self {
        self.cashbox_name = name.into();
        self
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    // ========== Accounts ==========

    /// Creates an account together with its Cashbox pocket.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the name or bank is blank. Nothing is persisted
    /// unless both records are created.
    pub async fn create_account(
        &self,
        user: UserId,
        input: NewAccount,
    ) -> LedgerResult<AccountWithPockets> {
        let result: LedgerResult<_> = async {
            let input = validate_new_account(input)?;
            let mut unit = self.store.begin().await?;

            let account = unit.create_account(user, input).await?;
            let cashbox = unit
                .create_pocket(NewPocket {
                    account_id: account.id,
                    name: self.cashbox_name.clone(),
                    pocket_type: PocketType::Cashbox,
                })
                .await?;
            unit.commit().await?;

            info!(
                user_id = %user,
                account_id = %account.id,
                cashbox_id = %cashbox.id,
                account_type = %account.account_type,
                "Account created"
            );
            Ok(AccountWithPockets {
                account,
                pockets: vec![cashbox],
            })
        }
        .await;
        finish("create_account", result)
    }

    /// Lists the user's accounts, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn get_accounts(&self, user: UserId) -> LedgerResult<Vec<Account>> {
        let result: LedgerResult<_> = async {
            let mut unit = self.store.begin().await?;
            let accounts = unit.list_accounts(user).await?;
            unit.commit().await?;
            Ok(accounts)
        }
        .await;
        finish("get_accounts", result)
    }

    /// Fetches one owned account.
    ///
    /// # Errors
    ///
    /// `NotFound` if the account is missing or owned by someone else.
    pub async fn get_account(&self, user: UserId, id: AccountId) -> LedgerResult<Account> {
        let result: LedgerResult<_> = async {
            let mut unit = self.store.begin().await?;
            let account = unit.get_account(user, id).await?;
            unit.commit().await?;
            Ok(account)
        }
        .await;
        finish("get_account", result)
    }

    /// Fetches one owned account with its pockets, read from one snapshot.
    ///
    /// # Errors
    ///
    /// `NotFound` if the account is missing or owned by someone else.
    pub async fn get_account_with_pockets(
        &self,
        user: UserId,
        id: AccountId,
    ) -> LedgerResult<AccountWithPockets> {
        let result: LedgerResult<_> = async {
            let mut unit = self.store.begin().await?;
            let account = unit.get_account(user, id).await?;
            let pockets = unit.list_pockets(id).await?;
            unit.commit().await?;
            Ok(AccountWithPockets { account, pockets })
        }
        .await;
        finish("get_account_with_pockets", result)
    }

    /// Overwrites the non-empty fields of an owned account.
    ///
    /// # Errors
    ///
    /// `NotFound` if the account is missing or owned by someone else.
    pub async fn update_account(
        &self,
        user: UserId,
        id: AccountId,
        input: UpdateAccountInput,
    ) -> LedgerResult<Account> {
        let result: LedgerResult<_> = async {
            let input = normalize_account_update(input);
            let mut unit = self.store.begin().await?;
            let account = unit.update_account(user, id, input).await?;
            unit.commit().await?;

            info!(user_id = %user, account_id = %id, "Account updated");
            Ok(account)
        }
        .await;
        finish("update_account", result)
    }

    /// Deletes an owned account with its pockets and transactions.
    ///
    /// # Errors
    ///
    /// `NotFound` if the account is missing or owned by someone else.
    pub async fn delete_account(&self, user: UserId, id: AccountId) -> LedgerResult<()> {
        let result: LedgerResult<_> = async {
            let mut unit = self.store.begin().await?;
            unit.get_account(user, id).await?;
            unit.lock_account(id).await?;
            unit.delete_account(user, id).await?;
            unit.commit().await?;

            info!(user_id = %user, account_id = %id, "Account deleted");
            Ok(())
        }
        .await;
        finish("delete_account", result)
    }

    // ========== Money Movements ==========

    /// Deposits external money into the account's Cashbox.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if `amount <= 0`
    /// - `NotFound` if the account is missing or owned by someone else
    /// - `InconsistentState` if the account does not have exactly one Cashbox
    pub async fn deposit(
        &self,
        user: UserId,
        account_id: AccountId,
        amount: Decimal,
    ) -> LedgerResult<Transaction> {
        let result: LedgerResult<_> = async {
            let amount = positive_amount(amount)?;
            let mut unit = self.store.begin().await?;

            unit.get_account(user, account_id).await?;
            unit.lock_account(account_id).await?;
            let account = unit.deposit_to_account(account_id, amount).await?;
            let cashbox = self.cashbox_of(&mut unit, account_id).await?;
            unit.deposit_to_pocket(cashbox.id, amount).await?;
            let transaction = unit
                .append_transaction(NewTransaction {
                    account_id,
                    kind: TransactionKind::Deposit { to: cashbox.id },
                    amount,
                })
                .await?;
            unit.commit().await?;

            info!(
                user_id = %user,
                account_id = %account_id,
                pocket_id = %cashbox.id,
                transaction_id = %transaction.id,
                %amount,
                balance = %account.balance,
                "Deposit committed"
            );
            Ok(transaction)
        }
        .await;
        finish("deposit", result)
    }

    /// Sets the account balance to an externally observed value.
    ///
    /// A positive difference is deposited into the Cashbox and logged as a
    /// deposit. Returns `None` when the balance already matched.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if `target < 0`
    /// - `InvalidBalanceDecrease` if `target` is below the current balance
    /// - `NotFound` if the account is missing or owned by someone else
    pub async fn reconcile_balance(
        &self,
        user: UserId,
        account_id: AccountId,
        target: Decimal,
    ) -> LedgerResult<Option<Transaction>> {
        let result: LedgerResult<_> = async {
            let target = validate_balance_target(target)?;
            let mut unit = self.store.begin().await?;

            unit.get_account(user, account_id).await?;
            unit.lock_account(account_id).await?;
            let delta = unit.reconcile_account_balance(account_id, target).await?;
            if delta.is_zero() {
                unit.commit().await?;
                return Ok(None);
            }

            let amount = Amount::new(delta).map_err(|_| {
                LedgerError::InconsistentState(format!(
                    "reconciliation of account {account_id} produced delta {delta}"
                ))
            })?;
            let cashbox = self.cashbox_of(&mut unit, account_id).await?;
            unit.deposit_to_pocket(cashbox.id, amount).await?;
            let transaction = unit
                .append_transaction(NewTransaction {
                    account_id,
                    kind: TransactionKind::Deposit { to: cashbox.id },
                    amount,
                })
                .await?;
            unit.commit().await?;

            info!(
                user_id = %user,
                account_id = %account_id,
                transaction_id = %transaction.id,
                %target,
                %delta,
                "Balance reconciled"
            );
            Ok(Some(transaction))
        }
        .await;
        finish("reconcile_balance", result)
    }

    /// Moves money between two pockets of the same account.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if `amount <= 0`, the pockets are the same, or they
    ///   belong to different accounts
    /// - `NotFound` if either pocket is missing or owned by someone else
    /// - `InsufficientBalance` if the source pocket holds less than `amount`
    pub async fn transfer(
        &self,
        user: UserId,
        from: PocketId,
        to: PocketId,
        amount: Decimal,
    ) -> LedgerResult<Transaction> {
        let result: LedgerResult<_> = async {
            let amount = positive_amount(amount)?;
            if from == to {
                return Err(LedgerError::InvalidInput(
                    "cannot transfer to the same pocket".to_string(),
                ));
            }

            let mut unit = self.store.begin().await?;
            let source = unit.get_pocket(user, from).await?;
            let target = unit.get_pocket(user, to).await?;
            if source.account_id != target.account_id {
                return Err(LedgerError::InvalidInput(
                    "transfers between different accounts are not supported".to_string(),
                ));
            }

            unit.lock_account(source.account_id).await?;
            unit.transfer_between_pockets(from, to, amount).await?;
            let transaction = unit
                .append_transaction(NewTransaction {
                    account_id: source.account_id,
                    kind: TransactionKind::Transfer { from, to },
                    amount,
                })
                .await?;
            unit.commit().await?;

            info!(
                user_id = %user,
                account_id = %source.account_id,
                from_pocket_id = %from,
                to_pocket_id = %to,
                transaction_id = %transaction.id,
                %amount,
                "Transfer committed"
            );
            Ok(transaction)
        }
        .await;
        finish("transfer", result)
    }

    /// Withdraws money from a pocket to outside the ledger.
    ///
    /// The account balance is debited by the same amount.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if `amount <= 0`
    /// - `NotFound` if the pocket is missing or owned by someone else
    /// - `InsufficientBalance` if the pocket holds less than `amount`
    pub async fn withdraw(
        &self,
        user: UserId,
        pocket_id: PocketId,
        amount: Decimal,
    ) -> LedgerResult<Transaction> {
        let result: LedgerResult<_> = async {
            let amount = positive_amount(amount)?;
            let mut unit = self.store.begin().await?;

            let pocket = unit.get_pocket(user, pocket_id).await?;
            unit.lock_account(pocket.account_id).await?;
            unit.withdraw_from_pocket(pocket_id, amount).await?;
            let account = unit
                .withdraw_from_account(pocket.account_id, amount)
                .await?;
            let transaction = unit
                .append_transaction(NewTransaction {
                    account_id: pocket.account_id,
                    kind: TransactionKind::Withdraw { from: pocket_id },
                    amount,
                })
                .await?;
            unit.commit().await?;

            info!(
                user_id = %user,
                account_id = %pocket.account_id,
                pocket_id = %pocket_id,
                transaction_id = %transaction.id,
                %amount,
                balance = %account.balance,
                "Withdrawal committed"
            );
            Ok(transaction)
        }
        .await;
        finish("withdraw", result)
    }

    // ========== Pockets ==========

    /// Creates a normal pocket in an owned account.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the name is blank, `NotFound` if the account is
    /// missing or owned by someone else.
    pub async fn create_pocket(&self, user: UserId, input: CreatePocketInput) -> LedgerResult<Pocket> {
        let result: LedgerResult<_> = async {
            let name = required("name", &input.name)?;
            let mut unit = self.store.begin().await?;

            unit.get_account(user, input.account_id).await?;
            let pocket = unit
                .create_pocket(NewPocket {
                    account_id: input.account_id,
                    name,
                    pocket_type: PocketType::Normal,
                })
                .await?;
            unit.commit().await?;

            info!(
                user_id = %user,
                account_id = %input.account_id,
                pocket_id = %pocket.id,
                "Pocket created"
            );
            Ok(pocket)
        }
        .await;
        finish("create_pocket", result)
    }

    /// Fetches one owned pocket.
    ///
    /// # Errors
    ///
    /// `NotFound` if the pocket is missing or owned by someone else.
    pub async fn get_pocket(&self, user: UserId, id: PocketId) -> LedgerResult<Pocket> {
        let result: LedgerResult<_> = async {
            let mut unit = self.store.begin().await?;
            let pocket = unit.get_pocket(user, id).await?;
            unit.commit().await?;
            Ok(pocket)
        }
        .await;
        finish("get_pocket", result)
    }

    /// Lists the pockets of an owned account in creation order.
    ///
    /// # Errors
    ///
    /// `NotFound` if the account is missing or owned by someone else.
    pub async fn get_pockets(&self, user: UserId, account_id: AccountId) -> LedgerResult<Vec<Pocket>> {
        let result: LedgerResult<_> = async {
            let mut unit = self.store.begin().await?;
            unit.get_account(user, account_id).await?;
            let pockets = unit.list_pockets(account_id).await?;
            unit.commit().await?;
            Ok(pockets)
        }
        .await;
        finish("get_pockets", result)
    }

    /// Renames an owned pocket. A blank name leaves it unchanged.
    ///
    /// # Errors
    ///
    /// `NotFound` if the pocket is missing or owned by someone else.
    pub async fn update_pocket(
        &self,
        user: UserId,
        id: PocketId,
        input: UpdatePocketInput,
    ) -> LedgerResult<Pocket> {
        let result: LedgerResult<_> = async {
            let input = normalize_pocket_update(input);
            let mut unit = self.store.begin().await?;

            let pocket = unit.get_pocket(user, id).await?;
            if input.name.is_none() {
                unit.commit().await?;
                return Ok(pocket);
            }
            let pocket = unit.update_pocket(id, input).await?;
            unit.commit().await?;

            info!(user_id = %user, pocket_id = %id, "Pocket updated");
            Ok(pocket)
        }
        .await;
        finish("update_pocket", result)
    }

    /// Deletes an owned, empty, normal pocket.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the pocket is missing or owned by someone else
    /// - `InvalidPocketOperation` for the Cashbox or a pocket holding funds
    pub async fn delete_pocket(&self, user: UserId, id: PocketId) -> LedgerResult<()> {
        let result: LedgerResult<_> = async {
            let mut unit = self.store.begin().await?;

            let pocket = unit.get_pocket(user, id).await?;
            unit.lock_account(pocket.account_id).await?;
            // Re-read under the account lock so the balance is current.
            let pocket = unit.get_pocket(user, id).await?;

            if pocket.pocket_type.is_cashbox() {
                return Err(LedgerError::InvalidPocketOperation(
                    "the Cashbox pocket cannot be deleted".to_string(),
                ));
            }
            if !pocket.balance.is_zero() {
                return Err(LedgerError::InvalidPocketOperation(format!(
                    "pocket still holds {}; transfer the funds out first",
                    pocket.balance
                )));
            }

            unit.delete_pocket(id).await?;
            unit.commit().await?;

            info!(
                user_id = %user,
                account_id = %pocket.account_id,
                pocket_id = %id,
                "Pocket deleted"
            );
            Ok(())
        }
        .await;
        finish("delete_pocket", result)
    }

    // ========== Transactions ==========

    /// Lists the transactions of an owned account, newest first.
    ///
    /// # Errors
    ///
    /// `NotFound` if the account is missing or owned by someone else.
    pub async fn get_transactions(
        &self,
        user: UserId,
        account_id: AccountId,
    ) -> LedgerResult<Vec<Transaction>> {
        let result: LedgerResult<_> = async {
            let mut unit = self.store.begin().await?;
            unit.get_account(user, account_id).await?;
            let transactions = unit.list_transactions(user, account_id).await?;
            unit.commit().await?;
            Ok(transactions)
        }
        .await;
        finish("get_transactions", result)
    }

    /// Returns the account's single Cashbox pocket.
    async fn cashbox_of(
        &self,
        unit: &mut S::Unit,
        account_id: AccountId,
    ) -> LedgerResult<Pocket> {
        let pockets = unit.list_pockets(account_id).await?;
        single_cashbox(account_id, pockets)
    }
}

fn single_cashbox(account_id: AccountId, pockets: Vec<Pocket>) -> LedgerResult<Pocket> {
    let mut cashboxes = pockets.into_iter().filter(|p| p.pocket_type.is_cashbox());
    match (cashboxes.next(), cashboxes.next()) {
        (Some(cashbox), None) => Ok(cashbox),
        (None, _) => Err(LedgerError::InconsistentState(format!(
            "account {account_id} has no Cashbox pocket"
        ))),
        (Some(_), Some(_)) => Err(LedgerError::InconsistentState(format!(
            "account {account_id} has more than one Cashbox pocket"
        ))),
    }
}

/// Logs a failed operation and attaches its name.
fn finish<T>(operation: &'static str, result: LedgerResult<T>) -> LedgerResult<T> {
    if let Err(err) = &result {
        if err.is_rejection() {
            warn!(operation, code = err.error_code(), error = %err, "Ledger operation rejected");
        } else {
            error!(operation, code = err.error_code(), error = %err, "Ledger operation failed");
        }
    }
    result.context(operation)
}
