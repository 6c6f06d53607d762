//! Input validation for ledger operations.

use pocketbook_shared::types::Amount;
use rust_decimal::Decimal;

use super::error::{LedgerError, LedgerResult};
use super::types::{NewAccount, UpdateAccountInput, UpdatePocketInput};

/// Converts a raw decimal into a strictly positive amount.
///
/// # Errors
///
/// Returns `InvalidInput` if `value <= 0`.
pub fn positive_amount(value: Decimal) -> LedgerResult<Amount> {
    Ok(Amount::new(value)?)
}

/// Trims a required text field.
///
/// # Errors
///
/// Returns `InvalidInput` if the field is empty after trimming.
pub fn required(field: &'static str, value: &str) -> LedgerResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::InvalidInput(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Normalizes an optional text field; blank values become `None`.
#[must_use]
pub fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

/// Validates and normalizes account creation input.
///
/// # Errors
///
/// Returns `InvalidInput` if the name or bank is blank.
pub fn validate_new_account(input: NewAccount) -> LedgerResult<NewAccount> {
    Ok(NewAccount {
        account_type: input.account_type,
        name: required("name", &input.name)?,
        bank: required("bank", &input.bank)?,
    })
}

/// Drops blank fields from an account update.
#[must_use]
pub fn normalize_account_update(input: UpdateAccountInput) -> UpdateAccountInput {
    UpdateAccountInput {
        account_type: input.account_type,
        name: optional(input.name.as_deref()),
        bank: optional(input.bank.as_deref()),
    }
}

/// Drops blank fields from a pocket update.
#[must_use]
pub fn normalize_pocket_update(input: UpdatePocketInput) -> UpdatePocketInput {
    UpdatePocketInput {
        name: optional(input.name.as_deref()),
    }
}

/// Adds `amount` to `balance`.
///
/// # Errors
///
/// Returns `InvalidInput` if the sum does not fit in a `Decimal`.
pub fn credited(balance: Decimal, amount: Amount) -> LedgerResult<Decimal> {
    balance.checked_add(amount.value()).ok_or_else(|| {
        LedgerError::InvalidInput(format!("balance would overflow: {balance} + {amount}"))
    })
}

/// Validates a reconciliation target.
///
/// # Errors
///
/// Returns `InvalidInput` if the target is negative.
pub fn validate_balance_target(target: Decimal) -> LedgerResult<Decimal> {
    if target.is_sign_negative() && !target.is_zero() {
        return Err(LedgerError::InvalidInput(format!(
            "balance cannot be negative: {target}"
        )));
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::error::ErrorKind;
    use crate::ledger::types::AccountType;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(0))]
    #[case(dec!(-0.01))]
    #[case(dec!(-100))]
    fn test_non_positive_amount_rejected(#[case] value: Decimal) {
        let err = positive_amount(value).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_positive_amount_accepted() {
        assert_eq!(positive_amount(dec!(0.01)).unwrap().value(), dec!(0.01));
    }

    #[test]
    fn test_required_trims() {
        assert_eq!(required("name", "  Main  ").unwrap(), "Main");
        assert!(required("name", "   ").is_err());
        assert!(required("name", "").is_err());
    }

    #[test]
    fn test_new_account_requires_name_and_bank() {
        let input = NewAccount {
            account_type: AccountType::Saving,
            name: "Main".into(),
            bank: String::new(),
        };
        let err = validate_new_account(input).unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: bank is required");
    }

    #[test]
    fn test_blank_update_fields_are_dropped() {
        let update = normalize_account_update(UpdateAccountInput {
            account_type: None,
            name: Some(String::new()),
            bank: Some(" BCA ".into()),
        });
        assert_eq!(update.name, None);
        assert_eq!(update.bank.as_deref(), Some("BCA"));
    }

    #[rstest]
    #[case(dec!(0), true)]
    #[case(dec!(150.25), true)]
    #[case(dec!(-1), false)]
    fn test_balance_target(#[case] target: Decimal, #[case] ok: bool) {
        assert_eq!(validate_balance_target(target).is_ok(), ok);
    }

    #[test]
    fn test_credited_rejects_overflow() {
        let one = Amount::new(dec!(1)).unwrap();
        assert_eq!(credited(dec!(9.99), one).unwrap(), dec!(10.99));

        let err = credited(Decimal::MAX, one).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
