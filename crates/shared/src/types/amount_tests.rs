use super::*;
use rstest::rstest;
use rust_decimal_macros::dec;

#[rstest]
#[case(dec!(0.01))]
#[case(dec!(100.00))]
#[case(dec!(123456789.123456789))]
fn test_positive_amounts_accepted(#[case] value: Decimal) {
    let amount = Amount::new(value).unwrap();
    assert_eq!(amount.value(), value);
}

#[test]
fn test_zero_rejected() {
    assert_eq!(Amount::new(Decimal::ZERO), Err(AmountError::Zero));
    // -0 has a sign bit but is still zero
    assert_eq!(Amount::new(dec!(-0.00)), Err(AmountError::Zero));
}

#[test]
fn test_negative_rejected() {
    assert_eq!(
        Amount::new(dec!(-5.50)),
        Err(AmountError::Negative(dec!(-5.50)))
    );
}

#[test]
fn test_display_keeps_scale() {
    assert_eq!(Amount::new(dec!(40.00)).unwrap().to_string(), "40.00");
}

#[test]
fn test_deserialize_validates() {
    let amount: Amount = serde_json::from_str("\"12.50\"").unwrap();
    assert_eq!(amount.value(), dec!(12.50));
    assert!(serde_json::from_str::<Amount>("\"-1\"").is_err());
    assert!(serde_json::from_str::<Amount>("\"0\"").is_err());
}
