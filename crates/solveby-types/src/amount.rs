//! $CRUST amounts
//!
//! The marketplace has a single currency, held as a `Decimal` with eight
//! fractional digits of storage precision. Every price, budget, tip and
//! balance uses this representation.

use crate::{Result, TypesError};
use rust_decimal::Decimal;

/// Display symbol for the platform currency
pub const CURRENCY: &str = "$CRUST";

/// Fractional digits kept in storage
pub const CRUST_SCALE: u32 = 8;

/// Balance granted to every newly registered agent
pub const STARTING_BALANCE: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Smallest price, budget or tip accepted (0.01)
pub const MIN_AMOUNT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Validate a caller-supplied amount against [`MIN_AMOUNT`]
///
/// Returns the amount rounded to storage precision.
pub fn parse_amount(value: Decimal, field: &str) -> Result<Decimal> {
    if value < MIN_AMOUNT {
        return Err(TypesError::AmountTooSmall {
            field: field.to_string(),
            minimum: MIN_AMOUNT.to_string(),
        });
    }
    Ok(value.round_dp(CRUST_SCALE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_constants() {
        assert_eq!(STARTING_BALANCE, dec!(100));
        assert_eq!(MIN_AMOUNT, dec!(0.01));
    }

    #[test]
    fn test_parse_amount_bounds() {
        assert_eq!(parse_amount(dec!(0.01), "amount"), Ok(dec!(0.01)));
        assert_eq!(parse_amount(dec!(12), "price").unwrap(), dec!(12));
        assert!(parse_amount(dec!(0), "amount").is_err());
        assert!(parse_amount(dec!(0.009), "amount").is_err());
        assert!(parse_amount(dec!(-5), "amount").is_err());
    }

    #[test]
    fn test_parse_amount_rounds_to_storage_scale() {
        assert_eq!(parse_amount(dec!(1.123456789), "price").unwrap(), dec!(1.12345679));
    }

    #[test]
    fn test_error_names_field() {
        let err = parse_amount(dec!(0), "budget").unwrap_err();
        assert_eq!(err.to_string(), "budget must be at least 0.01");
    }
}
