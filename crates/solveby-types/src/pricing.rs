//! Direct-hire order pricing

use crate::{PackageTier, Result, TypesError};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Delivery window when no package is chosen
pub const DEFAULT_DELIVERY_DAYS: i32 = 3;

/// Revision allowance when no package is chosen
pub const DEFAULT_REVISIONS: i32 = 1;

/// The parts of a package that affect an order
#[derive(Debug, Clone, PartialEq)]
pub struct PackageTerms {
    pub tier: PackageTier,
    pub price: Decimal,
    pub delivery_days: i32,
    pub revisions: i32,
}

/// The parts of an add-on that affect an order
#[derive(Debug, Clone, PartialEq)]
pub struct AddonTerms {
    pub price: Decimal,
    pub delivery_days_extra: i32,
}

/// Final terms of a direct hire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderQuote {
    pub price: Decimal,
    pub delivery_days: i32,
    pub revisions: i32,
    pub tier: Option<PackageTier>,
}

impl OrderQuote {
    /// Package terms replace the base price and defaults; each add-on then
    /// adds its price and extra days on top.
    pub fn compute(base_price: Decimal, package: Option<&PackageTerms>, addons: &[AddonTerms]) -> Self {
        let mut quote = match package {
            Some(p) => Self {
                price: p.price,
                delivery_days: p.delivery_days,
                revisions: p.revisions,
                tier: Some(p.tier),
            },
            None => Self {
                price: base_price,
                delivery_days: DEFAULT_DELIVERY_DAYS,
                revisions: DEFAULT_REVISIONS,
                tier: None,
            },
        };

        for addon in addons {
            quote.price += addon.price;
            quote.delivery_days = quote.delivery_days.saturating_add(addon.delivery_days_extra);
        }
        quote
    }

    /// Fails instead of overflowing when the window is beyond the calendar
    pub fn deadline_from(&self, start: DateTime<Utc>) -> Result<DateTime<Utc>> {
        Duration::try_days(i64::from(self.delivery_days))
            .and_then(|days| start.checked_add_signed(days))
            .ok_or(TypesError::DeadlineOutOfRange {
                days: self.delivery_days,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_base_price_defaults() {
        let quote = OrderQuote::compute(dec!(10), None, &[]);
        assert_eq!(quote.price, dec!(10));
        assert_eq!(quote.delivery_days, 3);
        assert_eq!(quote.revisions, 1);
        assert_eq!(quote.tier, None);
    }

    #[test]
    fn test_package_overrides_base() {
        let package = PackageTerms {
            tier: PackageTier::Premium,
            price: dec!(45),
            delivery_days: 7,
            revisions: 3,
        };
        let quote = OrderQuote::compute(dec!(10), Some(&package), &[]);
        assert_eq!(quote.price, dec!(45));
        assert_eq!(quote.delivery_days, 7);
        assert_eq!(quote.revisions, 3);
        assert_eq!(quote.tier, Some(PackageTier::Premium));
    }

    #[test]
    fn test_addons_stack() {
        let addons = [
            AddonTerms { price: dec!(5), delivery_days_extra: 1 },
            AddonTerms { price: dec!(2.5), delivery_days_extra: 2 },
        ];
        let quote = OrderQuote::compute(dec!(10), None, &addons);
        assert_eq!(quote.price, dec!(17.5));
        assert_eq!(quote.delivery_days, 6);
    }

    #[test]
    fn test_deadline() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let quote = OrderQuote::compute(dec!(1), None, &[]);
        assert_eq!(
            quote.deadline_from(start),
            Ok(Utc.with_ymd_and_hms(2026, 3, 4, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_oversized_window_is_an_error_not_a_panic() {
        let package = PackageTerms {
            tier: PackageTier::Basic,
            price: dec!(1),
            delivery_days: i32::MAX,
            revisions: 0,
        };
        let addons = [AddonTerms { price: dec!(1), delivery_days_extra: i32::MAX }];
        let quote = OrderQuote::compute(dec!(1), Some(&package), &addons);
        assert_eq!(quote.delivery_days, i32::MAX);

        let err = quote.deadline_from(Utc::now()).unwrap_err();
        assert_eq!(err, TypesError::DeadlineOutOfRange { days: i32::MAX });
    }
}
