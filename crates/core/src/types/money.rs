//! Monetary helpers shared by pricing and serialization code.
//!
//! All amounts are [`Decimal`] values in the store currency's standard unit
//! (e.g., dirhams, not centimes), rounded to two decimal places at the
//! boundaries where they are persisted or returned to clients.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round a monetary amount to two decimal places.
///
/// Uses midpoint-away-from-zero rounding, matching how totals are stored
/// in `NUMERIC(10,2)` columns.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Compute a book's effective selling price.
///
/// When a discount is set it is subtracted from the base price; otherwise
/// the base price stands. Callers enforce the invariant that a stored
/// discount is strictly less than the base price, so the result is always
/// positive for a valid row.
#[must_use]
pub fn final_price(price: Decimal, discount_price: Option<Decimal>) -> Decimal {
    discount_price.map_or(price, |discount| price - discount)
}

/// Percentage of the base price covered by the discount, rounded to the
/// nearest whole percent. Returns 0 when there is no discount or the base
/// price is not positive.
#[must_use]
pub fn discount_percentage(price: Decimal, discount_price: Option<Decimal>) -> u32 {
    let Some(discount) = discount_price else {
        return 0;
    };
    if price <= Decimal::ZERO || discount <= Decimal::ZERO {
        return 0;
    }

    let percent = (discount / price * Decimal::from(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    u32::try_from(percent.mantissa()).unwrap_or(0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_final_price_without_discount() {
        assert_eq!(final_price(dec("100.00"), None), dec("100.00"));
    }

    #[test]
    fn test_final_price_subtracts_discount() {
        assert_eq!(final_price(dec("100.00"), Some(dec("20.00"))), dec("80.00"));
    }

    #[test]
    fn test_discount_percentage() {
        assert_eq!(discount_percentage(dec("100.00"), Some(dec("20.00"))), 20);
        assert_eq!(discount_percentage(dec("80.00"), Some(dec("20.00"))), 25);
        assert_eq!(discount_percentage(dec("100.00"), None), 0);
        assert_eq!(discount_percentage(Decimal::ZERO, Some(dec("5.00"))), 0);
    }

    #[test]
    fn test_round_money_half_up() {
        assert_eq!(round_money(dec("10.005")), dec("10.01"));
        assert_eq!(round_money(dec("10.004")), dec("10.00"));
    }
}
