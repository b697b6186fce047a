//! Pricing calculator for order placement.
//!
//! The calculator is pure: callers resolve each book's current final price
//! under the order transaction's row locks, then hand the resolved lines
//! here. Repeated pricing of the same lines always yields the same quote.

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use maktaba_core::{BookId, round_money};

/// Pricing configuration, loaded once per request from the settings store.
#[derive(Debug, Clone, Copy)]
pub struct PricingConfig {
    /// Subtotal at or above which shipping is free.
    pub free_shipping_threshold: Decimal,
    /// Flat shipping cost below the threshold.
    pub shipping_cost: Decimal,
    /// Tax rate as a fraction of the subtotal (0.20 = 20% VAT).
    pub tax_rate: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Decimal::new(500, 0),
            shipping_cost: Decimal::new(30, 0),
            tax_rate: Decimal::new(20, 2),
        }
    }
}

/// One cart line with its resolved unit price.
#[derive(Debug, Clone, Copy)]
pub struct QuoteLine {
    pub book_id: BookId,
    pub quantity: i32,
    /// The book's final price at quoting time.
    pub unit_price: Decimal,
}

/// A priced line: `total_price = unit_price * quantity`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricedLine {
    pub book_id: BookId,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

/// The computed totals for a cart.
///
/// Invariant: `total_amount = subtotal + tax_amount + shipping_amount -
/// discount_amount`. Discounts beyond per-book discount prices are not part
/// of this flow, so `discount_amount` is always zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub lines: Vec<PricedLine>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub shipping_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
}

/// Errors from quoting a cart.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    /// The cart has no lines.
    #[error("order must contain at least one item")]
    EmptyCart,

    /// A line's quantity is below one.
    #[error("quantity for book {book_id} must be at least 1")]
    InvalidQuantity {
        /// The offending book.
        book_id: BookId,
    },
}

/// Price a cart.
///
/// Shipping is waived when the subtotal reaches the free-shipping
/// threshold; tax is a fixed fraction of the subtotal, rounded to two
/// decimal places.
///
/// # Errors
///
/// Returns [`PricingError::EmptyCart`] for an empty cart and
/// [`PricingError::InvalidQuantity`] for any quantity below one.
pub fn price_quote(config: &PricingConfig, lines: &[QuoteLine]) -> Result<Quote, PricingError> {
    if lines.is_empty() {
        return Err(PricingError::EmptyCart);
    }

    let mut priced = Vec::with_capacity(lines.len());
    let mut subtotal = Decimal::ZERO;

    for line in lines {
        if line.quantity < 1 {
            return Err(PricingError::InvalidQuantity {
                book_id: line.book_id,
            });
        }

        let total_price = round_money(line.unit_price * Decimal::from(line.quantity));
        subtotal += total_price;
        priced.push(PricedLine {
            book_id: line.book_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            total_price,
        });
    }

    let shipping_amount = if subtotal >= config.free_shipping_threshold {
        Decimal::ZERO
    } else {
        config.shipping_cost
    };
    let tax_amount = round_money(subtotal * config.tax_rate);
    let discount_amount = Decimal::ZERO;
    let total_amount = subtotal + tax_amount + shipping_amount - discount_amount;

    Ok(Quote {
        lines: priced,
        subtotal,
        tax_amount,
        shipping_amount,
        discount_amount,
        total_amount,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn config() -> PricingConfig {
        PricingConfig {
            free_shipping_threshold: dec("500"),
            shipping_cost: dec("30"),
            tax_rate: dec("0.20"),
        }
    }

    fn line(id: i32, quantity: i32, unit_price: &str) -> QuoteLine {
        QuoteLine {
            book_id: BookId::new(id),
            quantity,
            unit_price: dec(unit_price),
        }
    }

    #[test]
    fn test_discounted_cart_scenario() {
        // Book at 100 with a 20 discount, qty 2: subtotal 160, shipping 30
        // (below the 500 threshold), 20% tax = 32, total 222.
        let quote = price_quote(&config(), &[line(1, 2, "80")]).unwrap();
        assert_eq!(quote.subtotal, dec("160"));
        assert_eq!(quote.shipping_amount, dec("30"));
        assert_eq!(quote.tax_amount, dec("32.00"));
        assert_eq!(quote.discount_amount, Decimal::ZERO);
        assert_eq!(quote.total_amount, dec("222.00"));
    }

    #[test]
    fn test_totals_identity() {
        let quote = price_quote(&config(), &[line(1, 3, "45.50"), line(2, 1, "120")]).unwrap();
        assert_eq!(
            quote.total_amount,
            quote.subtotal + quote.tax_amount + quote.shipping_amount - quote.discount_amount
        );
        for priced in &quote.lines {
            assert_eq!(
                priced.total_price,
                priced.unit_price * Decimal::from(priced.quantity)
            );
        }
    }

    #[test]
    fn test_free_shipping_at_exact_threshold() {
        let quote = price_quote(&config(), &[line(1, 1, "500")]).unwrap();
        assert_eq!(quote.shipping_amount, Decimal::ZERO);
    }

    #[test]
    fn test_shipping_charged_one_below_threshold() {
        let quote = price_quote(&config(), &[line(1, 1, "499")]).unwrap();
        assert_eq!(quote.shipping_amount, dec("30"));
    }

    #[test]
    fn test_quoting_is_idempotent() {
        let lines = [line(1, 2, "80"), line(2, 5, "33.33")];
        let first = price_quote(&config(), &lines).unwrap();
        let second = price_quote(&config(), &lines).unwrap();
        assert_eq!(first.subtotal, second.subtotal);
        assert_eq!(first.tax_amount, second.tax_amount);
        assert_eq!(first.shipping_amount, second.shipping_amount);
        assert_eq!(first.total_amount, second.total_amount);
    }

    #[test]
    fn test_empty_cart_rejected() {
        assert_eq!(price_quote(&config(), &[]), Err(PricingError::EmptyCart));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let err = price_quote(&config(), &[line(7, 0, "10")]).unwrap_err();
        assert_eq!(
            err,
            PricingError::InvalidQuantity {
                book_id: BookId::new(7)
            }
        );
    }

    #[test]
    fn test_tax_rounding() {
        // 3 * 33.33 = 99.99; 20% tax = 19.998 -> 20.00
        let quote = price_quote(&config(), &[line(1, 3, "33.33")]).unwrap();
        assert_eq!(quote.tax_amount, dec("20.00"));
    }
}
