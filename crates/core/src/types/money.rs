//! Decimal money helpers.
//!
//! Prices travel as decimals (the API serializes them as strings) and are
//! never converted to floating point.

use rust_decimal::Decimal;

/// Price of `quantity` units at `unit_price`, saturating at the bounds of
/// [`Decimal`].
#[must_use]
pub fn line_total(unit_price: Decimal, quantity: u32) -> Decimal {
    unit_price.saturating_mul(Decimal::from(quantity))
}

/// Price of `quantity` units at `unit_price`, or `None` if it does not fit
/// in a [`Decimal`].
#[must_use]
pub fn checked_line_total(unit_price: Decimal, quantity: u32) -> Option<Decimal> {
    unit_price.checked_mul(Decimal::from(quantity))
}

/// Format an amount for display, e.g. `$19.90`.
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total() {
        let price = Decimal::new(1999, 2);
        assert_eq!(line_total(price, 3), Decimal::new(5997, 2));
        assert_eq!(line_total(price, 0), Decimal::ZERO);
    }

    #[test]
    fn test_line_total_at_decimal_bounds() {
        assert_eq!(line_total(Decimal::MAX, 2), Decimal::MAX);
        assert_eq!(checked_line_total(Decimal::MAX, 2), None);
        assert_eq!(checked_line_total(Decimal::MAX, 1), Some(Decimal::MAX));
        assert_eq!(
            checked_line_total(Decimal::new(250, 2), 4),
            Some(Decimal::from(10))
        );
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(Decimal::from(20)), "$20.00");
        assert_eq!(format_amount(Decimal::new(1999, 2)), "$19.99");
        assert_eq!(format_amount(Decimal::new(12346, 3)), "$12.35");
    }
}
