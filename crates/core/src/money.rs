//! Currency helpers.
//!
//! Money is carried as [`rust_decimal::Decimal`] end to end; rounding happens once,
//! when a value is reported.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of fractional digits in reported currency values.
pub const CURRENCY_SCALE: u32 = 2;

/// Round a currency amount to cents, midpoint away from zero.
pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_to_cents() {
        assert_eq!(round_currency(dec!(245) / dec!(15)), dec!(16.33));
        assert_eq!(round_currency(dec!(0.125)), dec!(0.13));
        assert_eq!(round_currency(dec!(-0.125)), dec!(-0.13));
    }
}
