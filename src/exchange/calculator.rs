use crate::core::error::ForexError;
use crate::core::rate::{ExchangeRate, RATE_SCALE};
use rust_decimal::{Decimal, RoundingStrategy};

/// Pure amount conversion against the home currency.
///
/// Rates are quoted as units of home currency per one unit of the foreign
/// currency, so converting into home multiplies and converting out of home
/// divides.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use forex_engine::core::currency::CurrencyCode;
/// use forex_engine::core::ids::RateId;
/// use forex_engine::core::rate::{ExchangeRate, ExchangeRateType, NewExchangeRate};
/// use forex_engine::exchange::calculator::ConversionCalculator;
/// use rust_decimal_macros::dec;
///
/// let selling = ExchangeRate::from_new(
///     RateId::new(1),
///     NewExchangeRate::new(
///         CurrencyCode::new("USD"),
///         ExchangeRateType::Selling,
///         NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
///         dec!(3720),
///     ),
/// );
/// let calc = ConversionCalculator::default();
/// assert_eq!(calc.convert_from_home(dec!(370000), &selling).unwrap(), dec!(99.462366));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionCalculator {
    scale: u32,
}

impl Default for ConversionCalculator {
    fn default() -> Self {
        Self { scale: RATE_SCALE }
    }
}

impl ConversionCalculator {
    pub fn new(scale: u32) -> Self {
        Self { scale }
    }

    /// Foreign amount into home currency: `amount * rate`, exact.
    pub fn convert_to_home(&self, amount_given: Decimal, rate: &ExchangeRate) -> Result<Decimal, ForexError> {
        let rate_amount = positive_rate(rate)?;
        amount_given
            .checked_mul(rate_amount)
            .ok_or(ForexError::AmountOverflow {
                amount: amount_given,
                rate: rate_amount,
            })
    }

    /// Home amount into a foreign currency: `amount / rate`, rounded half to
    /// even at the calculator's scale.
    pub fn convert_from_home(&self, amount_given: Decimal, rate: &ExchangeRate) -> Result<Decimal, ForexError> {
        let rate_amount = positive_rate(rate)?;
        let quotient = amount_given
            .checked_div(rate_amount)
            .ok_or(ForexError::AmountOverflow {
                amount: amount_given,
                rate: rate_amount,
            })?;
        let mut rounded =
            quotient.round_dp_with_strategy(self.scale, RoundingStrategy::MidpointNearestEven);
        // always report exactly `scale` fractional digits
        rounded.rescale(self.scale);
        Ok(rounded)
    }
}

fn positive_rate(rate: &ExchangeRate) -> Result<Decimal, ForexError> {
    if rate.amount() <= Decimal::ZERO {
        return Err(ForexError::InvalidRateAmount {
            rate_id: Some(rate.id()),
            currency: rate.currency().clone(),
            amount: rate.amount(),
        });
    }
    Ok(rate.amount())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::CurrencyCode;
    use crate::core::ids::RateId;
    use crate::core::rate::{ExchangeRateType, NewExchangeRate};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn rate(amount: Decimal) -> ExchangeRate {
        ExchangeRate::from_new(
            RateId::new(1),
            NewExchangeRate::new(
                CurrencyCode::new("USD"),
                ExchangeRateType::Buying,
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                amount,
            ),
        )
    }

    #[test]
    fn test_to_home_is_exact_multiplication() {
        let calc = ConversionCalculator::default();
        assert_eq!(calc.convert_to_home(dec!(100), &rate(dec!(3700))).unwrap(), dec!(370000));
        assert_eq!(
            calc.convert_to_home(dec!(0.333333), &rate(dec!(1.000001))).unwrap(),
            dec!(0.333333333333)
        );
    }

    #[test]
    fn test_from_home_rounds_half_even() {
        let calc = ConversionCalculator::default();
        assert_eq!(
            calc.convert_from_home(dec!(370000), &rate(dec!(3720))).unwrap(),
            dec!(99.462366)
        );
        // 0.0000025 and 0.0000035 are exact midpoints at six digits
        assert_eq!(
            calc.convert_from_home(dec!(0.000005), &rate(dec!(2))).unwrap(),
            dec!(0.000002)
        );
        assert_eq!(
            calc.convert_from_home(dec!(0.000007), &rate(dec!(2))).unwrap(),
            dec!(0.000004)
        );
    }

    #[test]
    fn test_from_home_has_exactly_six_digits() {
        let calc = ConversionCalculator::default();
        let taken = calc.convert_from_home(dec!(370000), &rate(dec!(3700))).unwrap();
        assert_eq!(taken, dec!(100));
        assert_eq!(taken.scale(), 6);
    }

    #[test]
    fn test_zero_and_negative_rates_rejected() {
        let calc = ConversionCalculator::default();
        for bad in [Decimal::ZERO, dec!(-3700)] {
            assert!(matches!(
                calc.convert_from_home(dec!(100), &rate(bad)),
                Err(ForexError::InvalidRateAmount { .. })
            ));
            assert!(matches!(
                calc.convert_to_home(dec!(100), &rate(bad)),
                Err(ForexError::InvalidRateAmount { .. })
            ));
        }
    }

    #[test]
    fn test_overflow_reported() {
        let calc = ConversionCalculator::default();
        assert!(matches!(
            calc.convert_to_home(Decimal::MAX, &rate(dec!(2))),
            Err(ForexError::AmountOverflow { .. })
        ));
    }
}
