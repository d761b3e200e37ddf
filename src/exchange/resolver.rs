use crate::core::currency::CurrencyCode;
use crate::core::error::ForexError;
use crate::core::rate::{ExchangeRate, ExchangeRateType};
use crate::store::RateStore;
use chrono::NaiveDate;
use std::sync::Arc;

/// Finds the rate in force for a currency and rate type on a given date.
///
/// "In force" means the stored rate with the latest effective date on or
/// before the requested date; rates dated in the future are never returned.
/// When several rates share that date the store's most recent insert wins.
#[derive(Clone)]
pub struct RateResolver {
    store: Arc<dyn RateStore>,
}

impl RateResolver {
    pub fn new(store: Arc<dyn RateStore>) -> Self {
        Self { store }
    }

    pub fn resolve_as_of(
        &self,
        currency: &CurrencyCode,
        rate_type: ExchangeRateType,
        as_of: NaiveDate,
    ) -> Result<ExchangeRate, ForexError> {
        let found = self
            .store
            .find_latest_as_of(currency, rate_type, as_of)
            .map_err(|e| e.into_forex("exchange rate"))?;

        match found {
            Some(rate) => {
                log::debug!("resolved {} {} as of {}: {}", currency, rate_type, as_of, rate);
                Ok(rate)
            }
            None => Err(ForexError::RateNotFound {
                currency: currency.clone(),
                rate_type,
                as_of,
            }),
        }
    }

    /// Same as [`resolve_as_of`](Self::resolve_as_of) for a raw stored type code.
    pub fn resolve_as_of_code(
        &self,
        currency: &CurrencyCode,
        rate_type_code: i32,
        as_of: NaiveDate,
    ) -> Result<ExchangeRate, ForexError> {
        let rate_type = ExchangeRateType::from_code(rate_type_code)?;
        self.resolve_as_of(currency, rate_type, as_of)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rate::NewExchangeRate;
    use crate::store::memory::InMemoryBook;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn resolver() -> RateResolver {
        let book = InMemoryBook::new();
        let usd = CurrencyCode::new("USD");
        book.insert_rate(NewExchangeRate::new(
            usd.clone(),
            ExchangeRateType::Buying,
            date(2024, 1, 1),
            dec!(100),
        ))
        .unwrap();
        book.insert_rate(NewExchangeRate::new(
            usd,
            ExchangeRateType::Buying,
            date(2024, 2, 1),
            dec!(110),
        ))
        .unwrap();
        RateResolver::new(Arc::new(book))
    }

    #[test]
    fn test_resolves_latest_before_date() {
        let usd = CurrencyCode::new("USD");
        let r = resolver();
        assert_eq!(
            r.resolve_as_of(&usd, ExchangeRateType::Buying, date(2024, 1, 15))
                .unwrap()
                .amount(),
            dec!(100)
        );
        assert_eq!(
            r.resolve_as_of(&usd, ExchangeRateType::Buying, date(2024, 3, 1))
                .unwrap()
                .amount(),
            dec!(110)
        );
    }

    #[test]
    fn test_resolves_on_effective_date() {
        let usd = CurrencyCode::new("USD");
        let rate = resolver()
            .resolve_as_of(&usd, ExchangeRateType::Buying, date(2024, 2, 1))
            .unwrap();
        assert_eq!(rate.amount(), dec!(110));
    }

    #[test]
    fn test_not_found_before_first_rate() {
        let usd = CurrencyCode::new("USD");
        let err = resolver()
            .resolve_as_of(&usd, ExchangeRateType::Buying, date(2023, 12, 1))
            .unwrap_err();
        assert_eq!(
            err,
            ForexError::RateNotFound {
                currency: usd,
                rate_type: ExchangeRateType::Buying,
                as_of: date(2023, 12, 1),
            }
        );
    }

    #[test]
    fn test_not_found_for_other_type() {
        let usd = CurrencyCode::new("USD");
        let err = resolver()
            .resolve_as_of(&usd, ExchangeRateType::Selling, date(2024, 3, 1))
            .unwrap_err();
        assert!(matches!(err, ForexError::RateNotFound { .. }));
    }

    #[test]
    fn test_unknown_type_code() {
        let usd = CurrencyCode::new("USD");
        let err = resolver()
            .resolve_as_of_code(&usd, 7, date(2024, 3, 1))
            .unwrap_err();
        assert_eq!(err, ForexError::InvalidRateType { code: 7 });
    }
}
