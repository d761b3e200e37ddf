use crate::core::currency::CurrencyCode;
use crate::core::error::ForexError;
use crate::core::ids::RateId;
use crate::core::rate::{ExchangeRate, ExchangeRateType, NewExchangeRate, RateChange, RateChanges};
use crate::exchange::resolver::RateResolver;
use crate::store::{Collaborators, CurrencyRegistry, RateStore};
use chrono::NaiveDate;
use std::sync::Arc;

/// Administration of stored exchange rates.
pub struct RateService {
    rates: Arc<dyn RateStore>,
    currencies: Arc<dyn CurrencyRegistry>,
    resolver: RateResolver,
}

impl RateService {
    pub fn new(collaborators: &Collaborators) -> Self {
        Self {
            rates: collaborators.rates.clone(),
            currencies: collaborators.currencies.clone(),
            resolver: RateResolver::new(collaborators.rates.clone()),
        }
    }

    /// Store a new rate snapshot for a registered currency.
    pub fn create_rate(&self, rate: NewExchangeRate) -> Result<ExchangeRate, ForexError> {
        let rate = rate.validated()?;
        self.ensure_registered(&rate.currency)?;
        let stored = self
            .rates
            .insert_rate(rate)
            .map_err(|e| e.into_forex("exchange rate"))?;
        log::info!("exchange rate created: {}", stored);
        Ok(stored)
    }

    /// Apply a partial change and return the stored rate with what changed.
    pub fn update_rate(
        &self,
        id: RateId,
        changes: &RateChanges,
    ) -> Result<(ExchangeRate, Vec<RateChange>), ForexError> {
        let current = self.retrieve_rate(id)?;
        let (next, applied) = current.apply(changes)?;
        if applied.is_empty() {
            return Ok((current, applied));
        }
        if applied.iter().any(|c| matches!(c, RateChange::Currency(_))) {
            self.ensure_registered(next.currency())?;
        }
        self.rates
            .replace_rate(&next)
            .map_err(|e| e.into_forex("exchange rate"))?;

        let fields: Vec<&str> = applied.iter().map(RateChange::field).collect();
        log::info!("exchange rate {} updated ({})", id, fields.join(", "));
        Ok((next, applied))
    }

    pub fn retrieve_rate(&self, id: RateId) -> Result<ExchangeRate, ForexError> {
        self.rates
            .find_rate(id)
            .map_err(|e| e.into_forex("exchange rate"))?
            .ok_or(ForexError::ExchangeRateNotFound { id })
    }

    /// Every stored rate ordered by currency, effective date, then id.
    pub fn retrieve_all_rates(&self) -> Result<Vec<ExchangeRate>, ForexError> {
        self.rates
            .all_rates()
            .map_err(|e| e.into_forex("exchange rate"))
    }

    pub fn resolve_as_of(
        &self,
        currency: &CurrencyCode,
        rate_type: ExchangeRateType,
        as_of: NaiveDate,
    ) -> Result<ExchangeRate, ForexError> {
        self.resolver.resolve_as_of(currency, rate_type, as_of)
    }

    pub fn resolve_as_of_code(
        &self,
        currency: &CurrencyCode,
        rate_type_code: i32,
        as_of: NaiveDate,
    ) -> Result<ExchangeRate, ForexError> {
        self.resolver.resolve_as_of_code(currency, rate_type_code, as_of)
    }

    fn ensure_registered(&self, code: &CurrencyCode) -> Result<(), ForexError> {
        self.currencies
            .find_by_code(code)
            .map_err(|e| e.into_forex("organisation currency"))?
            .map(|_| ())
            .ok_or_else(|| ForexError::CurrencyNotFound { code: code.clone() })
    }
}
