use crate::core::currency::CurrencyCode;
use crate::core::error::ForexError;
use crate::core::ids::RateId;
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fractional digits kept on stored rates and on divided amounts.
pub const RATE_SCALE: u32 = 6;

/// The kind of quote an exchange rate represents.
///
/// Numeric values are stable and used as the store-level type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExchangeRateType {
    /// Converting a foreign currency into the home currency.
    Buying,
    /// Converting the home currency into a foreign currency.
    Selling,
    /// Reference/display only.
    Intermediary,
}

impl ExchangeRateType {
    const ALL: [ExchangeRateType; 3] = [Self::Buying, Self::Selling, Self::Intermediary];

    pub fn all() -> &'static [ExchangeRateType] {
        &Self::ALL
    }

    pub const fn value(self) -> i32 {
        match self {
            Self::Buying => 1,
            Self::Selling => 2,
            Self::Intermediary => 3,
        }
    }

    /// Message code used by display layers.
    pub const fn code(self) -> &'static str {
        match self {
            Self::Buying => "exchangeRateType.buying",
            Self::Selling => "exchangeRateType.selling",
            Self::Intermediary => "exchangeRateType.intermediary",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Buying => "BUYING",
            Self::Selling => "SELLING",
            Self::Intermediary => "INTERMEDIARY",
        }
    }

    pub fn from_code(code: i32) -> Result<Self, ForexError> {
        match code {
            1 => Ok(Self::Buying),
            2 => Ok(Self::Selling),
            3 => Ok(Self::Intermediary),
            _ => Err(ForexError::InvalidRateType { code }),
        }
    }

    pub const fn min_value() -> i32 {
        Self::Buying.value()
    }

    pub const fn max_value() -> i32 {
        Self::Intermediary.value()
    }

    pub fn is_buying(self) -> bool {
        self == Self::Buying
    }

    pub fn is_selling(self) -> bool {
        self == Self::Selling
    }

    pub fn is_intermediary(self) -> bool {
        self == Self::Intermediary
    }
}

impl fmt::Display for ExchangeRateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<i32> for ExchangeRateType {
    type Error = ForexError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Self::from_code(code)
    }
}

/// Scale an amount to the stored rate precision.
pub(crate) fn to_rate_scale(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(RATE_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// An exchange rate that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExchangeRate {
    pub date: NaiveDate,
    pub rate_type: ExchangeRateType,
    pub currency: CurrencyCode,
    pub amount: Decimal,
}

impl NewExchangeRate {
    pub fn new(
        currency: CurrencyCode,
        rate_type: ExchangeRateType,
        date: NaiveDate,
        amount: Decimal,
    ) -> Self {
        Self {
            date,
            rate_type,
            currency,
            amount,
        }
    }

    /// Check the rate and return it with the amount at [`RATE_SCALE`].
    pub fn validated(self) -> Result<Self, ForexError> {
        let currency = CurrencyCode::parse(self.currency.as_str())?;
        let amount = to_rate_scale(self.amount);
        if amount <= Decimal::ZERO {
            return Err(ForexError::InvalidRateAmount {
                rate_id: None,
                currency,
                amount: self.amount,
            });
        }
        Ok(Self {
            currency,
            amount,
            ..self
        })
    }
}

/// A stored, point-in-time exchange rate snapshot.
///
/// The value is immutable; [`ExchangeRate::apply`] yields a new snapshot and
/// the list of fields that actually changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    id: RateId,
    date: NaiveDate,
    rate_type: ExchangeRateType,
    currency: CurrencyCode,
    amount: Decimal,
}

impl ExchangeRate {
    pub fn from_new(id: RateId, rate: NewExchangeRate) -> Self {
        Self {
            id,
            date: rate.date,
            rate_type: rate.rate_type,
            currency: rate.currency,
            amount: rate.amount,
        }
    }

    pub fn id(&self) -> RateId {
        self.id
    }

    /// Effective ("as of") date.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn rate_type(&self) -> ExchangeRateType {
        self.rate_type
    }

    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    /// Units of home currency per one unit of `currency`.
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Apply a partial change, keeping only fields whose value differs.
    pub fn apply(&self, changes: &RateChanges) -> Result<(ExchangeRate, Vec<RateChange>), ForexError> {
        let mut next = self.clone();
        let mut applied = Vec::new();

        if let Some(date) = changes.date {
            if date != self.date {
                next.date = date;
                applied.push(RateChange::Date(date));
            }
        }
        if let Some(rate_type) = changes.rate_type {
            if rate_type != self.rate_type {
                next.rate_type = rate_type;
                applied.push(RateChange::RateType(rate_type));
            }
        }
        if let Some(currency) = &changes.currency {
            let currency = CurrencyCode::parse(currency.as_str())?;
            if currency != self.currency {
                next.currency = currency.clone();
                applied.push(RateChange::Currency(currency));
            }
        }
        if let Some(amount) = changes.amount {
            let scaled = to_rate_scale(amount);
            if scaled <= Decimal::ZERO {
                return Err(ForexError::InvalidRateAmount {
                    rate_id: Some(self.id),
                    currency: next.currency.clone(),
                    amount,
                });
            }
            if scaled != self.amount {
                next.amount = scaled;
                applied.push(RateChange::Amount(scaled));
            }
        }

        Ok((next, applied))
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {} {} @ {}",
            self.id, self.currency, self.rate_type, self.date, self.amount
        )
    }
}

/// Partial update of an exchange rate. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateChanges {
    pub date: Option<NaiveDate>,
    pub rate_type: Option<ExchangeRateType>,
    pub currency: Option<CurrencyCode>,
    pub amount: Option<Decimal>,
}

/// One field actually changed by [`ExchangeRate::apply`], with its new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RateChange {
    Date(NaiveDate),
    RateType(ExchangeRateType),
    Currency(CurrencyCode),
    Amount(Decimal),
}

impl RateChange {
    pub fn field(&self) -> &'static str {
        match self {
            Self::Date(_) => "date",
            Self::RateType(_) => "typeId",
            Self::Currency(_) => "currency",
            Self::Amount(_) => "amount",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn usd_buying() -> ExchangeRate {
        ExchangeRate::from_new(
            RateId::new(1),
            NewExchangeRate::new(
                CurrencyCode::new("USD"),
                ExchangeRateType::Buying,
                date(2024, 1, 1),
                dec!(3700),
            )
            .validated()
            .unwrap(),
        )
    }

    #[test]
    fn test_rate_type_codes() {
        for rate_type in ExchangeRateType::all() {
            assert_eq!(ExchangeRateType::from_code(rate_type.value()).unwrap(), *rate_type);
        }
        assert_eq!(ExchangeRateType::min_value(), 1);
        assert_eq!(ExchangeRateType::max_value(), 3);
        assert_eq!(ExchangeRateType::Selling.code(), "exchangeRateType.selling");
    }

    #[test]
    fn test_unknown_rate_type_code() {
        assert_eq!(
            ExchangeRateType::from_code(4),
            Err(ForexError::InvalidRateType { code: 4 })
        );
        assert!(ExchangeRateType::try_from(0).is_err());
    }

    #[test]
    fn test_rate_type_serializes_by_name() {
        let json = serde_json::to_string(&ExchangeRateType::Intermediary).unwrap();
        assert_eq!(json, "\"INTERMEDIARY\"");
    }

    #[test]
    fn test_new_rate_rejects_non_positive() {
        let rate = NewExchangeRate::new(
            CurrencyCode::new("USD"),
            ExchangeRateType::Buying,
            date(2024, 1, 1),
            dec!(0.0000001),
        );
        assert!(matches!(
            rate.validated(),
            Err(ForexError::InvalidRateAmount { .. })
        ));
    }

    #[test]
    fn test_new_rate_scaled_to_six_digits() {
        let rate = NewExchangeRate::new(
            CurrencyCode::new("usd"),
            ExchangeRateType::Buying,
            date(2024, 1, 1),
            dec!(3700.12345651),
        )
        .validated()
        .unwrap();
        assert_eq!(rate.amount, dec!(3700.123457));
        assert_eq!(rate.currency.as_str(), "USD");
    }

    #[test]
    fn test_apply_reports_only_real_changes() {
        let rate = usd_buying();
        let (next, changes) = rate
            .apply(&RateChanges {
                date: Some(date(2024, 1, 1)),
                amount: Some(dec!(3710)),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(changes, vec![RateChange::Amount(dec!(3710))]);
        assert_eq!(next.amount(), dec!(3710));
        assert_eq!(rate.amount(), dec!(3700));
    }

    #[test]
    fn test_apply_rejects_zero_amount() {
        let rate = usd_buying();
        let result = rate.apply(&RateChanges {
            amount: Some(Decimal::ZERO),
            ..Default::default()
        });
        assert!(matches!(
            result,
            Err(ForexError::InvalidRateAmount { rate_id: Some(_), .. })
        ));
    }
}
