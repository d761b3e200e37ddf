use crate::core::error::ForexError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// ISO 4217-style three-letter currency code.
///
/// [`CurrencyCode::new`] accepts any string so that stored data can always be
/// represented; [`CurrencyCode::parse`] is the validating constructor used on
/// every inbound request.
///
/// # Examples
///
/// ```
/// use forex_engine::core::currency::CurrencyCode;
///
/// let usd = CurrencyCode::parse("usd").unwrap();
/// assert_eq!(usd, CurrencyCode::new("USD"));
/// assert!(CurrencyCode::parse("US").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Validate and normalise a code: exactly three ASCII letters, upper-cased.
    pub fn parse(code: &str) -> Result<Self, ForexError> {
        let trimmed = code.trim();
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ForexError::InvalidCurrencyCode {
                code: code.to_string(),
            });
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A currency the organisation is allowed to transact in.
///
/// Exactly one organisation currency carries `is_home_currency`; every
/// cross-currency exchange routes through it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganisationCurrency {
    pub code: CurrencyCode,
    pub name: String,
    pub decimal_places: u32,
    /// Rounding granularity in whole units, e.g. `50` for UGX cash.
    #[serde(default)]
    pub in_multiples_of: Option<u32>,
    #[serde(default)]
    pub display_symbol: Option<String>,
    #[serde(default)]
    pub is_home_currency: bool,
}

impl OrganisationCurrency {
    pub fn new(code: CurrencyCode, name: impl Into<String>, decimal_places: u32) -> Self {
        Self {
            code,
            name: name.into(),
            decimal_places,
            in_multiples_of: None,
            display_symbol: None,
            is_home_currency: false,
        }
    }

    /// Flag this currency as the organisation's home currency.
    pub fn home(mut self) -> Self {
        self.is_home_currency = true;
        self
    }

    pub fn with_multiples_of(mut self, multiple: u32) -> Self {
        self.in_multiples_of = Some(multiple);
        self
    }

    /// Round an amount to this currency's precision for display.
    ///
    /// Stored amounts keep six fractional digits; this is the presentation
    /// rounding (half-to-even to `decimal_places`, then to the nearest
    /// `in_multiples_of` when configured).
    pub fn round_to_precision(&self, amount: Decimal) -> Decimal {
        let rounded =
            amount.round_dp_with_strategy(self.decimal_places, RoundingStrategy::MidpointNearestEven);
        match self.in_multiples_of {
            Some(multiple) if multiple > 1 => {
                let step = Decimal::from(multiple);
                (rounded / step).round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
                    * step
            }
            _ => rounded,
        }
    }
}

impl fmt::Display for OrganisationCurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code, self.name)?;
        if self.is_home_currency {
            write!(f, " [home]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_currency_code_equality() {
        let a = CurrencyCode::new("USD");
        let b = CurrencyCode::new("USD");
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_normalises_case() {
        assert_eq!(CurrencyCode::parse(" ugx ").unwrap().as_str(), "UGX");
    }

    #[test]
    fn test_parse_rejects_bad_codes() {
        for code in ["", "US", "USDT", "U5D", "€UR"] {
            assert!(
                matches!(
                    CurrencyCode::parse(code),
                    Err(ForexError::InvalidCurrencyCode { .. })
                ),
                "{code:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_round_to_precision() {
        let usd = OrganisationCurrency::new(CurrencyCode::new("USD"), "US Dollar", 2);
        assert_eq!(usd.round_to_precision(dec!(99.462366)), dec!(99.46));
        // half-even on the display digit
        assert_eq!(usd.round_to_precision(dec!(0.125)), dec!(0.12));
        assert_eq!(usd.round_to_precision(dec!(0.135)), dec!(0.14));
    }

    #[test]
    fn test_round_to_multiples() {
        let ugx = OrganisationCurrency::new(CurrencyCode::new("UGX"), "Uganda Shilling", 0)
            .with_multiples_of(50)
            .home();
        assert_eq!(ugx.round_to_precision(dec!(370_020)), dec!(370_000));
        assert_eq!(ugx.round_to_precision(dec!(370_030)), dec!(370_050));
    }

    #[test]
    fn test_display_marks_home() {
        let ugx = OrganisationCurrency::new(CurrencyCode::new("UGX"), "Uganda Shilling", 0).home();
        assert_eq!(format!("{}", ugx), "UGX (Uganda Shilling) [home]");
    }
}
