use crate::core::currency::CurrencyCode;
use crate::core::ids::{ExchangeId, RateId, StaffId};
use crate::core::journal::FinancialActivity;
use crate::core::rate::ExchangeRateType;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors surfaced by the exchange engine.
///
/// None of these are retried internally: each is deterministic for the same
/// inputs and stored data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForexError {
    #[error("no {rate_type} rate for {currency} on or before {as_of}")]
    RateNotFound {
        currency: CurrencyCode,
        rate_type: ExchangeRateType,
        as_of: NaiveDate,
    },
    #[error("unknown exchange rate type code {code}")]
    InvalidRateType { code: i32 },
    #[error("exchange rate for {currency} must be positive, got {amount}")]
    InvalidRateAmount {
        rate_id: Option<RateId>,
        currency: CurrencyCode,
        amount: Decimal,
    },
    #[error("exactly one home currency must be configured, found {flagged}")]
    HomeCurrencyNotConfigured { flagged: usize },
    #[error("no cashier is assigned to staff {staff_id}")]
    CashierNotFound { staff_id: StaffId },
    #[error("financial activity account {activity} is not configured for {currency}")]
    FinancialActivityAccountNotConfigured {
        activity: FinancialActivity,
        currency: CurrencyCode,
    },
    #[error("cannot exchange {currency} into itself")]
    InvalidCurrencyPair { currency: CurrencyCode },
    #[error("{field} must be positive, got {amount}")]
    InvalidAmount { field: &'static str, amount: Decimal },
    #[error("invalid currency code {code:?}")]
    InvalidCurrencyCode { code: String },
    #[error("currency {code} is not an organisation currency")]
    CurrencyNotFound { code: CurrencyCode },
    #[error("{field} exceeds {max} characters")]
    FieldTooLong { field: &'static str, max: usize },
    #[error("exchange rate {id} not found")]
    ExchangeRateNotFound { id: RateId },
    #[error("forex exchange {id} not found")]
    ExchangeNotFound { id: ExchangeId },
    #[error("amount overflow converting {amount} at rate {rate}")]
    AmountOverflow { amount: Decimal, rate: Decimal },
    #[error("unknown data integrity issue with resource: {resource}")]
    DataIntegrity { resource: &'static str },
}

impl ForexError {
    /// Whether the failure means a referenced record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RateNotFound { .. }
                | Self::CashierNotFound { .. }
                | Self::CurrencyNotFound { .. }
                | Self::ExchangeRateNotFound { .. }
                | Self::ExchangeNotFound { .. }
        )
    }

    /// Whether an operator must fix organisation setup before retrying.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::HomeCurrencyNotConfigured { .. }
                | Self::FinancialActivityAccountNotConfigured { .. }
                | Self::InvalidRateAmount { .. }
        )
    }
}
