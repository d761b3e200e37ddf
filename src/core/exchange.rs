use crate::core::currency::CurrencyCode;
use crate::core::error::ForexError;
use crate::core::ids::{ExchangeId, RateId, StaffId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Maximum length of the optional client id and client name.
pub const CLIENT_FIELD_MAX_LEN: usize = 50;

/// The application user performing an exchange and the staff record their
/// cashier assignment hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActingUser {
    pub user_id: UserId,
    pub staff_id: StaffId,
}

impl ActingUser {
    pub fn new(user_id: UserId, staff_id: StaffId) -> Self {
        Self { user_id, staff_id }
    }
}

/// Optional walk-in client details recorded with an exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRef {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
}

impl ClientRef {
    pub fn new(client_id: Option<String>, client_name: Option<String>) -> Self {
        Self {
            client_id,
            client_name,
        }
    }

    pub fn validate(&self) -> Result<(), ForexError> {
        check_client_field("clientId", self.client_id.as_deref())?;
        check_client_field("clientName", self.client_name.as_deref())
    }
}

fn check_client_field(field: &'static str, value: Option<&str>) -> Result<(), ForexError> {
    match value {
        Some(v) if v.chars().count() > CLIENT_FIELD_MAX_LEN => Err(ForexError::FieldTooLong {
            field,
            max: CLIENT_FIELD_MAX_LEN,
        }),
        _ => Ok(()),
    }
}

pub(crate) fn check_positive(field: &'static str, amount: Decimal) -> Result<(), ForexError> {
    if amount <= Decimal::ZERO {
        return Err(ForexError::InvalidAmount { field, amount });
    }
    Ok(())
}

/// One computed conversion leg, ready to be persisted.
///
/// Both amounts are supplied together: a leg never exists with only one side
/// of the conversion known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExchange {
    pub exchange_rate_id: RateId,
    pub user: ActingUser,
    pub currency_from: CurrencyCode,
    pub currency_to: CurrencyCode,
    pub client: ClientRef,
    pub transaction_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub amount_given: Decimal,
    pub amount_taken: Decimal,
}

/// A persisted currency-exchange record (one leg).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeTransaction {
    id: ExchangeId,
    exchange_rate_id: RateId,
    user: ActingUser,
    currency_from: CurrencyCode,
    currency_to: CurrencyCode,
    client: ClientRef,
    transaction_date: NaiveDate,
    created_at: DateTime<Utc>,
    amount_given: Decimal,
    amount_taken: Decimal,
}

impl ExchangeTransaction {
    pub fn from_new(id: ExchangeId, leg: NewExchange) -> Self {
        Self {
            id,
            exchange_rate_id: leg.exchange_rate_id,
            user: leg.user,
            currency_from: leg.currency_from,
            currency_to: leg.currency_to,
            client: leg.client,
            transaction_date: leg.transaction_date,
            created_at: leg.created_at,
            amount_given: leg.amount_given,
            amount_taken: leg.amount_taken,
        }
    }

    // --- Accessors ---

    pub fn id(&self) -> ExchangeId {
        self.id
    }

    pub fn exchange_rate_id(&self) -> RateId {
        self.exchange_rate_id
    }

    pub fn user(&self) -> ActingUser {
        self.user
    }

    pub fn currency_from(&self) -> &CurrencyCode {
        &self.currency_from
    }

    pub fn currency_to(&self) -> &CurrencyCode {
        &self.currency_to
    }

    pub fn client(&self) -> &ClientRef {
        &self.client
    }

    pub fn client_name(&self) -> Option<&str> {
        self.client.client_name.as_deref()
    }

    pub fn transaction_date(&self) -> NaiveDate {
        self.transaction_date
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn amount_given(&self) -> Decimal {
        self.amount_given
    }

    pub fn amount_taken(&self) -> Decimal {
        self.amount_taken
    }

    /// Whether this leg moves money in or out of `currency`.
    pub fn touches(&self, currency: &CurrencyCode) -> bool {
        &self.currency_from == currency || &self.currency_to == currency
    }

    /// Apply a partial change and return the new snapshot with the fields
    /// that changed.
    ///
    /// This checks the record's own invariants only (distinct currencies,
    /// positive amounts, client field lengths); whether referenced rates and
    /// currencies exist is up to the caller.
    pub fn apply(
        &self,
        changes: &ExchangeChanges,
    ) -> Result<(ExchangeTransaction, Vec<ExchangeChange>), ForexError> {
        let mut next = self.clone();
        let mut applied = Vec::new();

        if let Some(rate_id) = changes.exchange_rate_id {
            if rate_id != self.exchange_rate_id {
                next.exchange_rate_id = rate_id;
                applied.push(ExchangeChange::ExchangeRate(rate_id));
            }
        }
        if let Some(code) = &changes.currency_from {
            let code = CurrencyCode::parse(code.as_str())?;
            if code != self.currency_from {
                next.currency_from = code.clone();
                applied.push(ExchangeChange::CurrencyFrom(code));
            }
        }
        if let Some(code) = &changes.currency_to {
            let code = CurrencyCode::parse(code.as_str())?;
            if code != self.currency_to {
                next.currency_to = code.clone();
                applied.push(ExchangeChange::CurrencyTo(code));
            }
        }
        if let Some(client_id) = &changes.client_id {
            check_client_field("clientId", client_id.as_deref())?;
            if *client_id != self.client.client_id {
                next.client.client_id = client_id.clone();
                applied.push(ExchangeChange::ClientId(client_id.clone()));
            }
        }
        if let Some(client_name) = &changes.client_name {
            check_client_field("clientName", client_name.as_deref())?;
            if *client_name != self.client.client_name {
                next.client.client_name = client_name.clone();
                applied.push(ExchangeChange::ClientName(client_name.clone()));
            }
        }
        if let Some(date) = changes.transaction_date {
            if date != self.transaction_date {
                next.transaction_date = date;
                applied.push(ExchangeChange::TransactionDate(date));
            }
        }
        if let Some(amount) = changes.amount_given {
            check_positive("amountGiven", amount)?;
            if amount != self.amount_given {
                next.amount_given = amount;
                applied.push(ExchangeChange::AmountGiven(amount));
            }
        }
        if let Some(amount) = changes.amount_taken {
            check_positive("amountTaken", amount)?;
            if amount != self.amount_taken {
                next.amount_taken = amount;
                applied.push(ExchangeChange::AmountTaken(amount));
            }
        }

        if next.currency_from == next.currency_to {
            return Err(ForexError::InvalidCurrencyPair {
                currency: next.currency_from,
            });
        }

        Ok((next, applied))
    }
}

/// Partial update of an exchange record. `None` leaves a field untouched;
/// `Some(None)` on the client fields clears them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExchangeChanges {
    pub exchange_rate_id: Option<RateId>,
    pub currency_from: Option<CurrencyCode>,
    pub currency_to: Option<CurrencyCode>,
    pub client_id: Option<Option<String>>,
    pub client_name: Option<Option<String>>,
    pub transaction_date: Option<NaiveDate>,
    pub amount_given: Option<Decimal>,
    pub amount_taken: Option<Decimal>,
}

/// One field changed by [`ExchangeTransaction::apply`], with its new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ExchangeChange {
    ExchangeRate(RateId),
    CurrencyFrom(CurrencyCode),
    CurrencyTo(CurrencyCode),
    ClientId(Option<String>),
    ClientName(Option<String>),
    TransactionDate(NaiveDate),
    AmountGiven(Decimal),
    AmountTaken(Decimal),
}

impl ExchangeChange {
    pub fn field(&self) -> &'static str {
        match self {
            Self::ExchangeRate(_) => "exchangeRateId",
            Self::CurrencyFrom(_) => "currencyFrom",
            Self::CurrencyTo(_) => "currencyTo",
            Self::ClientId(_) => "clientId",
            Self::ClientName(_) => "clientName",
            Self::TransactionDate(_) => "transactionDate",
            Self::AmountGiven(_) => "amountGiven",
            Self::AmountTaken(_) => "amountTaken",
        }
    }

    /// Changes that make the record disagree with what was posted to the
    /// cashier and general ledgers.
    pub fn diverges_from_postings(&self) -> bool {
        !matches!(self, Self::ClientId(_) | Self::ClientName(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> ExchangeTransaction {
        ExchangeTransaction::from_new(
            ExchangeId::new(1),
            NewExchange {
                exchange_rate_id: RateId::new(10),
                user: ActingUser::new(UserId::new(1), StaffId::new(5)),
                currency_from: CurrencyCode::new("USD"),
                currency_to: CurrencyCode::new("UGX"),
                client: ClientRef::new(None, Some("Walk-in".to_string())),
                transaction_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                created_at: Utc::now(),
                amount_given: dec!(100),
                amount_taken: dec!(370000),
            },
        )
    }

    #[test]
    fn test_exchange_accessors() {
        let ex = sample();
        assert_eq!(ex.currency_from().as_str(), "USD");
        assert_eq!(ex.amount_taken(), dec!(370000));
        assert_eq!(ex.client_name(), Some("Walk-in"));
        assert!(ex.touches(&CurrencyCode::new("UGX")));
        assert!(!ex.touches(&CurrencyCode::new("EUR")));
    }

    #[test]
    fn test_apply_currency_to_updates_currency_to() {
        let ex = sample();
        let (next, changes) = ex
            .apply(&ExchangeChanges {
                currency_to: Some(CurrencyCode::new("KES")),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(next.currency_from().as_str(), "USD");
        assert_eq!(next.currency_to().as_str(), "KES");
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field(), "currencyTo");
    }

    #[test]
    fn test_apply_unchanged_values_is_empty() {
        let ex = sample();
        let (_, changes) = ex
            .apply(&ExchangeChanges {
                amount_given: Some(dec!(100.000)),
                client_name: Some(Some("Walk-in".to_string())),
                ..Default::default()
            })
            .unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn test_apply_clears_client_name() {
        let ex = sample();
        let (next, changes) = ex
            .apply(&ExchangeChanges {
                client_name: Some(None),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(next.client_name(), None);
        assert_eq!(changes, vec![ExchangeChange::ClientName(None)]);
        assert!(!changes[0].diverges_from_postings());
    }

    #[test]
    fn test_apply_rejects_same_currency() {
        let ex = sample();
        let result = ex.apply(&ExchangeChanges {
            currency_to: Some(CurrencyCode::new("USD")),
            ..Default::default()
        });
        assert!(matches!(result, Err(ForexError::InvalidCurrencyPair { .. })));
    }

    #[test]
    fn test_apply_rejects_negative_amount() {
        let ex = sample();
        let result = ex.apply(&ExchangeChanges {
            amount_taken: Some(dec!(-1)),
            ..Default::default()
        });
        assert!(matches!(
            result,
            Err(ForexError::InvalidAmount { field: "amountTaken", .. })
        ));
    }

    #[test]
    fn test_client_field_length() {
        let client = ClientRef::new(Some("x".repeat(51)), None);
        assert!(matches!(
            client.validate(),
            Err(ForexError::FieldTooLong { field: "clientId", max: 50 })
        ));
        assert!(ClientRef::new(Some("x".repeat(50)), None).validate().is_ok());
    }
}
