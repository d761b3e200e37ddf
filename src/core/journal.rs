use crate::core::currency::CurrencyCode;
use crate::core::ids::{GlAccountId, OfficeId, RateId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Debit or credit side of a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JournalEntryType {
    Credit,
    Debit,
}

/// GL account buckets representing where cash physically sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinancialActivity {
    #[serde(rename = "CASH_AT_MAINVAULT")]
    CashAtMainVault,
    CashAtTeller,
}

impl fmt::Display for FinancialActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CashAtMainVault => f.write_str("CASH_AT_MAINVAULT"),
            Self::CashAtTeller => f.write_str("CASH_AT_TELLER"),
        }
    }
}

/// Mapping of a financial activity to a GL account, per currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialActivityAccount {
    pub activity: FinancialActivity,
    pub currency: CurrencyCode,
    pub gl_account: GlAccountId,
}

impl FinancialActivityAccount {
    pub fn new(activity: FinancialActivity, currency: CurrencyCode, gl_account: GlAccountId) -> Self {
        Self {
            activity,
            currency,
            gl_account,
        }
    }
}

/// Token shared by the debit and credit entries of one cash movement.
///
/// Rendered as dash-separated lowercase hex of the posting time in
/// milliseconds, the acting user, the office and a process-wide sequence.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use forex_engine::core::ids::{OfficeId, UserId};
/// use forex_engine::core::journal::CorrelationId;
///
/// let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
/// let id = CorrelationId::generate(at, UserId::new(1), OfficeId::new(2), 255);
/// assert_eq!(id.as_str(), "18bcfe56800-1-2-ff");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn generate(at: DateTime<Utc>, user: UserId, office: OfficeId, sequence: u64) -> Self {
        let millis = at.timestamp_millis().max(0) as u64;
        Self(format!(
            "{:x}-{:x}-{:x}-{:x}",
            millis,
            user.get(),
            office.get(),
            sequence
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single debit or credit line in the general ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub office_id: OfficeId,
    pub gl_account: GlAccountId,
    pub currency: CurrencyCode,
    /// Rate the originating exchange leg used, kept for audit.
    pub exchange_rate_id: RateId,
    pub transaction_id: CorrelationId,
    pub manual_entry: bool,
    pub entry_date: NaiveDate,
    pub entry_type: JournalEntryType,
    pub amount: Decimal,
    pub description: Option<String>,
}

impl JournalEntry {
    /// Positive for debits, negative for credits.
    pub fn signed_amount(&self) -> Decimal {
        match self.entry_type {
            JournalEntryType::Debit => self.amount,
            JournalEntryType::Credit => -self.amount,
        }
    }
}
