//! Collaborator contracts the engine reads from and posts to.
//!
//! The engine never talks to a database directly. Deployments implement
//! these traits over their persistence layer; [`memory::InMemoryBook`] is a
//! complete in-process implementation used by the CLI and the tests.

pub mod memory;

use crate::core::cashier::{Cashier, CashierTransaction};
use crate::core::currency::{CurrencyCode, OrganisationCurrency};
use crate::core::error::ForexError;
use crate::core::exchange::{ExchangeTransaction, NewExchange};
use crate::core::ids::{ExchangeId, RateId, StaffId};
use crate::core::journal::{FinancialActivity, FinancialActivityAccount, JournalEntry};
use crate::core::rate::{ExchangeRate, ExchangeRateType, NewExchangeRate};
use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;

/// Failures reported by a store implementation.
///
/// These carry store-internal detail; the engine logs it and surfaces a
/// generic [`ForexError::DataIntegrity`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("conflicting write: {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Translate into the engine taxonomy, logging the original cause.
    pub fn into_forex(self, resource: &'static str) -> ForexError {
        log::error!("{} store failure: {}", resource, self);
        ForexError::DataIntegrity { resource }
    }
}

/// Ordered exchange-rate snapshots per currency and rate type.
pub trait RateStore: Send + Sync {
    /// The rate with the greatest effective date `<= date`; among rates on
    /// that date, the most recently inserted one.
    fn find_latest_as_of(
        &self,
        currency: &CurrencyCode,
        rate_type: ExchangeRateType,
        date: NaiveDate,
    ) -> Result<Option<ExchangeRate>, StoreError>;

    fn find_rate(&self, id: RateId) -> Result<Option<ExchangeRate>, StoreError>;

    fn all_rates(&self) -> Result<Vec<ExchangeRate>, StoreError>;

    fn insert_rate(&self, rate: NewExchangeRate) -> Result<ExchangeRate, StoreError>;

    fn replace_rate(&self, rate: &ExchangeRate) -> Result<(), StoreError>;
}

/// The organisation's allowed currencies.
pub trait CurrencyRegistry: Send + Sync {
    fn find_by_code(&self, code: &CurrencyCode) -> Result<Option<OrganisationCurrency>, StoreError>;

    /// Every currency carrying the home flag.
    fn home_currencies(&self) -> Result<Vec<OrganisationCurrency>, StoreError>;

    /// The single home currency, or a typed failure when zero or several
    /// currencies are flagged.
    fn find_home_currency(&self) -> Result<OrganisationCurrency, ForexError> {
        let mut homes = self
            .home_currencies()
            .map_err(|e| e.into_forex("organisation currency"))?;
        if homes.len() != 1 {
            return Err(ForexError::HomeCurrencyNotConfigured {
                flagged: homes.len(),
            });
        }
        Ok(homes.remove(0))
    }
}

/// Cashier assignments.
pub trait CashierLedger: Send + Sync {
    fn find_cashier_for_staff(&self, staff_id: StaffId) -> Result<Option<Cashier>, StoreError>;
}

/// General-ledger configuration lookups.
pub trait GlLedger: Send + Sync {
    fn find_financial_activity_account(
        &self,
        activity: FinancialActivity,
        currency: &CurrencyCode,
    ) -> Result<Option<FinancialActivityAccount>, StoreError>;
}

/// Exchange records plus the write path for postings.
pub trait ExchangeStore: Send + Sync {
    fn find_exchange(&self, id: ExchangeId) -> Result<Option<ExchangeTransaction>, StoreError>;

    fn all_exchanges(&self) -> Result<Vec<ExchangeTransaction>, StoreError>;

    fn replace_exchange(&self, exchange: &ExchangeTransaction) -> Result<(), StoreError>;

    /// Remove the record; returns `false` when it did not exist.
    fn delete_exchange(&self, id: ExchangeId) -> Result<bool, StoreError>;

    /// Open an all-or-nothing unit of work.
    fn begin(&self) -> Result<Box<dyn PostingUnit + '_>, StoreError>;
}

/// A unit of work spanning exchange records, cashier transactions and
/// journal entries.
///
/// Nothing written through a unit is visible until [`PostingUnit::commit`]
/// succeeds. Dropping a unit without committing discards every write.
pub trait PostingUnit {
    fn insert_exchange(&mut self, exchange: NewExchange) -> Result<ExchangeTransaction, StoreError>;

    fn record_cashier_transaction(&mut self, txn: CashierTransaction) -> Result<(), StoreError>;

    fn post_journal_entry(&mut self, entry: JournalEntry) -> Result<(), StoreError>;

    fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// The full set of collaborators an engine is wired to.
#[derive(Clone)]
pub struct Collaborators {
    pub rates: Arc<dyn RateStore>,
    pub currencies: Arc<dyn CurrencyRegistry>,
    pub cashiers: Arc<dyn CashierLedger>,
    pub gl: Arc<dyn GlLedger>,
    pub exchanges: Arc<dyn ExchangeStore>,
}

impl Collaborators {
    /// Wire every collaborator to one backing store.
    pub fn from_single<S>(store: Arc<S>) -> Self
    where
        S: RateStore + CurrencyRegistry + CashierLedger + GlLedger + ExchangeStore + 'static,
    {
        Self {
            rates: store.clone(),
            currencies: store.clone(),
            cashiers: store.clone(),
            gl: store.clone(),
            exchanges: store,
        }
    }
}
