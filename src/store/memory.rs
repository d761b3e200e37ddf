use crate::core::cashier::{Cashier, CashierTransaction};
use crate::core::currency::{CurrencyCode, OrganisationCurrency};
use crate::core::exchange::{ExchangeTransaction, NewExchange};
use crate::core::ids::{ExchangeId, RateId, StaffId};
use crate::core::journal::{CorrelationId, FinancialActivity, FinancialActivityAccount, JournalEntry};
use crate::core::rate::{ExchangeRate, ExchangeRateType, NewExchangeRate};
use crate::store::{
    CashierLedger, CurrencyRegistry, ExchangeStore, GlLedger, PostingUnit, RateStore, StoreError,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct BookState {
    currencies: BTreeMap<CurrencyCode, OrganisationCurrency>,
    rates: BTreeMap<RateId, ExchangeRate>,
    cashiers: Vec<Cashier>,
    accounts: Vec<FinancialActivityAccount>,
    exchanges: BTreeMap<ExchangeId, ExchangeTransaction>,
    cashier_transactions: Vec<CashierTransaction>,
    journal_entries: Vec<JournalEntry>,
}

/// Organisation setup loaded into an [`InMemoryBook`], e.g. from a JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub currencies: Vec<OrganisationCurrency>,
    #[serde(default)]
    pub rates: Vec<NewExchangeRate>,
    #[serde(default)]
    pub cashiers: Vec<Cashier>,
    #[serde(default)]
    pub financial_activity_accounts: Vec<FinancialActivityAccount>,
}

/// Thread-safe in-process implementation of every store trait.
///
/// All state sits behind one lock, so a [`PostingUnit`] commit is applied
/// atomically with respect to concurrent readers and writers. Ids come from
/// sequences that are not rolled back, like database sequences.
#[derive(Debug)]
pub struct InMemoryBook {
    state: RwLock<BookState>,
    next_rate_id: AtomicU64,
    next_exchange_id: AtomicU64,
}

impl Default for InMemoryBook {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBook {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(BookState::default()),
            next_rate_id: AtomicU64::new(1),
            next_exchange_id: AtomicU64::new(1),
        }
    }

    pub fn from_snapshot(snapshot: BookSnapshot) -> Result<Self, StoreError> {
        let book = Self::new();
        for currency in snapshot.currencies {
            book.add_currency(currency)?;
        }
        for rate in snapshot.rates {
            let rate = rate
                .validated()
                .map_err(|e| StoreError::ConstraintViolation(e.to_string()))?;
            book.insert_rate(rate)?;
        }
        for cashier in snapshot.cashiers {
            book.add_cashier(cashier)?;
        }
        for account in snapshot.financial_activity_accounts {
            book.add_financial_activity_account(account)?;
        }
        Ok(book)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BookState>, StoreError> {
        self.state
            .read()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BookState>, StoreError> {
        self.state
            .write()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    /// Register an organisation currency.
    ///
    /// The code is normalised to upper case. Rejects malformed or duplicate
    /// codes and a second home currency.
    pub fn add_currency(&self, mut currency: OrganisationCurrency) -> Result<(), StoreError> {
        currency.code = normalised(&currency.code)?;
        let mut state = self.write()?;
        if state.currencies.contains_key(&currency.code) {
            return Err(StoreError::ConstraintViolation(format!(
                "currency {} already registered",
                currency.code
            )));
        }
        if currency.is_home_currency {
            if let Some(home) = state.currencies.values().find(|c| c.is_home_currency) {
                return Err(StoreError::ConstraintViolation(format!(
                    "{} is already the home currency",
                    home.code
                )));
            }
        }
        state.currencies.insert(currency.code.clone(), currency);
        Ok(())
    }

    /// Assign a cashier; one assignment per staff member.
    pub fn add_cashier(&self, cashier: Cashier) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.cashiers.iter().any(|c| c.staff_id == cashier.staff_id) {
            return Err(StoreError::ConstraintViolation(format!(
                "staff {} already has a cashier assignment",
                cashier.staff_id
            )));
        }
        state.cashiers.push(cashier);
        Ok(())
    }

    /// Map a financial activity to a GL account; one mapping per activity
    /// and currency.
    pub fn add_financial_activity_account(
        &self,
        mut account: FinancialActivityAccount,
    ) -> Result<(), StoreError> {
        account.currency = normalised(&account.currency)?;
        let mut state = self.write()?;
        if state
            .accounts
            .iter()
            .any(|a| a.activity == account.activity && a.currency == account.currency)
        {
            return Err(StoreError::ConstraintViolation(format!(
                "{} already mapped for {}",
                account.activity, account.currency
            )));
        }
        state.accounts.push(account);
        Ok(())
    }

    pub fn cashier_transactions(&self) -> Result<Vec<CashierTransaction>, StoreError> {
        Ok(self.read()?.cashier_transactions.clone())
    }

    pub fn journal_entries(&self) -> Result<Vec<JournalEntry>, StoreError> {
        Ok(self.read()?.journal_entries.clone())
    }

    /// Journal entries sharing one correlation id.
    pub fn entries_for(&self, transaction_id: &CorrelationId) -> Result<Vec<JournalEntry>, StoreError> {
        Ok(self
            .read()?
            .journal_entries
            .iter()
            .filter(|e| &e.transaction_id == transaction_id)
            .cloned()
            .collect())
    }
}

fn normalised(code: &CurrencyCode) -> Result<CurrencyCode, StoreError> {
    CurrencyCode::parse(code.as_str()).map_err(|e| StoreError::ConstraintViolation(e.to_string()))
}

impl RateStore for InMemoryBook {
    fn find_latest_as_of(
        &self,
        currency: &CurrencyCode,
        rate_type: ExchangeRateType,
        date: NaiveDate,
    ) -> Result<Option<ExchangeRate>, StoreError> {
        Ok(self
            .read()?
            .rates
            .values()
            .filter(|r| r.currency() == currency && r.rate_type() == rate_type && r.date() <= date)
            .max_by_key(|r| (r.date(), r.id()))
            .cloned())
    }

    fn find_rate(&self, id: RateId) -> Result<Option<ExchangeRate>, StoreError> {
        Ok(self.read()?.rates.get(&id).cloned())
    }

    fn all_rates(&self) -> Result<Vec<ExchangeRate>, StoreError> {
        let mut rates: Vec<ExchangeRate> = self.read()?.rates.values().cloned().collect();
        rates.sort_by(|a, b| {
            (a.currency(), a.date(), a.id()).cmp(&(b.currency(), b.date(), b.id()))
        });
        Ok(rates)
    }

    fn insert_rate(&self, rate: NewExchangeRate) -> Result<ExchangeRate, StoreError> {
        let mut state = self.write()?;
        let id = RateId::new(self.next_rate_id.fetch_add(1, Ordering::SeqCst));
        let stored = ExchangeRate::from_new(id, rate);
        state.rates.insert(id, stored.clone());
        Ok(stored)
    }

    fn replace_rate(&self, rate: &ExchangeRate) -> Result<(), StoreError> {
        let mut state = self.write()?;
        match state.rates.get_mut(&rate.id()) {
            Some(existing) => {
                *existing = rate.clone();
                Ok(())
            }
            None => Err(StoreError::Conflict(format!("rate {} no longer exists", rate.id()))),
        }
    }
}

impl CurrencyRegistry for InMemoryBook {
    fn find_by_code(&self, code: &CurrencyCode) -> Result<Option<OrganisationCurrency>, StoreError> {
        Ok(self.read()?.currencies.get(code).cloned())
    }

    fn home_currencies(&self) -> Result<Vec<OrganisationCurrency>, StoreError> {
        Ok(self
            .read()?
            .currencies
            .values()
            .filter(|c| c.is_home_currency)
            .cloned()
            .collect())
    }
}

impl CashierLedger for InMemoryBook {
    fn find_cashier_for_staff(&self, staff_id: StaffId) -> Result<Option<Cashier>, StoreError> {
        Ok(self
            .read()?
            .cashiers
            .iter()
            .find(|c| c.staff_id == staff_id)
            .cloned())
    }
}

impl GlLedger for InMemoryBook {
    fn find_financial_activity_account(
        &self,
        activity: FinancialActivity,
        currency: &CurrencyCode,
    ) -> Result<Option<FinancialActivityAccount>, StoreError> {
        Ok(self
            .read()?
            .accounts
            .iter()
            .find(|a| a.activity == activity && &a.currency == currency)
            .cloned())
    }
}

impl ExchangeStore for InMemoryBook {
    fn find_exchange(&self, id: ExchangeId) -> Result<Option<ExchangeTransaction>, StoreError> {
        Ok(self.read()?.exchanges.get(&id).cloned())
    }

    fn all_exchanges(&self) -> Result<Vec<ExchangeTransaction>, StoreError> {
        let mut exchanges: Vec<ExchangeTransaction> =
            self.read()?.exchanges.values().cloned().collect();
        exchanges.sort_by_key(|e| (e.created_at(), e.id()));
        Ok(exchanges)
    }

    fn replace_exchange(&self, exchange: &ExchangeTransaction) -> Result<(), StoreError> {
        let mut state = self.write()?;
        match state.exchanges.get_mut(&exchange.id()) {
            Some(existing) => {
                *existing = exchange.clone();
                Ok(())
            }
            None => Err(StoreError::Conflict(format!(
                "exchange {} no longer exists",
                exchange.id()
            ))),
        }
    }

    fn delete_exchange(&self, id: ExchangeId) -> Result<bool, StoreError> {
        Ok(self.write()?.exchanges.remove(&id).is_some())
    }

    fn begin(&self) -> Result<Box<dyn PostingUnit + '_>, StoreError> {
        Ok(Box::new(MemoryPostingUnit {
            book: self,
            exchanges: Vec::new(),
            cashier_transactions: Vec::new(),
            journal_entries: Vec::new(),
        }))
    }
}

/// Buffered writes applied under a single write lock on commit.
struct MemoryPostingUnit<'a> {
    book: &'a InMemoryBook,
    exchanges: Vec<ExchangeTransaction>,
    cashier_transactions: Vec<CashierTransaction>,
    journal_entries: Vec<JournalEntry>,
}

impl PostingUnit for MemoryPostingUnit<'_> {
    fn insert_exchange(&mut self, exchange: NewExchange) -> Result<ExchangeTransaction, StoreError> {
        let id = ExchangeId::new(self.book.next_exchange_id.fetch_add(1, Ordering::SeqCst));
        let stored = ExchangeTransaction::from_new(id, exchange);
        self.exchanges.push(stored.clone());
        Ok(stored)
    }

    fn record_cashier_transaction(&mut self, txn: CashierTransaction) -> Result<(), StoreError> {
        self.cashier_transactions.push(txn);
        Ok(())
    }

    fn post_journal_entry(&mut self, entry: JournalEntry) -> Result<(), StoreError> {
        self.journal_entries.push(entry);
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let unit = *self;
        let book = unit.book;
        let mut state = book.write()?;
        if let Some(clash) = unit
            .exchanges
            .iter()
            .find(|e| state.exchanges.contains_key(&e.id()))
        {
            return Err(StoreError::Conflict(format!(
                "exchange {} already exists",
                clash.id()
            )));
        }
        for exchange in unit.exchanges {
            state.exchanges.insert(exchange.id(), exchange);
        }
        state.cashier_transactions.extend(unit.cashier_transactions);
        state.journal_entries.extend(unit.journal_entries);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::exchange::{ActingUser, ClientRef};
    use crate::core::ids::{GlAccountId, UserId};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn usd() -> CurrencyCode {
        CurrencyCode::new("USD")
    }

    fn rate(day: NaiveDate, amount: rust_decimal::Decimal) -> NewExchangeRate {
        NewExchangeRate::new(usd(), ExchangeRateType::Buying, day, amount)
    }

    fn leg() -> NewExchange {
        NewExchange {
            exchange_rate_id: RateId::new(1),
            user: ActingUser::new(UserId::new(1), StaffId::new(1)),
            currency_from: usd(),
            currency_to: CurrencyCode::new("UGX"),
            client: ClientRef::default(),
            transaction_date: date(2024, 1, 1),
            created_at: Utc::now(),
            amount_given: dec!(1),
            amount_taken: dec!(3700),
        }
    }

    #[test]
    fn test_second_home_currency_rejected() {
        let book = InMemoryBook::new();
        book.add_currency(OrganisationCurrency::new(CurrencyCode::new("UGX"), "Shilling", 0).home())
            .unwrap();
        let result =
            book.add_currency(OrganisationCurrency::new(usd(), "US Dollar", 2).home());
        assert!(matches!(result, Err(StoreError::ConstraintViolation(_))));
        assert_eq!(book.home_currencies().unwrap().len(), 1);
    }

    #[test]
    fn test_currency_codes_normalised_on_write() {
        let book = InMemoryBook::new();
        book.add_currency(OrganisationCurrency::new(CurrencyCode::new(" usd"), "US Dollar", 2))
            .unwrap();
        book.add_financial_activity_account(FinancialActivityAccount::new(
            FinancialActivity::CashAtTeller,
            CurrencyCode::new("usd"),
            GlAccountId::new(12),
        ))
        .unwrap();

        assert!(book.find_by_code(&usd()).unwrap().is_some());
        assert!(book
            .find_financial_activity_account(FinancialActivity::CashAtTeller, &usd())
            .unwrap()
            .is_some());
        let duplicate = book.add_currency(OrganisationCurrency::new(usd(), "US Dollar", 2));
        assert!(matches!(duplicate, Err(StoreError::ConstraintViolation(_))));
        let malformed = book.add_currency(OrganisationCurrency::new(CurrencyCode::new("US"), "?", 2));
        assert!(matches!(malformed, Err(StoreError::ConstraintViolation(_))));
    }

    #[test]
    fn test_latest_as_of_ignores_future_and_other_types() {
        let book = InMemoryBook::new();
        book.insert_rate(rate(date(2024, 1, 1), dec!(100))).unwrap();
        book.insert_rate(rate(date(2024, 2, 1), dec!(110))).unwrap();
        book.insert_rate(NewExchangeRate::new(
            usd(),
            ExchangeRateType::Selling,
            date(2024, 1, 10),
            dec!(120),
        ))
        .unwrap();

        let found = book
            .find_latest_as_of(&usd(), ExchangeRateType::Buying, date(2024, 1, 15))
            .unwrap()
            .unwrap();
        assert_eq!(found.amount(), dec!(100));
    }

    #[test]
    fn test_same_day_tie_goes_to_latest_insert() {
        let book = InMemoryBook::new();
        book.insert_rate(rate(date(2024, 1, 1), dec!(100))).unwrap();
        let second = book.insert_rate(rate(date(2024, 1, 1), dec!(101))).unwrap();

        let found = book
            .find_latest_as_of(&usd(), ExchangeRateType::Buying, date(2024, 1, 1))
            .unwrap()
            .unwrap();
        assert_eq!(found.id(), second.id());
    }

    #[test]
    fn test_uncommitted_unit_is_discarded() {
        let book = InMemoryBook::new();
        {
            let mut unit = book.begin().unwrap();
            unit.insert_exchange(leg()).unwrap();
        }
        assert!(book.all_exchanges().unwrap().is_empty());
    }

    #[test]
    fn test_commit_makes_writes_visible() {
        let book = InMemoryBook::new();
        let mut unit = book.begin().unwrap();
        let stored = unit.insert_exchange(leg()).unwrap();
        assert!(book.find_exchange(stored.id()).unwrap().is_none());
        unit.commit().unwrap();
        assert_eq!(book.find_exchange(stored.id()).unwrap(), Some(stored));
    }

    #[test]
    fn test_snapshot_loads_from_json() {
        let json = r#"{
            "currencies": [
                { "code": "UGX", "name": "Uganda Shilling", "decimal_places": 0, "is_home_currency": true },
                { "code": "USD", "name": "US Dollar", "decimal_places": 2 }
            ],
            "rates": [
                { "currency": "USD", "rate_type": "BUYING", "date": "2024-01-01", "amount": "3700" }
            ],
            "cashiers": [
                { "id": 1, "staff_id": 7, "teller_id": 1, "office_id": 1 }
            ],
            "financial_activity_accounts": [
                { "activity": "CASH_AT_MAINVAULT", "currency": "USD", "gl_account": 11 }
            ]
        }"#;
        let snapshot: BookSnapshot = serde_json::from_str(json).unwrap();
        let book = InMemoryBook::from_snapshot(snapshot).unwrap();
        assert_eq!(book.find_home_currency().unwrap().code.as_str(), "UGX");
        assert_eq!(book.all_rates().unwrap().len(), 1);
        assert!(book.find_cashier_for_staff(StaffId::new(7)).unwrap().is_some());
    }
}
