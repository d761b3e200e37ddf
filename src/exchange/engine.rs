use crate::core::currency::{CurrencyCode, OrganisationCurrency};
use crate::core::error::ForexError;
use crate::core::exchange::{
    check_positive, ActingUser, ClientRef, ExchangeChange, ExchangeChanges, ExchangeTransaction,
    NewExchange,
};
use crate::core::ids::{ExchangeId, StaffId};
use crate::core::rate::{ExchangeRate, ExchangeRateType, RATE_SCALE};
use crate::exchange::calculator::ConversionCalculator;
use crate::exchange::posting::{LedgerPostingAdapter, LegPostings};
use crate::exchange::resolver::RateResolver;
use crate::store::{Collaborators, PostingUnit};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How the two legs of a cross-currency exchange are committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegAtomicity {
    /// Both legs and all their postings commit together or not at all.
    #[default]
    AllLegs,
    /// Each leg commits on its own. A failure in the second leg leaves the
    /// first standing and is logged at `error` level for an operator.
    PerLeg,
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Fractional digits kept when converting out of the home currency.
    pub rate_scale: u32,
    pub leg_atomicity: LegAtomicity,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rate_scale: RATE_SCALE,
            leg_atomicity: LegAtomicity::AllLegs,
        }
    }
}

/// A request to exchange `amount` of `currency_from` into `currency_to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRequest {
    pub currency_from: CurrencyCode,
    pub currency_to: CurrencyCode,
    pub amount: Decimal,
    pub transaction_date: NaiveDate,
    pub user: ActingUser,
    #[serde(default)]
    pub client: ClientRef,
}

/// How an exchange is routed relative to the home currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Foreign into home, one leg at the BUYING rate of the source.
    ToHome,
    /// Home into foreign, one leg at the SELLING rate of the destination.
    FromHome,
    /// Foreign into foreign through `home`, two legs.
    Cross { home: CurrencyCode },
}

/// A committed leg together with what was posted for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutedLeg {
    pub exchange: ExchangeTransaction,
    pub postings: LegPostings,
}

#[derive(Debug, Clone)]
struct PlannedLeg {
    rate: ExchangeRate,
    currency_from: CurrencyCode,
    currency_to: CurrencyCode,
    amount_given: Decimal,
    amount_taken: Decimal,
}

/// The currency-exchange transaction engine.
///
/// Resolves rates, computes converted amounts, persists one or two exchange
/// legs and posts cashier and journal entries for each.
pub struct ExchangeEngine {
    collaborators: Collaborators,
    resolver: RateResolver,
    calculator: ConversionCalculator,
    posting: LedgerPostingAdapter,
    config: EngineConfig,
}

impl ExchangeEngine {
    pub fn new(collaborators: Collaborators, config: EngineConfig) -> Self {
        Self {
            resolver: RateResolver::new(collaborators.rates.clone()),
            calculator: ConversionCalculator::new(config.rate_scale),
            posting: LedgerPostingAdapter::new(
                collaborators.cashiers.clone(),
                collaborators.gl.clone(),
            ),
            collaborators,
            config,
        }
    }

    /// Decide single-hop or cross routing for a currency pair.
    pub fn route(
        &self,
        from: &OrganisationCurrency,
        to: &OrganisationCurrency,
    ) -> Result<Route, ForexError> {
        match (from.is_home_currency, to.is_home_currency) {
            (false, true) => Ok(Route::ToHome),
            (true, false) => Ok(Route::FromHome),
            (false, false) => {
                let home = self.collaborators.currencies.find_home_currency()?;
                Ok(Route::Cross { home: home.code })
            }
            // both sides flagged: the registry breaks the single-home rule
            (true, true) => match self.collaborators.currencies.find_home_currency() {
                Err(e) => Err(e),
                Ok(_) => Err(ForexError::HomeCurrencyNotConfigured { flagged: 2 }),
            },
        }
    }

    /// Execute an exchange, returning the committed legs in order.
    pub fn execute(&self, request: &ExchangeRequest) -> Result<Vec<ExecutedLeg>, ForexError> {
        if same_code(&request.currency_from, &request.currency_to) {
            return Err(ForexError::InvalidCurrencyPair {
                currency: request.currency_from.clone(),
            });
        }
        let from_code = CurrencyCode::parse(request.currency_from.as_str())?;
        let to_code = CurrencyCode::parse(request.currency_to.as_str())?;
        check_positive("amount", request.amount)?;
        request.client.validate()?;

        let from = self.organisation_currency(&from_code)?;
        let to = self.organisation_currency(&to_code)?;
        let route = self.route(&from, &to)?;
        log::debug!(
            "exchanging {} {} into {} on {}: {:?}",
            request.amount,
            from.code,
            to.code,
            request.transaction_date,
            route
        );

        let date = request.transaction_date;
        let plans = match route {
            Route::ToHome => vec![self.plan_to_home(from.code, to.code, request.amount, date)?],
            Route::FromHome => vec![self.plan_from_home(from.code, to.code, request.amount, date)?],
            Route::Cross { home } => {
                let first = self.plan_to_home(from.code, home.clone(), request.amount, date)?;
                let exchanged = first.amount_taken;
                let second = self.plan_from_home(home, to.code, exchanged, date)?;
                vec![first, second]
            }
        };

        match self.config.leg_atomicity {
            LegAtomicity::AllLegs => self.commit_legs(plans, request),
            LegAtomicity::PerLeg => {
                let total = plans.len();
                let mut legs = Vec::with_capacity(total);
                for (index, plan) in plans.into_iter().enumerate() {
                    match self.commit_legs(vec![plan], request) {
                        Ok(mut committed) => legs.append(&mut committed),
                        Err(e) => {
                            if !legs.is_empty() {
                                let ids: Vec<String> =
                                    legs.iter().map(|l| l.exchange.id().to_string()).collect();
                                log::error!(
                                    "leg {} of {} for {} -> {} failed ({}); committed exchange(s) {} stand without their counter-leg",
                                    index + 1,
                                    total,
                                    request.currency_from,
                                    request.currency_to,
                                    e,
                                    ids.join(", ")
                                );
                            }
                            return Err(e);
                        }
                    }
                }
                Ok(legs)
            }
        }
    }

    /// Patch stored fields of an exchange and return what changed.
    ///
    /// Amounts are not recomputed and postings are not re-issued.
    pub fn update(
        &self,
        id: ExchangeId,
        changes: &ExchangeChanges,
    ) -> Result<Vec<ExchangeChange>, ForexError> {
        let current = self.retrieve_exchange(id)?;
        let (next, applied) = current.apply(changes)?;
        if applied.is_empty() {
            return Ok(applied);
        }

        for change in &applied {
            match change {
                ExchangeChange::ExchangeRate(rate_id) => {
                    self.collaborators
                        .rates
                        .find_rate(*rate_id)
                        .map_err(|e| e.into_forex("exchange rate"))?
                        .ok_or(ForexError::ExchangeRateNotFound { id: *rate_id })?;
                }
                ExchangeChange::CurrencyFrom(code) | ExchangeChange::CurrencyTo(code) => {
                    self.organisation_currency(code)?;
                }
                _ => {}
            }
        }

        self.collaborators
            .exchanges
            .replace_exchange(&next)
            .map_err(|e| e.into_forex("forex exchange"))?;

        let fields: Vec<&str> = applied.iter().map(ExchangeChange::field).collect();
        if applied.iter().any(ExchangeChange::diverges_from_postings) {
            log::warn!(
                "forex exchange {} updated ({}); cashier and journal postings were not re-issued",
                id,
                fields.join(", ")
            );
        } else {
            log::info!("forex exchange {} updated ({})", id, fields.join(", "));
        }
        Ok(applied)
    }

    /// Remove an exchange record. Postings made for it are left in place.
    pub fn delete(&self, id: ExchangeId) -> Result<(), ForexError> {
        let removed = self
            .collaborators
            .exchanges
            .delete_exchange(id)
            .map_err(|e| e.into_forex("forex exchange"))?;
        if !removed {
            return Err(ForexError::ExchangeNotFound { id });
        }
        log::warn!(
            "forex exchange {} deleted; its cashier and journal postings were not reversed",
            id
        );
        Ok(())
    }

    pub fn retrieve_exchange(&self, id: ExchangeId) -> Result<ExchangeTransaction, ForexError> {
        self.collaborators
            .exchanges
            .find_exchange(id)
            .map_err(|e| e.into_forex("forex exchange"))?
            .ok_or(ForexError::ExchangeNotFound { id })
    }

    /// All exchanges, oldest first.
    pub fn retrieve_all_exchanges(&self) -> Result<Vec<ExchangeTransaction>, ForexError> {
        self.collaborators
            .exchanges
            .all_exchanges()
            .map_err(|e| e.into_forex("forex exchange"))
    }

    /// Exchanges made by one staff member that touch `currency` on either side.
    pub fn retrieve_cashier_exchanges(
        &self,
        staff_id: StaffId,
        currency: &CurrencyCode,
    ) -> Result<Vec<ExchangeTransaction>, ForexError> {
        Ok(self
            .retrieve_all_exchanges()?
            .into_iter()
            .filter(|e| e.user().staff_id == staff_id && e.touches(currency))
            .collect())
    }

    fn organisation_currency(&self, code: &CurrencyCode) -> Result<OrganisationCurrency, ForexError> {
        self.collaborators
            .currencies
            .find_by_code(code)
            .map_err(|e| e.into_forex("organisation currency"))?
            .ok_or_else(|| ForexError::CurrencyNotFound { code: code.clone() })
    }

    fn plan_to_home(
        &self,
        currency_from: CurrencyCode,
        home: CurrencyCode,
        amount: Decimal,
        date: NaiveDate,
    ) -> Result<PlannedLeg, ForexError> {
        let rate = self
            .resolver
            .resolve_as_of(&currency_from, ExchangeRateType::Buying, date)?;
        let amount_taken = self.calculator.convert_to_home(amount, &rate)?;
        Ok(PlannedLeg {
            rate,
            currency_from,
            currency_to: home,
            amount_given: amount,
            amount_taken,
        })
    }

    fn plan_from_home(
        &self,
        home: CurrencyCode,
        currency_to: CurrencyCode,
        amount: Decimal,
        date: NaiveDate,
    ) -> Result<PlannedLeg, ForexError> {
        let rate = self
            .resolver
            .resolve_as_of(&currency_to, ExchangeRateType::Selling, date)?;
        let amount_taken = self.calculator.convert_from_home(amount, &rate)?;
        Ok(PlannedLeg {
            rate,
            currency_from: home,
            currency_to,
            amount_given: amount,
            amount_taken,
        })
    }

    /// Persist and post `plans` in one unit of work, in order.
    fn commit_legs(
        &self,
        plans: Vec<PlannedLeg>,
        request: &ExchangeRequest,
    ) -> Result<Vec<ExecutedLeg>, ForexError> {
        let mut unit = self
            .collaborators
            .exchanges
            .begin()
            .map_err(|e| e.into_forex("forex exchange"))?;

        let now = Utc::now();
        let mut legs = Vec::with_capacity(plans.len());
        for plan in plans {
            legs.push(self.write_leg(unit.as_mut(), plan, request, now)?);
        }
        unit.commit().map_err(|e| e.into_forex("forex exchange"))?;

        for leg in &legs {
            log::info!(
                "forex exchange {} committed: {} {} -> {} {} at rate #{}",
                leg.exchange.id(),
                leg.exchange.amount_given(),
                leg.exchange.currency_from(),
                leg.exchange.amount_taken(),
                leg.exchange.currency_to(),
                leg.exchange.exchange_rate_id()
            );
        }
        Ok(legs)
    }

    fn write_leg(
        &self,
        unit: &mut dyn PostingUnit,
        plan: PlannedLeg,
        request: &ExchangeRequest,
        now: DateTime<Utc>,
    ) -> Result<ExecutedLeg, ForexError> {
        let exchange = unit
            .insert_exchange(NewExchange {
                exchange_rate_id: plan.rate.id(),
                user: request.user,
                currency_from: plan.currency_from,
                currency_to: plan.currency_to,
                client: request.client.clone(),
                transaction_date: request.transaction_date,
                created_at: now,
                amount_given: plan.amount_given,
                amount_taken: plan.amount_taken,
            })
            .map_err(|e| e.into_forex("forex exchange"))?;
        let postings = self.posting.post(unit, &exchange, now)?;
        Ok(ExecutedLeg { exchange, postings })
    }
}

fn same_code(a: &CurrencyCode, b: &CurrencyCode) -> bool {
    a.as_str().trim().eq_ignore_ascii_case(b.as_str().trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cashier::Cashier;
    use crate::core::ids::{CashierId, GlAccountId, OfficeId, TellerId, UserId};
    use crate::core::journal::{FinancialActivity, FinancialActivityAccount};
    use crate::core::rate::NewExchangeRate;
    use crate::store::memory::InMemoryBook;
    use crate::store::{CurrencyRegistry, ExchangeStore, RateStore};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn code(c: &str) -> CurrencyCode {
        CurrencyCode::new(c)
    }

    fn book(with_home: bool) -> Arc<InMemoryBook> {
        let book = InMemoryBook::new();
        let ugx = OrganisationCurrency::new(code("UGX"), "Uganda Shilling", 0);
        book.add_currency(if with_home { ugx.home() } else { ugx }).unwrap();
        book.add_currency(OrganisationCurrency::new(code("USD"), "US Dollar", 2))
            .unwrap();
        book.add_currency(OrganisationCurrency::new(code("EUR"), "Euro", 2))
            .unwrap();
        book.add_cashier(Cashier::new(
            CashierId::new(1),
            StaffId::new(5),
            TellerId::new(1),
            OfficeId::new(1),
        ))
        .unwrap();
        let mut gl = 100;
        for currency in ["UGX", "USD", "EUR"] {
            for activity in [FinancialActivity::CashAtMainVault, FinancialActivity::CashAtTeller] {
                gl += 1;
                book.add_financial_activity_account(FinancialActivityAccount::new(
                    activity,
                    code(currency),
                    GlAccountId::new(gl),
                ))
                .unwrap();
            }
        }
        for (currency, rate_type, amount) in [
            ("USD", ExchangeRateType::Buying, dec!(3700)),
            ("USD", ExchangeRateType::Selling, dec!(3720)),
            ("EUR", ExchangeRateType::Buying, dec!(3880)),
            ("EUR", ExchangeRateType::Selling, dec!(3900)),
        ] {
            book.insert_rate(NewExchangeRate::new(code(currency), rate_type, date(2024, 1, 1), amount))
                .unwrap();
        }
        Arc::new(book)
    }

    fn engine(book: &Arc<InMemoryBook>) -> ExchangeEngine {
        ExchangeEngine::new(Collaborators::from_single(book.clone()), EngineConfig::default())
    }

    fn request(from: &str, to: &str, amount: Decimal) -> ExchangeRequest {
        ExchangeRequest {
            currency_from: code(from),
            currency_to: code(to),
            amount,
            transaction_date: date(2024, 1, 15),
            user: ActingUser::new(UserId::new(1), StaffId::new(5)),
            client: ClientRef::default(),
        }
    }

    #[test]
    fn test_route_decisions() {
        let book = book(true);
        let engine = engine(&book);
        let ugx = book.find_by_code(&code("UGX")).unwrap().unwrap();
        let usd = book.find_by_code(&code("USD")).unwrap().unwrap();
        let eur = book.find_by_code(&code("EUR")).unwrap().unwrap();
        assert_eq!(engine.route(&usd, &ugx).unwrap(), Route::ToHome);
        assert_eq!(engine.route(&ugx, &usd).unwrap(), Route::FromHome);
        assert_eq!(
            engine.route(&usd, &eur).unwrap(),
            Route::Cross { home: code("UGX") }
        );
    }

    #[test]
    fn test_to_home_single_leg() {
        let book = book(true);
        let legs = engine(&book).execute(&request("USD", "UGX", dec!(100))).unwrap();
        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0].exchange.amount_given(), dec!(100));
        assert_eq!(legs[0].exchange.amount_taken(), dec!(370000));
    }

    #[test]
    fn test_from_home_single_leg() {
        let book = book(true);
        let legs = engine(&book).execute(&request("UGX", "USD", dec!(370000))).unwrap();
        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0].exchange.amount_taken(), dec!(99.462366));
    }

    #[test]
    fn test_same_pair_rejected_before_lookup() {
        // "XYZ" is not registered; the pair check comes first
        let book = book(true);
        let err = engine(&book).execute(&request("XYZ", "xyz", dec!(-1))).unwrap_err();
        assert!(matches!(err, ForexError::InvalidCurrencyPair { .. }));
    }

    #[test]
    fn test_unknown_currency() {
        let book = book(true);
        let err = engine(&book).execute(&request("GBP", "UGX", dec!(1))).unwrap_err();
        assert_eq!(err, ForexError::CurrencyNotFound { code: code("GBP") });
    }

    #[test]
    fn test_non_positive_amount() {
        let book = book(true);
        let err = engine(&book).execute(&request("USD", "UGX", Decimal::ZERO)).unwrap_err();
        assert!(matches!(err, ForexError::InvalidAmount { field: "amount", .. }));
    }

    #[test]
    fn test_cross_without_home_currency() {
        let book = book(false);
        let err = engine(&book).execute(&request("USD", "EUR", dec!(100))).unwrap_err();
        assert_eq!(err, ForexError::HomeCurrencyNotConfigured { flagged: 0 });
        assert!(book.all_exchanges().unwrap().is_empty());
    }

    #[test]
    fn test_zero_rate_rejected() {
        let book = book(true);
        book.insert_rate(NewExchangeRate::new(
            code("USD"),
            ExchangeRateType::Buying,
            date(2024, 1, 10),
            Decimal::ZERO,
        ))
        .unwrap();
        let err = engine(&book).execute(&request("USD", "UGX", dec!(1))).unwrap_err();
        assert!(matches!(err, ForexError::InvalidRateAmount { .. }));
    }

    #[test]
    fn test_custom_rate_scale() {
        let book = book(true);
        let engine = ExchangeEngine::new(
            Collaborators::from_single(book.clone()),
            EngineConfig {
                rate_scale: 2,
                ..Default::default()
            },
        );
        let legs = engine.execute(&request("UGX", "USD", dec!(370000))).unwrap();
        assert_eq!(legs[0].exchange.amount_taken(), dec!(99.46));
    }
}
