//! Single-hop exchange example.
//!
//! A client hands a teller US dollars and takes home Uganda shillings, then
//! buys dollars back. Each exchange is one leg with two cash movements.

use chrono::NaiveDate;
use forex_engine::core::cashier::Cashier;
use forex_engine::core::currency::{CurrencyCode, OrganisationCurrency};
use forex_engine::core::exchange::{ActingUser, ClientRef};
use forex_engine::core::ids::{CashierId, GlAccountId, OfficeId, StaffId, TellerId, UserId};
use forex_engine::core::journal::{FinancialActivity, FinancialActivityAccount};
use forex_engine::core::rate::{ExchangeRateType, NewExchangeRate};
use forex_engine::exchange::engine::{EngineConfig, ExchangeEngine, ExchangeRequest, ExecutedLeg};
use forex_engine::store::memory::InMemoryBook;
use forex_engine::store::{Collaborators, RateStore};
use rust_decimal_macros::dec;
use std::sync::Arc;

fn main() {
    println!("╔══════════════════════════════════════════╗");
    println!("║  forex-engine: Single-Hop Exchange       ║");
    println!("╚══════════════════════════════════════════╝\n");

    let book = InMemoryBook::new();
    let ugx = CurrencyCode::new("UGX");
    let usd = CurrencyCode::new("USD");
    let opened = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    book.add_currency(OrganisationCurrency::new(ugx.clone(), "Uganda Shilling", 0).home())
        .unwrap();
    book.add_currency(OrganisationCurrency::new(usd.clone(), "US Dollar", 2))
        .unwrap();
    book.add_cashier(Cashier::new(
        CashierId::new(1),
        StaffId::new(7),
        TellerId::new(1),
        OfficeId::new(1),
    ))
    .unwrap();
    for (currency, vault, till) in [(&ugx, 1100, 1200), (&usd, 2100, 2200)] {
        book.add_financial_activity_account(FinancialActivityAccount::new(
            FinancialActivity::CashAtMainVault,
            currency.clone(),
            GlAccountId::new(vault),
        ))
        .unwrap();
        book.add_financial_activity_account(FinancialActivityAccount::new(
            FinancialActivity::CashAtTeller,
            currency.clone(),
            GlAccountId::new(till),
        ))
        .unwrap();
    }
    book.insert_rate(NewExchangeRate::new(usd.clone(), ExchangeRateType::Buying, opened, dec!(3700)))
        .unwrap();
    book.insert_rate(NewExchangeRate::new(usd.clone(), ExchangeRateType::Selling, opened, dec!(3750)))
        .unwrap();

    let book = Arc::new(book);
    let engine = ExchangeEngine::new(Collaborators::from_single(book.clone()), EngineConfig::default());
    let teller = ActingUser::new(UserId::new(3), StaffId::new(7));

    // --- Scenario 1: foreign into home, at the buying rate ---
    println!("━━━ Scenario 1: 250 USD into UGX ━━━\n");
    let request = ExchangeRequest {
        currency_from: usd.clone(),
        currency_to: ugx.clone(),
        amount: dec!(250),
        transaction_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        user: teller,
        client: ClientRef::new(Some("C-1042".to_string()), Some("Amina N.".to_string())),
    };
    let legs = engine.execute(&request).unwrap();
    for leg in &legs {
        print_leg(leg);
    }
    println!();

    // --- Scenario 2: home into foreign, at the selling rate ---
    println!("━━━ Scenario 2: 1,000,000 UGX into USD ━━━\n");
    let request = ExchangeRequest {
        currency_from: ugx.clone(),
        currency_to: usd.clone(),
        amount: dec!(1_000_000),
        client: ClientRef::default(),
        ..request
    };
    let legs = engine.execute(&request).unwrap();
    for leg in &legs {
        print_leg(leg);
        println!("  balanced: {}", leg.postings.is_balanced());
    }
    println!();

    // --- Journal ---
    println!("━━━ Journal ━━━\n");
    for entry in book.journal_entries().unwrap() {
        println!(
            "  {:<7} GL {:<5} {:>14} {}  [{}]",
            format!("{:?}", entry.entry_type),
            entry.gl_account.to_string(),
            entry.amount.to_string(),
            entry.currency,
            entry.transaction_id
        );
    }
}

fn print_leg(leg: &ExecutedLeg) {
    let exchange = &leg.exchange;
    println!(
        "  exchange #{}: {} {} -> {} {} (rate #{})",
        exchange.id(),
        exchange.amount_given(),
        exchange.currency_from(),
        exchange.amount_taken(),
        exchange.currency_to(),
        exchange.exchange_rate_id()
    );
    for movement in [&leg.postings.outward, &leg.postings.inward] {
        let txn = &movement.cashier_transaction;
        println!(
            "    {:<8} {} {}  dr GL {} / cr GL {}",
            txn.txn_type.label(),
            txn.amount,
            txn.currency,
            movement.debit.gl_account,
            movement.credit.gl_account
        );
    }
}
