//! Cross-currency exchange example.
//!
//! Neither side is the home currency, so the engine routes through it: the
//! client's dollars are bought into shillings, and the shillings are sold
//! for euros. Shows both leg atomicity modes and a rejected request.

use chrono::NaiveDate;
use forex_engine::core::cashier::Cashier;
use forex_engine::core::ids::{CashierId, GlAccountId, OfficeId, StaffId, TellerId, UserId};
use forex_engine::core::journal::{FinancialActivity, FinancialActivityAccount};
use forex_engine::prelude::*;
use forex_engine::store::{CurrencyRegistry, ExchangeStore, RateStore};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn branch() -> Arc<InMemoryBook> {
    let book = InMemoryBook::new();
    let opened = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    book.add_currency(
        OrganisationCurrency::new(CurrencyCode::new("UGX"), "Uganda Shilling", 0).home(),
    )
    .unwrap();
    for (code, name) in [("USD", "US Dollar"), ("EUR", "Euro"), ("KES", "Kenyan Shilling")] {
        book.add_currency(OrganisationCurrency::new(CurrencyCode::new(code), name, 2))
            .unwrap();
    }
    book.add_cashier(Cashier::new(
        CashierId::new(1),
        StaffId::new(7),
        TellerId::new(1),
        OfficeId::new(1),
    ))
    .unwrap();
    for (n, code) in ["UGX", "USD", "EUR", "KES"].iter().enumerate() {
        let base = 1000 * (n as u64 + 1);
        for (activity, offset) in [
            (FinancialActivity::CashAtMainVault, 100),
            (FinancialActivity::CashAtTeller, 200),
        ] {
            book.add_financial_activity_account(FinancialActivityAccount::new(
                activity,
                CurrencyCode::new(*code),
                GlAccountId::new(base + offset),
            ))
            .unwrap();
        }
    }
    // KES only has a buying rate, so selling into it always fails
    for (code, rate_type, amount) in [
        ("USD", ExchangeRateType::Buying, dec!(3700)),
        ("USD", ExchangeRateType::Selling, dec!(3750)),
        ("EUR", ExchangeRateType::Buying, dec!(4020)),
        ("EUR", ExchangeRateType::Selling, dec!(4080)),
        ("KES", ExchangeRateType::Buying, dec!(28.5)),
    ] {
        book.insert_rate(NewExchangeRate::new(CurrencyCode::new(code), rate_type, opened, amount))
            .unwrap();
    }
    Arc::new(book)
}

fn request(from: &str, to: &str, amount: Decimal) -> ExchangeRequest {
    ExchangeRequest {
        currency_from: CurrencyCode::new(from),
        currency_to: CurrencyCode::new(to),
        amount,
        transaction_date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
        user: ActingUser::new(UserId::new(3), StaffId::new(7)),
        client: ClientRef::new(None, Some("Walk-in".to_string())),
    }
}

fn main() {
    println!("╔══════════════════════════════════════════╗");
    println!("║  forex-engine: Cross-Currency Exchange   ║");
    println!("╚══════════════════════════════════════════╝\n");

    // --- Scenario 1: USD into EUR through UGX ---
    println!("━━━ Scenario 1: 500 USD into EUR ━━━\n");
    let book = branch();
    let engine = ExchangeEngine::new(Collaborators::from_single(book.clone()), EngineConfig::default());
    let legs = engine.execute(&request("USD", "EUR", dec!(500))).unwrap();
    for (n, leg) in legs.iter().enumerate() {
        let exchange = &leg.exchange;
        println!(
            "  Leg {}: {} {} -> {} {} (rate #{})",
            n + 1,
            exchange.amount_given(),
            exchange.currency_from(),
            exchange.amount_taken(),
            exchange.currency_to(),
            exchange.exchange_rate_id()
        );
    }
    let paid_out = legs[1].exchange.amount_taken();
    let rounded = book
        .find_by_code(&CurrencyCode::new("EUR"))
        .ok()
        .flatten()
        .map(|c| c.round_to_precision(paid_out))
        .unwrap_or(paid_out);
    println!("\n  Client receives {} EUR ({} before rounding)\n", rounded, paid_out);

    // --- Scenario 2: net effect on the journal ---
    println!("━━━ Scenario 2: Journal Net by Currency ━━━\n");
    let entries = book.journal_entries().unwrap();
    for code in ["USD", "UGX", "EUR"] {
        let in_currency: Vec<_> = entries.iter().filter(|e| e.currency.as_str() == code).collect();
        let net: Decimal = in_currency.iter().map(|e| e.signed_amount()).sum();
        println!("  {:<4} {:>2} entries  net {}", code, in_currency.len(), net);
    }
    println!();

    // --- Scenario 3: a leg that cannot be priced ---
    println!("━━━ Scenario 3: USD into KES (no selling rate) ━━━\n");
    for atomicity in [LegAtomicity::AllLegs, LegAtomicity::PerLeg] {
        let book = branch();
        let config = EngineConfig {
            leg_atomicity: atomicity,
            ..Default::default()
        };
        let engine = ExchangeEngine::new(Collaborators::from_single(book.clone()), config);
        match engine.execute(&request("USD", "KES", dec!(100))) {
            Ok(legs) => println!("  {:?}: {} legs committed", atomicity, legs.len()),
            Err(e) => println!(
                "  {:?}: {} ({} exchanges stored)",
                atomicity,
                e,
                book.all_exchanges().map(|all| all.len()).unwrap_or(0)
            ),
        }
    }
}
