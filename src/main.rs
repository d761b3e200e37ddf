//! forex-engine CLI
//!
//! Run currency exchanges and rate lookups against an organisation book.
//!
//! # Usage
//!
//! ```bash
//! # Exchange 100 USD into the home currency
//! forex-engine exchange --book book.json --from USD --to UGX --amount 100 --date 2024-01-15 --user 1
//!
//! # Output as JSON
//! forex-engine exchange --book book.json --from USD --to EUR --amount 100 --date 2024-01-15 --user 1 --format json
//!
//! # Look up the rate in force
//! forex-engine rate --book book.json --currency USD --type selling --date 2024-01-15
//! ```

use chrono::NaiveDate;
use forex_engine::core::currency::CurrencyCode;
use forex_engine::core::exchange::{ActingUser, ClientRef};
use forex_engine::core::ids::{StaffId, UserId};
use forex_engine::core::rate::ExchangeRateType;
use forex_engine::exchange::engine::{
    EngineConfig, ExchangeEngine, ExchangeRequest, LegAtomicity,
};
use forex_engine::exchange::rates::RateService;
use forex_engine::store::memory::{BookSnapshot, InMemoryBook};
use forex_engine::store::{Collaborators, CurrencyRegistry};
use rust_decimal::Decimal;
use std::fs;
use std::process;
use std::sync::Arc;

fn print_usage() {
    eprintln!(
        r#"forex-engine: currency exchange with cashier and journal posting

USAGE:
    forex-engine <COMMAND> [OPTIONS]

COMMANDS:
    exchange    Execute an exchange and print the committed legs
    rate        Show the rate in force for a currency on a date
    help        Show this message

OPTIONS (exchange):
    --book <FILE>          Organisation book (currencies, rates, cashiers, GL accounts)
    --from <CODE>          Currency handed over by the client
    --to <CODE>            Currency paid out to the client
    --amount <AMOUNT>      Amount of --from currency
    --date <YYYY-MM-DD>    Transaction date
    --user <ID>            Acting user id
    --staff <ID>           Acting staff id (default: same as --user)
    --client-id <ID>       Optional client reference
    --client-name <NAME>   Optional client name
    --per-leg              Commit cross-currency legs separately
    --format <FORMAT>      Output format: text (default) or json

OPTIONS (rate):
    --book <FILE>          Organisation book
    --currency <CODE>      Currency to look up
    --type <TYPE>          buying, selling, intermediary (or 1, 2, 3)
    --date <YYYY-MM-DD>    Effective date
    --format <FORMAT>      Output format: text (default) or json

EXAMPLES:
    forex-engine exchange --book book.json --from USD --to UGX --amount 100 --date 2024-01-15 --user 1
    forex-engine exchange --book book.json --from USD --to EUR --amount 100 --date 2024-01-15 --user 1 --format json
    forex-engine rate --book book.json --currency USD --type selling --date 2024-01-15"#
    );
}

fn load_book(path: &str) -> Arc<InMemoryBook> {
    let content = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{}': {}", path, e);
        process::exit(1);
    });

    let snapshot: BookSnapshot = serde_json::from_str(&content).unwrap_or_else(|e| {
        eprintln!("Error parsing JSON: {}", e);
        eprintln!("Expected format:");
        eprintln!(r#"{{
  "currencies": [
    {{ "code": "UGX", "name": "Uganda Shilling", "decimal_places": 0, "is_home_currency": true }},
    {{ "code": "USD", "name": "US Dollar", "decimal_places": 2, "is_home_currency": false }}
  ],
  "rates": [
    {{ "date": "2024-01-01", "rate_type": "BUYING", "currency": "USD", "amount": "3700" }}
  ],
  "cashiers": [
    {{ "id": 1, "staff_id": 1, "teller_id": 1, "office_id": 1 }}
  ],
  "financial_activity_accounts": [
    {{ "activity": "CASH_AT_MAINVAULT", "currency": "USD", "gl_account": 11 }}
  ]
}}"#);
        process::exit(1);
    });

    let book = InMemoryBook::from_snapshot(snapshot).unwrap_or_else(|e| {
        eprintln!("Error loading book: {}", e);
        process::exit(1);
    });
    Arc::new(book)
}

fn required<T>(value: Option<T>, flag: &str) -> T {
    value.unwrap_or_else(|| {
        eprintln!("Error: {} is required", flag);
        process::exit(1);
    })
}

fn next_value(args: &[String], i: usize, flag: &str, what: &str) -> String {
    args.get(i).cloned().unwrap_or_else(|| {
        eprintln!("{} requires {}", flag, what);
        process::exit(1);
    })
}

fn parse_date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap_or_else(|e| {
        eprintln!("Invalid date '{}': {}", value, e);
        process::exit(1);
    })
}

fn parse_id(value: &str, flag: &str) -> u64 {
    value.parse().unwrap_or_else(|_| {
        eprintln!("{} requires a numeric id", flag);
        process::exit(1);
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("Error writing JSON: {}", e);
        process::exit(1);
    })
}

fn cmd_exchange(args: &[String]) {
    let mut book_path = None;
    let mut from = None;
    let mut to = None;
    let mut amount = None;
    let mut date = None;
    let mut user = None;
    let mut staff = None;
    let mut client_id = None;
    let mut client_name = None;
    let mut atomicity = LegAtomicity::AllLegs;
    let mut format = "text".to_string();
    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--book" => {
                i += 1;
                book_path = Some(next_value(args, i, flag, "a file path"));
            }
            "--from" => {
                i += 1;
                from = Some(next_value(args, i, flag, "a currency code"));
            }
            "--to" => {
                i += 1;
                to = Some(next_value(args, i, flag, "a currency code"));
            }
            "--amount" => {
                i += 1;
                let raw = next_value(args, i, flag, "an amount");
                amount = Some(raw.parse::<Decimal>().unwrap_or_else(|e| {
                    eprintln!("Invalid amount '{}': {}", raw, e);
                    process::exit(1);
                }));
            }
            "--date" => {
                i += 1;
                date = Some(parse_date(&next_value(args, i, flag, "a date")));
            }
            "--user" => {
                i += 1;
                user = Some(parse_id(&next_value(args, i, flag, "an id"), flag));
            }
            "--staff" => {
                i += 1;
                staff = Some(parse_id(&next_value(args, i, flag, "an id"), flag));
            }
            "--client-id" => {
                i += 1;
                client_id = Some(next_value(args, i, flag, "a value"));
            }
            "--client-name" => {
                i += 1;
                client_name = Some(next_value(args, i, flag, "a value"));
            }
            "--per-leg" => atomicity = LegAtomicity::PerLeg,
            "--format" => {
                i += 1;
                format = next_value(args, i, flag, "'text' or 'json'");
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let book = load_book(&required(book_path, "--book <FILE>"));
    let user = required(user, "--user <ID>");
    let request = ExchangeRequest {
        currency_from: CurrencyCode::new(required(from, "--from <CODE>")),
        currency_to: CurrencyCode::new(required(to, "--to <CODE>")),
        amount: required(amount, "--amount <AMOUNT>"),
        transaction_date: required(date, "--date <YYYY-MM-DD>"),
        user: ActingUser::new(UserId::new(user), StaffId::new(staff.unwrap_or(user))),
        client: ClientRef::new(client_id, client_name),
    };

    let config = EngineConfig {
        leg_atomicity: atomicity,
        ..Default::default()
    };
    let engine = ExchangeEngine::new(Collaborators::from_single(book.clone()), config);
    let legs = engine.execute(&request).unwrap_or_else(|e| {
        eprintln!("Exchange failed: {}", e);
        process::exit(1);
    });

    if format == "json" {
        println!("{}", to_json(&legs));
        return;
    }

    for (n, leg) in legs.iter().enumerate() {
        let exchange = &leg.exchange;
        // display at the paid-out currency's precision; the stored value is untouched
        let shown = book
            .find_by_code(exchange.currency_to())
            .ok()
            .flatten()
            .map(|c| c.round_to_precision(exchange.amount_taken()))
            .unwrap_or(exchange.amount_taken());
        println!(
            "Leg {}: exchange #{} {} {} → {} {} (rate #{})",
            n + 1,
            exchange.id(),
            exchange.amount_given(),
            exchange.currency_from(),
            shown,
            exchange.currency_to(),
            exchange.exchange_rate_id()
        );
        for movement in [&leg.postings.outward, &leg.postings.inward] {
            let txn = &movement.cashier_transaction;
            println!(
                "    {:<12} {} {}  dr GL {} / cr GL {}  [{}]",
                txn.txn_type.label(),
                txn.amount,
                txn.currency,
                movement.debit.gl_account,
                movement.credit.gl_account,
                movement.correlation_id()
            );
        }
    }
}

fn cmd_rate(args: &[String]) {
    let mut book_path = None;
    let mut currency = None;
    let mut rate_type = None;
    let mut date = None;
    let mut format = "text".to_string();
    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--book" => {
                i += 1;
                book_path = Some(next_value(args, i, flag, "a file path"));
            }
            "--currency" => {
                i += 1;
                currency = Some(next_value(args, i, flag, "a currency code"));
            }
            "--type" => {
                i += 1;
                let raw = next_value(args, i, flag, "buying, selling, intermediary or 1-3");
                let parsed = match raw.parse::<i32>() {
                    Ok(code) => ExchangeRateType::from_code(code).ok(),
                    Err(_) => ExchangeRateType::all()
                        .iter()
                        .copied()
                        .find(|t| t.name().eq_ignore_ascii_case(&raw)),
                };
                rate_type = Some(parsed.unwrap_or_else(|| {
                    eprintln!("Unknown rate type '{}'", raw);
                    process::exit(1);
                }));
            }
            "--date" => {
                i += 1;
                date = Some(parse_date(&next_value(args, i, flag, "a date")));
            }
            "--format" => {
                i += 1;
                format = next_value(args, i, flag, "'text' or 'json'");
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let book = load_book(&required(book_path, "--book <FILE>"));
    let currency = CurrencyCode::parse(&required(currency, "--currency <CODE>")).unwrap_or_else(|e| {
        eprintln!("{}", e);
        process::exit(1);
    });
    let rate_type = required(rate_type, "--type <TYPE>");
    let date = required(date, "--date <YYYY-MM-DD>");

    let service = RateService::new(&Collaborators::from_single(book));
    let rate = service
        .resolve_as_of(&currency, rate_type, date)
        .unwrap_or_else(|e| {
            eprintln!("{}", e);
            process::exit(1);
        });

    if format == "json" {
        println!("{}", to_json(&rate));
    } else {
        println!("{}", rate);
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "exchange" => cmd_exchange(rest),
        "rate" => cmd_rate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
