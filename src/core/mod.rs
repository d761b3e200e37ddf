//! Foundational domain types: identifiers, currencies, exchange rates,
//! exchange transactions, cashier movements and journal entries.

pub mod cashier;
pub mod currency;
pub mod error;
pub mod exchange;
pub mod ids;
pub mod journal;
pub mod rate;
