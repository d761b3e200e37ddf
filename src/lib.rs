//! # forex-engine
//!
//! Currency-exchange transaction engine for a cashier-based branch.
//!
//! Exchanges are priced against the organisation's home currency. Foreign
//! into home uses the BUYING rate of the source currency, home into foreign
//! uses the SELLING rate of the destination, and foreign into foreign is
//! routed through home as two legs. Every leg posts an outward and an inward
//! cashier transaction together with balanced journal entries.
//!
//! ## Architecture
//!
//! - **core**: Foundational types: currencies, rates, exchanges, cashier and journal records
//! - **store**: Collaborator traits and an in-memory book implementing them
//! - **exchange**: Rate resolver, conversion calculator, posting adapter and engine

pub mod core;
pub mod exchange;
pub mod store;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::core::currency::{CurrencyCode, OrganisationCurrency};
    pub use crate::core::error::ForexError;
    pub use crate::core::exchange::{ActingUser, ClientRef, ExchangeChanges, ExchangeTransaction};
    pub use crate::core::rate::{ExchangeRate, ExchangeRateType, NewExchangeRate};
    pub use crate::exchange::engine::{
        EngineConfig, ExchangeEngine, ExchangeRequest, ExecutedLeg, LegAtomicity,
    };
    pub use crate::exchange::rates::RateService;
    pub use crate::store::memory::InMemoryBook;
    pub use crate::store::Collaborators;
}
