//! Rate resolution, conversion, orchestration and ledger posting.

pub mod calculator;
pub mod engine;
pub mod posting;
pub mod rates;
pub mod resolver;
