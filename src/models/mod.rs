//! # models
//!
//! Data structures shared across the API, the ledger and the store.

pub mod portfolio;
pub mod rate;

pub use portfolio::{PortfolioState, Trade, TradeKind, TradeRequest};
pub use rate::RateObservation;
