//! # routes
//!
//! Axum handlers, grouped by surface: rate entry, portfolio/trading,
//! live WebSocket + health.

pub mod live;
pub mod portfolio;
pub mod rates;
