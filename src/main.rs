//! # Midas — Gold Rate Tracking & Portfolio Ledger Backend
//!
//! ```text
//!  ┌─────────────┐  POST /api/rates            ┌─────────────────────────────┐
//!  │  Entry Form │ ─────────────────────────▶ │ AppState                    │
//!  └─────────────┘                             │ ├─ store ───▶ goldRates     │
//!                                              │ │            goldProfile    │
//!  ┌─────────────┐  POST /api/trades           │ ├─ profile_lock 🔒          │
//!  │  Chart Page │ ─────────────────────────▶ │ ├─ ledger (pure)            │
//!  └─────────────┘  GET  /api/portfolio/*      │ └─ broadcast_tx ──────────┐ │
//!                                              └────────────────────────────┘ │
//!  ┌─────────────┐  ws://host/ws/live  ◀──────────────────────────────────── ┘
//!  │  Browser    │  GET  /api/rates?period=*
//!  └─────────────┘  GET  /api/stats 📊
//! ```

use std::net::SocketAddr;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod auth;
mod error;
mod events;
mod ledger;
mod models;
mod routes;
mod state;
mod store;
mod watch;

use auth::require_api_key;
use routes::{
    live::{get_stats, health_check, ws_live},
    portfolio::{get_portfolio, get_summary, get_transactions, submit_trade},
    rates::{list_rates, submit_rate, today_rate},
};
use state::build_state;
use store::{build_store, StoreBackend, StoreConfig};
use watch::spawn_watchers;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Load .env ──────────────────────────────────────────────────────────
    dotenvy::dotenv().ok();

    // ── 2. Structured logging ─────────────────────────────────────────────────
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("midas=debug".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    info!(r#"

  ╔═══════════════════════════════════════════════════════╗
  ║              MIDAS — Gold Tracker Backend             ║
  ║          Rates · Ledger · Portfolio · Live            ║
  ╚═══════════════════════════════════════════════════════╝"#);

    // ── 3. Store + Shared state ───────────────────────────────────────────────
    let store_config = StoreConfig::from_env();
    match store_config.backend {
        StoreBackend::Memory => info!("🗄️ store backend: in-memory"),
        StoreBackend::Rest => info!(base_url = %store_config.base_url, "🗄️ store backend: rest"),
    }
    let state = build_state(build_store(&store_config));

    // ── 4. Store watchers (remote change → WS fan-out) ────────────────────────
    spawn_watchers(state.clone());

    // ── 5. CORS ───────────────────────────────────────────────────────────────
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // ── 6. Router ─────────────────────────────────────────────────────────────
    let app = Router::new()
        // ── Entry Loop ────────────────────────────────────────────────────────
        .route("/api/rates",                  post(submit_rate))
        .route("/api/rates",                  get(list_rates))
        .route("/api/rates/today",            get(today_rate))
        // ── Trade Loop ────────────────────────────────────────────────────────
        .route("/api/trades",                 post(submit_trade))
        .route("/api/portfolio",              get(get_portfolio))
        .route("/api/portfolio/summary",      get(get_summary))
        .route("/api/portfolio/transactions", get(get_transactions))
        // ── Live Loop ─────────────────────────────────────────────────────────
        .route("/ws/live",                    get(ws_live))
        .route("/api/stats",                  get(get_stats))
        .route("/api/health",                 get(health_check))
        // ── Middleware ────────────────────────────────────────────────────────
        .layer(axum::middleware::from_fn(require_api_key))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    // ── 7. Bind & Serve ───────────────────────────────────────────────────────
    let addr: SocketAddr = std::env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        .parse()?;

    info!(?addr, "🚀 Midas server starting");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
