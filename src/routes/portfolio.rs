//! # routes::portfolio
//!
//! **Trade Loop** — buy/sell submissions and portfolio views
//!
//! | Method | Path                          | Description                       |
//! |--------|-------------------------------|-----------------------------------|
//! | POST   | `/api/trades`                 | apply one trade through the ledger |
//! | GET    | `/api/portfolio`              | current aggregate record          |
//! | GET    | `/api/portfolio/summary`      | value / P/L / amount drawn        |
//! | GET    | `/api/portfolio/transactions` | full history, submission order    |

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::json;
use std::sync::atomic::Ordering;
use tracing::info;

use crate::{
    error::AppError,
    events::WsEvent,
    ledger,
    models::rate::normalize_date,
    models::{PortfolioState, Trade, TradeRequest},
    state::SharedState,
};

// ─── POST /api/trades ─────────────────────────────────────────────────────────

/// **Trade entry point** — resolve rate ของวันที่เลือก, run ledger, เขียนทับ
/// portfolio ทั้งก้อน
pub async fn submit_trade(
    State(state): State<SharedState>,
    Json(request): Json<TradeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (trade, portfolio) = execute_trade(&state, request).await?;

    state.trade_count.fetch_add(1, Ordering::Relaxed);
    info!(
        date  = %trade.date,
        kind  = ?trade.kind,
        grams = trade.grams,
        amount = trade.amount,
        "🪙 trade recorded"
    );

    // ── Broadcast ─────────────────────────────────────────────────────────────
    state.broadcast(&WsEvent::TradeRecorded {
        trade: Box::new(trade.clone()),
    });

    Ok((
        StatusCode::OK,
        Json(json!({
            "ok":    true,
            "trade": trade,
            "portfolio": {
                "totalGrams":      portfolio.total_grams,
                "totalInvestment": portfolio.total_investment,
            },
        })),
    ))
}

/// ทั้ง flow ของหนึ่ง trade — แยกจาก handler เพื่อให้ test ตรงๆ ได้
///
/// ```text
/// 1. Normalize date
/// 2. หา RateObservation ของวันนั้น (rate snapshot จากวันที่เลือก)
/// 3. ล็อค → อ่าน portfolio ล่าสุด → ledger → เขียนทับ → ปล่อยล็อค
/// ```
/// Validation fail ทุกแบบเกิดก่อนเขียน — ไม่มี partial state
pub async fn execute_trade(
    state: &SharedState,
    request: TradeRequest,
) -> Result<(Trade, PortfolioState), AppError> {
    // ── 1. Date ───────────────────────────────────────────────────────────────
    let date = normalize_date(&request.date)?;

    // ── 2. Rate ของวันที่ trade อ้างถึง ───────────────────────────────────────
    let observation = state.rate_for_date(&date).await?.ok_or_else(|| {
        AppError::NotFound(format!("no rate observation for {date}"))
    })?;

    let request = TradeRequest { date, ..request };

    // ── 3. Read-Modify-Write ใต้ lock ─────────────────────────────────────────
    // กันสอง submission พร้อมกันใน process นี้ — ข้าม process ยัง
    // last-write-wins (ข้อจำกัดของ store แบบเขียนทับทั้ง record)
    let _guard = state.profile_lock.lock().await;

    let current = state.read_portfolio().await?;
    let (next, trade) = ledger::apply_trade(&current, &request, observation.rate, Utc::now())?;
    state.write_portfolio(&next).await?;

    Ok((trade, next))
}

// ─── GET /api/portfolio ───────────────────────────────────────────────────────

pub async fn get_portfolio(
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, AppError> {
    let portfolio = state.read_portfolio().await?;
    Ok(Json(json!({
        "ok":        true,
        "portfolio": portfolio,
    })))
}

// ─── GET /api/portfolio/summary ───────────────────────────────────────────────

/// Summary cards ของหน้า chart: มูลค่าปัจจุบัน, P/L, เงินที่ถอนออกสุทธิ
pub async fn get_summary(
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, AppError> {
    let portfolio = state.read_portfolio().await?;

    let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
    let today_rate = state.rate_for_date(&today).await?.map(|o| o.rate);

    Ok(Json(json!({
        "ok": true,
        "summary": {
            "totalGrams":      portfolio.total_grams,
            "totalInvestment": portfolio.total_investment,
            "currentValue":    ledger::current_value(&portfolio, today_rate),
            "profitLoss":      ledger::profit_loss(&portfolio, today_rate),
            "amountDrawn":     ledger::amount_drawn(&portfolio.transactions),
            "todayRate":       today_rate,
        },
    })))
}

// ─── GET /api/portfolio/transactions ──────────────────────────────────────────

pub async fn get_transactions(
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, AppError> {
    let portfolio = state.read_portfolio().await?;
    Ok(Json(json!({
        "ok":           true,
        "count":        portfolio.transactions.len(),
        "transactions": portfolio.transactions,
    })))
}

// ─── Tests ────────────────────────────────────────────────────────────────────
