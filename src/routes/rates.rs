//! # routes::rates
//!
//! **Entry Loop** — rate submissions and chart data
//!
//! | Method | Path               | Description                               |
//! |--------|--------------------|-------------------------------------------|
//! | POST   | `/api/rates`       | validate + normalize + store one rate     |
//! | GET    | `/api/rates`       | all observations; `?period=` ตัดช่วง + Δ  |
//! | GET    | `/api/rates/today` | observation ของวันนี้                      |

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::Ordering;
use tracing::info;

use crate::{
    error::AppError,
    events::WsEvent,
    models::rate::{normalize_date, parse_rate, RateSubmission},
    models::RateObservation,
    state::SharedState,
};

// ─── POST /api/rates ──────────────────────────────────────────────────────────

/// **Entry form endpoint** — ตรวจ free-text ทั้งสอง field ก่อนเขียนเสมอ
///
/// วันเดิมส่งซ้ำ = เขียนทับ observation เดิม (date เป็น key)
pub async fn submit_rate(
    State(state): State<SharedState>,
    Json(submission): Json<RateSubmission>,
) -> Result<impl IntoResponse, AppError> {
    // ── 1. Validate / Normalize ───────────────────────────────────────────────
    let date = normalize_date(&submission.date)?;
    let rate = parse_rate(&submission.rate)?;

    // ── 2. Write (ทั้ง record ในครั้งเดียว — fail = ไม่มีอะไรค้าง) ────────────
    let observation = RateObservation::new(date, rate);
    state.write_rate(&observation).await?;

    state.rate_count.fetch_add(1, Ordering::Relaxed);
    info!(date = %observation.date, rate, "💰 rate recorded");

    // ── 3. Broadcast ──────────────────────────────────────────────────────────
    state.broadcast(&WsEvent::RateRecorded {
        observation: observation.clone(),
    });

    Ok((
        StatusCode::OK,
        Json(json!({
            "ok":          true,
            "observation": observation,
        })),
    ))
}

// ─── GET /api/rates ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RatesQuery {
    /// `day` | `week` | `month` — ไม่ส่ง = ทั้งหมด ไม่คำนวณ Δ
    pub period: Option<String>,
}

/// One chart point: the observation plus its change versus the previous
/// point in the window.
#[derive(Debug, Serialize)]
pub struct RatePoint {
    #[serde(flatten)]
    pub observation: RateObservation,
    pub change: f64,
    #[serde(rename = "changePercent")]
    pub change_percent: f64,
}

pub async fn list_rates(
    State(state): State<SharedState>,
    Query(query): Query<RatesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let rates = state.read_rates().await?;

    match query.period.as_deref() {
        None => Ok(Json(json!({
            "ok":    true,
            "count": rates.len(),
            "rates": rates,
        }))
        .into_response()),

        Some(period) => {
            let today = Utc::now().date_naive();
            let windowed = filter_window(rates, period, today);
            let points = annotate_changes(windowed);
            Ok(Json(json!({
                "ok":     true,
                "period": period,
                "count":  points.len(),
                "rates":  points,
            }))
            .into_response())
        }
    }
}

/// Keeps observations inside the trailing window ending today.
/// Period ที่ไม่รู้จัก = week (default เดียวกับหน้า chart)
fn filter_window(
    rates: Vec<RateObservation>,
    period: &str,
    today: NaiveDate,
) -> Vec<RateObservation> {
    let start = match period {
        "day" => today.checked_sub_days(Days::new(1)),
        "month" => today.checked_sub_months(Months::new(1)),
        _ => today.checked_sub_days(Days::new(7)), // "week"
    };
    let Some(start) = start else {
        return rates;
    };

    rates
        .into_iter()
        .filter(|r| match NaiveDate::parse_from_str(&r.date, "%Y-%m-%d") {
            Ok(d) => d >= start && d <= today,
            Err(_) => false, // Record พัง — ไม่เอาเข้า chart
        })
        .collect()
}

/// Annotates each point with Δ versus the previous point in the window.
/// จุดแรกไม่มีตัวเทียบ → 0 / 0
fn annotate_changes(rates: Vec<RateObservation>) -> Vec<RatePoint> {
    let mut points = Vec::with_capacity(rates.len());
    let mut previous: Option<f64> = None;

    for observation in rates {
        let (change, change_percent) = match previous {
            Some(prev) => {
                let change = observation.rate - prev;
                (change, change / prev * 100.0)
            }
            None => (0.0, 0.0),
        };
        previous = Some(observation.rate);
        points.push(RatePoint {
            observation,
            change,
            change_percent,
        });
    }

    points
}

// ─── GET /api/rates/today ─────────────────────────────────────────────────────

pub async fn today_rate(
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, AppError> {
    let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();

    match state.rate_for_date(&today).await? {
        Some(observation) => Ok(Json(json!({
            "ok":          true,
            "observation": observation,
        }))),
        None => Err(AppError::NotFound(format!(
            "no rate observation recorded for {today}"
        ))),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
