//! # models::portfolio
//!
//! Defines structs for the **portfolio aggregate** and its **trade history**.
//!
//! ## Why three types?
//! `TradeRequest`   = สิ่งที่ผู้ใช้กรอกใน Trade dialog (amount หรือ grams อย่างเดียว)
//! `Trade`          = บันทึกถาวรของ buy/sell หนึ่งครั้ง — ไม่มีวันแก้ไข
//! `PortfolioState` = ยอดรวมปัจจุบัน + ประวัติทั้งหมด (เขียนทับทั้งก้อนทุกครั้ง)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── TradeKind ────────────────────────────────────────────────────────────────

/// Direction of a trade against a priced date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeKind {
    Buy,
    Sell,
}

// ─── Trade ────────────────────────────────────────────────────────────────────

/// An immutable record of one buy or sell action.
///
/// The `rate` is snapshotted at trade time — overwriting the day's rate
/// observation later does **not** rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Internal id — records written before this field existed get a fresh
    /// one assigned on read.
    #[serde(rename = "tradeId", default = "Uuid::new_v4")]
    pub trade_id: Uuid,

    /// The rate-observation date this trade is priced against (`YYYY-MM-DD`).
    pub date: String,

    #[serde(rename = "type")]
    pub kind: TradeKind,

    /// Grams of gold moved. Always positive.
    pub grams: f64,

    /// Currency value moved: `grams * rate` at creation time.
    pub amount: f64,

    /// The observation rate used, frozen at trade time.
    pub rate: f64,

    #[serde(rename = "timestamp")]
    pub recorded_at: DateTime<Utc>,
}

// ─── PortfolioState ───────────────────────────────────────────────────────────

/// The single shared aggregate: running totals plus the append-only history.
///
/// ทุก trade อ่าน state ล่าสุด → คำนวณ state ใหม่ → เขียนทับทั้ง record
/// (ดู ledger สำหรับกติกาการคำนวณ)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PortfolioState {
    /// Grams of gold currently held. Never negative.
    pub total_grams: f64,

    /// Net capital committed to the held gold (average-cost basis).
    pub total_investment: f64,

    /// Every trade ever made, in submission order — **not** sorted by the
    /// date the trade was priced against.
    pub transactions: Vec<Trade>,
}

// ─── TradeRequest ─────────────────────────────────────────────────────────────

/// A buy/sell submission from the trade dialog.
///
/// Exactly one of `amount` / `grams` must be supplied; the ledger derives
/// the other from the day's rate.
#[derive(Debug, Clone, Deserialize)]
pub struct TradeRequest {
    /// The priced date, free text — normalized before the rate lookup.
    pub date: String,

    #[serde(rename = "type")]
    pub kind: TradeKind,

    #[serde(default)]
    pub amount: Option<f64>,

    #[serde(default)]
    pub grams: Option<f64>,
}

// ─── Tests ────────────────────────────────────────────────────────────────────
