//! # ledger
//!
//! **Portfolio Ledger** — the accounting rules applied on every trade.
//!
//! ## ลำดับการตรวจสอบ (ทุก trade)
//! ```text
//! 1. ตรวจ rate (ต้องเป็นบวก)
//! 2. Resolve grams ↔ amount จาก field ที่ผู้ใช้กรอก
//! 3. ตรวจ Duplicate — วันนี้มี transaction แล้วหรือยัง?
//! 4. buy  → บวกยอดตรงๆ
//!    sell → ตรวจ balance, ลด cost basis ตามสัดส่วนที่ขาย
//! 5. Append Trade เข้า history → คืน state ใหม่
//! ```
//!
//! ## Cost basis
//! A sell reduces the invested capital by the fraction of holdings sold
//! (`investment * grams_sold / grams_before`). This is average-cost
//! accounting — it does not track individual lots, so it diverges from
//! FIFO/LIFO once buys happen at varying prices. Accepted simplification.
//!
//! Everything here is pure: no I/O, no clocks except the injected
//! timestamp, failures never mutate the input state.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{PortfolioState, Trade, TradeKind, TradeRequest};

// ─── Apply Trade ──────────────────────────────────────────────────────────────

/// Applies one trade to the current state and returns the next state plus
/// the appended [`Trade`].
///
/// `rate` is the observation rate snapshotted from the priced date — not
/// today's rate. `recorded_at` is injected so callers (and tests) control
/// the clock.
pub fn apply_trade(
    state: &PortfolioState,
    request: &TradeRequest,
    rate: f64,
    recorded_at: DateTime<Utc>,
) -> Result<(PortfolioState, Trade), AppError> {
    // ── 1. Guard: rate ────────────────────────────────────────────────────────
    if !rate.is_finite() || rate <= 0.0 {
        return Err(AppError::InvalidInput(format!(
            "trade rate must be positive, got {rate}"
        )));
    }

    // ── 2. Resolve grams ↔ amount ────────────────────────────────────────────
    let (grams, amount) = resolve_quantities(request, rate)?;

    // ── 3. Guard: one trade per date ──────────────────────────────────────────
    // วันที่มี transaction แล้วถือว่า settled — ไม่รับ trade ซ้ำ
    if transaction_for_date(&state.transactions, &request.date).is_some() {
        return Err(AppError::DuplicateTrade(format!(
            "{} already has a settled transaction",
            request.date
        )));
    }

    // ── 4. Totals ─────────────────────────────────────────────────────────────
    let (new_total_grams, new_total_investment) = match request.kind {
        TradeKind::Buy => (state.total_grams + grams, state.total_investment + amount),

        TradeKind::Sell => {
            if grams > state.total_grams {
                return Err(AppError::InsufficientBalance(format!(
                    "tried to sell {grams:.3}g but only {:.3}g held",
                    state.total_grams
                )));
            }

            let remaining = state.total_grams - grams;
            let investment = if remaining == 0.0 {
                // ขายหมดพอร์ต → cost basis กลับเป็นศูนย์เสมอ
                // (ไม่คำนวณตามสัดส่วน เพื่อกัน rounding residue ค้าง)
                0.0
            } else {
                let proportion_sold = grams / state.total_grams;
                let reduced = state.total_investment - state.total_investment * proportion_sold;
                reduced.max(0.0)
            };

            (remaining, investment)
        }
    };

    // ── 5. Append ─────────────────────────────────────────────────────────────
    let trade = Trade {
        trade_id: Uuid::new_v4(),
        date: request.date.clone(),
        kind: request.kind,
        grams,
        amount,
        rate,
        recorded_at,
    };

    let mut transactions = state.transactions.clone();
    transactions.push(trade.clone());

    Ok((
        PortfolioState {
            total_grams: new_total_grams,
            total_investment: new_total_investment,
            transactions,
        },
        trade,
    ))
}

/// Exactly one of amount/grams must be supplied and positive; the other is
/// derived from the day's rate.
fn resolve_quantities(request: &TradeRequest, rate: f64) -> Result<(f64, f64), AppError> {
    match (request.amount, request.grams) {
        (Some(_), Some(_)) => Err(AppError::InvalidInput(
            "supply either amount or grams, not both".to_string(),
        )),
        (None, None) => Err(AppError::InvalidInput(
            "either amount or grams is required".to_string(),
        )),
        (Some(amount), None) => {
            if !amount.is_finite() || amount <= 0.0 {
                return Err(AppError::InvalidInput(format!(
                    "amount must be positive, got {amount}"
                )));
            }
            Ok((amount / rate, amount))
        }
        (None, Some(grams)) => {
            if !grams.is_finite() || grams <= 0.0 {
                return Err(AppError::InvalidInput(format!(
                    "grams must be positive, got {grams}"
                )));
            }
            Ok((grams, grams * rate))
        }
    }
}

// ─── Derived Queries (read-only, pure) ────────────────────────────────────────

/// Market value of the held gold at today's rate. Zero when the portfolio
/// is flat or today has no observation yet.
pub fn current_value(state: &PortfolioState, today_rate: Option<f64>) -> f64 {
    if state.total_grams == 0.0 {
        return 0.0;
    }
    match today_rate {
        Some(rate) => state.total_grams * rate,
        None => 0.0,
    }
}

/// Unrealised P/L versus the invested capital.
///
/// พอร์ตว่าง → 0 เสมอ แม้ total_investment จะมีเศษ rounding ค้างอยู่
pub fn profit_loss(state: &PortfolioState, today_rate: Option<f64>) -> f64 {
    if state.total_grams == 0.0 {
        return 0.0;
    }
    current_value(state, today_rate) - state.total_investment
}

/// Net cash extracted across the whole history:
/// Σ sell.amount − Σ buy.amount. Positive once cumulative sells exceed
/// cumulative buys.
pub fn amount_drawn(transactions: &[Trade]) -> f64 {
    let mut bought = 0.0;
    let mut sold = 0.0;
    for t in transactions {
        match t.kind {
            TradeKind::Buy => bought += t.amount,
            TradeKind::Sell => sold += t.amount,
        }
    }
    sold - bought
}

/// First transaction priced against `date`, if any.
pub fn transaction_for_date<'a>(transactions: &'a [Trade], date: &str) -> Option<&'a Trade> {
    transactions.iter().find(|t| t.date == date)
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn buy_request(date: &str, grams: f64) -> TradeRequest {
        TradeRequest {
            date: date.to_string(),
            kind: TradeKind::Buy,
            amount: None,
            grams: Some(grams),
        }
    }

    fn sell_request(date: &str, grams: f64) -> TradeRequest {
        TradeRequest {
            date: date.to_string(),
            kind: TradeKind::Sell,
            amount: None,
            grams: Some(grams),
        }
    }

    fn now() -> DateTime<Utc> {
        "2025-08-30T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_buy_adds_totals_exactly() {
        let state = PortfolioState::default();
        let (next, trade) = apply_trade(&state, &buy_request("2025-08-28", 10.0), 5000.0, now()).unwrap();

        assert_eq!(next.total_grams, 10.0);
        assert_eq!(next.total_investment, 50_000.0);
        assert_eq!(next.transactions.len(), 1);
        assert_eq!(trade.amount, 50_000.0);
        assert_eq!(trade.rate, 5000.0);
    }

    #[test]
    fn test_amount_supplied_derives_grams() {
        let state = PortfolioState::default();
        let request = TradeRequest {
            date: "2025-08-28".to_string(),
            kind: TradeKind::Buy,
            amount: Some(10_000.0),
            grams: None,
        };
        let (next, trade) = apply_trade(&state, &request, 5000.0, now()).unwrap();

        assert_eq!(trade.grams, 2.0);
        assert_eq!(trade.amount, 10_000.0);
        assert_eq!(next.total_grams, 2.0);
    }

    #[test]
    fn test_partial_sell_reduces_cost_basis_proportionally() {
        // ซื้อ 10g @ 5000 → ขาย 4g @ 6000
        let state = PortfolioState::default();
        let (state, _) = apply_trade(&state, &buy_request("2025-08-28", 10.0), 5000.0, now()).unwrap();
        let (state, trade) = apply_trade(&state, &sell_request("2025-08-29", 4.0), 6000.0, now()).unwrap();

        assert_eq!(trade.amount, 24_000.0);
        assert_eq!(state.total_grams, 6.0);
        // proportion ที่ขาย = 0.4 → เหลือ 50000 − 0.4·50000
        assert_eq!(state.total_investment, 30_000.0);
    }

    #[test]
    fn test_full_liquidation_forces_investment_to_zero() {
        // Investment มีเศษ float — branch ขายหมดต้องตัดเป็น 0 ตรงๆ
        // ไม่ใช่คำนวณ 29999.999999 − 1.0·29999.999999
        let state = PortfolioState {
            total_grams: 6.0,
            total_investment: 29_999.999999,
            transactions: vec![],
        };
        let (next, _) = apply_trade(&state, &sell_request("2025-08-30", 6.0), 7000.0, now()).unwrap();

        assert_eq!(next.total_grams, 0.0);
        assert_eq!(next.total_investment, 0.0);
    }

    #[test]
    fn test_oversell_fails_and_state_unchanged() {
        let state = PortfolioState {
            total_grams: 2.0,
            total_investment: 10_000.0,
            transactions: vec![],
        };
        let result = apply_trade(&state, &sell_request("2025-08-30", 3.0), 5000.0, now());

        assert!(matches!(result, Err(AppError::InsufficientBalance(_))));
        assert_eq!(state.total_grams, 2.0);
        assert_eq!(state.total_investment, 10_000.0);
        assert!(state.transactions.is_empty());
    }

    #[test]
    fn test_sell_exact_balance_allowed() {
        let state = PortfolioState {
            total_grams: 2.0,
            total_investment: 10_000.0,
            transactions: vec![],
        };
        let (next, _) = apply_trade(&state, &sell_request("2025-08-30", 2.0), 5000.0, now()).unwrap();
        assert_eq!(next.total_grams, 0.0);
        assert_eq!(next.total_investment, 0.0);
    }

    #[test]
    fn test_missing_both_and_supplying_both_rejected() {
        let state = PortfolioState::default();

        let neither = TradeRequest {
            date: "2025-08-28".to_string(),
            kind: TradeKind::Buy,
            amount: None,
            grams: None,
        };
        assert!(matches!(
            apply_trade(&state, &neither, 5000.0, now()),
            Err(AppError::InvalidInput(_))
        ));

        let both = TradeRequest {
            date: "2025-08-28".to_string(),
            kind: TradeKind::Buy,
            amount: Some(1000.0),
            grams: Some(1.0),
        };
        assert!(matches!(
            apply_trade(&state, &both, 5000.0, now()),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_nonpositive_values_rejected() {
        let state = PortfolioState::default();
        for grams in [0.0, -1.0, f64::NAN] {
            let request = TradeRequest {
                date: "2025-08-28".to_string(),
                kind: TradeKind::Buy,
                amount: None,
                grams: Some(grams),
            };
            assert!(matches!(
                apply_trade(&state, &request, 5000.0, now()),
                Err(AppError::InvalidInput(_))
            ));
        }

        // rate ไม่ valid → InvalidInput ก่อนแตะอะไรทั้งนั้น
        assert!(matches!(
            apply_trade(&state, &buy_request("2025-08-28", 1.0), 0.0, now()),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_second_trade_on_same_date_rejected() {
        let state = PortfolioState::default();
        let (state, _) = apply_trade(&state, &buy_request("2025-08-28", 1.0), 5000.0, now()).unwrap();

        let result = apply_trade(&state, &sell_request("2025-08-28", 1.0), 5000.0, now());
        assert!(matches!(result, Err(AppError::DuplicateTrade(_))));
    }

    #[test]
    fn test_invariant_amount_equals_grams_times_rate() {
        let state = PortfolioState::default();
        let request = TradeRequest {
            date: "2025-08-28".to_string(),
            kind: TradeKind::Buy,
            amount: Some(12_345.67),
            grams: None,
        };
        let (_, trade) = apply_trade(&state, &request, 7891.0, now()).unwrap();
        assert!((trade.amount - trade.grams * trade.rate).abs() < 1e-9);
    }

    #[test]
    fn test_amount_drawn_nets_sells_against_buys() {
        assert_eq!(amount_drawn(&[]), 0.0);

        let state = PortfolioState::default();
        let (state, _) = apply_trade(&state, &buy_request("2025-08-26", 10.0), 5000.0, now()).unwrap();
        let (state, _) = apply_trade(&state, &sell_request("2025-08-27", 4.0), 6000.0, now()).unwrap();

        // 24000 ขาย − 50000 ซื้อ
        assert_eq!(amount_drawn(&state.transactions), -26_000.0);
    }

    #[test]
    fn test_profit_loss_zero_when_flat() {
        // เศษ investment ค้างหลังขายหมด (สมมุติ) ต้องไม่โผล่เป็น P/L
        let state = PortfolioState {
            total_grams: 0.0,
            total_investment: 0.000001,
            transactions: vec![],
        };
        assert_eq!(profit_loss(&state, Some(9999.0)), 0.0);
        assert_eq!(current_value(&state, Some(9999.0)), 0.0);
    }

    #[test]
    fn test_queries_without_todays_rate() {
        let state = PortfolioState {
            total_grams: 3.0,
            total_investment: 15_000.0,
            transactions: vec![],
        };
        assert_eq!(current_value(&state, None), 0.0);
        assert_eq!(current_value(&state, Some(6000.0)), 18_000.0);
        assert_eq!(profit_loss(&state, Some(6000.0)), 3_000.0);
    }

    #[test]
    fn test_transaction_for_date_finds_first_match() {
        let state = PortfolioState::default();
        let (state, trade) = apply_trade(&state, &buy_request("2025-08-28", 1.0), 5000.0, now()).unwrap();

        let found = transaction_for_date(&state.transactions, "2025-08-28").unwrap();
        assert_eq!(found.trade_id, trade.trade_id);
        assert!(transaction_for_date(&state.transactions, "2025-08-29").is_none());
    }
}
