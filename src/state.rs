//! # state
//!
//! AppState ที่ inject เข้า handler ทุกตัว — ถือ store, broadcast channel,
//! lock ของ portfolio read-modify-write และ counters
//!
//! ตัว state ไม่เก็บข้อมูลโดเมนเอง — rates กับ portfolio อยู่ใน store
//! เสมอ ทุก request อ่านค่าล่าสุดจาก store ไม่มี cache ในหน่วยความจำ

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, Mutex};

use crate::error::AppError;
use crate::models::{rate::storage_key, PortfolioState, RateObservation};
use crate::store::{rate_path, SharedStore, PROFILE_PATH, RATES_PATH};

/// Buffer ของ WebSocket broadcast — client ที่อ่านช้าโดน skip ไม่ใช่ block
const BROADCAST_BUFFER: usize = 256;

// ─── AppState ─────────────────────────────────────────────────────────────────

/// Top-level shared state injected into every Axum handler.
#[derive(Clone)]
pub struct AppState {
    // ── Persistence ───────────────────────────────────────────────────────────
    /// The realtime key-value store holding both records.
    pub store: SharedStore,

    // ── Live / WebSocket ──────────────────────────────────────────────────────
    /// Broadcast channel สำหรับส่ง Event ไปยัง WebSocket clients
    /// ใช้ String (pre-serialized JSON) เพื่อหลีกเลี่ยง Clone constraints
    pub broadcast_tx: broadcast::Sender<String>,

    // ── Trade Serialization ───────────────────────────────────────────────────
    /// Portfolio ถูกเขียนทับทั้งก้อน (read → ledger → write) — lock นี้กัน
    /// สอง submission พร้อมกันใน process เดียวไม่ให้ทับกันเงียบๆ
    /// ข้าม process ยังเป็น last-write-wins ตามข้อจำกัดของ store
    pub profile_lock: Arc<Mutex<()>>,

    // ── Metrics ───────────────────────────────────────────────────────────────
    pub rate_count:  Arc<AtomicU64>,
    pub trade_count: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(store: SharedStore) -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_BUFFER);

        Self {
            store,
            broadcast_tx,
            profile_lock: Arc::new(Mutex::new(())),
            rate_count:   Arc::new(AtomicU64::new(0)),
            trade_count:  Arc::new(AtomicU64::new(0)),
        }
    }

    // ── Helper Methods ────────────────────────────────────────────────────────

    /// Broadcast WsEvent ไปยัง WebSocket clients ทั้งหมด
    /// ไม่ panic ถ้าไม่มี listener (ปลอดภัยสำหรับ headless mode)
    pub fn broadcast(&self, event: &crate::events::WsEvent) {
        // Err เกิดขึ้นเมื่อไม่มี receiver — ไม่ใช่ error จริงๆ
        let _ = self.broadcast_tx.send(event.to_json());
    }

    /// จำนวน WebSocket clients ที่ต่ออยู่ตอนนี้
    pub fn ws_clients(&self) -> usize {
        self.broadcast_tx.receiver_count()
    }

    // ── Typed Store Accessors ─────────────────────────────────────────────────

    /// อ่าน portfolio record — ไม่มี = พอร์ตว่างเปล่า (default)
    pub async fn read_portfolio(&self) -> Result<PortfolioState, AppError> {
        match self.store.read_once_at_path(PROFILE_PATH).await? {
            Some(value) => serde_json::from_value(value).map_err(|e| {
                AppError::Store(format!("portfolio record is corrupt: {e}"))
            }),
            None => Ok(PortfolioState::default()),
        }
    }

    /// เขียนทับ portfolio record ทั้งก้อน (aggregate เดียว ไม่มี partial update)
    pub async fn write_portfolio(&self, portfolio: &PortfolioState) -> Result<(), AppError> {
        let value = serde_json::to_value(portfolio)
            .map_err(|e| AppError::Internal(e.into()))?;
        self.store.write_at_path(PROFILE_PATH, value).await
    }

    /// อ่าน observation ทุกวัน เรียงตาม date เก่า → ใหม่
    ///
    /// Record ใต้ root ที่ parse ไม่ได้จะถูกข้าม (ไม่ล้มทั้ง list)
    pub async fn read_rates(&self) -> Result<Vec<RateObservation>, AppError> {
        let Some(value) = self.store.read_once_at_path(RATES_PATH).await? else {
            return Ok(Vec::new());
        };

        let mut rates: Vec<RateObservation> = match value {
            Value::Object(map) => map
                .into_iter()
                .filter_map(|(_, v)| serde_json::from_value(v).ok())
                .collect(),
            _ => Vec::new(),
        };

        rates.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(rates)
    }

    /// อ่าน observation ของวันเดียวด้วย key `YYYYMMDD`
    pub async fn rate_for_date(
        &self,
        date: &str,
    ) -> Result<Option<RateObservation>, AppError> {
        let path = rate_path(&storage_key(date));
        match self.store.read_once_at_path(&path).await? {
            Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
                AppError::Store(format!("rate record at {path} is corrupt: {e}"))
            }),
            None => Ok(None),
        }
    }

    /// เขียน observation ของวันเดียว — date เป็น key ทับของเดิมได้เลย
    pub async fn write_rate(&self, observation: &RateObservation) -> Result<(), AppError> {
        let value = serde_json::to_value(observation)
            .map_err(|e| AppError::Internal(e.into()))?;
        self.store
            .write_at_path(&rate_path(&observation.storage_key()), value)
            .await
    }
}

/// Convenience type alias
pub type SharedState = Arc<AppState>;

pub fn build_state(store: SharedStore) -> SharedState {
    Arc::new(AppState::new(store))
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn make_state() -> SharedState {
        build_state(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_empty_store_reads_default_portfolio() {
        let state = make_state();
        let portfolio = state.read_portfolio().await.unwrap();
        assert_eq!(portfolio.total_grams, 0.0);
        assert!(portfolio.transactions.is_empty());
    }

    #[tokio::test]
    async fn test_portfolio_roundtrip() {
        let state = make_state();
        let portfolio = PortfolioState {
            total_grams: 4.2,
            total_investment: 21_000.0,
            transactions: vec![],
        };
        state.write_portfolio(&portfolio).await.unwrap();

        let back = state.read_portfolio().await.unwrap();
        assert_eq!(back.total_grams, 4.2);
        assert_eq!(back.total_investment, 21_000.0);
    }

    #[tokio::test]
    async fn test_rates_come_back_sorted_by_date() {
        let state = make_state();
        for (date, rate) in [("2025-08-30", 5100.0), ("2025-08-28", 5000.0), ("2025-08-29", 5050.0)] {
            state
                .write_rate(&RateObservation::new(date.to_string(), rate))
                .await
                .unwrap();
        }

        let rates = state.read_rates().await.unwrap();
        let dates: Vec<&str> = rates.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["2025-08-28", "2025-08-29", "2025-08-30"]);
    }

    #[tokio::test]
    async fn test_rate_for_date_hits_the_keyed_child() {
        let state = make_state();
        state
            .write_rate(&RateObservation::new("2025-08-30".to_string(), 5100.0))
            .await
            .unwrap();

        let hit = state.rate_for_date("2025-08-30").await.unwrap().unwrap();
        assert_eq!(hit.rate, 5100.0);
        assert!(state.rate_for_date("2025-08-31").await.unwrap().is_none());
    }
}
