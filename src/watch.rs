//! # watch — Store Subscription Fan-out
//!
//! หน้าเว็บเดิมถือ subscription ของทั้งสอง record ไว้ตลอดเวลา —
//! ฝั่ง server จำลองพฤติกรรมเดียวกัน: task พื้นหลัง subscribe store
//! แล้วส่งต่อค่าเต็มก้อนให้ WebSocket clients ทุกครั้งที่มี remote change
//!
//! Store ที่ remote เปลี่ยน (แม้จาก process อื่น) → client ทุกจอเห็นทันที

use tracing::{debug, info};

use crate::events::WsEvent;
use crate::state::SharedState;
use crate::store::{PROFILE_PATH, RATES_PATH};

/// Spawn หนึ่ง watcher ต่อ root record. ตัว task อยู่ยาวเท่า process.
pub fn spawn_watchers(state: SharedState) {
    spawn_one(state.clone(), RATES_PATH);
    spawn_one(state, PROFILE_PATH);
}

fn spawn_one(state: SharedState, path: &'static str) {
    tokio::spawn(async move {
        let mut rx = state.store.subscribe(path).await;
        info!(path, "👁️ store watcher attached");

        while let Some(value) = rx.recv().await {
            debug!(path, "store change observed");
            let event = match path {
                RATES_PATH => WsEvent::RatesChanged { rates: value },
                _ => WsEvent::PortfolioChanged { portfolio: value },
            };
            state.broadcast(&event);
        }

        // Channel ปิด = store หยุดส่ง (ปกติเกิดตอน shutdown เท่านั้น)
        info!(path, "store watcher stopped");
    });
}
