//! # events
//!
//! Defines [`WsEvent`] — ทุก Event ที่ระบบ Broadcast ออกไปผ่าน WebSocket
//! ไปยังหน้า Chart/Entry ที่เปิดค้างอยู่
//!
//! ใช้ `tokio::sync::broadcast::Sender<String>` โดยแปลง WsEvent เป็น JSON
//! String ก่อนส่ง เพื่อหลีกเลี่ยง Clone constraints ที่ซับซ้อน

use serde::Serialize;

use crate::models::{RateObservation, Trade};

/// Event ทุกรูปแบบที่หน้าเว็บจะได้รับแบบ Real-time
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WsEvent {
    /// มีการบันทึก (หรือเขียนทับ) rate ของวันหนึ่งผ่าน entry form
    RateRecorded {
        observation: RateObservation,
    },

    /// Trade ผ่าน ledger สำเร็จแล้ว — portfolio ถูกเขียนทับเรียบร้อย
    TradeRecorded {
        trade: Box<Trade>,
    },

    /// Store แจ้งว่า rates record เปลี่ยน (ค่า root ทั้งก้อน)
    RatesChanged {
        rates: serde_json::Value,
    },

    /// Store แจ้งว่า portfolio record เปลี่ยน (ค่า root ทั้งก้อน)
    PortfolioChanged {
        portfolio: serde_json::Value,
    },

    /// สถิติ Server (ส่งตอนมีคน poll /api/stats เพื่อให้ Dashboard ยัง alive)
    ServerStats {
        rate_count: u64,
        trade_count: u64,
        ws_clients: usize,
    },
}

impl WsEvent {
    /// แปลงเป็น JSON String สำหรับส่งผ่าน WebSocket
    #[inline]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"event":"SERIALIZATION_ERROR"}"#.to_string())
    }
}
