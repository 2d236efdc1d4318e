//! # routes::live
//!
//! **Live Loop** — realtime mirror of the store for open browser tabs
//!
//! ## Endpoints
//!
//! | Method    | Path          | Description                              |
//! |-----------|---------------|------------------------------------------|
//! | GET (WS)  | `/ws/live`    | WebSocket real-time event stream         |
//! | GET       | `/api/stats`  | rate_count, trade_count, ws_clients      |
//! | GET       | `/api/health` | liveness probe (ไม่ต้อง auth)            |

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    Json,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::sync::atomic::Ordering;
use tracing::{debug, info};

use crate::{
    events::WsEvent,
    state::SharedState,
    store::{PROFILE_PATH, RATES_PATH},
};

// ─── WebSocket Handler ────────────────────────────────────────────────────────

/// Upgrade HTTP → WebSocket แล้ว subscribe broadcast channel
///
/// หน้าเว็บต่อที่ `ws://localhost:3000/ws/live`
/// ทุก WsEvent จะถูกส่งมาเป็น JSON text frame
pub async fn ws_live(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: SharedState) {
    let mut rx = state.broadcast_tx.subscribe();
    let (mut sender, mut receiver) = socket.split();

    info!("🔌 WebSocket client connected");

    // ── ส่ง Snapshot ของทั้งสอง record ทันทีที่ต่อ ───────────────────────────
    let snapshot = {
        let rates = state.store.read_once_at_path(RATES_PATH).await.ok().flatten();
        let portfolio = state.store.read_once_at_path(PROFILE_PATH).await.ok().flatten();

        json!({
            "event":       "SNAPSHOT",
            "rates":       rates,
            "portfolio":   portfolio,
            "rate_count":  state.rate_count.load(Ordering::Relaxed),
            "trade_count": state.trade_count.load(Ordering::Relaxed),
        })
        .to_string()
    };

    if sender.send(Message::Text(snapshot.into())).await.is_err() {
        return; // Client ปิดก่อน snapshot ส่งได้
    }

    // ── Event Loop ────────────────────────────────────────────────────────────
    loop {
        tokio::select! {
            // รับ Event จาก broadcast channel → ส่งต่อไป WebSocket client
            result = rx.recv() => {
                match result {
                    Ok(json_str) => {
                        if sender.send(Message::Text(json_str.into())).await.is_err() {
                            break; // Client disconnect
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        // Client read ช้าเกินไป — บาง Event ถูก skip
                        debug!("WS client lagged, skipped {n} events");
                    }
                    Err(_) => break, // Channel closed
                }
            }

            // รับ Message จาก Client (Ping / Close)
            result = receiver.next() => {
                match result {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sender.send(Message::Pong(data)).await;
                    }
                    _ => {} // Text/Binary from client — ignored for now
                }
            }
        }
    }

    info!("🔌 WebSocket client disconnected");
}

// ─── REST Endpoints ───────────────────────────────────────────────────────────

/// GET /api/health — liveness probe (ยกเว้นจาก API key middleware)
pub async fn health_check(State(state): State<SharedState>) -> impl IntoResponse {
    Json(json!({
        "ok":          true,
        "service":     "midas",
        "rate_count":  state.rate_count.load(Ordering::Relaxed),
        "trade_count": state.trade_count.load(Ordering::Relaxed),
    }))
}

/// GET /api/stats — สถิติ Server
pub async fn get_stats(State(state): State<SharedState>) -> impl IntoResponse {
    let rate_count = state.rate_count.load(Ordering::Relaxed);
    let trade_count = state.trade_count.load(Ordering::Relaxed);
    let ws_clients = state.ws_clients();

    // Broadcast stats event ไปด้วยทุกครั้งที่มีคน poll
    state.broadcast(&WsEvent::ServerStats {
        rate_count,
        trade_count,
        ws_clients,
    });

    Json(json!({
        "ok":          true,
        "rate_count":  rate_count,
        "trade_count": trade_count,
        "ws_clients":  ws_clients,
    }))
}
