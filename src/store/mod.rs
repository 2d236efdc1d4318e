//! # store — Realtime Key-Value Store Layer
//!
//! Persistence and live sync are delegated to a hosted realtime database.
//! The app only ever needs three operations, keyed by path strings:
//!
//! | Operation            | Semantics                                        |
//! |----------------------|--------------------------------------------------|
//! | `write_at_path`      | replace the value at `path` wholesale            |
//! | `read_once_at_path`  | one-shot read, `None` if nothing stored yet      |
//! | `subscribe`          | stream of the **full current value** at a root — |
//! |                      | delivered on subscribe and on every change       |
//!
//! Paths are at most two levels: a root record (`goldProfile`) or a keyed
//! child under a root (`goldRates/20250830`). Subscriptions attach to the
//! root and always receive the whole root value, child writes included.
//!
//! ## Backends
//! - [`memory::MemoryStore`] — in-process, default. ใช้ใน test ด้วย
//! - [`rest::RestStore`]     — hosted realtime DB ผ่าน REST (`STORE_BASE_URL`)

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::AppError;

pub mod memory;
pub mod rest;

// ─── Paths ────────────────────────────────────────────────────────────────────

/// Root path holding the `YYYYMMDD → RateObservation` mapping.
pub const RATES_PATH: &str = "goldRates";

/// Root path holding the single portfolio aggregate record.
pub const PROFILE_PATH: &str = "goldProfile";

/// Child path of one observation, e.g. `goldRates/20250830`.
#[inline]
pub fn rate_path(storage_key: &str) -> String {
    format!("{RATES_PATH}/{storage_key}")
}

// ─── Trait ────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait RateStore: Send + Sync {
    /// Replaces the value at `path` wholesale. No partial merge.
    async fn write_at_path(&self, path: &str, value: Value) -> Result<(), AppError>;

    /// Reads the value at `path` once. `None` = nothing stored there yet.
    async fn read_once_at_path(&self, path: &str) -> Result<Option<Value>, AppError>;

    /// Subscribes to a root path. The receiver gets the current value
    /// immediately (if one exists) and the full new value on every change.
    async fn subscribe(&self, path: &str) -> mpsc::Receiver<Value>;
}

pub type SharedStore = Arc<dyn RateStore>;

// ─── Config ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Rest,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Base URL of the hosted store, e.g. `https://myapp.firebaseio.com`
    pub base_url: String,
    /// Poll interval (seconds) the REST backend uses to emulate subscribe.
    pub poll_secs: u64,
}

impl StoreConfig {
    pub fn from_env() -> Self {
        let backend = match std::env::var("STORE_BACKEND").as_deref() {
            Ok("rest") => StoreBackend::Rest,
            // ไม่ตั้ง (หรือค่าอื่น) → in-memory
            _ => StoreBackend::Memory,
        };
        Self {
            backend,
            base_url: std::env::var("STORE_BASE_URL").unwrap_or_default(),
            poll_secs: env_u64("STORE_POLL_SECS", 3),
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Builds the configured backend behind the trait object.
pub fn build_store(config: &StoreConfig) -> SharedStore {
    match config.backend {
        StoreBackend::Memory => Arc::new(memory::MemoryStore::new()),
        StoreBackend::Rest => Arc::new(rest::RestStore::new(
            config.base_url.clone(),
            config.poll_secs,
        )),
    }
}
