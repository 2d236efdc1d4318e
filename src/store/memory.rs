//! # store::memory
//!
//! In-process [`RateStore`] — a `HashMap` of root records plus a broadcast
//! channel for change fan-out.
//!
//! เขียน child (`goldRates/20250830`) = แก้ map ใต้ root แล้วประกาศ
//! **ค่า root ทั้งก้อน** ให้ subscriber ทุกคน เหมือน hosted store จริง

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::debug;

use crate::error::AppError;
use crate::store::RateStore;

/// Buffer ของ change channel — subscriber ที่อ่านช้าจะโดน skip ไม่ใช่ block
const CHANGE_BUFFER: usize = 64;

pub struct MemoryStore {
    records: RwLock<HashMap<String, Value>>,
    /// (root path, full new root value) on every successful write
    change_tx: broadcast::Sender<(String, Value)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (change_tx, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            records: RwLock::new(HashMap::new()),
            change_tx,
        }
    }

    /// `goldRates/20250830` → `("goldRates", Some("20250830"))`
    fn split_path(path: &str) -> Result<(&str, Option<&str>), AppError> {
        let mut parts = path.splitn(2, '/');
        let root = parts.next().filter(|r| !r.is_empty()).ok_or_else(|| {
            AppError::Store(format!("empty store path: {path:?}"))
        })?;
        Ok((root, parts.next()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateStore for MemoryStore {
    async fn write_at_path(&self, path: &str, value: Value) -> Result<(), AppError> {
        let (root, child) = Self::split_path(path)?;

        let full = {
            let mut records = self.records.write().await;
            match child {
                // Root record — เขียนทับทั้งก้อน
                None => {
                    records.insert(root.to_string(), value.clone());
                    value
                }
                // Keyed child — insert ใต้ root object
                Some(key) => {
                    let entry = records
                        .entry(root.to_string())
                        .or_insert_with(|| Value::Object(Map::new()));
                    match entry.as_object_mut() {
                        Some(map) => {
                            map.insert(key.to_string(), value);
                        }
                        None => {
                            return Err(AppError::Store(format!(
                                "{root} holds a non-object value, cannot write child {key}"
                            )));
                        }
                    }
                    entry.clone()
                }
            }
        };

        debug!(path, "store write");
        // Err = ไม่มี subscriber — ไม่ใช่ปัญหา
        let _ = self.change_tx.send((root.to_string(), full));
        Ok(())
    }

    async fn read_once_at_path(&self, path: &str) -> Result<Option<Value>, AppError> {
        let (root, child) = Self::split_path(path)?;
        let records = self.records.read().await;

        let value = match child {
            None => records.get(root).cloned(),
            Some(key) => records
                .get(root)
                .and_then(|v| v.as_object())
                .and_then(|map| map.get(key))
                .cloned(),
        };
        Ok(value)
    }

    async fn subscribe(&self, path: &str) -> mpsc::Receiver<Value> {
        let (tx, rx) = mpsc::channel(CHANGE_BUFFER);

        // ต่อ change channel ก่อนอ่าน snapshot — เขียนที่แทรกระหว่างสองจังหวะ
        // จะมาเป็น event แทนที่จะหายเงียบ
        let mut change_rx = self.change_tx.subscribe();

        // ── Snapshot ทันทีตอน subscribe (ถ้ามีข้อมูลอยู่แล้ว) ───────────────────
        if let Ok(Some(current)) = self.read_once_at_path(path).await {
            let _ = tx.send(current).await;
        }

        let path = path.to_string();

        tokio::spawn(async move {
            loop {
                match change_rx.recv().await {
                    Ok((root, value)) if root == path => {
                        if tx.send(value).await.is_err() {
                            break; // Subscriber dropped
                        }
                    }
                    Ok(_) => {} // Change ของ root อื่น
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        debug!(path, skipped = n, "slow store subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        rx
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_root_write_and_read_roundtrip() {
        let store = MemoryStore::new();
        store
            .write_at_path("goldProfile", json!({"totalGrams": 1.5}))
            .await
            .unwrap();

        let value = store.read_once_at_path("goldProfile").await.unwrap().unwrap();
        assert_eq!(value["totalGrams"], 1.5);
    }

    #[tokio::test]
    async fn test_child_write_lands_under_root() {
        let store = MemoryStore::new();
        store
            .write_at_path("goldRates/20250830", json!({"goldRate": 5000.0}))
            .await
            .unwrap();
        store
            .write_at_path("goldRates/20250831", json!({"goldRate": 5100.0}))
            .await
            .unwrap();

        let map = store.read_once_at_path("goldRates").await.unwrap().unwrap();
        assert_eq!(map.as_object().unwrap().len(), 2);

        let single = store
            .read_once_at_path("goldRates/20250831")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(single["goldRate"], 5100.0);
    }

    #[tokio::test]
    async fn test_child_rewrite_overwrites_same_key() {
        // Resubmission ของวันเดิมต้องทับ record เดิม ไม่ใช่เพิ่มใหม่
        let store = MemoryStore::new();
        store
            .write_at_path("goldRates/20250830", json!({"goldRate": 5000.0}))
            .await
            .unwrap();
        store
            .write_at_path("goldRates/20250830", json!({"goldRate": 5555.0}))
            .await
            .unwrap();

        let map = store.read_once_at_path("goldRates").await.unwrap().unwrap();
        assert_eq!(map.as_object().unwrap().len(), 1);
        assert_eq!(map["20250830"]["goldRate"], 5555.0);
    }

    #[tokio::test]
    async fn test_read_missing_is_none() {
        let store = MemoryStore::new();
        assert!(store.read_once_at_path("goldProfile").await.unwrap().is_none());
        assert!(store
            .read_once_at_path("goldRates/19990101")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_subscribe_delivers_snapshot_then_changes() {
        let store = MemoryStore::new();
        store
            .write_at_path("goldRates/20250830", json!({"goldRate": 5000.0}))
            .await
            .unwrap();

        let mut rx = store.subscribe("goldRates").await;

        // [1] Snapshot ทันที
        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot["20250830"]["goldRate"], 5000.0);

        // [2] Change ถัดไปส่ง root ทั้งก้อน
        store
            .write_at_path("goldRates/20250831", json!({"goldRate": 5100.0}))
            .await
            .unwrap();
        let updated = rx.recv().await.unwrap();
        assert_eq!(updated.as_object().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_subscribe_ignores_other_roots() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe("goldProfile").await;

        store
            .write_at_path("goldRates/20250830", json!({"goldRate": 5000.0}))
            .await
            .unwrap();
        store
            .write_at_path("goldProfile", json!({"totalGrams": 2.0}))
            .await
            .unwrap();

        // Event แรกที่มาถึงต้องเป็นของ goldProfile เท่านั้น
        let value = rx.recv().await.unwrap();
        assert_eq!(value["totalGrams"], 2.0);
    }
}
