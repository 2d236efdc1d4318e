//! # store::rest
//!
//! [`RateStore`] over a hosted realtime database's REST surface.
//!
//! ## Store API Contract
//! ```text
//! PUT {base}/{path}.json   body = value      → replaces wholesale
//! GET {base}/{path}.json                     → value | null
//! ```
//! `null` body = ไม่มีข้อมูลที่ path นั้น
//!
//! The hosted service's native push protocol is its own business — here
//! `subscribe` is emulated with a polling loop that re-reads the root and
//! emits whenever the value actually changed. No retries: a failed write
//! surfaces to the caller, a failed poll is logged and retried on the next
//! interval tick.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::error::AppError;
use crate::store::RateStore;

pub struct RestStore {
    base_url: String,
    poll_secs: u64,
    client: reqwest::Client,
}

impl RestStore {
    pub fn new(base_url: String, poll_secs: u64) -> Self {
        Self {
            // base ไม่เอา trailing slash — url() เติมให้เอง
            base_url: base_url.trim_end_matches('/').to_string(),
            poll_secs: poll_secs.max(1),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}.json", self.base_url)
    }

    async fn fetch(client: &reqwest::Client, url: &str) -> Result<Option<Value>, AppError> {
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Store(format!("store unreachable: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::Store(format!("store read HTTP {status}")));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| AppError::Store(format!("store response parse error: {e}")))?;

        // Hosted store คืน null แปลว่ายังไม่มีข้อมูล
        Ok(if value.is_null() { None } else { Some(value) })
    }
}

#[async_trait]
impl RateStore for RestStore {
    async fn write_at_path(&self, path: &str, value: Value) -> Result<(), AppError> {
        let url = self.url(path);

        let response = self
            .client
            .put(&url)
            .json(&value)
            .send()
            .await
            .map_err(|e| {
                error!(path, error = %e, "store unreachable");
                AppError::Store(format!("store unreachable: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(path, http_status = %status, body = %body, "store rejected write");
            return Err(AppError::Store(format!("store write HTTP {status}")));
        }

        debug!(path, "store write acknowledged");
        Ok(())
    }

    async fn read_once_at_path(&self, path: &str) -> Result<Option<Value>, AppError> {
        Self::fetch(&self.client, &self.url(path)).await
    }

    async fn subscribe(&self, path: &str) -> mpsc::Receiver<Value> {
        let (tx, rx) = mpsc::channel(16);
        let client = self.client.clone();
        let url = self.url(path);
        let path = path.to_string();
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(self.poll_secs));

        tokio::spawn(async move {
            // ค่าล่าสุดที่เคยส่ง — ส่งใหม่เฉพาะตอนเปลี่ยนจริง
            let mut last_sent: Option<Value> = None;

            loop {
                interval.tick().await;

                match Self::fetch(&client, &url).await {
                    Ok(Some(value)) => {
                        if last_sent.as_ref() != Some(&value) {
                            if tx.send(value.clone()).await.is_err() {
                                break; // Subscriber dropped
                            }
                            last_sent = Some(value);
                        }
                    }
                    Ok(None) => {} // ยังไม่มีข้อมูล — รอรอบถัดไป
                    Err(e) => {
                        // Poll fail ไม่ retry ทันที — รอ interval รอบหน้า
                        warn!(path, error = %e, "store poll failed");
                    }
                }
            }
        });

        rx
    }
}
