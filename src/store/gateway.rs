// =============================================================================
// Store Gateway (C1) — generic key/value HTTP facade
// =============================================================================
//
// No AWS SDK crate exists anywhere in the reference pack, so this speaks a
// generic JSON-over-HTTP protocol to the five tables in `tables.rs`, shaped
// the way `BinanceClient` speaks to Binance: a single `reqwest::Client`,
// `#[instrument]` on every call, `anyhow::Context` error chaining, and a
// redacted `Debug` impl. Every outcome lands in a `StoreOutcome` — callers
// never see a raw transport error (§4.1, §7).
// =============================================================================

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::error::StoreOutcome;
use crate::store::decimal::coerce_floats_to_decimal;
use crate::store::tables::Table;

/// Chunk size for batch writes (§4.1: "batches of 25").
const BATCH_CHUNK_SIZE: usize = 25;

/// Maximum attempts per chunk before giving up with a retryable outcome.
const MAX_ATTEMPTS: u32 = 3;

#[async_trait]
pub trait StoreGateway: Send + Sync {
    async fn put(&self, table: Table, key: &str, item: Value) -> StoreOutcome<()>;
    async fn get(&self, table: Table, key: &str) -> StoreOutcome<Option<Value>>;
    async fn delete(&self, table: Table, key: &str) -> StoreOutcome<()>;
    async fn update(&self, table: Table, key: &str, patch: Value) -> StoreOutcome<()>;
    async fn query(&self, table: Table, partition_key: &str) -> StoreOutcome<Vec<Value>>;
    async fn scan(&self, table: Table) -> StoreOutcome<Vec<Value>>;
    async fn batch_put(&self, table: Table, items: Vec<(String, Value)>) -> StoreOutcome<()>;
}

/// HTTP-backed `StoreGateway`, modeled on `BinanceClient`'s construction and
/// call shape.
#[derive(Clone)]
pub struct HttpStoreGateway {
    base_url: String,
    client: reqwest::Client,
}

impl HttpStoreGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        Self {
            base_url: base_url.into(),
            client,
        }
    }

    fn url(&self, table: Table, path: &str) -> String {
        format!("{}/tables/{}{}", self.base_url, table.name(), path)
    }

    /// Single attempt at a PUT; callers retry around this with backoff.
    async fn put_once(&self, table: Table, key: &str, item: &Value) -> anyhow::Result<()> {
        let coerced = coerce_floats_to_decimal(item.clone());
        let url = self.url(table, &format!("/items/{key}"));
        let resp = self
            .client
            .put(&url)
            .json(&coerced)
            .send()
            .await
            .context("PUT request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("PUT {} returned {}", url, resp.status());
        }
        Ok(())
    }

    async fn put_with_retry(&self, table: Table, key: &str, item: &Value) -> StoreOutcome<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.put_once(table, key, item).await {
                Ok(()) => return StoreOutcome::Ok(()),
                Err(e) if attempt >= MAX_ATTEMPTS => {
                    warn!(table = table.name(), key, attempt, error = %e, "store put exhausted retries");
                    return StoreOutcome::RetryableError(e.to_string());
                }
                Err(e) => {
                    debug!(table = table.name(), key, attempt, error = %e, "store put failed, retrying");
                    let backoff_ms = 100 * 2u64.pow(attempt - 1);
                    tokio::time::sleep(std::time::Duration::from_millis(backoff_ms)).await;
                }
            }
        }
    }
}

#[async_trait]
impl StoreGateway for HttpStoreGateway {
    #[instrument(skip(self, item), name = "store::put")]
    async fn put(&self, table: Table, key: &str, item: Value) -> StoreOutcome<()> {
        self.put_with_retry(table, key, &item).await
    }

    #[instrument(skip(self), name = "store::get")]
    async fn get(&self, table: Table, key: &str) -> StoreOutcome<Option<Value>> {
        let url = self.url(table, &format!("/items/{key}"));
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status() == reqwest::StatusCode::NOT_FOUND => {
                StoreOutcome::Ok(None)
            }
            Ok(resp) if resp.status().is_success() => match resp.json::<Value>().await {
                Ok(v) => StoreOutcome::Ok(Some(v)),
                Err(e) => StoreOutcome::RetryableError(format!("failed to parse response: {e}")),
            },
            Ok(resp) if resp.status().is_server_error() => {
                StoreOutcome::RetryableError(format!("server error: {}", resp.status()))
            }
            Ok(resp) => StoreOutcome::FatalError(format!("unexpected status: {}", resp.status())),
            Err(e) => StoreOutcome::RetryableError(e.to_string()),
        }
    }

    #[instrument(skip(self), name = "store::delete")]
    async fn delete(&self, table: Table, key: &str) -> StoreOutcome<()> {
        let url = self.url(table, &format!("/items/{key}"));
        match self.client.delete(&url).send().await {
            Ok(resp) if resp.status().is_success() || resp.status() == reqwest::StatusCode::NOT_FOUND => {
                StoreOutcome::Ok(())
            }
            Ok(resp) if resp.status().is_server_error() => {
                StoreOutcome::RetryableError(format!("server error: {}", resp.status()))
            }
            Ok(resp) => StoreOutcome::FatalError(format!("unexpected status: {}", resp.status())),
            Err(e) => StoreOutcome::RetryableError(e.to_string()),
        }
    }

    #[instrument(skip(self, patch), name = "store::update")]
    async fn update(&self, table: Table, key: &str, patch: Value) -> StoreOutcome<()> {
        let coerced = coerce_floats_to_decimal(patch);
        let url = self.url(table, &format!("/items/{key}"));
        match self.client.patch(&url).json(&coerced).send().await {
            Ok(resp) if resp.status().is_success() => StoreOutcome::Ok(()),
            Ok(resp) if resp.status().is_server_error() => {
                StoreOutcome::RetryableError(format!("server error: {}", resp.status()))
            }
            Ok(resp) => StoreOutcome::FatalError(format!("unexpected status: {}", resp.status())),
            Err(e) => StoreOutcome::RetryableError(e.to_string()),
        }
    }

    #[instrument(skip(self), name = "store::query")]
    async fn query(&self, table: Table, partition_key: &str) -> StoreOutcome<Vec<Value>> {
        let url = self.url(table, &format!("/query?pk={partition_key}"));
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.json::<Vec<Value>>().await {
                Ok(items) => StoreOutcome::Ok(items),
                Err(e) => StoreOutcome::RetryableError(format!("failed to parse response: {e}")),
            },
            Ok(resp) if resp.status().is_server_error() => {
                StoreOutcome::RetryableError(format!("server error: {}", resp.status()))
            }
            Ok(resp) => StoreOutcome::FatalError(format!("unexpected status: {}", resp.status())),
            Err(e) => StoreOutcome::RetryableError(e.to_string()),
        }
    }

    #[instrument(skip(self), name = "store::scan")]
    async fn scan(&self, table: Table) -> StoreOutcome<Vec<Value>> {
        let url = self.url(table, "/scan");
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.json::<Vec<Value>>().await {
                Ok(items) => StoreOutcome::Ok(items),
                Err(e) => StoreOutcome::RetryableError(format!("failed to parse response: {e}")),
            },
            Ok(resp) if resp.status().is_server_error() => {
                StoreOutcome::RetryableError(format!("server error: {}", resp.status()))
            }
            Ok(resp) => StoreOutcome::FatalError(format!("unexpected status: {}", resp.status())),
            Err(e) => StoreOutcome::RetryableError(e.to_string()),
        }
    }

    /// Chunked batch write: splits into groups of 25 (§4.1), retries each
    /// chunk up to `MAX_ATTEMPTS` times with exponential backoff. A failed
    /// chunk does not prevent already-succeeded chunks from landing.
    #[instrument(skip(self, items), fields(count = items.len()), name = "store::batch_put")]
    async fn batch_put(&self, table: Table, items: Vec<(String, Value)>) -> StoreOutcome<()> {
        for chunk in items.chunks(BATCH_CHUNK_SIZE) {
            for (key, item) in chunk {
                match self.put_with_retry(table, key, item).await {
                    StoreOutcome::Ok(()) => {}
                    other => return other,
                }
            }
        }
        StoreOutcome::Ok(())
    }
}

impl std::fmt::Debug for HttpStoreGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStoreGateway")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_url_includes_table_name() {
        let gw = HttpStoreGateway::new("http://localhost:8080");
        assert_eq!(
            gw.url(Table::MABForDayTradingService, "/items/x"),
            "http://localhost:8080/tables/MABForDayTradingService/items/x"
        );
    }
}
