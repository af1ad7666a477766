// =============================================================================
// Market-Data Adapter (C2)
// =============================================================================
//
// HTTP client shaped like `BinanceClient` (single `reqwest::Client`,
// `#[instrument]` per call, redacted `Debug`), but speaking the Alpaca-style
// bars/quotes/clock endpoints named in §6 rather than Binance's. Batch
// fetching is the one operation with real control flow — see
// `fetch_tech_snapshots` below.
// =============================================================================

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::indicators::snapshot::build_snapshot;
use crate::market_data::cache::SnapshotCache;
use crate::memory_governor::MemoryGovernor;
use crate::types::{Bar, Quote, TechnicalSnapshot};

/// Cap on distinct tickers considered in a single entry-cycle batch (§4.2).
pub const MAX_TICKERS_PER_CYCLE: usize = 25;

/// Three screener buckets returned by the provider's screener endpoint (§6).
#[derive(Debug, Clone, Default)]
pub struct ScreenerResult {
    pub most_active: Vec<String>,
    pub gainers: Vec<String>,
    pub losers: Vec<String>,
}

impl ScreenerResult {
    /// Flattened, deduplicated universe across all three buckets.
    pub fn universe(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for t in self
            .most_active
            .iter()
            .chain(self.gainers.iter())
            .chain(self.losers.iter())
        {
            if seen.insert(t.clone()) {
                out.push(t.clone());
            }
        }
        out
    }
}

/// Outcome of `fetch_tech_snapshots`: successes plus whatever failed or was
/// never attempted because of a memory abort (§4.2, scenario 6).
#[derive(Debug, Default)]
pub struct SnapshotBatch {
    pub snapshots: HashMap<String, TechnicalSnapshot>,
    pub failed_tickers: Vec<String>,
    pub aborted: bool,
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn is_market_open(&self) -> bool;
    async fn quote(&self, ticker: &str) -> Option<Quote>;
    async fn bars(&self, ticker: &str, limit: usize) -> Vec<Bar>;
    async fn screener(&self) -> ScreenerResult;

    /// Minutes remaining until the next market close, per the clock
    /// endpoint's `next_close` (§6). `None` when the market is closed or the
    /// clock request fails — callers treat that as "EOD closure doesn't
    /// apply right now" rather than as an error (§4.6 rule 3, §7).
    async fn minutes_to_close(&self) -> Option<f64>;

    /// Batched tech-snapshot fetch with memory-aware sub-batching (§4.2).
    async fn fetch_tech_snapshots(
        &self,
        tickers: &[String],
        max_concurrent: usize,
        governor: &MemoryGovernor,
        cache: &SnapshotCache,
    ) -> SnapshotBatch;
}

#[derive(Deserialize)]
struct ClockResponse {
    is_open: bool,
    next_close: Option<chrono::DateTime<Utc>>,
}

#[derive(Deserialize)]
struct RawBar {
    t: i64,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
}

#[derive(Deserialize)]
struct BarsResponse {
    bars: HashMap<String, Vec<RawBar>>,
}

#[derive(Deserialize)]
struct RawQuote {
    bp: f64,
    ap: f64,
}

#[derive(Deserialize)]
struct QuoteEnvelope {
    quote: QuoteInner,
}

#[derive(Deserialize)]
struct QuoteInner {
    quotes: HashMap<String, RawQuote>,
}

#[derive(Deserialize, Default)]
struct ScreenerResponse {
    #[serde(default)]
    most_actives: Vec<String>,
    #[serde(default)]
    gainers: Vec<String>,
    #[serde(default)]
    losers: Vec<String>,
}

#[derive(Clone)]
pub struct HttpMarketDataProvider {
    base_url: String,
    client: reqwest::Client,
}

impl HttpMarketDataProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        Self {
            base_url: base_url.into(),
            client,
        }
    }

    async fn fetch_one_snapshot(&self, ticker: &str) -> Option<TechnicalSnapshot> {
        let bars = self.bars(ticker, 100).await;
        if bars.is_empty() {
            return None;
        }
        Some(build_snapshot(&bars))
    }
}

#[async_trait]
impl MarketDataProvider for HttpMarketDataProvider {
    #[instrument(skip(self), name = "market_data::is_market_open")]
    async fn is_market_open(&self) -> bool {
        let url = format!("{}/v2/clock", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => resp
                .json::<ClockResponse>()
                .await
                .map(|c| c.is_open)
                .unwrap_or(false),
            Ok(resp) => {
                warn!(status = %resp.status(), "market clock returned non-success status");
                false
            }
            Err(e) => {
                warn!(error = %e, "market clock request failed");
                false
            }
        }
    }

    #[instrument(skip(self), name = "market_data::minutes_to_close")]
    async fn minutes_to_close(&self) -> Option<f64> {
        let url = format!("{}/v2/clock", self.base_url);
        let resp = self.client.get(&url).send().await.ok()?;
        if !resp.status().is_success() {
            return None;
        }
        let clock: ClockResponse = resp.json().await.ok()?;
        let next_close = clock.next_close?;
        let minutes = (next_close - Utc::now()).num_seconds() as f64 / 60.0;
        Some(minutes.max(0.0))
    }

    #[instrument(skip(self), name = "market_data::quote")]
    async fn quote(&self, ticker: &str) -> Option<Quote> {
        let url = format!("{}/v2/stocks/quotes/latest?symbols={}", self.base_url, ticker);
        let resp = self.client.get(&url).send().await.ok()?;
        if !resp.status().is_success() {
            return None;
        }
        let envelope: QuoteEnvelope = resp.json().await.ok()?;
        let raw = envelope.quote.quotes.get(ticker)?;
        let quote = Quote {
            bid: raw.bp,
            ask: raw.ap,
        };
        quote.is_valid().then_some(quote)
    }

    #[instrument(skip(self), name = "market_data::bars")]
    async fn bars(&self, ticker: &str, limit: usize) -> Vec<Bar> {
        let url = format!(
            "{}/v2/stocks/bars?symbols={}&timeframe=1Min&limit={}&adjustment=raw&feed=sip&sort=asc",
            self.base_url, ticker, limit
        );

        let resp = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(ticker, error = %e, "bars request failed");
                return Vec::new();
            }
        };

        // 422 means no data for this symbol/day — treated as absent, not an
        // error (§6, §7).
        if resp.status() == reqwest::StatusCode::UNPROCESSABLE_ENTITY {
            return Vec::new();
        }
        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            debug!(ticker, "rate limited on bars fetch, backing off");
            tokio::time::sleep(Duration::from_secs(5)).await;
            return Vec::new();
        }
        if !resp.status().is_success() {
            warn!(ticker, status = %resp.status(), "bars request returned error status");
            return Vec::new();
        }

        let body: BarsResponse = match resp.json().await {
            Ok(b) => b,
            Err(e) => {
                warn!(ticker, error = %e, "failed to parse bars response");
                return Vec::new();
            }
        };

        body.bars
            .get(ticker)
            .map(|raw_bars| {
                raw_bars
                    .iter()
                    .map(|b| Bar {
                        timestamp: b.t,
                        open: b.o,
                        high: b.h,
                        low: b.l,
                        close: b.c,
                        volume: b.v,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    #[instrument(skip(self), name = "market_data::screener")]
    async fn screener(&self) -> ScreenerResult {
        let url = format!("{}/v1/screener/stocks/movers", self.base_url);
        let resp = match self.client.get(&url).send().await {
            Ok(r) if r.status().is_success() => r,
            _ => return ScreenerResult::default(),
        };
        let body: ScreenerResponse = resp.json().await.unwrap_or_default();
        ScreenerResult {
            most_active: body.most_actives,
            gainers: body.gainers,
            losers: body.losers,
        }
    }

    #[instrument(skip(self, cache), fields(requested = tickers.len()), name = "market_data::fetch_tech_snapshots")]
    async fn fetch_tech_snapshots(
        &self,
        tickers: &[String],
        max_concurrent: usize,
        governor: &MemoryGovernor,
        cache: &SnapshotCache,
    ) -> SnapshotBatch {
        let mut seen = std::collections::HashSet::new();
        let deduped: Vec<String> = tickers
            .iter()
            .filter(|t| seen.insert((*t).clone()))
            .take(MAX_TICKERS_PER_CYCLE)
            .cloned()
            .collect();

        let mut batch = SnapshotBatch::default();

        if governor.should_abort_fetch() {
            governor.force_reclamation_pass();
            if governor.should_abort_fetch() {
                warn!("memory abort threshold crossed before batch start, returning empty batch");
                batch.aborted = true;
                return batch;
            }
        }

        let max_concurrent = max_concurrent.max(1);
        for (i, sub_batch) in deduped.chunks(max_concurrent).enumerate() {
            if i > 0 {
                if governor.should_pause_fetch() {
                    governor.force_reclamation_pass();
                }
                if governor.should_abort_fetch() {
                    warn!(
                        completed_sub_batches = i,
                        "memory abort threshold crossed mid-batch, returning partial results"
                    );
                    batch.aborted = true;
                    return batch;
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
            }

            let results: Vec<(String, Option<TechnicalSnapshot>)> = stream::iter(sub_batch.iter())
                .map(|ticker| async move {
                    if let Some(cached) = cache.get(ticker) {
                        return (ticker.clone(), Some(cached));
                    }
                    (ticker.clone(), self.fetch_one_snapshot(ticker).await)
                })
                .buffer_unordered(max_concurrent)
                .collect()
                .await;

            for (ticker, snapshot) in results {
                match snapshot {
                    Some(s) => {
                        cache.insert(ticker.clone(), s.clone());
                        batch.snapshots.insert(ticker, s);
                    }
                    None => batch.failed_tickers.push(ticker),
                }
            }
        }

        debug!(
            ok = batch.snapshots.len(),
            failed = batch.failed_tickers.len(),
            "tech snapshot batch complete"
        );
        batch
    }
}

impl std::fmt::Debug for HttpMarketDataProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMarketDataProvider")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screener_universe_dedupes() {
        let s = ScreenerResult {
            most_active: vec!["AAPL".into(), "TSLA".into()],
            gainers: vec!["TSLA".into(), "GME".into()],
            losers: vec!["AAPL".into()],
        };
        let universe = s.universe();
        assert_eq!(universe, vec!["AAPL", "TSLA", "GME"]);
    }
}
