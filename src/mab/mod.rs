// =============================================================================
// MAB Selector (C5) — Thompson Sampling over (indicator, ticker)
// =============================================================================
//
// Replaces the teacher's `ThompsonState::thompson_score` placeholder (which
// returned the Beta posterior mean) with an actual draw from
// `Beta(1+successes, 1+failures)` via `statrs`/`rand`, per §4.5.
//
// Statistics rows are durable: every read goes through an in-process cache
// backed by the Store Gateway's `MABForDayTradingService` table, and every
// mutation is written through before it lands in the cache, so successes,
// failures, and exclusions survive a restart instead of resetting with it.
// =============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::RwLock;
use rand::thread_rng;
use serde::{Deserialize, Serialize};
use statrs::distribution::Beta;
use tracing::debug;

use crate::store::tables::mab_stats_key;
use crate::store::{StoreGateway, Table};

/// Per-(indicator, ticker) posterior state (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MabStatistics {
    pub indicator: String,
    pub ticker: String,
    pub successes: u64,
    pub failures: u64,
    pub total: u64,
    pub last_updated: DateTime<Utc>,
    pub excluded_until: Option<DateTime<Utc>>,
}

impl MabStatistics {
    fn new(indicator: &str, ticker: &str) -> Self {
        Self {
            indicator: indicator.to_string(),
            ticker: ticker.to_string(),
            successes: 0,
            failures: 0,
            total: 0,
            last_updated: Utc::now(),
            excluded_until: None,
        }
    }

    pub fn is_excluded(&self, now: DateTime<Utc>) -> bool {
        self.excluded_until.is_some_and(|until| until > now)
    }

    fn alpha(&self) -> f64 {
        1.0 + self.successes as f64
    }

    fn beta_param(&self) -> f64 {
        1.0 + self.failures as f64
    }
}

/// A candidate considered by `select`, carrying enough signal to build a
/// rejection reason if it is not chosen (§4.5 rejection-reason policy).
pub struct Candidate {
    pub ticker: String,
    /// Positive momentum routes a rejection into `reason_long`; negative
    /// into `reason_short` — never both (§4.5).
    pub momentum: f64,
}

#[derive(Debug, Clone, Default)]
pub struct RejectionReason {
    pub reason_long: String,
    pub reason_short: String,
}

pub struct MabSelector {
    store: Arc<dyn StoreGateway>,
    cache: RwLock<HashMap<(String, String), MabStatistics>>,
}

impl MabSelector {
    pub fn new(store: Arc<dyn StoreGateway>) -> Self {
        Self {
            store,
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn key(indicator: &str, ticker: &str) -> (String, String) {
        (indicator.to_string(), ticker.to_string())
    }

    /// Fetch-or-synthesize step 1 of `select` (§4.5): cache hit first, then
    /// the Store Gateway, defaulting to a fresh zeroed row.
    async fn load_or_default(&self, indicator: &str, ticker: &str) -> MabStatistics {
        if let Some(cached) = self.cache.read().get(&Self::key(indicator, ticker)).cloned() {
            return cached;
        }
        let store_key = mab_stats_key(indicator, ticker);
        let stats = match self.store.get(Table::MABForDayTradingService, &store_key).await.ok() {
            Some(Some(value)) => serde_json::from_value(value).unwrap_or_else(|_| MabStatistics::new(indicator, ticker)),
            _ => MabStatistics::new(indicator, ticker),
        };
        self.cache.write().insert(Self::key(indicator, ticker), stats.clone());
        stats
    }

    /// Write a row through to the Store Gateway and refresh the cache.
    async fn persist(&self, stats: MabStatistics) {
        let store_key = mab_stats_key(&stats.indicator, &stats.ticker);
        let value = serde_json::to_value(&stats).unwrap_or_else(|_| serde_json::json!({}));
        let _ = self.store.put(Table::MABForDayTradingService, &store_key, value).await;
        self.cache
            .write()
            .insert(Self::key(&stats.indicator, &stats.ticker), stats);
    }

    /// Draw one Thompson Sampling sample and rank the top `k` unexcluded
    /// candidates, returning selections plus a rejection-reason map for
    /// everyone else (§4.5).
    pub async fn select(
        &self,
        indicator: &str,
        candidates: &[Candidate],
        k: usize,
    ) -> (Vec<String>, HashMap<String, RejectionReason>) {
        let now = Utc::now();
        let mut rng = thread_rng();

        let mut fetched: HashMap<String, MabStatistics> = HashMap::with_capacity(candidates.len());
        for c in candidates {
            let stats = self.load_or_default(indicator, &c.ticker).await;
            fetched.insert(c.ticker.clone(), stats);
        }

        let mut scored: Vec<(String, f64, bool)> = Vec::with_capacity(candidates.len());
        for c in candidates {
            let stats = &fetched[&c.ticker];
            if stats.is_excluded(now) {
                scored.push((c.ticker.clone(), f64::MIN, true));
                continue;
            }
            let sample = draw_beta_sample(stats.alpha(), stats.beta_param(), &mut rng);
            scored.push((c.ticker.clone(), sample, false));
        }

        let mut eligible: Vec<&(String, f64, bool)> = scored.iter().filter(|(_, _, excluded)| !excluded).collect();
        eligible.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let selected: Vec<String> = eligible.iter().take(k).map(|(t, _, _)| t.clone()).collect();
        let selected_set: std::collections::HashSet<&str> =
            selected.iter().map(|s| s.as_str()).collect();

        let mut reasons = HashMap::new();
        for c in candidates {
            if selected_set.contains(c.ticker.as_str()) {
                continue;
            }
            let stats = &fetched[&c.ticker];
            let reason_text = if stats.total == 0 && stats.excluded_until.is_none() {
                "explored by Thompson Sampling".to_string()
            } else {
                let mut text = format!(
                    "not selected: {} successes / {} failures",
                    stats.successes, stats.failures
                );
                if let Some(until) = stats.excluded_until {
                    if until > now {
                        text.push_str(&format!(", excluded until {until}"));
                    }
                }
                text
            };
            let mut reason = RejectionReason::default();
            if c.momentum >= 0.0 {
                reason.reason_long = reason_text;
            } else {
                reason.reason_short = reason_text;
            }
            reasons.insert(c.ticker.clone(), reason);
        }

        debug!(indicator, selected = selected.len(), "mab selection complete");
        (selected, reasons)
    }

    /// Increment successes/failures, bump total + last_updated; create the
    /// row if absent (§4.5).
    pub async fn record_outcome(&self, indicator: &str, ticker: &str, success: bool) {
        let mut stats = self.load_or_default(indicator, ticker).await;
        if success {
            stats.successes += 1;
        } else {
            stats.failures += 1;
        }
        stats.total = stats.successes + stats.failures;
        stats.last_updated = Utc::now();
        self.persist(stats).await;
    }

    /// Bench a ticker for `duration` (default 24h) (§4.5).
    pub async fn exclude(&self, indicator: &str, ticker: &str, duration: ChronoDuration) {
        let mut stats = self.load_or_default(indicator, ticker).await;
        stats.excluded_until = Some(Utc::now() + duration);
        self.persist(stats).await;
    }

    /// Remove `excluded_until` on every row matching `indicator`. Idempotent
    /// (§4.5). Scans the durable table rather than just the cache, so rows
    /// created by a process that has since restarted still get cleared.
    pub async fn reset_daily(&self, indicator: &str) {
        let rows = self
            .store
            .scan(Table::MABForDayTradingService)
            .await
            .ok()
            .unwrap_or_default();

        for value in rows {
            let Ok(mut stats) = serde_json::from_value::<MabStatistics>(value) else {
                continue;
            };
            if stats.indicator != indicator || stats.excluded_until.is_none() {
                continue;
            }
            stats.excluded_until = None;
            self.persist(stats).await;
        }

        let mut cache = self.cache.write();
        for ((ind, _), stats) in cache.iter_mut() {
            if ind == indicator {
                stats.excluded_until = None;
            }
        }
    }

    pub async fn get(&self, indicator: &str, ticker: &str) -> Option<MabStatistics> {
        if let Some(cached) = self.cache.read().get(&Self::key(indicator, ticker)).cloned() {
            return Some(cached);
        }
        let store_key = mab_stats_key(indicator, ticker);
        self.store
            .get(Table::MABForDayTradingService, &store_key)
            .await
            .ok()
            .flatten()
            .and_then(|v| serde_json::from_value(v).ok())
    }
}

/// Draw one sample from `Beta(alpha, beta)`. Falls back to the posterior
/// mean if the distribution cannot be constructed (degenerate parameters).
fn draw_beta_sample(alpha: f64, beta_param: f64, rng: &mut impl rand::Rng) -> f64 {
    use rand::distributions::Distribution;
    match Beta::new(alpha, beta_param) {
        Ok(dist) => dist.sample(rng),
        Err(_) => alpha / (alpha + beta_param),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap as StdHashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::error::StoreOutcome;

    use super::*;

    /// Minimal in-memory `StoreGateway` standing in for the HTTP-backed one
    /// in these tests — single key/value map keyed the same way the real
    /// tables are.
    #[derive(Default)]
    struct InMemoryStore {
        items: Mutex<StdHashMap<String, Value>>,
    }

    #[async_trait]
    impl StoreGateway for InMemoryStore {
        async fn put(&self, _table: Table, key: &str, item: Value) -> StoreOutcome<()> {
            self.items.lock().unwrap().insert(key.to_string(), item);
            StoreOutcome::Ok(())
        }

        async fn get(&self, _table: Table, key: &str) -> StoreOutcome<Option<Value>> {
            StoreOutcome::Ok(self.items.lock().unwrap().get(key).cloned())
        }

        async fn delete(&self, _table: Table, key: &str) -> StoreOutcome<()> {
            self.items.lock().unwrap().remove(key);
            StoreOutcome::Ok(())
        }

        async fn update(&self, table: Table, key: &str, patch: Value) -> StoreOutcome<()> {
            self.put(table, key, patch).await
        }

        async fn query(&self, _table: Table, _partition_key: &str) -> StoreOutcome<Vec<Value>> {
            StoreOutcome::Ok(self.items.lock().unwrap().values().cloned().collect())
        }

        async fn scan(&self, _table: Table) -> StoreOutcome<Vec<Value>> {
            StoreOutcome::Ok(self.items.lock().unwrap().values().cloned().collect())
        }

        async fn batch_put(&self, _table: Table, items: Vec<(String, Value)>) -> StoreOutcome<()> {
            let mut guard = self.items.lock().unwrap();
            for (key, item) in items {
                guard.insert(key, item);
            }
            StoreOutcome::Ok(())
        }
    }

    fn selector() -> MabSelector {
        MabSelector::new(Arc::new(InMemoryStore::default()))
    }

    #[tokio::test]
    async fn record_outcome_maintains_total_invariant() {
        let mab = selector();
        mab.record_outcome("momentum", "AAPL", true).await;
        mab.record_outcome("momentum", "AAPL", false).await;
        let stats = mab.get("momentum", "AAPL").await.unwrap();
        assert_eq!(stats.total, stats.successes + stats.failures);
        assert_eq!(stats.successes, 1);
        assert_eq!(stats.failures, 1);
    }

    #[tokio::test]
    async fn excluded_ticker_never_selected() {
        let mab = selector();
        mab.exclude("momentum", "BADCO", ChronoDuration::hours(24)).await;
        let candidates = vec![
            Candidate { ticker: "BADCO".to_string(), momentum: 3.0 },
            Candidate { ticker: "GOODCO".to_string(), momentum: 3.0 },
        ];
        let (selected, _) = mab.select("momentum", &candidates, 5).await;
        assert!(!selected.contains(&"BADCO".to_string()));
    }

    #[tokio::test]
    async fn select_respects_k_limit() {
        let mab = selector();
        let candidates: Vec<Candidate> = (0..10)
            .map(|i| Candidate { ticker: format!("T{i}"), momentum: 1.0 })
            .collect();
        let (selected, _) = mab.select("momentum", &candidates, 3).await;
        assert!(selected.len() <= 3);
    }

    #[tokio::test]
    async fn reset_daily_clears_exclusion() {
        let mab = selector();
        mab.exclude("momentum", "AAPL", ChronoDuration::hours(24)).await;
        mab.reset_daily("momentum").await;
        let stats = mab.get("momentum", "AAPL").await.unwrap();
        assert!(stats.excluded_until.is_none());
    }

    #[tokio::test]
    async fn rejection_reason_is_direction_specific() {
        let mab = selector();
        let candidates: Vec<Candidate> = (0..5)
            .map(|i| Candidate { ticker: format!("T{i}"), momentum: if i % 2 == 0 { 2.0 } else { -2.0 } })
            .collect();
        let (_, reasons) = mab.select("momentum", &candidates, 0).await;
        for r in reasons.values() {
            assert!(r.reason_long.is_empty() || r.reason_short.is_empty());
        }
    }

    #[tokio::test]
    async fn stats_survive_a_fresh_selector_over_the_same_store() {
        let store: Arc<dyn StoreGateway> = Arc::new(InMemoryStore::default());
        let first = MabSelector::new(store.clone());
        first.record_outcome("momentum", "AAPL", true).await;

        let second = MabSelector::new(store);
        let stats = second.get("momentum", "AAPL").await.unwrap();
        assert_eq!(stats.successes, 1);
    }
}
