// =============================================================================
// Strategy Runner (C8) — entry + exit loops per indicator (§4.8)
// =============================================================================

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;
use tracing::{error, info, instrument, warn};

use crate::exit::{ExitDecisionEngine, ExitType};
use crate::indicators::{build_snapshot, trend_metrics};
use crate::mab::{Candidate, MabSelector};
use crate::market_data::{MarketDataProvider, SnapshotCache};
use crate::memory_governor::MemoryGovernor;
use crate::position::{ActivePosition, PositionManager};
use crate::store::tables::{active_ticker_key, completed_trades_partition_key, inactive_ticker_sort_key};
use crate::store::{StoreGateway, Table};
use crate::strategy::config::StrategyConfig;
use crate::strategy::golden::is_golden;
use crate::time_util::today_market_date;
use crate::types::TechnicalSnapshot;
use crate::validation::{build_inactive_record, evaluate};
use crate::webhook::{Signal, SignalAction, WebhookClient};

/// Shared infrastructure every strategy runner draws on (§4.8, §4.9).
pub struct StrategyServices {
    pub store: Arc<dyn StoreGateway>,
    pub market_data: Arc<dyn MarketDataProvider>,
    pub mab: Arc<MabSelector>,
    pub positions: Arc<PositionManager>,
    pub exit_engine: Arc<ExitDecisionEngine>,
    pub webhook: Arc<WebhookClient>,
    pub cache: Arc<SnapshotCache>,
    pub memory_governor: Arc<MemoryGovernor>,
}

/// One indicator's runner: owns nothing but its config and a cooperative
/// cancellation flag; all state it mutates lives in `StrategyServices` or the
/// remote store.
pub struct StrategyRunner {
    config: StrategyConfig,
    services: Arc<StrategyServices>,
    running: Arc<AtomicBool>,
    /// Losing-ticker bench, in-memory, cleared at the next market-day reset
    /// (§4.8 "Losing-ticker benching", penny strategy only).
    benched: Mutex<HashSet<String>>,
    /// Market date of the last MAB reset, to make the once-per-day reset
    /// idempotent across ticks.
    last_reset_date: Mutex<String>,
}

impl StrategyRunner {
    pub fn new(config: StrategyConfig, services: Arc<StrategyServices>) -> Self {
        Self {
            config,
            services,
            running: Arc::new(AtomicBool::new(true)),
            benched: Mutex::new(HashSet::new()),
            last_reset_date: Mutex::new(String::new()),
        }
    }

    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Runs both loops concurrently until `running` is flipped false (§4.9).
    pub async fn run(self: Arc<Self>) {
        let entry = self.clone();
        let exit = self.clone();
        tokio::join!(entry.entry_loop(), exit.exit_loop());
    }

    fn indicator_name(&self) -> String {
        self.config.indicator.as_str().to_string()
    }

    // =========================================================================
    // Entry loop
    // =========================================================================

    #[instrument(skip(self), fields(indicator = %self.config.indicator))]
    async fn entry_loop(&self) {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(self.config.entry_tick_seconds));
        while self.running.load(Ordering::Relaxed) {
            interval.tick().await;
            if !self.running.load(Ordering::Relaxed) {
                break;
            }
            if let Err(e) = self.run_entry_tick().await {
                error!(error = %e, "entry tick failed");
            }
        }
    }

    async fn run_entry_tick(&self) -> anyhow::Result<()> {
        if !self.services.market_data.is_market_open().await {
            return Ok(());
        }

        self.maybe_reset_daily().await;

        let indicator = self.indicator_name();
        let today = today_market_date();

        let daily_trade_count = self.daily_trade_count(&today).await;
        let at_daily_cap = daily_trade_count >= self.config.max_daily_trades;

        self.services.cache.clear();

        let screener = self.services.market_data.screener().await;
        let universe = screener.universe();
        let candidates_universe: Vec<String> = universe
            .into_iter()
            .filter(|t| !self.services.positions.has_position(&indicator, t))
            .filter(|t| !self.benched.lock().contains(t))
            .collect();

        if candidates_universe.is_empty() {
            return Ok(());
        }

        let batch = self
            .services
            .market_data
            .fetch_tech_snapshots(
                &candidates_universe,
                self.services.memory_governor.configured_limits().max_concurrent_fetch,
                &self.services.memory_governor,
                &self.services.cache,
            )
            .await;
        if batch.aborted {
            warn!("entry tick skipped: memory abort threshold crossed during snapshot fetch");
        }

        let mut inactive_batch: Vec<(String, serde_json::Value)> = Vec::new();
        // Surviving candidates keyed by ticker, so later stages (MAB,
        // preemption, golden check) look each one up in O(1) instead of
        // re-scanning the evaluated set.
        let mut surviving: std::collections::HashMap<String, (TechnicalSnapshot, f64)> = std::collections::HashMap::new();
        let mut upward_candidates: Vec<Candidate> = Vec::new();
        let mut downward_candidates: Vec<Candidate> = Vec::new();

        for ticker in &candidates_universe {
            let Some(snapshot) = batch.snapshots.get(ticker) else {
                continue;
            };
            let Some(quote) = self.services.market_data.quote(ticker).await else {
                continue;
            };
            let bars = self.services.market_data.bars(ticker, 100).await;
            let metrics = trend_metrics(&bars);
            let momentum = self.momentum_for(snapshot, &metrics);

            let outcome = evaluate(ticker, snapshot, &quote, &bars, &metrics, momentum, &self.config);

            let timestamp = chrono::Utc::now().timestamp();
            if !outcome.is_valid_long() && !outcome.is_valid_short() {
                let record = build_inactive_record(
                    ticker,
                    &indicator,
                    timestamp,
                    outcome.reason_not_to_enter_long.clone(),
                    outcome.reason_not_to_enter_short.clone(),
                    snapshot.clone(),
                );
                let key = inactive_ticker_sort_key(timestamp);
                inactive_batch.push((key, serde_json::to_value(&record).unwrap_or(json!({}))));
                continue;
            }

            if momentum >= 0.0 && outcome.is_valid_long() {
                upward_candidates.push(Candidate { ticker: ticker.clone(), momentum });
            } else if momentum < 0.0 && outcome.is_valid_short() {
                downward_candidates.push(Candidate { ticker: ticker.clone(), momentum });
            } else {
                continue;
            }
            surviving.insert(ticker.clone(), (snapshot.clone(), momentum));
        }

        let k = self.config.max_active_positions;
        let (selected_up, rejected_up) = self.services.mab.select(&indicator, &upward_candidates, k).await;
        let (selected_down, rejected_down) = self.services.mab.select(&indicator, &downward_candidates, k).await;

        for (ticker, reason) in rejected_up.into_iter().chain(rejected_down) {
            if let Some((snapshot, _)) = surviving.get(&ticker) {
                let timestamp = chrono::Utc::now().timestamp();
                let record = build_inactive_record(
                    &ticker,
                    &indicator,
                    timestamp,
                    reason.reason_long,
                    reason.reason_short,
                    snapshot.clone(),
                );
                let key = inactive_ticker_sort_key(timestamp);
                inactive_batch.push((key, serde_json::to_value(&record).unwrap_or(json!({}))));
            }
        }

        for ticker in selected_up.into_iter().chain(selected_down) {
            let Some((snapshot, momentum)) = surviving.get(&ticker) else {
                continue;
            };
            let is_bypass_eligible = !at_daily_cap || is_golden(*momentum, snapshot, &self.config);
            if !is_bypass_eligible {
                continue;
            }
            self.try_open(&ticker, *momentum, snapshot).await;
        }

        if !inactive_batch.is_empty() {
            let outcome = self.services.store.batch_put(Table::InactiveTickersForDayTrading, inactive_batch).await;
            if !outcome.is_ok() {
                warn!("failed to persist inactive-ticker batch");
            }
        }

        Ok(())
    }

    /// Momentum used for routing/validation: ROC-based for Momentum, trend
    /// metrics' `momentum_score` for PennyStocks (simplified pipeline).
    fn momentum_for(&self, snapshot: &TechnicalSnapshot, metrics: &crate::types::TrendMetrics) -> f64 {
        use crate::strategy::config::Indicator;
        match self.config.indicator {
            Indicator::Momentum => snapshot.roc,
            Indicator::PennyStocks => metrics.momentum_score,
        }
    }

    async fn daily_trade_count(&self, today: &str) -> usize {
        let pk = completed_trades_partition_key(today);
        match self.services.store.query(Table::CompletedTradesForMarketData, &pk).await.ok() {
            Some(items) => items
                .iter()
                .filter(|v| v.get("indicator").and_then(|i| i.as_str()) == Some(self.config.indicator.as_str()))
                .count(),
            None => 0,
        }
    }

    /// Attempt to open a position for `ticker`, preempting the lowest-profit
    /// active position if at capacity and the candidate qualifies (§4.8 step 8).
    async fn try_open(&self, ticker: &str, momentum: f64, snapshot: &TechnicalSnapshot) {
        let indicator = self.indicator_name();

        let active = self.services.positions.positions_for(&indicator);
        if active.len() >= self.config.max_active_positions
            && !self.attempt_preemption(&active, momentum).await
        {
            return;
        }

        let Some(quote) = self.services.market_data.quote(ticker).await else {
            return;
        };
        if quote.spread_pct() > self.config.max_spread_pct {
            return;
        }

        let direction = if momentum >= 0.0 {
            crate::types::Direction::Long
        } else {
            crate::types::Direction::Short
        };
        // Opened at ask for longs, bid for shorts (§8 scenario 2) — breakeven
        // then layers the spread on top of the side actually paid/received.
        let entry_price = match direction {
            crate::types::Direction::Long => quote.ask,
            crate::types::Direction::Short => quote.bid,
        };
        let position = ActivePosition::new(
            ticker.to_string(),
            indicator.clone(),
            direction,
            entry_price,
            quote.spread_pct(),
            self.config.atr_stop_pct,
            snapshot.clone(),
        );

        if !self.services.positions.open_position(position) {
            return;
        }
        self.services.exit_engine.arm_trailing_cooldown(&indicator, ticker, &self.config);

        let key = active_ticker_key(&indicator, ticker);
        let _ = self
            .services
            .store
            .put(Table::ActiveTickersForAutomatedDayTrader, &key, json!({"ticker": ticker, "indicator": indicator}))
            .await;

        let action = if direction == crate::types::Direction::Long {
            SignalAction::BuyToOpen
        } else {
            SignalAction::SellToOpen
        };
        let reason = format!("momentum={momentum:.2}");
        self.services
            .webhook
            .send(&Signal {
                ticker,
                action,
                indicator: &indicator,
                reason: &reason,
                enter_price: Some(entry_price),
                exit_price: None,
                profit_loss: None,
                technical_indicators: snapshot,
            })
            .await;

        info!(ticker, indicator = %indicator, direction = %direction, "position opened");
    }

    /// Preempt the lowest-profit active position whose profit clears the
    /// configured threshold, only if the candidate's momentum is exceptional
    /// (§4.8 step 8). Returns `true` if a slot was freed.
    async fn attempt_preemption(&self, active: &[ActivePosition], candidate_momentum: f64) -> bool {
        if candidate_momentum.abs() < self.config.exceptional_momentum_threshold {
            return false;
        }
        let now = chrono::Utc::now();
        let mut eligible: Vec<&ActivePosition> = active
            .iter()
            .filter(|p| {
                let current_profit = p.peak_profit_pct;
                current_profit >= self.config.preemption_profit_threshold_pct && p.holding_seconds(now) > 0
            })
            .collect();
        eligible.sort_by(|a, b| a.peak_profit_pct.partial_cmp(&b.peak_profit_pct).unwrap_or(std::cmp::Ordering::Equal));

        let Some(victim) = eligible.first() else {
            return false;
        };

        let indicator = victim.indicator.clone();
        let ticker = victim.ticker.clone();
        let profit = victim.peak_profit_pct;
        let Some(quote) = self.services.market_data.quote(&ticker).await else {
            return false;
        };
        let reason = format!("Preempted for exceptional trade: {profit:.2}% profit");
        self.close_position(&indicator, &ticker, quote.mid(), reason, ExitType::MaxHoldingTime)
            .await;
        true
    }

    // =========================================================================
    // Exit loop
    // =========================================================================

    #[instrument(skip(self), fields(indicator = %self.config.indicator))]
    async fn exit_loop(&self) {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(self.config.exit_tick_seconds));
        while self.running.load(Ordering::Relaxed) {
            interval.tick().await;
            if !self.running.load(Ordering::Relaxed) {
                break;
            }
            if let Err(e) = self.run_exit_tick().await {
                error!(error = %e, "exit tick failed");
            }
        }
    }

    async fn run_exit_tick(&self) -> anyhow::Result<()> {
        if !self.services.market_data.is_market_open().await {
            return Ok(());
        }
        let indicator = self.indicator_name();
        let active = self.services.positions.positions_for(&indicator);

        for position in active {
            let Some(quote) = self.services.market_data.quote(&position.ticker).await else {
                continue;
            };
            let price = quote.mid();
            self.services.positions.update_peak(&indicator, &position.ticker, price);

            let minutes_to_close = self.services.market_data.minutes_to_close().await;
            let now = chrono::Utc::now();
            let decision = self.services.exit_engine.evaluate(&position, price, minutes_to_close, now, &self.config);

            if let Some(decision) = decision {
                self.close_position(&indicator, &position.ticker, price, decision.reason, decision.exit_type).await;
            }
        }

        Ok(())
    }

    async fn close_position(
        &self,
        indicator: &str,
        ticker: &str,
        exit_price: f64,
        reason: String,
        exit_type: ExitType,
    ) {
        let bars = self.services.market_data.bars(ticker, 100).await;
        let exit_snapshot = build_snapshot(&bars);

        let Some(trade) = self.services.positions.close_position(
            indicator,
            ticker,
            exit_price,
            reason.clone(),
            exit_type,
            self.config.position_dollars,
            exit_snapshot.clone(),
        ) else {
            return;
        };

        self.services.exit_engine.clear(indicator, ticker);

        let success = trade.profit_loss_dollars > 0.0;
        self.services.mab.record_outcome(indicator, ticker, success).await;

        if !success && self.config.bench_losers {
            self.benched.lock().insert(ticker.to_string());
            self.services
                .mab
                .exclude(indicator, ticker, chrono::Duration::hours(self.config.exclusion_duration_hours))
                .await;
        }

        let key = active_ticker_key(indicator, ticker);
        let _ = self.services.store.delete(Table::ActiveTickersForAutomatedDayTrader, &key).await;

        let pk = completed_trades_partition_key(&trade.trade_date);
        let trade_key = format!("{pk}#{ticker}#{indicator}");
        let _ = self
            .services
            .store
            .put(Table::CompletedTradesForMarketData, &trade_key, serde_json::to_value(&trade).unwrap_or(json!({})))
            .await;

        let action = if trade.direction == crate::types::Direction::Long {
            SignalAction::SellToClose
        } else {
            SignalAction::BuyToClose
        };
        self.services
            .webhook
            .send(&Signal {
                ticker,
                action,
                indicator,
                reason: &reason,
                enter_price: Some(trade.entry_price),
                exit_price: Some(trade.exit_price),
                profit_loss: Some(trade.profit_loss_dollars),
                technical_indicators: &exit_snapshot,
            })
            .await;

        info!(
            ticker,
            indicator,
            pnl = trade.profit_loss_dollars,
            exit_type = %exit_type,
            "position closed"
        );
    }

    /// Once-per-market-day MAB reset (§4.8 entry loop step 1).
    async fn maybe_reset_daily(&self) {
        let today = today_market_date();
        let needs_reset = {
            let mut last = self.last_reset_date.lock();
            let needs_reset = *last != today;
            *last = today;
            needs_reset
        };
        if needs_reset {
            self.services.mab.reset_daily(&self.indicator_name()).await;
            self.benched.lock().clear();
        }
    }
}
