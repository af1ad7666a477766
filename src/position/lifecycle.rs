// =============================================================================
// Position Lifecycle (C7) — candidate -> open -> held -> exiting -> closed
// =============================================================================
//
// Shaped like the teacher's `PositionManager` (two `RwLock<Vec<_>>` lists,
// an explicit `open_position`/`close_position` API) but the state machine
// itself follows §4.7 rather than the teacher's TP1/TP2/trailing scheme.
// =============================================================================

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::exit::engine::ExitType;
use crate::time_util::{format_market_local, to_market_local};
use crate::types::{Direction, TechnicalSnapshot};

/// An open trade tracked by the engine (§3). Only `peak_price` and
/// `peak_profit_pct` mutate after open; everything else is immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivePosition {
    pub ticker: String,
    pub indicator: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub breakeven_price: f64,
    pub entry_time: DateTime<Utc>,
    pub peak_price: f64,
    pub atr_stop_pct: f64,
    pub spread_pct_at_entry: f64,
    pub dynamic_stop_pct: f64,
    pub trailing_stop_pct: f64,
    pub peak_profit_pct: f64,
    pub entry_tech_snapshot: TechnicalSnapshot,
    pub created_at: DateTime<Utc>,
}

impl ActivePosition {
    /// Breakeven-adjusted price: for longs `entry*(1+spread/100)`, mirrored
    /// for shorts (§4.6).
    fn compute_breakeven(entry_price: f64, spread_pct_at_entry: f64, direction: Direction) -> f64 {
        match direction {
            Direction::Long => entry_price * (1.0 + spread_pct_at_entry / 100.0),
            Direction::Short => entry_price * (1.0 - spread_pct_at_entry / 100.0),
        }
    }

    pub fn new(
        ticker: String,
        indicator: String,
        direction: Direction,
        entry_price: f64,
        spread_pct_at_entry: f64,
        atr_stop_pct: f64,
        entry_tech_snapshot: TechnicalSnapshot,
    ) -> Self {
        let now = Utc::now();
        let breakeven_price = Self::compute_breakeven(entry_price, spread_pct_at_entry, direction);
        Self {
            ticker,
            indicator,
            direction,
            entry_price,
            breakeven_price,
            entry_time: now,
            peak_price: entry_price,
            atr_stop_pct,
            spread_pct_at_entry,
            dynamic_stop_pct: atr_stop_pct,
            trailing_stop_pct: 0.0,
            peak_profit_pct: 0.0,
            entry_tech_snapshot,
            created_at: now,
        }
    }

    /// Profit percent of `price` against the breakeven price — the basis
    /// for every exit-engine comparison (§4.6).
    pub fn profit_vs_breakeven_pct(&self, price: f64) -> f64 {
        let sign = self.direction.sign();
        (price - self.breakeven_price) / self.breakeven_price * 100.0 * sign
    }

    pub fn profit_vs_entry_pct(&self, price: f64) -> f64 {
        let sign = self.direction.sign();
        (price - self.entry_price) / self.entry_price * 100.0 * sign
    }

    /// Update `peak_price`/`peak_profit_pct` monotonically in the
    /// direction of the trade (§4.7 HELD tick).
    pub fn update_peak(&mut self, price: f64) {
        let improved = match self.direction {
            Direction::Long => price > self.peak_price,
            Direction::Short => price < self.peak_price,
        };
        if improved {
            self.peak_price = price;
        }
        let profit = self.profit_vs_breakeven_pct(self.peak_price);
        if profit > self.peak_profit_pct {
            self.peak_profit_pct = profit;
        }
    }

    pub fn holding_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.entry_time).num_seconds().max(0)
    }
}

/// Append-only record of a finished trade (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedTrade {
    pub ticker: String,
    pub indicator: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub exit_price: f64,
    pub enter_timestamp: String,
    pub exit_timestamp: String,
    pub profit_loss_dollars: f64,
    pub profit_loss_pct: f64,
    pub exit_reason: String,
    pub exit_type: ExitType,
    pub entry_tech_snapshot: TechnicalSnapshot,
    pub exit_tech_snapshot: TechnicalSnapshot,
    pub trade_date: String,
}

/// Thread-safe manager owning the active-position set, mirroring the
/// teacher's `PositionManager` shape.
pub struct PositionManager {
    active: RwLock<Vec<ActivePosition>>,
}

impl PositionManager {
    pub fn new() -> Self {
        Self {
            active: RwLock::new(Vec::new()),
        }
    }

    /// Enforces the uniqueness invariant: at most one Active Position per
    /// `(indicator, ticker)` (§3, §8).
    pub fn has_position(&self, indicator: &str, ticker: &str) -> bool {
        self.active
            .read()
            .iter()
            .any(|p| p.indicator == indicator && p.ticker == ticker)
    }

    /// `open()` — returns `false` (candidate discarded) if a position
    /// already exists for this `(indicator, ticker)` pair.
    pub fn open_position(&self, position: ActivePosition) -> bool {
        let mut active = self.active.write();
        if active
            .iter()
            .any(|p| p.indicator == position.indicator && p.ticker == position.ticker)
        {
            warn!(
                ticker = %position.ticker,
                indicator = %position.indicator,
                "refusing to open duplicate position"
            );
            return false;
        }
        info!(ticker = %position.ticker, indicator = %position.indicator, direction = %position.direction, "position opened");
        active.push(position);
        true
    }

    pub fn positions_for(&self, indicator: &str) -> Vec<ActivePosition> {
        self.active
            .read()
            .iter()
            .filter(|p| p.indicator == indicator)
            .cloned()
            .collect()
    }

    pub fn update_peak(&self, indicator: &str, ticker: &str, price: f64) {
        let mut active = self.active.write();
        if let Some(p) = active
            .iter_mut()
            .find(|p| p.indicator == indicator && p.ticker == ticker)
        {
            p.update_peak(price);
        }
    }

    /// `exit()` — removes the position and computes the Completed Trade.
    /// `position_dollars` yields `shares = position_dollars / entry_price`
    /// per §4.7.
    pub fn close_position(
        &self,
        indicator: &str,
        ticker: &str,
        exit_price: f64,
        exit_reason: String,
        exit_type: ExitType,
        position_dollars: f64,
        exit_tech_snapshot: TechnicalSnapshot,
    ) -> Option<CompletedTrade> {
        let mut active = self.active.write();
        let idx = active
            .iter()
            .position(|p| p.indicator == indicator && p.ticker == ticker)?;
        let position = active.remove(idx);
        drop(active);

        let shares = position_dollars / position.entry_price;
        let profit_loss_dollars = match position.direction {
            Direction::Long => (exit_price - position.entry_price) * shares,
            Direction::Short => (position.entry_price - exit_price) * shares,
        };
        let profit_loss_pct = position.profit_vs_entry_pct(exit_price);

        let now = Utc::now();
        let enter_local = to_market_local(position.entry_time);
        let exit_local = to_market_local(now);

        info!(
            ticker,
            indicator,
            profit_loss_dollars,
            profit_loss_pct,
            reason = %exit_reason,
            "position closed"
        );

        Some(CompletedTrade {
            ticker: ticker.to_string(),
            indicator: indicator.to_string(),
            direction: position.direction,
            entry_price: position.entry_price,
            exit_price,
            enter_timestamp: format_market_local(enter_local),
            exit_timestamp: format_market_local(exit_local),
            profit_loss_dollars,
            profit_loss_pct,
            exit_reason,
            exit_type,
            entry_tech_snapshot: position.entry_tech_snapshot,
            exit_tech_snapshot,
            trade_date: exit_local.format("%Y-%m-%d").to_string(),
        })
    }
}

impl Default for PositionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> TechnicalSnapshot {
        TechnicalSnapshot::default_for_close(10.0)
    }

    #[test]
    fn duplicate_open_is_rejected() {
        let manager = PositionManager::new();
        let p1 = ActivePosition::new(
            "AAPL".to_string(),
            "momentum".to_string(),
            Direction::Long,
            10.0,
            0.5,
            -1.5,
            snapshot(),
        );
        let p2 = ActivePosition::new(
            "AAPL".to_string(),
            "momentum".to_string(),
            Direction::Long,
            10.5,
            0.5,
            -1.5,
            snapshot(),
        );
        assert!(manager.open_position(p1));
        assert!(!manager.open_position(p2));
    }

    #[test]
    fn peak_tracks_favorable_direction_only() {
        let mut p = ActivePosition::new(
            "AAPL".to_string(),
            "momentum".to_string(),
            Direction::Long,
            10.0,
            0.0,
            -1.5,
            snapshot(),
        );
        p.update_peak(10.5);
        p.update_peak(10.2);
        assert_eq!(p.peak_price, 10.5);
    }

    #[test]
    fn close_computes_pnl_for_long() {
        let manager = PositionManager::new();
        let p = ActivePosition::new(
            "AAPL".to_string(),
            "momentum".to_string(),
            Direction::Long,
            10.0,
            0.0,
            -1.5,
            snapshot(),
        );
        manager.open_position(p);
        let trade = manager
            .close_position(
                "momentum",
                "AAPL",
                11.0,
                "trailing_stop".to_string(),
                ExitType::TrailingStop,
                1000.0,
                snapshot(),
            )
            .unwrap();
        assert!((trade.profit_loss_dollars - 100.0).abs() < 1e-6);
        assert!(trade.exit_timestamp >= trade.enter_timestamp);
    }
}
