// =============================================================================
// Exit Decision Engine (C6) — priority-ordered exit chain
// =============================================================================
//
// Tier structure and progressive-tightening vocabulary (locked profit,
// trailing fraction, activation threshold) are grounded in the teacher's
// `BarrierConfig`/`regime_params` in `exit/triple_barrier.rs`, but the tiers
// themselves and their trigger order come from §4.6.
// =============================================================================

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::position::lifecycle::ActivePosition;
use crate::strategy::config::StrategyConfig;

/// Which rule in the priority chain produced an exit (§4.6). Recorded on the
/// Completed Trade for audit/analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitType {
    Emergency,
    EndOfDay,
    TrailingStop,
    AtrStop,
    MaxHoldingTime,
}

impl std::fmt::Display for ExitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Emergency => "emergency_stop",
            Self::EndOfDay => "end_of_day",
            Self::TrailingStop => "trailing_stop",
            Self::AtrStop => "atr_stop",
            Self::MaxHoldingTime => "max_holding_time",
        };
        write!(f, "{s}")
    }
}

/// A positive exit decision: what fired, and the human-readable reason
/// string that is later logged and published on the webhook (§4.6, §6).
#[derive(Debug, Clone)]
pub struct ExitDecision {
    pub exit_type: ExitType,
    pub reason: String,
}

/// One (locked_profit_pct, trail_pct) step in the trailing-stop tier table
/// (§4.6). Tiers are checked from the highest activation threshold down.
struct TrailingTier {
    activation_pct: f64,
    trail_pct: f64,
    locked_pct: f64,
}

const TRAILING_TIERS: [TrailingTier; 3] = [
    TrailingTier { activation_pct: 3.0, trail_pct: 1.5, locked_pct: 1.5 },
    TrailingTier { activation_pct: 2.0, trail_pct: 0.3, locked_pct: 0.0 },
    TrailingTier { activation_pct: 1.0, trail_pct: 0.5, locked_pct: 0.0 },
];

/// Evaluates the exit priority chain for open positions, maintaining the
/// per-ticker consecutive-ATR-check latch (§4.6 rule 5) across ticks.
pub struct ExitDecisionEngine {
    /// Keyed by `(indicator, ticker)`; cleared when a position closes or is
    /// excluded.
    atr_breach_counts: Mutex<HashMap<(String, String), u32>>,
    /// Keyed by `(indicator, ticker)`; gates the trailing-stop tier check
    /// for `trailing_cooldown_seconds` after the position is opened.
    trailing_cooldown_until: Mutex<HashMap<(String, String), DateTime<Utc>>>,
}

impl ExitDecisionEngine {
    pub fn new() -> Self {
        Self {
            atr_breach_counts: Mutex::new(HashMap::new()),
            trailing_cooldown_until: Mutex::new(HashMap::new()),
        }
    }

    fn key(indicator: &str, ticker: &str) -> (String, String) {
        (indicator.to_string(), ticker.to_string())
    }

    /// Start the post-entry trailing-stop cooldown window. Called by the
    /// strategy runner right after `PositionManager::open_position` succeeds.
    pub fn arm_trailing_cooldown(&self, indicator: &str, ticker: &str, config: &StrategyConfig) {
        let until = Utc::now() + chrono::Duration::seconds(config.trailing_cooldown_seconds as i64);
        self.trailing_cooldown_until
            .lock()
            .insert(Self::key(indicator, ticker), until);
    }

    /// Drop all per-ticker latch state for a closed or excluded position.
    pub fn clear(&self, indicator: &str, ticker: &str) {
        let key = Self::key(indicator, ticker);
        self.atr_breach_counts.lock().remove(&key);
        self.trailing_cooldown_until.lock().remove(&key);
    }

    /// Run the full priority chain once for `position` at `current_price`.
    /// `minutes_to_close` is `None` outside of normal market hours tracking.
    pub fn evaluate(
        &self,
        position: &ActivePosition,
        current_price: f64,
        minutes_to_close: Option<f64>,
        now: DateTime<Utc>,
        config: &StrategyConfig,
    ) -> Option<ExitDecision> {
        let profit_vs_breakeven = position.profit_vs_breakeven_pct(current_price);
        let holding_seconds = position.holding_seconds(now);

        // 1. Emergency exit — always allowed, even inside the min-holding window.
        if profit_vs_breakeven <= config.emergency_stop_pct {
            let spread_induced = profit_vs_breakeven.abs() <= position.spread_pct_at_entry * 1.5;
            let reason = if spread_induced {
                format!(
                    "emergency stop at {profit_vs_breakeven:.2}% (spread-induced, entry spread {:.2}%)",
                    position.spread_pct_at_entry
                )
            } else {
                format!("emergency stop at {profit_vs_breakeven:.2}%")
            };
            return Some(ExitDecision { exit_type: ExitType::Emergency, reason });
        }

        // 2. Holding-period gate — no further exits until the minimum hold elapses.
        if holding_seconds < config.min_holding_seconds as i64 {
            return None;
        }

        // 3. End-of-day closure.
        if let Some(minutes) = minutes_to_close {
            if minutes <= config.eod_minutes as f64 {
                let winning = profit_vs_breakeven > 0.0;
                if winning || !config.allow_hold_over_close {
                    return Some(ExitDecision {
                        exit_type: ExitType::EndOfDay,
                        reason: format!(
                            "end-of-day closure at {profit_vs_breakeven:.2}% with {minutes:.1}m to close"
                        ),
                    });
                }
            }
        }

        // 4. Tiered trailing stop.
        let cooldown_active = self
            .trailing_cooldown_until
            .lock()
            .get(&Self::key(&position.indicator, &position.ticker))
            .is_some_and(|until| *until > now);
        if !cooldown_active {
            if let Some(decision) =
                self.check_trailing_stop(position, current_price, profit_vs_breakeven, config)
            {
                return Some(decision);
            }
        }

        // 5. ATR-based stop with a consecutive-check latch.
        if let Some(decision) =
            self.check_atr_stop(position, profit_vs_breakeven, config)
        {
            return Some(decision);
        } else {
            // Reset the latch on any tick that does not satisfy the breach
            // condition, per §4.6 ("resets on a non-satisfying tick").
            self.atr_breach_counts
                .lock()
                .remove(&Self::key(&position.indicator, &position.ticker));
        }

        // 6. Max holding time cap.
        if holding_seconds >= config.max_holding_seconds as i64 {
            return Some(ExitDecision {
                exit_type: ExitType::MaxHoldingTime,
                reason: format!("max holding time of {}s reached", config.max_holding_seconds),
            });
        }

        None
    }

    fn check_trailing_stop(
        &self,
        position: &ActivePosition,
        current_price: f64,
        profit_vs_breakeven: f64,
        config: &StrategyConfig,
    ) -> Option<ExitDecision> {
        if position.peak_profit_pct < config.trailing_activation_threshold_pct {
            return None;
        }
        let tier = TRAILING_TIERS
            .iter()
            .find(|t| position.peak_profit_pct >= t.activation_pct)?;

        // Trigger price: retreat of `trail_pct` off the peak, mirrored for
        // shorts. A position also can't drop below `locked_pct` profit once
        // a tier has activated.
        let trigger_price = match position.direction {
            crate::types::Direction::Long => position.peak_price * (1.0 - tier.trail_pct / 100.0),
            crate::types::Direction::Short => position.peak_price * (1.0 + tier.trail_pct / 100.0),
        };
        let price_breached = match position.direction {
            crate::types::Direction::Long => current_price <= trigger_price,
            crate::types::Direction::Short => current_price >= trigger_price,
        };
        let triggered = price_breached || profit_vs_breakeven <= tier.locked_pct;

        if triggered {
            return Some(ExitDecision {
                exit_type: ExitType::TrailingStop,
                reason: format!(
                    "trailing stop: peak {:.2}%, locked {:.2}%, now {profit_vs_breakeven:.2}%",
                    position.peak_profit_pct, tier.locked_pct
                ),
            });
        }
        None
    }

    fn check_atr_stop(
        &self,
        position: &ActivePosition,
        profit_vs_breakeven: f64,
        config: &StrategyConfig,
    ) -> Option<ExitDecision> {
        let key = Self::key(&position.indicator, &position.ticker);
        let breached = profit_vs_breakeven <= config.atr_stop_pct;
        if !breached {
            return None;
        }
        let mut counts = self.atr_breach_counts.lock();
        let count = counts.entry(key).or_insert(0);
        *count += 1;
        if *count >= config.consecutive_checks_required {
            return Some(ExitDecision {
                exit_type: ExitType::AtrStop,
                reason: format!(
                    "ATR stop confirmed after {} consecutive checks at {profit_vs_breakeven:.2}%",
                    *count
                ),
            });
        }
        None
    }
}

impl Default for ExitDecisionEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, TechnicalSnapshot};

    fn position(entry: f64, direction: Direction) -> ActivePosition {
        ActivePosition::new(
            "AAPL".to_string(),
            "momentum".to_string(),
            direction,
            entry,
            0.1,
            -1.5,
            TechnicalSnapshot::default_for_close(entry),
        )
    }

    #[test]
    fn emergency_stop_fires_even_inside_min_holding_window() {
        let engine = ExitDecisionEngine::new();
        let config = StrategyConfig::momentum_defaults();
        let position = position(10.0, Direction::Long);
        let decision = engine
            .evaluate(&position, 9.5, None, Utc::now(), &config)
            .expect("emergency stop should fire");
        assert_eq!(decision.exit_type, ExitType::Emergency);
    }

    #[test]
    fn holding_period_gate_blocks_non_emergency_exits() {
        let engine = ExitDecisionEngine::new();
        let config = StrategyConfig::momentum_defaults();
        let position = position(10.0, Direction::Long);
        let decision = engine.evaluate(&position, 10.02, None, Utc::now(), &config);
        assert!(decision.is_none());
    }

    #[test]
    fn atr_stop_requires_consecutive_confirmations() {
        let engine = ExitDecisionEngine::new();
        let mut config = StrategyConfig::momentum_defaults();
        config.min_holding_seconds = 0;
        config.consecutive_checks_required = 2;
        let mut position = position(10.0, Direction::Long);
        position.entry_time = Utc::now() - chrono::Duration::seconds(120);

        let price = 10.0 * (1.0 + config.atr_stop_pct / 100.0) - 0.01;
        let first = engine.evaluate(&position, price, None, Utc::now(), &config);
        assert!(first.is_none());
        let second = engine
            .evaluate(&position, price, None, Utc::now(), &config)
            .expect("second breach should confirm the ATR stop");
        assert_eq!(second.exit_type, ExitType::AtrStop);
    }

    #[test]
    fn atr_latch_resets_on_non_breaching_tick() {
        let engine = ExitDecisionEngine::new();
        let mut config = StrategyConfig::momentum_defaults();
        config.min_holding_seconds = 0;
        config.trailing_activation_threshold_pct = 1000.0; // disable trailing for this test
        let mut position = position(10.0, Direction::Long);
        position.entry_time = Utc::now() - chrono::Duration::seconds(120);

        let breach_price = 10.0 * (1.0 + config.atr_stop_pct / 100.0) - 0.01;
        engine.evaluate(&position, breach_price, None, Utc::now(), &config);
        engine.evaluate(&position, 10.05, None, Utc::now(), &config);
        let decision = engine.evaluate(&position, breach_price, None, Utc::now(), &config);
        assert!(decision.is_none());
    }

    #[test]
    fn max_holding_time_fires_after_cap() {
        let engine = ExitDecisionEngine::new();
        let mut config = StrategyConfig::momentum_defaults();
        config.min_holding_seconds = 0;
        config.max_holding_seconds = 60;
        config.trailing_activation_threshold_pct = 1000.0;
        let mut position = position(10.0, Direction::Long);
        position.entry_time = Utc::now() - chrono::Duration::seconds(120);

        let decision = engine
            .evaluate(&position, 10.0, None, Utc::now(), &config)
            .expect("max holding time should fire");
        assert_eq!(decision.exit_type, ExitType::MaxHoldingTime);
    }
}
