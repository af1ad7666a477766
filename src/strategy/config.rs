// =============================================================================
// Strategy identity + per-indicator tunables (§4.8)
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::warn;

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => v.eq_ignore_ascii_case("true"),
        Err(_) => default,
    }
}

/// The set of indicator strategies the engine knows how to run. Each maps to
/// one `ENABLE_<STRATEGY>_INDICATOR` environment toggle (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Indicator {
    Momentum,
    PennyStocks,
}

impl Indicator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Momentum => "momentum",
            Self::PennyStocks => "penny_stocks",
        }
    }

    fn env_flag_name(self) -> &'static str {
        match self {
            Self::Momentum => "ENABLE_MOMENTUM_INDICATOR",
            Self::PennyStocks => "ENABLE_PENNY_STOCKS_INDICATOR",
        }
    }

    /// "Disabled by default unless env is explicit" (§9 Open Question 1):
    /// every indicator defaults to `false` and must be turned on explicitly.
    pub fn enabled_from_env(self) -> bool {
        env_bool(self.env_flag_name(), false)
    }
}

impl std::fmt::Display for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tunable thresholds for one strategy runner. Field names mirror the rule
/// names in §4.4/§4.6/§4.8 directly so the runner code reads like the spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub indicator: Indicator,

    // --- entry/exit cadence --------------------------------------------
    pub entry_tick_seconds: u64,
    pub exit_tick_seconds: u64,

    // --- validation thresholds (§4.4) -----------------------------------
    pub min_price: f64,
    pub max_spread_pct: f64,
    pub min_volume: f64,
    pub min_relative_volume: f64,
    pub max_atr_pct: f64,
    pub max_atr_pct_low_priced: f64,
    pub low_priced_threshold: f64,
    pub min_adx: f64,
    pub min_momentum_long: f64,
    pub max_momentum_short: f64,
    pub overbought_rsi: f64,
    pub oversold_rsi: f64,
    pub bollinger_band_edge_pct: f64,

    // simplified/penny pipeline (§4.3 trend metrics, §4.4 rule 9)
    pub min_continuation_score: f64,
    pub max_peak_proximity: f64,

    // --- position sizing / caps (§4.8) ----------------------------------
    pub position_dollars: f64,
    pub max_active_positions: usize,
    pub max_daily_trades: usize,

    // --- exit engine (§4.6) ---------------------------------------------
    pub emergency_stop_pct: f64,
    pub min_holding_seconds: u64,
    pub eod_minutes: u64,
    pub allow_hold_over_close: bool,
    pub trailing_activation_threshold_pct: f64,
    pub trailing_cooldown_seconds: u64,
    pub atr_stop_pct: f64,
    pub consecutive_checks_required: u32,
    pub max_holding_seconds: u64,

    // --- preemption / golden ticker (§4.8) -------------------------------
    pub preemption_profit_threshold_pct: f64,
    pub exceptional_momentum_threshold: f64,

    // --- MAB exclusion (§4.5) --------------------------------------------
    pub exclusion_duration_hours: i64,

    // --- losing-ticker benching (§4.8, penny strategy only) --------------
    pub bench_losers: bool,
}

impl StrategyConfig {
    /// Momentum strategy defaults — rich technical-indicator pipeline, wider
    /// stops, longer max-hold, per the teacher's "TRENDING" regime being the
    /// widest-stop regime in `triple_barrier.rs::regime_params`.
    pub fn momentum_defaults() -> Self {
        Self {
            indicator: Indicator::Momentum,
            entry_tick_seconds: 60,
            exit_tick_seconds: 15,
            min_price: 1.0,
            max_spread_pct: 1.0,
            min_volume: 500_000.0,
            min_relative_volume: 1.2,
            max_atr_pct: 8.0,
            max_atr_pct_low_priced: 5.0,
            low_priced_threshold: 5.0,
            min_adx: 20.0,
            min_momentum_long: 0.0,
            max_momentum_short: 0.0,
            overbought_rsi: 75.0,
            oversold_rsi: 25.0,
            bollinger_band_edge_pct: 10.0,
            min_continuation_score: 0.4,
            max_peak_proximity: 0.98,
            position_dollars: 2_000.0,
            max_active_positions: 5,
            max_daily_trades: 20,
            emergency_stop_pct: -3.0,
            min_holding_seconds: 60,
            eod_minutes: 15,
            allow_hold_over_close: false,
            trailing_activation_threshold_pct: 1.0,
            trailing_cooldown_seconds: 120,
            atr_stop_pct: -1.5,
            consecutive_checks_required: 2,
            max_holding_seconds: 60 * 60,
            preemption_profit_threshold_pct: 0.5,
            exceptional_momentum_threshold: 8.0,
            exclusion_duration_hours: 24,
            bench_losers: false,
        }
    }

    /// Penny-stock strategy defaults — simplified trend-metrics pipeline,
    /// tighter stops, shorter max-hold, losing-ticker benching enabled
    /// (§4.8 "Losing-ticker benching").
    pub fn penny_stocks_defaults() -> Self {
        Self {
            indicator: Indicator::PennyStocks,
            entry_tick_seconds: 45,
            exit_tick_seconds: 10,
            min_price: 0.10,
            max_spread_pct: 2.0,
            min_volume: 100_000.0,
            min_relative_volume: 1.5,
            max_atr_pct: 12.0,
            max_atr_pct_low_priced: 6.0,
            low_priced_threshold: 1.0,
            min_adx: 15.0,
            min_momentum_long: 0.0,
            max_momentum_short: 0.0,
            overbought_rsi: 80.0,
            oversold_rsi: 20.0,
            bollinger_band_edge_pct: 10.0,
            min_continuation_score: 0.5,
            max_peak_proximity: 0.97,
            position_dollars: 500.0,
            max_active_positions: 8,
            max_daily_trades: 40,
            emergency_stop_pct: -5.0,
            min_holding_seconds: 45,
            eod_minutes: 15,
            allow_hold_over_close: true,
            trailing_activation_threshold_pct: 1.0,
            trailing_cooldown_seconds: 180,
            atr_stop_pct: -2.0,
            consecutive_checks_required: 2,
            max_holding_seconds: 30 * 60,
            preemption_profit_threshold_pct: 0.5,
            exceptional_momentum_threshold: 8.0,
            exclusion_duration_hours: 24,
            bench_losers: true,
        }
    }

    /// Construct the default config for every indicator enabled via env
    /// (§9 Open Question 1: indicators are opt-in, never opt-out).
    pub fn enabled_from_env() -> Vec<Self> {
        let mut out = Vec::new();
        if Indicator::Momentum.enabled_from_env() {
            out.push(Self::momentum_defaults());
        } else {
            warn!(indicator = %Indicator::Momentum, "strategy disabled (ENABLE_MOMENTUM_INDICATOR not true)");
        }
        if Indicator::PennyStocks.enabled_from_env() {
            out.push(Self::penny_stocks_defaults());
        } else {
            warn!(indicator = %Indicator::PennyStocks, "strategy disabled (ENABLE_PENNY_STOCKS_INDICATOR not true)");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn momentum_and_penny_defaults_differ() {
        let m = StrategyConfig::momentum_defaults();
        let p = StrategyConfig::penny_stocks_defaults();
        assert!(m.min_price > p.min_price);
        assert!(p.bench_losers);
        assert!(!m.bench_losers);
        assert!(p.allow_hold_over_close);
        assert!(!m.allow_hold_over_close);
    }
}
