// =============================================================================
// Validation rule chain (§4.4)
// =============================================================================
//
// Each rule is `(TechnicalSnapshot, Quote, [Bar]) -> RuleResult`. Symmetric
// rules populate both `reason_long` and `reason_short` identically on
// failure; asymmetric rules (trend direction, mean-reversion guard,
// continuation/peak) populate only the direction they reject.
// =============================================================================

use crate::strategy::config::StrategyConfig;
use crate::types::{Bar, Quote, TechnicalSnapshot, TrendMetrics};

/// Ticker suffixes that mark warrants/rights/units — excluded as a class
/// (§4.4 rule 2).
const EXCLUDED_SUFFIXES: &[&str] = &["W", "WS", "WT", "R", "RT", ".U", ".WS", ".RT"];

#[derive(Debug, Clone, Default)]
pub struct RuleResult {
    pub passed: bool,
    pub reason_long: String,
    pub reason_short: String,
}

impl RuleResult {
    pub fn pass() -> Self {
        Self {
            passed: true,
            reason_long: String::new(),
            reason_short: String::new(),
        }
    }

    /// Both directions rejected with the same reason.
    pub fn symmetric_fail(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            passed: false,
            reason_long: reason.clone(),
            reason_short: reason,
        }
    }

    pub fn fail_long(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason_long: reason.into(),
            reason_short: String::new(),
        }
    }

    pub fn fail_short(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason_long: String::new(),
            reason_short: reason.into(),
        }
    }
}

/// 1. Data Quality — required bar count present, non-null prices.
pub fn data_quality(bars: &[Bar], quote: &Quote, min_bars: usize) -> RuleResult {
    if bars.len() < min_bars {
        return RuleResult::symmetric_fail(format!(
            "Insufficient bar history: {} < {} required",
            bars.len(),
            min_bars
        ));
    }
    if !quote.is_valid() {
        return RuleResult::symmetric_fail("Invalid quote: bid/ask must both be positive");
    }
    RuleResult::pass()
}

/// 2. Security Type — reject warrant/right/unit suffixes.
pub fn security_type(ticker: &str) -> RuleResult {
    for suffix in EXCLUDED_SUFFIXES {
        if ticker.ends_with(suffix) {
            return RuleResult::symmetric_fail(format!(
                "Excluded security type: ticker suffix '{suffix}' (warrant/right/unit)"
            ));
        }
    }
    RuleResult::pass()
}

/// 3. Price Floor — reject if mid-price is below the configured minimum.
pub fn price_floor(quote: &Quote, min_price: f64) -> RuleResult {
    let mid = quote.mid();
    if mid < min_price {
        return RuleResult::symmetric_fail(format!(
            "Price too low: ${mid:.2} < ${min_price:.2} minimum (too risky)"
        ));
    }
    RuleResult::pass()
}

/// 4. Liquidity (Spread) — reject wide spreads.
pub fn spread(quote: &Quote, max_spread_pct: f64) -> RuleResult {
    let spread_pct = quote.spread_pct();
    if spread_pct > max_spread_pct {
        return RuleResult::symmetric_fail(format!(
            "Spread too wide: {spread_pct:.2}% > {max_spread_pct:.2}% maximum"
        ));
    }
    RuleResult::pass()
}

/// 5. Volume — absolute and relative (volume/SMA ratio) thresholds.
pub fn volume(
    snapshot: &TechnicalSnapshot,
    min_volume: f64,
    min_relative_volume: f64,
) -> RuleResult {
    if snapshot.volume < min_volume {
        return RuleResult::symmetric_fail(format!(
            "Volume too low: {:.0} < {:.0} minimum",
            snapshot.volume, min_volume
        ));
    }
    if snapshot.volume_sma > 0.0 {
        let relative = snapshot.volume / snapshot.volume_sma;
        if relative < min_relative_volume {
            return RuleResult::symmetric_fail(format!(
                "Relative volume too low: {relative:.2}x < {min_relative_volume:.2}x minimum"
            ));
        }
    }
    RuleResult::pass()
}

/// 6. Volatility — ATR-percent-of-price ceiling, stricter for low-priced
/// stocks.
pub fn volatility(
    snapshot: &TechnicalSnapshot,
    quote: &Quote,
    max_atr_pct: f64,
    max_atr_pct_low_priced: f64,
    low_priced_threshold: f64,
) -> RuleResult {
    let atr_pct = snapshot.atr_pct();
    let ceiling = if quote.mid() < low_priced_threshold {
        max_atr_pct_low_priced
    } else {
        max_atr_pct
    };
    if atr_pct > ceiling {
        return RuleResult::symmetric_fail(format!(
            "Volatility too high: ATR {atr_pct:.2}% > {ceiling:.2}% ceiling"
        ));
    }
    RuleResult::pass()
}

/// 7. Trend Direction / Momentum Band — asymmetric. `min_momentum_long` and
/// `max_momentum_short` are the configured momentum-band thresholds (§4.8);
/// the sign check alone only tells direction, not whether the move clears
/// the strategy's configured minimum size.
pub fn trend_direction(
    momentum: f64,
    snapshot: &TechnicalSnapshot,
    min_adx: f64,
    overbought_rsi: f64,
    oversold_rsi: f64,
    min_momentum_long: f64,
    max_momentum_short: f64,
) -> RuleResult {
    if momentum > 0.0 {
        if momentum < min_momentum_long {
            return RuleResult::fail_long(format!(
                "Momentum too weak for long: {momentum:.2}% < {min_momentum_long:.2}% minimum"
            ));
        }
        if snapshot.adx < min_adx {
            return RuleResult::fail_long(format!(
                "Weak trend for long: ADX {:.1} < {min_adx:.1} minimum",
                snapshot.adx
            ));
        }
        if snapshot.rsi > overbought_rsi {
            return RuleResult::fail_long(format!(
                "Overbought: RSI {:.1} > {overbought_rsi:.1}",
                snapshot.rsi
            ));
        }
    } else if momentum < 0.0 {
        if momentum > max_momentum_short {
            return RuleResult::fail_short(format!(
                "Momentum too weak for short: {momentum:.2}% > {max_momentum_short:.2}% maximum"
            ));
        }
        if snapshot.rsi < oversold_rsi {
            return RuleResult::fail_short(format!(
                "Oversold: RSI {:.1} < {oversold_rsi:.1}",
                snapshot.rsi
            ));
        }
    } else {
        return RuleResult::symmetric_fail("No momentum: flat price action");
    }
    RuleResult::pass()
}

/// 8. Mean-Reversion Guard — asymmetric: reject long near the top of the
/// Bollinger band, short near the bottom.
pub fn mean_reversion_guard(
    momentum: f64,
    snapshot: &TechnicalSnapshot,
    band_edge_pct: f64,
) -> RuleResult {
    let width = snapshot.bollinger_upper - snapshot.bollinger_lower;
    if width <= 0.0 {
        return RuleResult::pass();
    }
    let position_in_band = (snapshot.close - snapshot.bollinger_lower) / width * 100.0;

    if momentum > 0.0 && position_in_band >= 100.0 - band_edge_pct {
        return RuleResult::fail_long(format!(
            "Mean-reversion risk: price at {position_in_band:.1}% of band (top {band_edge_pct:.0}%)"
        ));
    }
    if momentum < 0.0 && position_in_band <= band_edge_pct {
        return RuleResult::fail_short(format!(
            "Mean-reversion risk: price at {position_in_band:.1}% of band (bottom {band_edge_pct:.0}%)"
        ));
    }
    RuleResult::pass()
}

/// 9. Continuation & Peak Proximity — simplified/penny pipeline path.
pub fn continuation_and_peak_proximity(
    momentum: f64,
    metrics: &TrendMetrics,
    close: f64,
    min_continuation_score: f64,
    max_peak_proximity: f64,
) -> RuleResult {
    if metrics.continuation_score < min_continuation_score {
        return RuleResult::symmetric_fail(format!(
            "Weak continuation: score {:.2} < {min_continuation_score:.2} minimum",
            metrics.continuation_score
        ));
    }

    if momentum > 0.0 && metrics.peak_price > 0.0 {
        let proximity = close / metrics.peak_price;
        if proximity > max_peak_proximity {
            return RuleResult::fail_long(format!(
                "Too close to peak: {proximity:.3} > {max_peak_proximity:.3} threshold"
            ));
        }
    } else if momentum < 0.0 && metrics.bottom_price > 0.0 {
        let proximity = close / metrics.bottom_price;
        if proximity < (2.0 - max_peak_proximity) {
            return RuleResult::fail_short(format!(
                "Too close to bottom: {proximity:.3} below threshold"
            ));
        }
    }
    RuleResult::pass()
}

/// Helper shared by the pipeline: minimum bars required before any
/// indicator is trusted (feeds rule 1).
pub fn min_bars_required(_config: &StrategyConfig) -> usize {
    20
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(bid: f64, ask: f64) -> Quote {
        Quote { bid, ask }
    }

    #[test]
    fn price_floor_is_symmetric() {
        let q = quote(0.049, 0.051);
        let r = price_floor(&q, 0.10);
        assert!(!r.passed);
        assert_eq!(r.reason_long, r.reason_short);
        assert!(r.reason_long.contains("0.05"));
    }

    #[test]
    fn security_type_rejects_warrant_suffix() {
        let r = security_type("ABCW");
        assert!(!r.passed);
        assert_eq!(r.reason_long, r.reason_short);
    }

    #[test]
    fn trend_direction_rejects_only_long_on_weak_adx() {
        let snapshot = TechnicalSnapshot {
            adx: 10.0,
            ..TechnicalSnapshot::default_for_close(10.0)
        };
        let r = trend_direction(5.0, &snapshot, 20.0, 75.0, 25.0, 0.0, 0.0);
        assert!(!r.passed);
        assert!(!r.reason_long.is_empty());
        assert!(r.reason_short.is_empty());
    }

    #[test]
    fn mean_reversion_guard_rejects_only_short_at_band_bottom() {
        let snapshot = TechnicalSnapshot {
            close: 10.0,
            bollinger_upper: 20.0,
            bollinger_lower: 10.0,
            ..TechnicalSnapshot::default_for_close(10.0)
        };
        let r = mean_reversion_guard(-5.0, &snapshot, 10.0);
        assert!(!r.passed);
        assert!(r.reason_long.is_empty());
        assert!(!r.reason_short.is_empty());
    }
}
