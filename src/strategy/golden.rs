// =============================================================================
// Golden-ticker qualification (§4.8)
// =============================================================================
//
// A golden candidate bypasses the daily-trade cap but not the active-position
// cap — it still has to win a slot via preemption like any other entry.
// =============================================================================

use crate::strategy::config::StrategyConfig;
use crate::types::TechnicalSnapshot;

/// Stricter ADX/RSI/Bollinger checks than the ordinary trend-direction rule,
/// gating which exceptional-momentum candidates earn the daily-cap bypass.
pub fn is_golden(momentum: f64, snapshot: &TechnicalSnapshot, config: &StrategyConfig) -> bool {
    if momentum.abs() < config.exceptional_momentum_threshold {
        return false;
    }

    // Stricter trend confirmation: require a stronger ADX than the ordinary
    // entry bar, and keep RSI away from both extremes so the move isn't
    // already exhausted.
    let strict_min_adx = config.min_adx * 1.5;
    if snapshot.adx < strict_min_adx {
        return false;
    }

    let width = snapshot.bollinger_upper - snapshot.bollinger_lower;
    if width > 0.0 {
        let position_in_band = (snapshot.close - snapshot.bollinger_lower) / width * 100.0;
        if momentum > 0.0 && position_in_band >= 100.0 - config.bollinger_band_edge_pct / 2.0 {
            return false;
        }
        if momentum < 0.0 && position_in_band <= config.bollinger_band_edge_pct / 2.0 {
            return false;
        }
    }

    if momentum > 0.0 && snapshot.rsi > config.overbought_rsi {
        return false;
    }
    if momentum < 0.0 && snapshot.rsi < config.oversold_rsi {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(close: f64, adx: f64, rsi: f64) -> TechnicalSnapshot {
        TechnicalSnapshot {
            adx,
            rsi,
            bollinger_upper: close * 1.1,
            bollinger_lower: close * 0.9,
            close,
            ..TechnicalSnapshot::default_for_close(close)
        }
    }

    #[test]
    fn rejects_below_exceptional_threshold() {
        let config = StrategyConfig::momentum_defaults();
        let snap = snapshot(10.0, 50.0, 50.0);
        assert!(!is_golden(3.0, &snap, &config));
    }

    #[test]
    fn accepts_strong_confirmed_momentum() {
        let config = StrategyConfig::momentum_defaults();
        let snap = snapshot(10.0, 45.0, 55.0);
        assert!(is_golden(9.0, &snap, &config));
    }

    #[test]
    fn rejects_overbought_long_even_with_strong_momentum() {
        let config = StrategyConfig::momentum_defaults();
        let snap = snapshot(10.0, 45.0, 90.0);
        assert!(!is_golden(9.0, &snap, &config));
    }
}
