// =============================================================================
// Validation Pipeline (C4) — ordered, short-circuiting rule chain
// =============================================================================

use crate::strategy::config::StrategyConfig;
use crate::types::{Bar, Quote, TechnicalSnapshot, TrendMetrics, ValidationOutcome};
use crate::validation::rules::{self, RuleResult};

/// Runs the full nine-rule chain in fixed order (§4.4), stopping at the
/// first rule that fails for *both* directions. Asymmetric rules (7-9) only
/// remove one direction and fall through to later rules for the other.
pub fn evaluate(
    ticker: &str,
    snapshot: &TechnicalSnapshot,
    quote: &Quote,
    bars: &[Bar],
    metrics: &TrendMetrics,
    momentum: f64,
    config: &StrategyConfig,
) -> ValidationOutcome {
    let min_bars = rules::min_bars_required(config);

    let ordered: Vec<RuleResult> = vec![
        rules::data_quality(bars, quote, min_bars),
        rules::security_type(ticker),
        rules::price_floor(quote, config.min_price),
        rules::spread(quote, config.max_spread_pct),
        rules::volume(snapshot, config.min_volume, config.min_relative_volume),
        rules::volatility(
            snapshot,
            quote,
            config.max_atr_pct,
            config.max_atr_pct_low_priced,
            config.low_priced_threshold,
        ),
    ];

    for r in &ordered {
        if !r.passed {
            return ValidationOutcome {
                reason_not_to_enter_long: r.reason_long.clone(),
                reason_not_to_enter_short: r.reason_short.clone(),
            };
        }
    }

    let mut outcome = ValidationOutcome::valid();

    let trend = rules::trend_direction(
        momentum,
        snapshot,
        config.min_adx,
        config.overbought_rsi,
        config.oversold_rsi,
        config.min_momentum_long,
        config.max_momentum_short,
    );
    apply_asymmetric(&mut outcome, &trend);

    let mean_reversion = rules::mean_reversion_guard(momentum, snapshot, config.bollinger_band_edge_pct);
    apply_asymmetric(&mut outcome, &mean_reversion);

    let continuation = rules::continuation_and_peak_proximity(
        momentum,
        metrics,
        snapshot.close,
        config.min_continuation_score,
        config.max_peak_proximity,
    );
    apply_asymmetric(&mut outcome, &continuation);

    outcome
}

/// Merge an asymmetric rule's rejection into the accumulated outcome —
/// once a direction is rejected it stays rejected (first reason wins).
fn apply_asymmetric(outcome: &mut ValidationOutcome, result: &RuleResult) {
    if !result.reason_long.is_empty() && outcome.reason_not_to_enter_long.is_empty() {
        outcome.reason_not_to_enter_long = result.reason_long.clone();
    }
    if !result.reason_short.is_empty() && outcome.reason_not_to_enter_short.is_empty() {
        outcome.reason_not_to_enter_short = result.reason_short.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| Bar {
                timestamp: i as i64,
                open: 10.0,
                high: 10.3,
                low: 9.8,
                close: 10.0 + i as f64 * 0.05,
                volume: 1_000_000.0,
            })
            .collect()
    }

    #[test]
    fn price_floor_rejection_is_symmetric_and_short_circuits() {
        let quote = Quote { bid: 0.04, ask: 0.06 };
        let snapshot = TechnicalSnapshot::default_for_close(0.05);
        let metrics = TrendMetrics::insufficient_data(0.05);
        let config = StrategyConfig::momentum_defaults();
        let outcome = evaluate("XYZ", &snapshot, &quote, &bars(30), &metrics, 1.0, &config);
        assert!(outcome.is_symmetric_rejection());
        assert!(outcome.reason_not_to_enter_long.contains("too low"));
    }

    #[test]
    fn healthy_candidate_passes_both_directions_when_momentum_is_flat_only_rejects_flat() {
        let quote = Quote { bid: 9.99, ask: 10.01 };
        let snapshot = TechnicalSnapshot {
            adx: 30.0,
            rsi: 50.0,
            volume: 2_000_000.0,
            volume_sma: 1_000_000.0,
            bollinger_upper: 12.0,
            bollinger_lower: 8.0,
            close: 10.0,
            ..TechnicalSnapshot::default_for_close(10.0)
        };
        let metrics = TrendMetrics {
            momentum_score: 4.0,
            continuation_score: 0.7,
            peak_price: 10.5,
            bottom_price: 9.0,
            reason_text: String::new(),
        };
        let config = StrategyConfig::momentum_defaults();
        let outcome = evaluate("XYZ", &snapshot, &quote, &bars(30), &metrics, 4.0, &config);
        assert!(outcome.is_valid_long());
    }
}
