// =============================================================================
// Trend Metrics — simplified path for the penny-stock pipeline (§4.3)
// =============================================================================
//
// Computed over the last N closes (default 5): price_change_pct, a
// dominant/consistency ratio over up/down moves, an amplification factor in
// [1.0, 3.0], and momentum_score = price_change_pct * amplification.
// =============================================================================

use crate::types::{Bar, TrendMetrics};

const DEFAULT_LOOKBACK: usize = 5;

pub fn trend_metrics(bars: &[Bar]) -> TrendMetrics {
    trend_metrics_with_lookback(bars, DEFAULT_LOOKBACK)
}

pub fn trend_metrics_with_lookback(bars: &[Bar], lookback: usize) -> TrendMetrics {
    let positive_closes: Vec<&Bar> = bars.iter().filter(|b| b.close > 0.0).collect();
    if positive_closes.len() < 2 {
        let close = bars.last().map(|b| b.close).unwrap_or(0.0);
        return TrendMetrics::insufficient_data(close);
    }

    let window_start = positive_closes.len().saturating_sub(lookback);
    let window = &positive_closes[window_start..];

    let first = window.first().unwrap().close;
    let last = window.last().unwrap().close;
    let price_change_pct = if first != 0.0 {
        (last - first) / first * 100.0
    } else {
        0.0
    };

    let mut up_moves = 0u32;
    let mut down_moves = 0u32;
    for w in window.windows(2) {
        if w[1].close > w[0].close {
            up_moves += 1;
        } else if w[1].close < w[0].close {
            down_moves += 1;
        }
    }
    let total_moves = (up_moves + down_moves).max(1);

    let dominant_ratio = up_moves.max(down_moves) as f64 / total_moves as f64;
    let consistency_factor = (up_moves as f64 - down_moves as f64) / total_moves as f64;

    let continuation_score = dominant_ratio.clamp(0.0, 1.0);
    let amplification = (1.0 + continuation_score * 2.0).clamp(1.0, 3.0);
    let momentum_score = price_change_pct * amplification;

    let peak_price = window.iter().map(|b| b.close).fold(f64::MIN, f64::max);
    let bottom_price = window.iter().map(|b| b.close).fold(f64::MAX, f64::min);

    let reason_text = format!(
        "momentum_score={momentum_score:.2} continuation_score={continuation_score:.2} \
         consistency={consistency_factor:.2}"
    );

    TrendMetrics {
        momentum_score,
        continuation_score,
        peak_price,
        bottom_price,
        reason_text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(c: f64) -> Bar {
        Bar {
            timestamp: 0,
            open: c,
            high: c,
            low: c,
            close: c,
            volume: 1000.0,
        }
    }

    #[test]
    fn insufficient_bars_returns_neutral() {
        let bars = vec![bar(5.0)];
        let m = trend_metrics(&bars);
        assert_eq!(m.momentum_score, 0.0);
        assert_eq!(m.continuation_score, 0.0);
    }

    #[test]
    fn steady_uptrend_has_positive_momentum() {
        let bars: Vec<Bar> = vec![1.0, 1.1, 1.2, 1.3, 1.4, 1.5]
            .into_iter()
            .map(bar)
            .collect();
        let m = trend_metrics(&bars);
        assert!(m.momentum_score > 0.0);
        assert!(m.continuation_score > 0.5);
    }

    #[test]
    fn continuation_score_bounded_0_to_1() {
        let bars: Vec<Bar> = vec![1.0, 1.2, 0.9, 1.3, 0.8, 1.4].into_iter().map(bar).collect();
        let m = trend_metrics(&bars);
        assert!((0.0..=1.0).contains(&m.continuation_score));
    }
}
