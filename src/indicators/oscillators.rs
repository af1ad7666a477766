// =============================================================================
// Remaining single-value indicators: CCI, Williams %R, ROC, VWAP, VWMA, WMA,
// OBV, MFI, AD, volume SMA
// =============================================================================
//
// Grouped together because each is a short, self-contained reduction over
// the bar window rather than a multi-step pipeline like ADX or MACD.
// =============================================================================

use crate::types::Bar;

/// Commodity Channel Index: (typical_price - SMA) / (0.015 * mean_deviation).
pub fn cci(bars: &[Bar], period: usize) -> f64 {
    if period == 0 || bars.is_empty() {
        return 0.0;
    }
    let window_start = bars.len().saturating_sub(period);
    let window = &bars[window_start..];

    let typical: Vec<f64> = window
        .iter()
        .map(|b| (b.high + b.low + b.close) / 3.0)
        .collect();
    let sma = typical.iter().sum::<f64>() / typical.len() as f64;
    let mean_dev = typical.iter().map(|t| (t - sma).abs()).sum::<f64>() / typical.len() as f64;

    if mean_dev <= 0.0 {
        return 0.0;
    }
    (typical.last().unwrap() - sma) / (0.015 * mean_dev)
}

/// Williams %R: (highest_high - close) / range * -100. Defaults to -50 on
/// zero range.
pub fn williams_r(bars: &[Bar], period: usize) -> f64 {
    if period == 0 || bars.is_empty() {
        return -50.0;
    }
    let window_start = bars.len().saturating_sub(period);
    let window = &bars[window_start..];

    let highest = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let lowest = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
    let range = highest - lowest;
    if range <= 0.0 {
        return -50.0;
    }
    (highest - window.last().unwrap().close) / range * -100.0
}

/// Rate of Change over `period` bars, as a percentage.
pub fn roc(closes: &[f64], period: usize) -> f64 {
    if period == 0 || closes.len() <= period {
        return 0.0;
    }
    let past = closes[closes.len() - period - 1];
    let current = *closes.last().unwrap();
    if past == 0.0 {
        return 0.0;
    }
    (current - past) / past * 100.0
}

/// Volume-Weighted Average Price over the full bar window supplied.
pub fn vwap(bars: &[Bar]) -> f64 {
    if bars.is_empty() {
        return 0.0;
    }
    let (pv_sum, v_sum) = bars.iter().fold((0.0, 0.0), |(pv, v), b| {
        let typical = (b.high + b.low + b.close) / 3.0;
        (pv + typical * b.volume, v + b.volume)
    });
    if v_sum <= 0.0 {
        bars.last().map(|b| b.close).unwrap_or(0.0)
    } else {
        pv_sum / v_sum
    }
}

/// Volume-Weighted Moving Average over the last `period` bars.
pub fn vwma(bars: &[Bar], period: usize) -> f64 {
    if bars.is_empty() {
        return 0.0;
    }
    let window_start = bars.len().saturating_sub(period);
    vwap(&bars[window_start..])
}

/// Weighted Moving Average over the last `period` closes (linear weights).
pub fn wma(closes: &[f64], period: usize) -> f64 {
    if period == 0 || closes.is_empty() {
        return closes.last().copied().unwrap_or(0.0);
    }
    let window_start = closes.len().saturating_sub(period);
    let window = &closes[window_start..];
    let n = window.len();
    let denom: f64 = (1..=n).sum::<usize>() as f64;
    if denom <= 0.0 {
        return window.last().copied().unwrap_or(0.0);
    }
    let weighted: f64 = window
        .iter()
        .enumerate()
        .map(|(i, c)| c * (i + 1) as f64)
        .sum();
    weighted / denom
}

/// On-Balance Volume, accumulated across the full bar window.
pub fn obv(bars: &[Bar]) -> f64 {
    if bars.len() < 2 {
        return 0.0;
    }
    let mut value = 0.0;
    for w in bars.windows(2) {
        if w[1].close > w[0].close {
            value += w[1].volume;
        } else if w[1].close < w[0].close {
            value -= w[1].volume;
        }
    }
    value
}

/// Money Flow Index over the last `period` bars. Defaults to 50 (neutral)
/// under insufficient data or zero money flow.
pub fn mfi(bars: &[Bar], period: usize) -> f64 {
    if bars.len() < period + 1 {
        return 50.0;
    }
    let window_start = bars.len() - period - 1;
    let window = &bars[window_start..];

    let mut positive_flow = 0.0;
    let mut negative_flow = 0.0;
    for w in window.windows(2) {
        let prev_typical = (w[0].high + w[0].low + w[0].close) / 3.0;
        let typical = (w[1].high + w[1].low + w[1].close) / 3.0;
        let money_flow = typical * w[1].volume;
        if typical > prev_typical {
            positive_flow += money_flow;
        } else if typical < prev_typical {
            negative_flow += money_flow;
        }
    }

    if negative_flow <= 0.0 && positive_flow <= 0.0 {
        return 50.0;
    }
    if negative_flow <= 0.0 {
        return 100.0;
    }
    let money_ratio = positive_flow / negative_flow;
    100.0 - 100.0 / (1.0 + money_ratio)
}

/// Accumulation/Distribution line, accumulated across the full bar window.
pub fn ad(bars: &[Bar]) -> f64 {
    let mut value = 0.0;
    for b in bars {
        let range = b.high - b.low;
        if range <= 0.0 {
            continue;
        }
        let mfm = ((b.close - b.low) - (b.high - b.close)) / range;
        value += mfm * b.volume;
    }
    value
}

/// Simple moving average of volume over the last `period` bars.
pub fn volume_sma(bars: &[Bar], period: usize) -> f64 {
    if bars.is_empty() {
        return 0.0;
    }
    let window_start = bars.len().saturating_sub(period);
    let window = &bars[window_start..];
    window.iter().map(|b| b.volume).sum::<f64>() / window.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(h: f64, l: f64, c: f64, v: f64) -> Bar {
        Bar {
            timestamp: 0,
            open: c,
            high: h,
            low: l,
            close: c,
            volume: v,
        }
    }

    #[test]
    fn williams_r_defaults_on_zero_range() {
        let bars = vec![bar(10.0, 10.0, 10.0, 100.0); 5];
        assert_eq!(williams_r(&bars, 14), -50.0);
    }

    #[test]
    fn roc_computes_percentage_change() {
        let closes = vec![100.0, 101.0, 102.0, 110.0];
        assert!((roc(&closes, 3) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn obv_accumulates_on_up_moves() {
        let bars = vec![bar(10.0, 9.0, 9.5, 100.0), bar(11.0, 9.5, 10.5, 50.0)];
        assert_eq!(obv(&bars), 50.0);
    }

    #[test]
    fn mfi_defaults_to_neutral_under_insufficient_data() {
        let bars = vec![bar(10.0, 9.0, 9.5, 100.0)];
        assert_eq!(mfi(&bars, 14), 50.0);
    }

    #[test]
    fn vwap_is_between_low_and_high() {
        let bars = vec![bar(11.0, 9.0, 10.0, 100.0), bar(12.0, 10.0, 11.0, 200.0)];
        let v = vwap(&bars);
        assert!(v > 9.0 && v < 12.0);
    }
}
