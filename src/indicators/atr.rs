// =============================================================================
// Average True Range (ATR)
// =============================================================================
//
// True Range = max(high-low, |high-prev_close|, |low-prev_close|). ATR is
// the mean of True Range over the last `period` bars. Falls back to ~1% of
// close under insufficient data (§4.3).
// =============================================================================

use crate::types::Bar;

pub fn true_range(bar: &Bar, prev_close: f64) -> f64 {
    let a = bar.high - bar.low;
    let b = (bar.high - prev_close).abs();
    let c = (bar.low - prev_close).abs();
    a.max(b).max(c)
}

pub fn atr(bars: &[Bar], period: usize) -> f64 {
    if bars.len() < 2 {
        let close = bars.last().map(|b| b.close).unwrap_or(0.0);
        return close * 0.01;
    }

    let window_start = bars.len().saturating_sub(period).max(1);
    let window = &bars[window_start..];

    let mut sum = 0.0;
    let mut count = 0;
    for i in 0..window.len() {
        let idx = window_start + i;
        let prev_close = bars[idx - 1].close;
        sum += true_range(&bars[idx], prev_close);
        count += 1;
    }

    if count == 0 {
        bars.last().map(|b| b.close * 0.01).unwrap_or(0.0)
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(o: f64, h: f64, l: f64, c: f64) -> Bar {
        Bar {
            timestamp: 0,
            open: o,
            high: h,
            low: l,
            close: c,
            volume: 1000.0,
        }
    }

    #[test]
    fn insufficient_data_defaults_to_one_percent_of_close() {
        let bars = vec![bar(10.0, 10.2, 9.8, 10.0)];
        assert!((atr(&bars, 14) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn constant_range_atr_equals_that_range() {
        let bars: Vec<Bar> = (0..20).map(|_| bar(10.0, 10.5, 9.5, 10.0)).collect();
        let v = atr(&bars, 14);
        assert!((v - 1.0).abs() < 1e-9);
    }
}
