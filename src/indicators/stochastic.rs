// =============================================================================
// Stochastic Oscillator
// =============================================================================
//
// %K = (close - lowest_low) / (highest_high - lowest_low) * 100 over the
// last `period` bars; %D is the 3-period SMA of %K. Returns (50, 50) on
// zero range (§4.3).
// =============================================================================

use crate::types::Bar;

pub struct Stochastic {
    pub k: f64,
    pub d: f64,
}

pub fn stochastic(bars: &[Bar], period: usize) -> Stochastic {
    if period == 0 || bars.is_empty() {
        return Stochastic { k: 50.0, d: 50.0 };
    }

    let window_start = bars.len().saturating_sub(period);
    let window = &bars[window_start..];

    let highest = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let lowest = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
    let range = highest - lowest;

    if range <= 0.0 {
        return Stochastic { k: 50.0, d: 50.0 };
    }

    let close = window.last().unwrap().close;
    let k = (close - lowest) / range * 100.0;

    // %D: 3-period SMA of %K computed over the trailing closes in-window.
    let d_period = 3.min(window.len());
    let mut k_values = Vec::with_capacity(d_period);
    for i in 0..d_period {
        let idx = window.len() - d_period + i;
        let sub = &window[..=idx];
        let h = sub.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let l = sub.iter().map(|b| b.low).fold(f64::MAX, f64::min);
        let r = h - l;
        if r > 0.0 {
            k_values.push((sub.last().unwrap().close - l) / r * 100.0);
        } else {
            k_values.push(50.0);
        }
    }
    let d = k_values.iter().sum::<f64>() / k_values.len() as f64;

    Stochastic { k, d }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(h: f64, l: f64, c: f64) -> Bar {
        Bar {
            timestamp: 0,
            open: c,
            high: h,
            low: l,
            close: c,
            volume: 1000.0,
        }
    }

    #[test]
    fn zero_range_returns_50_50() {
        let bars = vec![bar(10.0, 10.0, 10.0); 5];
        let s = stochastic(&bars, 14);
        assert_eq!(s.k, 50.0);
        assert_eq!(s.d, 50.0);
    }

    #[test]
    fn close_at_high_gives_k_100() {
        let bars = vec![bar(9.0, 8.0, 8.5), bar(10.0, 8.0, 10.0)];
        let s = stochastic(&bars, 2);
        assert!((s.k - 100.0).abs() < 1e-9);
    }
}
