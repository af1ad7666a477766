// =============================================================================
// Average Directional Index (ADX)
// =============================================================================
//
// +DM/-DM per bar, smoothed over `period`, combined into +DI/-DI, then
// DX = |+DI - -DI| / (+DI + -DI) * 100, averaged over the trailing window.
// Defaults to 0 (no trend) under insufficient data (§4.3).
// =============================================================================

use crate::indicators::atr::true_range;
use crate::types::Bar;

pub fn adx(bars: &[Bar], period: usize) -> f64 {
    if period == 0 || bars.len() < period + 1 {
        return 0.0;
    }

    let mut plus_dm_sum = 0.0;
    let mut minus_dm_sum = 0.0;
    let mut tr_sum = 0.0;
    let mut dx_values = Vec::new();

    let window_start = bars.len().saturating_sub(period).max(1);

    for i in window_start..bars.len() {
        let up_move = bars[i].high - bars[i - 1].high;
        let down_move = bars[i - 1].low - bars[i].low;

        let plus_dm = if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        };
        let minus_dm = if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        };

        let tr = true_range(&bars[i], bars[i - 1].close);

        plus_dm_sum += plus_dm;
        minus_dm_sum += minus_dm;
        tr_sum += tr;

        if tr_sum > 0.0 {
            let plus_di = plus_dm_sum / tr_sum * 100.0;
            let minus_di = minus_dm_sum / tr_sum * 100.0;
            let di_sum = plus_di + minus_di;
            if di_sum > 0.0 {
                dx_values.push((plus_di - minus_di).abs() / di_sum * 100.0);
            }
        }
    }

    if dx_values.is_empty() {
        return 0.0;
    }
    let sum: f64 = dx_values.iter().sum();
    let v = sum / dx_values.len() as f64;
    if v.is_finite() {
        v
    } else {
        0.0
    }
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
    fn insufficient_data_defaults_to_zero() {
        let bars = vec![bar(10.0, 9.0, 9.5)];
        assert_eq!(adx(&bars, 14), 0.0);
    }

    #[test]
    fn trending_series_has_positive_adx() {
        let bars: Vec<Bar> = (0..30)
            .map(|i| {
                let base = 10.0 + i as f64 * 0.5;
                bar(base + 0.3, base - 0.1, base)
            })
            .collect();
        let v = adx(&bars, 14);
        assert!(v > 0.0);
        assert!(v.is_finite());
    }
}
