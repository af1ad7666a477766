// =============================================================================
// Relative Strength Index (RSI) — simple averaging
// =============================================================================
//
// Simple (not Wilder-smoothed) average of gains/losses over the last `period`
// deltas. RSI = 50 when there isn't enough history; RSI = 100 when every
// delta in the window is a gain (average loss of zero).
// =============================================================================

/// Compute RSI over the last `period` deltas of `closes`. Returns the
/// default neutral value (50.0) when there are fewer than `period + 1`
/// closes.
pub fn rsi(closes: &[f64], period: usize) -> f64 {
    if period == 0 || closes.len() < period + 1 {
        return 50.0;
    }

    let window = &closes[closes.len() - period - 1..];
    let deltas: Vec<f64> = window.windows(2).map(|w| w[1] - w[0]).collect();

    let (sum_gain, sum_loss) = deltas.iter().fold((0.0_f64, 0.0_f64), |(g, l), &d| {
        if d > 0.0 {
            (g + d, l)
        } else {
            (g, l + d.abs())
        }
    });

    let period_f = period as f64;
    let avg_gain = sum_gain / period_f;
    let avg_loss = sum_loss / period_f;

    if avg_loss == 0.0 && avg_gain == 0.0 {
        return 50.0;
    }
    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_is_neutral() {
        assert_eq!(rsi(&[1.0, 2.0], 14), 50.0);
    }

    #[test]
    fn all_gains_is_100() {
        let closes: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        assert_eq!(rsi(&closes, 14), 100.0);
    }

    #[test]
    fn flat_series_is_neutral() {
        let closes = vec![10.0; 20];
        assert_eq!(rsi(&closes, 14), 50.0);
    }

    #[test]
    fn bounded_0_to_100() {
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03,
            44.18, 44.22, 44.57,
        ];
        let v = rsi(&closes, 10);
        assert!((0.0..=100.0).contains(&v));
    }
}
