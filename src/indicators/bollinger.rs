// =============================================================================
// Bollinger Bands — 2 sigma over the last `period` closes
// =============================================================================

pub struct Bollinger {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

pub fn bollinger(closes: &[f64], period: usize) -> Bollinger {
    if period == 0 || closes.is_empty() {
        let close = closes.last().copied().unwrap_or(0.0);
        return Bollinger {
            upper: close,
            middle: close,
            lower: close,
        };
    }

    let window = if closes.len() >= period {
        &closes[closes.len() - period..]
    } else {
        closes
    };

    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let variance = window.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    Bollinger {
        upper: mean + 2.0 * stddev,
        middle: mean,
        lower: mean - 2.0 * stddev,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_series_collapses_bands_to_close() {
        let closes = vec![25.0; 20];
        let b = bollinger(&closes, 20);
        assert!((b.upper - 25.0).abs() < 1e-9);
        assert!((b.lower - 25.0).abs() < 1e-9);
    }

    #[test]
    fn upper_above_middle_above_lower_under_variance() {
        let closes = vec![10.0, 12.0, 9.0, 14.0, 8.0, 15.0, 11.0, 13.0, 9.5, 12.5];
        let b = bollinger(&closes, 10);
        assert!(b.upper > b.middle);
        assert!(b.middle > b.lower);
    }
}
