// =============================================================================
// MACD — Moving Average Convergence/Divergence
// =============================================================================
//
// line = EMA(fast) - EMA(slow); signal approximates the EMA(signal_period)
// of the line itself. With short bar history the signal line is
// approximated by the line value directly rather than attempting a second
// EMA pass with insufficient seed data (§4.3: "signal line is approximated
// when bar history is short").
// =============================================================================

use super::ema::ema;

pub struct Macd {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

pub fn macd(closes: &[f64], fast: usize, slow: usize, signal_period: usize) -> Macd {
    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);
    let line = fast_ema - slow_ema;

    let signal = if closes.len() >= slow + signal_period {
        // Build a short trailing series of MACD-line values to smooth into
        // a signal line.
        let mut line_series = Vec::with_capacity(signal_period);
        for i in 0..signal_period {
            let upto = closes.len() - signal_period + i + 1;
            let slice = &closes[..upto];
            line_series.push(ema(slice, fast) - ema(slice, slow));
        }
        ema(&line_series, signal_period.min(line_series.len()))
    } else {
        line
    };

    Macd {
        line,
        signal,
        histogram: line - signal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_series_has_zero_macd() {
        let closes = vec![100.0; 40];
        let m = macd(&closes, 12, 26, 9);
        assert!(m.line.abs() < 1e-9);
        assert!(m.histogram.abs() < 1e-9);
    }

    #[test]
    fn short_history_approximates_signal_with_line() {
        let closes = vec![10.0, 11.0, 12.0];
        let m = macd(&closes, 12, 26, 9);
        assert_eq!(m.signal, m.line);
        assert_eq!(m.histogram, 0.0);
    }
}
