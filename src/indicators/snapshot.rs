// =============================================================================
// Technical Snapshot assembly
// =============================================================================
//
// Wires every pure indicator function in this module into one dense,
// always-fully-populated `TechnicalSnapshot` (§3). No field is ever
// conditionally absent — short bar history falls through to each
// indicator's own documented default.
// =============================================================================

use crate::indicators::adx::adx;
use crate::indicators::atr::atr;
use crate::indicators::bollinger::bollinger;
use crate::indicators::ema::ema;
use crate::indicators::macd::macd;
use crate::indicators::oscillators::{ad, cci, mfi, obv, roc, volume_sma, vwap, vwma, williams_r, wma};
use crate::indicators::rsi::rsi;
use crate::indicators::stochastic::stochastic;
use crate::types::{Bar, TechnicalSnapshot, MAX_RECENT_CLOSES};

const RSI_PERIOD: usize = 14;
const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;
const BOLLINGER_PERIOD: usize = 20;
const ADX_PERIOD: usize = 14;
const EMA_FAST_PERIOD: usize = 9;
const EMA_SLOW_PERIOD: usize = 21;
const VOLUME_SMA_PERIOD: usize = 20;
const STOCHASTIC_PERIOD: usize = 14;
const CCI_PERIOD: usize = 20;
const ATR_PERIOD: usize = 14;
const WILLIAMS_R_PERIOD: usize = 14;
const ROC_PERIOD: usize = 10;
const VWMA_PERIOD: usize = 20;
const WMA_PERIOD: usize = 20;
const MFI_PERIOD: usize = 14;

pub fn build_snapshot(bars: &[Bar]) -> TechnicalSnapshot {
    let close = bars.last().map(|b| b.close).unwrap_or(0.0);
    if bars.is_empty() {
        return TechnicalSnapshot::default_for_close(close);
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volume = bars.last().map(|b| b.volume).unwrap_or(0.0);

    let macd_result = macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
    let bollinger_result = bollinger(&closes, BOLLINGER_PERIOD);
    let stochastic_result = stochastic(bars, STOCHASTIC_PERIOD);

    let recent_closes: Vec<(i64, f64)> = bars
        .iter()
        .rev()
        .take(MAX_RECENT_CLOSES)
        .map(|b| (b.timestamp, b.close))
        .rev()
        .collect();

    TechnicalSnapshot {
        rsi: rsi(&closes, RSI_PERIOD),
        macd_line: macd_result.line,
        macd_signal: macd_result.signal,
        macd_histogram: macd_result.histogram,
        bollinger_upper: bollinger_result.upper,
        bollinger_middle: bollinger_result.middle,
        bollinger_lower: bollinger_result.lower,
        adx: adx(bars, ADX_PERIOD),
        ema_fast: ema(&closes, EMA_FAST_PERIOD),
        ema_slow: ema(&closes, EMA_SLOW_PERIOD),
        volume_sma: volume_sma(bars, VOLUME_SMA_PERIOD),
        obv: obv(bars),
        mfi: mfi(bars, MFI_PERIOD),
        ad: ad(bars),
        stochastic_k: stochastic_result.k,
        stochastic_d: stochastic_result.d,
        cci: cci(bars, CCI_PERIOD),
        atr: atr(bars, ATR_PERIOD),
        williams_r: williams_r(bars, WILLIAMS_R_PERIOD),
        roc: roc(&closes, ROC_PERIOD),
        vwap: vwap(bars),
        vwma: vwma(bars, VWMA_PERIOD),
        wma: wma(&closes, WMA_PERIOD),
        close,
        volume,
        recent_closes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(ts: i64, c: f64) -> Bar {
        Bar {
            timestamp: ts,
            open: c,
            high: c * 1.01,
            low: c * 0.99,
            close: c,
            volume: 10_000.0,
        }
    }

    #[test]
    fn empty_bars_use_default_snapshot() {
        let snapshot = build_snapshot(&[]);
        assert_eq!(snapshot.close, 0.0);
        assert_eq!(snapshot.rsi, 50.0);
    }

    #[test]
    fn recent_closes_capped_at_twenty() {
        let bars: Vec<Bar> = (0..50).map(|i| bar(i, 10.0 + i as f64)).collect();
        let snapshot = build_snapshot(&bars);
        assert_eq!(snapshot.recent_closes.len(), MAX_RECENT_CLOSES);
        assert_eq!(snapshot.recent_closes.last().unwrap().1, 59.0);
    }

    #[test]
    fn no_field_ever_nan() {
        let bars: Vec<Bar> = (0..30).map(|i| bar(i, 10.0 + (i as f64 * 0.3).sin())).collect();
        let snapshot = build_snapshot(&bars);
        assert!(!snapshot.rsi.is_nan());
        assert!(!snapshot.atr.is_nan());
        assert!(!snapshot.adx.is_nan());
    }
}
