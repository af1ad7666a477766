// =============================================================================
// Shared data model — bars, quotes, technical snapshots, trade direction
// =============================================================================
//
// These are the records that flow between every other module. None of them
// carry behavior beyond small derived-field helpers; the pipelines that
// consume them (indicators, validation, MAB, exit engine) live in their own
// modules.
// =============================================================================

use serde::{Deserialize, Serialize};

/// Long or short — the direction of a candidate entry or an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
        }
    }
}

impl Direction {
    /// `+1.0` for long, `-1.0` for short — the sign convention used throughout
    /// P&L and trailing-stop math.
    pub fn sign(self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Short => -1.0,
        }
    }
}

/// A single OHLCV bar. Immutable once constructed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bar {
    /// Unix epoch seconds.
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// A top-of-book quote. `mid` and `spread_pct` are derived, not stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Quote {
    pub bid: f64,
    pub ask: f64,
}

impl Quote {
    /// `false` if either side is non-positive.
    pub fn is_valid(&self) -> bool {
        self.bid > 0.0 && self.ask > 0.0
    }

    /// Midpoint of bid/ask.
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }

    /// Spread as a percentage of the midpoint. `0.0` when the quote is
    /// invalid (callers must check [`Quote::is_valid`] before trusting this).
    pub fn spread_pct(&self) -> f64 {
        let mid = self.mid();
        if mid <= 0.0 {
            return 0.0;
        }
        (self.ask - self.bid) / mid * 100.0
    }
}

/// Dense technical indicator record. Every field has a defined default under
/// insufficient data — no field is ever conditionally absent (§3, §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalSnapshot {
    pub rsi: f64,
    pub macd_line: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,
    pub bollinger_upper: f64,
    pub bollinger_middle: f64,
    pub bollinger_lower: f64,
    pub adx: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub volume_sma: f64,
    pub obv: f64,
    pub mfi: f64,
    pub ad: f64,
    pub stochastic_k: f64,
    pub stochastic_d: f64,
    pub cci: f64,
    pub atr: f64,
    pub williams_r: f64,
    pub roc: f64,
    pub vwap: f64,
    pub vwma: f64,
    pub wma: f64,
    pub close: f64,
    pub volume: f64,
    /// `(timestamp, close)` pairs, oldest first, capped at 20 entries.
    pub recent_closes: Vec<(i64, f64)>,
}

/// Maximum number of `(timestamp, close)` pairs retained in a snapshot.
pub const MAX_RECENT_CLOSES: usize = 20;

impl TechnicalSnapshot {
    /// A fully-defaulted snapshot for when bar history is empty or
    /// insufficient. RSI defaults to neutral (50), ADX to 0 (no trend), ATR
    /// to roughly 1% of `close` per §4.3.
    pub fn default_for_close(close: f64) -> Self {
        Self {
            rsi: 50.0,
            macd_line: 0.0,
            macd_signal: 0.0,
            macd_histogram: 0.0,
            bollinger_upper: close,
            bollinger_middle: close,
            bollinger_lower: close,
            adx: 0.0,
            ema_fast: close,
            ema_slow: close,
            volume_sma: 0.0,
            obv: 0.0,
            mfi: 50.0,
            ad: 0.0,
            stochastic_k: 50.0,
            stochastic_d: 50.0,
            cci: 0.0,
            atr: close * 0.01,
            williams_r: -50.0,
            roc: 0.0,
            vwap: close,
            vwma: close,
            wma: close,
            close,
            volume: 0.0,
            recent_closes: Vec::new(),
        }
    }

    /// ATR as a percentage of `close`. Used by the volatility validation rule
    /// and the exit engine's ATR stop.
    pub fn atr_pct(&self) -> f64 {
        if self.close <= 0.0 {
            return 0.0;
        }
        self.atr / self.close * 100.0
    }

}

/// Simplified-pipeline metrics computed over the last *N* closes (§4.3 trend
/// metrics path), used by the penny-stock strategy's validator chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendMetrics {
    pub momentum_score: f64,
    pub continuation_score: f64,
    pub peak_price: f64,
    pub bottom_price: f64,
    pub reason_text: String,
}

impl TrendMetrics {
    /// Neutral metrics for when there isn't enough bar history to compute
    /// anything meaningful.
    pub fn insufficient_data(close: f64) -> Self {
        Self {
            momentum_score: 0.0,
            continuation_score: 0.0,
            peak_price: close,
            bottom_price: close,
            reason_text: "insufficient bar history for trend metrics".to_string(),
        }
    }
}

/// Result of running a ticker through the validation pipeline (§3, §4.4).
/// Empty string in either field means that direction is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub reason_not_to_enter_long: String,
    pub reason_not_to_enter_short: String,
}

impl ValidationOutcome {
    pub fn valid() -> Self {
        Self::default()
    }

    pub fn is_valid_long(&self) -> bool {
        self.reason_not_to_enter_long.is_empty()
    }

    pub fn is_valid_short(&self) -> bool {
        self.reason_not_to_enter_short.is_empty()
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_long() || self.is_valid_short()
    }

    /// True iff both rejection strings are equal (§3, §8: symmetric rules
    /// must produce this).
    pub fn is_symmetric_rejection(&self) -> bool {
        !self.reason_not_to_enter_long.is_empty()
            && self.reason_not_to_enter_long == self.reason_not_to_enter_short
    }
}
