// =============================================================================
// Domain error taxonomy (§7)
// =============================================================================
//
// Transient I/O is retried internally (store gateway, market-data adapter)
// and only surfaces here once retries are exhausted. Data-absent conditions
// (404, missing bars, no quote) are never represented as errors — callers
// get `None`/an explicit partial result instead. Validation rejection is
// likewise not an error; it produces an Inactive-Ticker Record.
// =============================================================================

use thiserror::Error;

/// Error categories a caller needs to distinguish at the boundary.
#[derive(Debug, Error)]
pub enum TradingError {
    /// Timeout, 429, 5xx, or transport failure after internal retries are
    /// exhausted. The caller should skip this ticker/cycle and move on.
    #[error("retryable: {0}")]
    Retryable(String),

    /// Misconfiguration or missing credential discovered at boot. The
    /// coordinator refuses to start enabled strategies and exits non-zero.
    #[error("fatal: {0}")]
    Fatal(String),

    /// An invariant was violated (e.g. `entry_price <= 0`). Logged with full
    /// context; the offending ticker is skipped; no cascading failure.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl TradingError {
    pub fn retryable(msg: impl Into<String>) -> Self {
        Self::Retryable(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }
}

/// Outcome of a Store Gateway operation (§4.1). Callers never see raw
/// transport exceptions — everything lands in one of these three buckets.
#[derive(Debug, Clone)]
pub enum StoreOutcome<T> {
    Ok(T),
    RetryableError(String),
    FatalError(String),
}

impl<T> StoreOutcome<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Extract the success value, or `None` for either error variant.
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Ok(v) => Some(v),
            _ => None,
        }
    }
}
