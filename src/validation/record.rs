// =============================================================================
// Inactive-Ticker Record builder (§3)
// =============================================================================
//
// Per-evaluation audit log: one record per evaluated candidate per cycle,
// covering both validation rejections and MAB rejections.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::types::TechnicalSnapshot;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InactiveTickerRecord {
    pub ticker: String,
    pub indicator: String,
    pub timestamp: i64,
    pub reason_not_to_enter_long: String,
    pub reason_not_to_enter_short: String,
    pub technical_snapshot: TechnicalSnapshot,
}

pub fn build_inactive_record(
    ticker: &str,
    indicator: &str,
    timestamp: i64,
    reason_not_to_enter_long: String,
    reason_not_to_enter_short: String,
    technical_snapshot: TechnicalSnapshot,
) -> InactiveTickerRecord {
    InactiveTickerRecord {
        ticker: ticker.to_string(),
        indicator: indicator.to_string(),
        timestamp,
        reason_not_to_enter_long,
        reason_not_to_enter_short,
        technical_snapshot,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_record_with_given_fields() {
        let snapshot = TechnicalSnapshot::default_for_close(10.0);
        let record = build_inactive_record(
            "AAPL",
            "momentum",
            1_700_000_000,
            "too low".to_string(),
            "too low".to_string(),
            snapshot,
        );
        assert_eq!(record.ticker, "AAPL");
        assert_eq!(record.reason_not_to_enter_long, record.reason_not_to_enter_short);
    }
}
