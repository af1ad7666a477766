// =============================================================================
// Market-local time helpers — America/New_York, DST-aware
// =============================================================================
//
// Completed Trades store their enter/exit timestamps in market-local time
// (§3, §4.7, §8): "both timestamps carry an America/New_York offset (−05:00
// or −04:00)". `chrono-tz` carries the IANA tzdata so the EST/EDT switch is
// handled without a hand-rolled DST table.
// =============================================================================

use chrono::{DateTime, Utc};
use chrono_tz::America::New_York;

/// Current time, already converted to America/New_York.
pub fn now_market_local() -> DateTime<chrono_tz::Tz> {
    Utc::now().with_timezone(&New_York)
}

/// Convert a UTC instant to America/New_York.
pub fn to_market_local(utc: DateTime<Utc>) -> DateTime<chrono_tz::Tz> {
    utc.with_timezone(&New_York)
}

/// RFC 3339 rendering with the explicit ∓05:00/∓04:00 offset, as required for
/// Completed Trade timestamps.
pub fn format_market_local(dt: DateTime<chrono_tz::Tz>) -> String {
    dt.to_rfc3339()
}

/// Today's date in the market's local calendar, `yyyy-mm-dd`. Used as the
/// partition key for `CompletedTradesForMarketData` and as the day boundary
/// for daily counters / MAB resets.
pub fn today_market_date() -> String {
    now_market_local().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn winter_offset_is_est() {
        let winter = Utc.with_ymd_and_hms(2026, 1, 15, 15, 0, 0).unwrap();
        let local = to_market_local(winter);
        assert_eq!(local.format("%:z").to_string(), "-05:00");
    }

    #[test]
    fn summer_offset_is_edt() {
        let summer = Utc.with_ymd_and_hms(2026, 7, 15, 15, 0, 0).unwrap();
        let local = to_market_local(summer);
        assert_eq!(local.format("%:z").to_string(), "-04:00");
    }

    #[test]
    fn exit_after_enter_preserves_order() {
        let enter = Utc.with_ymd_and_hms(2026, 3, 10, 14, 30, 0).unwrap();
        let exit = Utc.with_ymd_and_hms(2026, 3, 10, 15, 0, 0).unwrap();
        let enter_local = to_market_local(enter);
        let exit_local = to_market_local(exit);
        assert!(exit_local >= enter_local);
    }
}
