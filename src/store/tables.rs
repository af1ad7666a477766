// =============================================================================
// Store table identity (§4.1, §6)
// =============================================================================
//
// Five logical tables behind the Store Gateway's generic key/value facade.
// These are names and key-builders only — no I/O lives here.
// =============================================================================

/// The five tables the Store Gateway reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    ActiveTickersForAutomatedDayTrader,
    CompletedTradesForMarketData,
    InactiveTickersForDayTrading,
    MABForDayTradingService,
    DayTraderEvents,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Self::ActiveTickersForAutomatedDayTrader => "ActiveTickersForAutomatedDayTrader",
            Self::CompletedTradesForMarketData => "CompletedTradesForMarketData",
            Self::InactiveTickersForDayTrading => "InactiveTickersForDayTrading",
            Self::MABForDayTradingService => "MABForDayTradingService",
            Self::DayTraderEvents => "DayTraderEvents",
        }
    }
}

/// Composite key for `ActiveTickersForAutomatedDayTrader`, unique per
/// (indicator, ticker) per the position-lifecycle uniqueness invariant (§4.7).
pub fn active_ticker_key(indicator: &str, ticker: &str) -> String {
    format!("{indicator}#{ticker}")
}

/// Partition key for `CompletedTradesForMarketData`: the market-local trade
/// date, so trades naturally bucket per day (§3, §4.7).
pub fn completed_trades_partition_key(market_date: &str) -> String {
    market_date.to_string()
}

/// Sort key for `InactiveTickersForDayTrading`. Fixed to `timestamp` per the
/// resolved Open Question in SPEC_FULL.md §10 item 3.
pub fn inactive_ticker_sort_key(timestamp: i64) -> String {
    timestamp.to_string()
}

/// Composite key for `MABForDayTradingService`, keyed by (indicator, ticker)
/// to match the MAB Statistics record's granularity (§3, §4.5).
pub fn mab_stats_key(indicator: &str, ticker: &str) -> String {
    format!("{indicator}#{ticker}")
}
