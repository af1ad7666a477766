// =============================================================================
// Per-cycle technical-snapshot cache (§4.2, §5)
// =============================================================================
//
// Read-mostly within a single entry tick, cleared between ticks — mirrors the
// teacher's `CandleBuffer` in shape (keyed ring of market data behind a
// `parking_lot::RwLock`) but holds one `TechnicalSnapshot` per ticker instead
// of a candle series, since nothing here needs history beyond the latest
// computed snapshot.
// =============================================================================

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::types::TechnicalSnapshot;

pub struct SnapshotCache {
    entries: RwLock<HashMap<String, TechnicalSnapshot>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, ticker: &str) -> Option<TechnicalSnapshot> {
        self.entries.read().get(ticker).cloned()
    }

    pub fn insert(&self, ticker: String, snapshot: TechnicalSnapshot) {
        self.entries.write().insert(ticker, snapshot);
    }

    /// Called at the top of every entry tick (§5: "cleared between ticks").
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_empties_the_cache() {
        let cache = SnapshotCache::new();
        cache.insert("AAPL".to_string(), TechnicalSnapshot::default_for_close(100.0));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
