pub mod cache;
pub mod provider;

pub use cache::SnapshotCache;
pub use provider::{HttpMarketDataProvider, MarketDataProvider, ScreenerResult, SnapshotBatch};
