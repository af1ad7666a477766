pub mod lifecycle;

pub use lifecycle::{ActivePosition, CompletedTrade, PositionManager};
