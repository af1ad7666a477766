pub mod config;
pub mod golden;
pub mod runner;

pub use config::{Indicator, StrategyConfig};
pub use golden::is_golden;
pub use runner::{StrategyRunner, StrategyServices};
