pub mod engine;

pub use engine::{ExitDecision, ExitDecisionEngine, ExitType};
