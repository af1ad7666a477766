// =============================================================================
// Configuration — env-driven engine settings
// =============================================================================
//
// Follows the teacher's `RuntimeConfig` pattern (atomic tmp+rename JSON
// persistence, `#[serde(default = "...")]` forward-compatible fields) but
// sources its primary values from environment variables per §6, since that
// is how the memory/batch knobs are delivered in this system. Per-strategy
// tunables live in `strategy::config`.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// =============================================================================
// Defaults
// =============================================================================

fn default_max_tickers_per_cycle() -> usize {
    25
}

fn default_max_concurrent_fetch() -> usize {
    8
}

fn default_dynamodb_batch_size() -> usize {
    25
}

fn default_memory_limit_mb() -> u64 {
    1024
}

fn default_startup_delay_secs() -> u64 {
    5
}

// =============================================================================
// EngineConfig — global, shared across all strategy runners
// =============================================================================

/// Global engine configuration, loaded once at startup from the environment
/// (§6) with JSON-file override support for local development.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_max_tickers_per_cycle")]
    pub max_tickers_per_cycle: usize,

    #[serde(default = "default_max_concurrent_fetch")]
    pub max_concurrent_fetch: usize,

    #[serde(default = "default_dynamodb_batch_size")]
    pub dynamodb_batch_size: usize,

    /// Resident-memory pause threshold in MB (C10).
    #[serde(default = "default_memory_limit_mb")]
    pub memory_limit_mb: u64,

    /// Randomized per-strategy startup stagger ceiling, in seconds (§5).
    #[serde(default = "default_startup_delay_secs")]
    pub startup_delay_seconds: u64,

    /// Base URL for the market-data provider (§6).
    #[serde(default)]
    pub market_data_base_url: String,

    /// Base URL for the key/value store's HTTP facade (§4.1, §6).
    #[serde(default)]
    pub store_base_url: String,

    /// Webhook endpoint for signal emission (§6).
    #[serde(default)]
    pub webhook_url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_tickers_per_cycle: default_max_tickers_per_cycle(),
            max_concurrent_fetch: default_max_concurrent_fetch(),
            dynamodb_batch_size: default_dynamodb_batch_size(),
            memory_limit_mb: default_memory_limit_mb(),
            startup_delay_seconds: default_startup_delay_secs(),
            market_data_base_url: String::new(),
            store_base_url: String::new(),
            webhook_url: String::new(),
        }
    }
}

impl EngineConfig {
    /// Build from environment variables, falling back to defaults for any
    /// variable that is absent or unparsable.
    pub fn from_env() -> Self {
        Self {
            max_tickers_per_cycle: env_usize(
                "MAX_TICKERS_PER_CYCLE",
                default_max_tickers_per_cycle(),
            ),
            max_concurrent_fetch: env_usize(
                "MAX_CONCURRENT_FETCH",
                default_max_concurrent_fetch(),
            ),
            dynamodb_batch_size: env_usize(
                "DYNAMODB_BATCH_SIZE",
                default_dynamodb_batch_size(),
            ),
            memory_limit_mb: env_u64("MEMORY_LIMIT_MB", default_memory_limit_mb()),
            startup_delay_seconds: env_u64(
                "INDICATOR_STARTUP_DELAY_SECONDS",
                default_startup_delay_secs(),
            ),
            market_data_base_url: std::env::var("MARKET_DATA_BASE_URL").unwrap_or_default(),
            store_base_url: std::env::var("STORE_BASE_URL").unwrap_or_default(),
            webhook_url: std::env::var("SIGNAL_WEBHOOK_URL").unwrap_or_default(),
        }
    }

    /// Load from a JSON file, falling back to `from_env` if the file is
    /// absent (mirrors the teacher's `RuntimeConfig::load` fallback idiom in
    /// `main.rs`).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config from {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse engine config from {}", path.display()))?;
        info!(path = %path.display(), "engine config loaded");
        Ok(config)
    }

    /// Persist via the atomic tmp+rename pattern, matching
    /// `RuntimeConfig::save`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise engine config to JSON")?;
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_config_defaults_are_sane() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.max_tickers_per_cycle, 25);
        assert_eq!(cfg.dynamodb_batch_size, 25);
    }
}
