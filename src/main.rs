// =============================================================================
// Automated Day Trader — Main Entry Point
// =============================================================================
//
// Reads environment, wires the shared infrastructure (Store Gateway,
// Market-Data Adapter, MAB selector, Position Manager, Exit Engine, webhook,
// snapshot cache, Memory Governor), launches the Coordinator, and blocks
// until an OS shutdown signal arrives (§4.9, §6).
// =============================================================================

mod config;
mod coordinator;
mod error;
mod exit;
mod indicators;
mod mab;
mod market_data;
mod memory_governor;
mod position;
mod store;
mod strategy;
mod time_util;
mod types;
mod validation;
mod webhook;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::EngineConfig;
use crate::coordinator::Coordinator;
use crate::exit::ExitDecisionEngine;
use crate::mab::MabSelector;
use crate::market_data::{HttpMarketDataProvider, SnapshotCache};
use crate::memory_governor::MemoryGovernor;
use crate::position::PositionManager;
use crate::store::HttpStoreGateway;
use crate::strategy::{StrategyConfig, StrategyServices};
use crate::webhook::WebhookClient;

const CONFIG_PATH: &str = "engine_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        Automated Day Trader — Starting Up                ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let config = EngineConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "failed to load engine config, falling back to environment");
        EngineConfig::from_env()
    });

    let strategy_configs = StrategyConfig::enabled_from_env();
    if strategy_configs.is_empty() {
        error!("no strategies enabled (set ENABLE_MOMENTUM_INDICATOR / ENABLE_PENNY_STOCKS_INDICATOR) — refusing to start");
        anyhow::bail!("no strategies enabled");
    }
    info!(
        strategies = ?strategy_configs.iter().map(|c| c.indicator.as_str()).collect::<Vec<_>>(),
        "strategies enabled"
    );

    if config.store_base_url.is_empty() || config.market_data_base_url.is_empty() {
        error!("STORE_BASE_URL / MARKET_DATA_BASE_URL must both be set — refusing to start");
        anyhow::bail!("missing provider configuration");
    }

    // ── 2. Build shared infrastructure ───────────────────────────────────
    let limits = config.max_concurrent_fetch;
    let store: Arc<dyn crate::store::StoreGateway> = Arc::new(HttpStoreGateway::new(config.store_base_url.clone()));
    let services = Arc::new(StrategyServices {
        store: store.clone(),
        market_data: Arc::new(HttpMarketDataProvider::new(config.market_data_base_url.clone())),
        mab: Arc::new(MabSelector::new(store.clone())),
        positions: Arc::new(PositionManager::new()),
        exit_engine: Arc::new(ExitDecisionEngine::new()),
        webhook: Arc::new(WebhookClient::new(config.webhook_url.clone())),
        cache: Arc::new(SnapshotCache::new()),
        memory_governor: Arc::new(MemoryGovernor::new(config.memory_limit_mb, limits, config.dynamodb_batch_size)),
    });

    // ── 3. Coordinator ────────────────────────────────────────────────────
    let coordinator = Coordinator::new(strategy_configs, services);
    if coordinator.is_empty() {
        anyhow::bail!("coordinator has no runners to launch");
    }

    let startup_delay = Duration::from_secs(config.startup_delay_seconds);

    info!("all strategy runners launching. Press Ctrl+C to stop.");

    // ── 4. Run until an OS shutdown signal arrives, then drain gracefully ──
    tokio::select! {
        _ = coordinator.run(startup_delay) => {
            warn!("all strategy runners exited on their own");
        }
        result = tokio::signal::ctrl_c() => {
            result?;
            warn!("shutdown signal received — stopping gracefully");
            coordinator.shutdown().await;
        }
    }

    if let Err(e) = config.save(CONFIG_PATH) {
        error!(error = %e, "failed to save engine config on shutdown");
    }

    info!("automated day trader shut down complete.");
    Ok(())
}
