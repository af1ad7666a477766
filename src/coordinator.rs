// =============================================================================
// Coordinator (C9) — launches and supervises strategy runners
// =============================================================================
//
// Shaped like the teacher's `main.rs` spawn-loop idiom (one `tokio::spawn`
// per subsystem, errors logged and isolated rather than propagated) but
// generalized to an arbitrary number of enabled strategies instead of a
// fixed set of market-data streams (§4.9, §5).
// =============================================================================

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};

use crate::strategy::{StrategyConfig, StrategyRunner, StrategyServices};

/// Grace period the coordinator waits for in-flight ticks to finish after
/// flipping every runner's `running` flag to false (§4.9).
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Owns the set of running strategy runners and their cancellation flags.
pub struct Coordinator {
    runners: Vec<Arc<StrategyRunner>>,
}

impl Coordinator {
    /// Builds one runner per enabled `StrategyConfig`, sharing the given
    /// infrastructure across all of them.
    pub fn new(configs: Vec<StrategyConfig>, services: Arc<StrategyServices>) -> Self {
        let runners = configs
            .into_iter()
            .map(|config| Arc::new(StrategyRunner::new(config, services.clone())))
            .collect();
        Self { runners }
    }

    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }

    /// Launches every runner with a small randomized startup stagger so the
    /// first entry ticks don't all hit the market-data provider at once
    /// (§5 "Startup stagger"), and error-isolates each runner's panic so one
    /// strategy crashing never halts the others (§4.9, §7).
    ///
    /// Returns once every runner's task has exited — which only happens
    /// after `shutdown()` is called or a runner's task panics.
    pub async fn run(&self, startup_delay_ceiling: Duration) {
        let mut handles = Vec::with_capacity(self.runners.len());

        for runner in &self.runners {
            let runner = runner.clone();
            let stagger = if startup_delay_ceiling.is_zero() {
                Duration::ZERO
            } else {
                let ceiling_ms = startup_delay_ceiling.as_millis().max(1) as u64;
                Duration::from_millis(rand::thread_rng().gen_range(0..ceiling_ms))
            };

            handles.push(tokio::spawn(async move {
                tokio::time::sleep(stagger).await;
                runner.run().await;
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "strategy runner task panicked — isolated, other strategies unaffected");
            }
        }
    }

    /// Flips every runner's cancellation flag and waits out the grace
    /// period for in-flight ticks to complete (§4.9, §5 "Cancellation").
    pub async fn shutdown(&self) {
        for runner in &self.runners {
            runner.running_flag().store(false, Ordering::Relaxed);
        }
        info!(strategies = self.runners.len(), "shutdown signal published, waiting for in-flight ticks");
        tokio::time::sleep(SHUTDOWN_GRACE_PERIOD).await;
    }
}
