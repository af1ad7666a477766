// =============================================================================
// Memory Governor (C10)
// =============================================================================
//
// Samples resident process memory on demand via `sysinfo`, the way
// `MemoryProfiler::system_memory` caches a single `System` instance behind a
// lock rather than re-initializing it per call (expensive). Consulted by the
// Market-Data Adapter at the start of a batch and between sub-batches (§4.2,
// §4.10, §5).
// =============================================================================

use parking_lot::Mutex;
use sysinfo::{Pid, ProcessRefreshKind, System};
use tracing::{debug, warn};

/// Adaptive batch-sizing limits exposed to callers.
#[derive(Debug, Clone, Copy)]
pub struct ConfiguredLimits {
    pub max_concurrent_fetch: usize,
    pub batch_size: usize,
}

pub struct MemoryGovernor {
    system: Mutex<System>,
    pid: Pid,
    pause_mb: u64,
    abort_mb: u64,
    max_concurrent_fetch: usize,
    batch_size: usize,
}

impl MemoryGovernor {
    /// `pause_mb`/`abort_mb` are configuration-driven (§4.10: "pause at
    /// 400 MB, abort at 550 MB on a 1 GB instance" is the illustrative
    /// default); `limit_mb` from `EngineConfig` derives both via fixed
    /// fractions unless the caller overrides them.
    pub fn new(limit_mb: u64, max_concurrent_fetch: usize, batch_size: usize) -> Self {
        Self {
            system: Mutex::new(System::new()),
            pid: Pid::from_u32(std::process::id()),
            pause_mb: limit_mb * 4 / 10,
            abort_mb: limit_mb * 55 / 100,
            max_concurrent_fetch,
            batch_size,
        }
    }

    /// Resident memory of this process, in megabytes.
    pub fn current_mb(&self) -> u64 {
        let mut sys = self.system.lock();
        sys.refresh_processes_specifics(
            sysinfo::ProcessesToUpdate::Some(&[self.pid]),
            ProcessRefreshKind::new().with_memory(),
        );
        sys.process(self.pid)
            .map(|p| p.memory() / (1024 * 1024))
            .unwrap_or(0)
    }

    pub fn configured_limits(&self) -> ConfiguredLimits {
        ConfiguredLimits {
            max_concurrent_fetch: self.max_concurrent_fetch,
            batch_size: self.batch_size,
        }
    }

    pub fn should_pause_fetch(&self) -> bool {
        let mb = self.current_mb();
        let pause = mb >= self.pause_mb;
        if pause {
            debug!(mb, pause_mb = self.pause_mb, "memory pause threshold crossed");
        }
        pause
    }

    pub fn should_abort_fetch(&self) -> bool {
        let mb = self.current_mb();
        let abort = mb >= self.abort_mb;
        if abort {
            warn!(mb, abort_mb = self.abort_mb, "memory abort threshold crossed");
        }
        abort
    }

    /// GC-hint + cache purge equivalent: there is no GC to hint in Rust, so
    /// this forces an immediate memory re-sample (invalidating any stale
    /// cached reading) and is a seam for callers to drop their own
    /// per-cycle caches (§4.10: "Forces a reclamation pass").
    pub fn force_reclamation_pass(&self) {
        let mut sys = self.system.lock();
        sys.refresh_processes_specifics(
            sysinfo::ProcessesToUpdate::Some(&[self.pid]),
            ProcessRefreshKind::new().with_memory(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_derive_from_limit() {
        let gov = MemoryGovernor::new(1000, 8, 25);
        assert_eq!(gov.pause_mb, 400);
        assert_eq!(gov.abort_mb, 550);
    }

    #[test]
    fn current_mb_is_nonzero_for_running_process() {
        let gov = MemoryGovernor::new(1024, 8, 25);
        assert!(gov.current_mb() > 0);
    }
}
