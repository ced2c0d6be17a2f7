//! Memory watchdog
//!
//! Samples process resident memory before each externally-bound stage and
//! terminates the process outright when the configured threshold is
//! exceeded. The hosting environment restarts a dead process with a clean
//! memory image; crash-is-the-recovery-mechanism is the intended policy
//! here, not a bug. The in-flight caller gets no response and observes a
//! connection failure.
//!
//! With the per-job temp-directory arena carrying deterministic cleanup,
//! the watchdog is an optional outer guard: a zero threshold disables it.

use tracing::{debug, error};

/// Memory-pressure guard; one instance per request
#[derive(Debug, Clone, Copy)]
pub struct MemoryWatchdog {
    limit_bytes: u64,
}

impl MemoryWatchdog {
    /// `limit_bytes == 0` disables the guard
    pub fn new(limit_bytes: u64) -> Self {
        Self { limit_bytes }
    }

    pub fn enabled(&self) -> bool {
        self.limit_bytes > 0
    }

    /// Sample resident memory; terminate the process if over the limit.
    ///
    /// Called at job start and before each externally-bound stage, never
    /// inside a loop. The termination is process-global and unconditional;
    /// it deliberately takes no locks and waits for nothing.
    pub fn check(&self, stage: &str) {
        if !self.enabled() {
            return;
        }
        let Some(rss_bytes) = resident_memory_bytes() else {
            debug!(stage = stage, "Resident memory sample unavailable, skipping check");
            return;
        };
        if exceeds_limit(rss_bytes, self.limit_bytes) {
            error!(
                stage = stage,
                rss_bytes = rss_bytes,
                limit_bytes = self.limit_bytes,
                "Resident memory over limit, terminating process for a clean restart"
            );
            std::process::exit(1);
        }
        debug!(stage = stage, rss_bytes = rss_bytes, "Memory check passed");
    }
}

fn exceeds_limit(rss_bytes: u64, limit_bytes: u64) -> bool {
    rss_bytes > limit_bytes
}

/// Instantaneous VmRSS reading; recomputed on every call, never cached
pub fn resident_memory_bytes() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        let contents = std::fs::read_to_string("/proc/self/status").ok()?;
        for line in contents.lines() {
            if let Some(rest) = line.strip_prefix("VmRSS:") {
                let kib = rest.trim().strip_suffix("kB")?.trim();
                return kib.parse::<u64>().ok().map(|v| v * 1024);
            }
        }
        None
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_limit_disables_guard() {
        let watchdog = MemoryWatchdog::new(0);
        assert!(!watchdog.enabled());
        // Must be a no-op even though RSS certainly exceeds zero
        watchdog.check("unit-test");
    }

    #[test]
    fn test_generous_limit_does_not_terminate() {
        let watchdog = MemoryWatchdog::new(u64::MAX);
        assert!(watchdog.enabled());
        watchdog.check("unit-test");
    }

    #[test]
    fn test_threshold_comparison() {
        assert!(exceeds_limit(101, 100));
        assert!(!exceeds_limit(100, 100));
        assert!(!exceeds_limit(99, 100));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_sampler_reads_rss() {
        let rss = resident_memory_bytes().expect("VmRSS should be readable on Linux");
        assert!(rss > 0);
    }
}
