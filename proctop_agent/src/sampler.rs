//! CPU utilization from monotonic jiffy counters.
//!
//! A single reading only gives the since-boot average, so the sampler keeps the
//! previous (active, total) pair and reports the ratio of the two deltas.

use crate::process::CpuTimes;

/// One (active, total) reading in jiffies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UtilizationSample {
    pub active: u64,
    pub total: u64,
}

/// Delta sampler for one scope: the whole system, or a single pid.
#[derive(Debug, Clone, Default)]
pub struct CpuSampler {
    prev: Option<UtilizationSample>,
}

impl CpuSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a reading and returns utilization in `0.0..=1.0` since the previous one.
    ///
    /// Returns 0.0 on the first call (no baseline), when the total did not advance,
    /// or when it went backwards (counter reset).
    pub fn sample(&mut self, now: UtilizationSample) -> f32 {
        let prev = self.prev.replace(now);
        let Some(prev) = prev else {
            return 0.0;
        };
        let Some(total_diff) = now.total.checked_sub(prev.total) else {
            return 0.0;
        };
        if total_diff == 0 {
            return 0.0;
        }
        let active_diff = now.active.saturating_sub(prev.active);
        (active_diff as f64 / total_diff as f64).clamp(0.0, 1.0) as f32
    }

    pub fn previous(&self) -> Option<UtilizationSample> {
        self.prev
    }

    pub fn reset(&mut self) {
        self.prev = None;
    }
}

/// Lifetime utilization of a process: cpu seconds over seconds alive.
pub fn process_utilization(times: &CpuTimes, uptime_secs: i64, ticks_per_sec: u64) -> f32 {
    if uptime_secs <= 0 || ticks_per_sec == 0 {
        return 0.0;
    }
    let cpu_secs = times.total() as f64 / ticks_per_sec as f64;
    (cpu_secs / uptime_secs as f64) as f32
}
