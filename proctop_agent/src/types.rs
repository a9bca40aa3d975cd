//! Snapshot types handed to the display layer and printed by the agent.
//! Keep this module minimal and stable; it defines the output format.

use serde::Serialize;

use crate::process::{format_mib, CpuTimes, NOT_AVAILABLE};
use crate::reader::Pid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessSnapshot {
    pub pid: Pid,
    pub command: String,
    pub user: String,
    /// Resident set size; `None` when VmRSS was unavailable (kernel threads, exited).
    pub resident_mib: Option<f64>,
    #[serde(flatten)]
    pub times: CpuTimes,
    pub start_time_ticks: Option<u64>,
    pub uptime_secs: i64,
    /// CPU seconds over seconds alive.
    pub cpu_utilization: f32,
    /// Share of total CPU time used since the previous refresh.
    pub recent_cpu: f32,
}

impl ProcessSnapshot {
    /// Resident memory as display text: "2.00" or "N/A".
    pub fn ram(&self) -> String {
        self.resident_mib
            .map(|mib| format_mib((mib * 1024.0).round() as u64))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    pub fn active_jiffies(&self) -> u64 {
        self.times.total()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemSummary {
    pub os_name: String,
    pub kernel: String,
    pub uptime_secs: u64,
    pub mem_utilization: f32,
    pub cpu_utilization: f32,
    pub total_processes: i64,
    pub running_processes: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub system: SystemSummary,
    pub processes: Vec<ProcessSnapshot>,
}
