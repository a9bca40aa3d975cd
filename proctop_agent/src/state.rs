//! Monitor: owns the reader, the account directory and all sampling state.
//!
//! One caller drives it with `refresh()`; nothing here is shared or locked.
//! A refresh reads `/proc/stat` once and derives the cpu sample, the jiffy
//! denominator for per-pid samplers and the process counts from that read.
//! OS name and kernel are read until they succeed once, then kept.

use tracing::debug;

use crate::clock::clock_ticks_per_second;
use crate::config::AgentConfig;
use crate::reader::{ProcFs, ResourceReader};
use crate::registry::{LiveProcesses, ProcessRegistry, Reconciled};
use crate::sampler::CpuSampler;
use crate::system::{StatReading, SystemStats};
use crate::types::{ProcessSnapshot, Snapshot, SystemSummary};
use crate::users::{AccountDirectory, SystemAccounts};

pub struct Monitor<R = ProcFs, D = SystemAccounts> {
    reader: R,
    accounts: D,
    ticks_per_sec: u64,
    cpu: CpuSampler,
    cpu_utilization: f32,
    registry: ProcessRegistry,
    os_name: Option<String>,
    kernel: Option<String>,
    summary: Option<SystemSummary>,
}

impl Monitor<ProcFs, SystemAccounts> {
    /// Monitor over the local host using the configured source paths.
    pub fn local(cfg: &AgentConfig) -> Self {
        Self::new(
            ProcFs::new(&cfg.proc_root, &cfg.os_release),
            SystemAccounts::new(),
            clock_ticks_per_second(),
        )
    }
}

impl<R: ResourceReader, D: AccountDirectory> Monitor<R, D> {
    pub fn new(reader: R, accounts: D, ticks_per_sec: u64) -> Self {
        Self {
            reader,
            accounts,
            ticks_per_sec,
            cpu: CpuSampler::new(),
            cpu_utilization: 0.0,
            registry: ProcessRegistry::new(),
            os_name: None,
            kernel: None,
            summary: None,
        }
    }

    pub fn system(&self) -> SystemStats<'_, R> {
        SystemStats::new(&self.reader)
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn reader_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// One poll: samples system CPU and reconciles the process set.
    pub fn refresh(&mut self) -> SystemSummary {
        self.accounts.refresh();

        let system = SystemStats::new(&self.reader);
        let reading = system.stat_reading();
        let uptime = system.uptime();
        let mem_utilization = system.memory_utilization();

        self.cpu_utilization = self.sample_reading(&reading);
        let live = LiveProcesses::at(
            &self.reader,
            &self.accounts,
            self.ticks_per_sec,
            uptime,
            reading.total_jiffies(),
        );
        let changes = self.registry.refresh(&live);
        debug!(
            tracked = self.registry.len(),
            inserted = changes.inserted.len(),
            evicted = changes.evicted.len(),
            "refresh complete"
        );

        self.cache_release_info();
        let summary = SystemSummary {
            os_name: self.operating_system(),
            kernel: self.kernel(),
            uptime_secs: uptime,
            mem_utilization,
            cpu_utilization: self.cpu_utilization,
            total_processes: reading.total_processes,
            running_processes: reading.running_processes,
        };
        self.summary = Some(summary.clone());
        summary
    }

    fn sample_reading(&mut self, reading: &StatReading) -> f32 {
        match reading.counters {
            Some(counters) => self.cpu.sample(counters.utilization_sample()),
            None => 0.0,
        }
    }

    fn cache_release_info(&mut self) {
        let system = SystemStats::new(&self.reader);
        if self.os_name.is_none() {
            self.os_name = system.try_operating_system().ok();
        }
        if self.kernel.is_none() {
            self.kernel = system.try_kernel().ok();
        }
    }

    /// Feeds the system sampler; a missing or malformed cpu row leaves the
    /// previous reading untouched and reports 0.0.
    pub fn sample_cpu(&mut self) -> f32 {
        let reading = self.system().stat_reading();
        self.cpu_utilization = self.sample_reading(&reading);
        self.cpu_utilization
    }

    pub fn refresh_processes(&mut self) -> Reconciled {
        let live = LiveProcesses::new(&self.reader, &self.accounts, self.ticks_per_sec);
        self.registry.refresh(&live)
    }

    /// Utilization measured by the last `refresh`/`sample_cpu`.
    pub fn cpu_utilization(&self) -> f32 {
        self.cpu_utilization
    }

    pub fn memory_utilization(&self) -> f32 {
        self.system().memory_utilization()
    }

    pub fn operating_system(&self) -> String {
        self.os_name
            .clone()
            .unwrap_or_else(|| self.system().operating_system())
    }

    pub fn kernel(&self) -> String {
        self.kernel.clone().unwrap_or_else(|| self.system().kernel())
    }

    pub fn uptime(&self) -> u64 {
        self.system().uptime()
    }

    /// As of the last refresh; read live before the first one.
    pub fn total_processes(&self) -> i64 {
        match &self.summary {
            Some(s) => s.total_processes,
            None => self.system().total_processes(),
        }
    }

    pub fn running_processes(&self) -> i64 {
        match &self.summary {
            Some(s) => s.running_processes,
            None => self.system().running_processes(),
        }
    }

    pub fn processes(&self) -> Vec<&ProcessSnapshot> {
        self.registry.processes()
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    /// The summary produced by the last refresh, or a fresh read before the first.
    pub fn summary(&self) -> SystemSummary {
        if let Some(s) = &self.summary {
            return s.clone();
        }
        let system = self.system();
        let reading = system.stat_reading();
        SystemSummary {
            os_name: self.operating_system(),
            kernel: self.kernel(),
            uptime_secs: system.uptime(),
            mem_utilization: system.memory_utilization(),
            cpu_utilization: self.cpu_utilization,
            total_processes: reading.total_processes,
            running_processes: reading.running_processes,
        }
    }

    /// Summary plus the ordered process list, optionally cut to the first `top`.
    pub fn snapshot(&self, top: Option<usize>) -> Snapshot {
        let mut processes: Vec<ProcessSnapshot> =
            self.registry.processes().into_iter().cloned().collect();
        if let Some(k) = top {
            processes.truncate(k);
        }
        Snapshot {
            system: self.summary(),
            processes,
        }
    }
}
