//! System-wide facts parsed from `/proc/stat`, `/proc/meminfo`, `/proc/uptime`,
//! `/proc/version` and os-release.
//!
//! Every fact has a `try_*` form that reports why it is missing and a plain form that
//! substitutes the sentinel the display expects.

use serde::Serialize;
use tracing::debug;

use crate::error::{StatError, StatResult};
use crate::reader::{split_fields, Pid, Resource, ResourceReader};
use crate::sampler::UtilizationSample;

pub const UNKNOWN_OS: &str = "Unknown OS";
pub const UNKNOWN_KERNEL: &str = "Unknown Kernel";
/// Process counts report this when the keyed line is missing.
pub const INVALID_COUNT: i64 = -1;

const CPU_ROW: &str = "cpu";
// "cpu" plus user..softirq; steal and the guest fields may be missing on old kernels
const MIN_COUNTER_TOKENS: usize = 8;
const MIN_IDLE_TOKENS: usize = 5;

/// The aggregate `cpu` row of `/proc/stat`, in jiffies since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSet {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
    pub guest: u64,
    pub guest_nice: u64,
}

fn sum(values: &[u64]) -> u64 {
    values.iter().fold(0u64, |acc, v| acc.saturating_add(*v))
}

impl CounterSet {
    /// Parses a tokenized `cpu` row. Rejected wholesale when the sentinel is wrong,
    /// fewer than 8 tokens are present, or any counter is not a number.
    pub fn parse(fields: &[&str]) -> StatResult<Self> {
        let resource = Resource::SystemStat;
        if fields.first() != Some(&CPU_ROW) {
            return Err(StatError::malformed(resource, "first row is not the aggregate cpu row"));
        }
        if fields.len() < MIN_COUNTER_TOKENS {
            return Err(StatError::malformed(resource, "cpu row has too few counters"));
        }
        let mut v = [0u64; 10];
        for (slot, tok) in v.iter_mut().zip(&fields[1..]) {
            *slot = tok
                .parse()
                .map_err(|_| StatError::malformed(resource, "non-numeric cpu counter"))?;
        }
        let [user, nice, system, idle, iowait, irq, softirq, steal, guest, guest_nice] = v;
        Ok(Self {
            user,
            nice,
            system,
            idle,
            iowait,
            irq,
            softirq,
            steal,
            guest,
            guest_nice,
        })
    }

    /// user + nice + system + idle + iowait + irq + softirq.
    pub fn total_jiffies(&self) -> u64 {
        sum(&[
            self.user,
            self.nice,
            self.system,
            self.idle,
            self.iowait,
            self.irq,
            self.softirq,
        ])
    }

    /// user + nice + system + irq + softirq. Steal is not counted here.
    pub fn active_jiffies(&self) -> u64 {
        sum(&[self.user, self.nice, self.system, self.irq, self.softirq])
    }

    pub fn idle_jiffies(&self) -> u64 {
        sum(&[self.idle, self.iowait])
    }

    /// Reading used by the system-wide sampler: active counts steal, total is
    /// active plus idle plus iowait.
    pub fn utilization_sample(&self) -> UtilizationSample {
        let active = self.active_jiffies().saturating_add(self.steal);
        UtilizationSample {
            active,
            total: active.saturating_add(self.idle_jiffies()),
        }
    }
}

/// Values of interest from `/proc/meminfo`, in kB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemInfo {
    pub total: Option<u64>,
    pub free: u64,
    pub buffers: u64,
    pub cached: u64,
    pub available: Option<u64>,
}

impl MemInfo {
    pub fn parse(text: &str) -> Self {
        let mut info = MemInfo::default();
        for line in text.lines() {
            let mut it = line.split_whitespace();
            let (Some(key), Some(value)) = (it.next(), it.next()) else {
                continue;
            };
            let Ok(value) = value.parse::<u64>() else {
                continue;
            };
            match key {
                "MemTotal:" => info.total = Some(value),
                "MemFree:" => info.free = value,
                "Buffers:" => info.buffers = value,
                "Cached:" => info.cached = value,
                "MemAvailable:" => info.available = Some(value),
                _ => {}
            }
        }
        info
    }

    /// MemAvailable when the kernel reports a nonzero value, else free + buffers + cached.
    pub fn available_kb(&self) -> u64 {
        self.available
            .filter(|&kb| kb > 0)
            .unwrap_or_else(|| sum(&[self.free, self.buffers, self.cached]))
    }

    /// `1 - available / total`, never negative.
    pub fn utilization(&self) -> StatResult<f32> {
        match self.total {
            Some(total) if total > 0 => {
                let ratio = 1.0 - self.available_kb() as f64 / total as f64;
                Ok(ratio.max(0.0) as f32)
            }
            _ => Err(StatError::malformed(Resource::MemInfo, "MemTotal missing or zero")),
        }
    }
}

/// Whole seconds from the first token of `/proc/uptime` ("12345.67 ...").
pub fn parse_uptime(text: &str) -> StatResult<u64> {
    let token = text
        .split_whitespace()
        .next()
        .ok_or(StatError::malformed(Resource::Uptime, "empty uptime"))?;
    let whole = token.split('.').next().unwrap_or(token);
    whole
        .parse()
        .map_err(|_| StatError::malformed(Resource::Uptime, "non-numeric uptime"))
}

/// Value of `PRETTY_NAME=` with surrounding quotes removed.
pub fn parse_pretty_name(text: &str) -> Option<String> {
    text.lines().find_map(|line| {
        let (key, value) = line.split_once('=')?;
        (key.trim() == "PRETTY_NAME")
            .then(|| value.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
    })
}

/// Third token of the version line: `Linux version 6.8.0-45-generic ...`.
pub fn parse_kernel(line: &str) -> Option<String> {
    split_fields(line).get(2).map(|s| s.to_string())
}

/// First integer after a line starting with `key`, e.g. `procs_running 3`.
pub fn parse_keyed_count(text: &str, key: &str) -> Option<i64> {
    text.lines().find_map(|line| {
        let mut it = line.split_whitespace();
        if it.next()? != key {
            return None;
        }
        it.next()?.parse().ok()
    })
}

/// Directory names made only of decimal digits that fit a pid.
pub fn parse_pids<S: AsRef<str>>(entries: &[S]) -> Vec<Pid> {
    let mut pids: Vec<Pid> = entries
        .iter()
        .map(|s| s.as_ref())
        .filter(|name| !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|name| name.parse().ok())
        .collect();
    pids.sort_unstable();
    pids
}

/// Everything taken from one read of `/proc/stat`: the aggregate cpu row and
/// the process counts. A refresh derives all of its stat-based values from one
/// of these so they describe the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatReading {
    pub counters: Option<CounterSet>,
    pub total_processes: i64,
    pub running_processes: i64,
}

impl StatReading {
    pub fn parse(text: &str) -> Self {
        let first = text.lines().next().unwrap_or_default();
        let counters = CounterSet::parse(&split_fields(first))
            .map_err(|e| debug!(error = %e, "cpu row unusable"))
            .ok();
        Self {
            counters,
            total_processes: parse_keyed_count(text, "processes").unwrap_or(INVALID_COUNT),
            running_processes: parse_keyed_count(text, "procs_running").unwrap_or(INVALID_COUNT),
        }
    }

    /// Used when the stat source cannot be read at all.
    pub fn unavailable() -> Self {
        Self {
            counters: None,
            total_processes: INVALID_COUNT,
            running_processes: INVALID_COUNT,
        }
    }

    pub fn total_jiffies(&self) -> u64 {
        self.counters.map(|c| c.total_jiffies()).unwrap_or(0)
    }
}

fn fallback<T>(result: StatResult<T>, what: &'static str, sentinel: T) -> T {
    result.unwrap_or_else(|e| {
        debug!(error = %e, "{what} unavailable, using sentinel");
        sentinel
    })
}

/// System-wide view over a reader.
pub struct SystemStats<'a, R: ?Sized> {
    reader: &'a R,
}

impl<'a, R: ResourceReader + ?Sized> SystemStats<'a, R> {
    pub fn new(reader: &'a R) -> Self {
        Self { reader }
    }

    pub fn try_counters(&self) -> StatResult<CounterSet> {
        let fields = self.reader.read_fields(&Resource::SystemStat)?;
        let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
        CounterSet::parse(&fields)
    }

    /// `None` when the cpu row is absent or malformed.
    pub fn counters(&self) -> Option<CounterSet> {
        self.try_counters().ok()
    }

    pub fn total_jiffies(&self) -> u64 {
        fallback(self.try_counters().map(|c| c.total_jiffies()), "total jiffies", 0)
    }

    pub fn active_jiffies(&self) -> u64 {
        fallback(self.try_counters().map(|c| c.active_jiffies()), "active jiffies", 0)
    }

    /// One read of the stat source, parsed for counters and process counts.
    pub fn stat_reading(&self) -> StatReading {
        match self.reader.read_text(&Resource::SystemStat) {
            Ok(text) => StatReading::parse(&text),
            Err(e) => {
                debug!(error = %e, "stat unavailable, using sentinels");
                StatReading::unavailable()
            }
        }
    }

    pub fn try_idle_jiffies(&self) -> StatResult<u64> {
        let resource = Resource::SystemStat;
        let fields = self.reader.read_fields(&resource)?;
        if fields.first().map(String::as_str) != Some(CPU_ROW) {
            return Err(StatError::malformed(resource, "first row is not the aggregate cpu row"));
        }
        if fields.len() < MIN_IDLE_TOKENS {
            return Err(StatError::malformed(resource, "cpu row has too few counters"));
        }
        let parse = |tok: &String| {
            tok.parse::<u64>()
                .map_err(|_| StatError::malformed(resource, "non-numeric cpu counter"))
        };
        let idle = parse(&fields[4])?;
        let iowait = fields.get(5).map(parse).transpose()?.unwrap_or(0);
        Ok(idle.saturating_add(iowait))
    }

    pub fn idle_jiffies(&self) -> u64 {
        fallback(self.try_idle_jiffies(), "idle jiffies", 0)
    }

    pub fn try_memory_utilization(&self) -> StatResult<f32> {
        let text = self.reader.read_text(&Resource::MemInfo)?;
        MemInfo::parse(&text).utilization()
    }

    pub fn memory_utilization(&self) -> f32 {
        fallback(self.try_memory_utilization(), "memory utilization", 0.0)
    }

    pub fn try_uptime(&self) -> StatResult<u64> {
        parse_uptime(&self.reader.read_text(&Resource::Uptime)?)
    }

    pub fn uptime(&self) -> u64 {
        fallback(self.try_uptime(), "uptime", 0)
    }

    pub fn try_operating_system(&self) -> StatResult<String> {
        let text = self.reader.read_text(&Resource::OsRelease)?;
        parse_pretty_name(&text)
            .ok_or(StatError::malformed(Resource::OsRelease, "no PRETTY_NAME"))
    }

    pub fn operating_system(&self) -> String {
        fallback(self.try_operating_system(), "os name", UNKNOWN_OS.to_string())
    }

    pub fn try_kernel(&self) -> StatResult<String> {
        let line = self.reader.read_line(&Resource::Version)?;
        parse_kernel(&line).ok_or(StatError::malformed(Resource::Version, "too few fields"))
    }

    pub fn kernel(&self) -> String {
        fallback(self.try_kernel(), "kernel version", UNKNOWN_KERNEL.to_string())
    }

    pub fn try_pids(&self) -> StatResult<Vec<Pid>> {
        let entries = self.reader.process_entries()?;
        Ok(parse_pids(entries.as_slice()))
    }

    pub fn pids(&self) -> Vec<Pid> {
        fallback(self.try_pids(), "pid list", Vec::new())
    }

    fn try_keyed(&self, key: &str) -> StatResult<i64> {
        let text = self.reader.read_text(&Resource::SystemStat)?;
        parse_keyed_count(&text, key)
            .ok_or(StatError::malformed(Resource::SystemStat, "process count line missing"))
    }

    pub fn try_total_processes(&self) -> StatResult<i64> {
        self.try_keyed("processes")
    }

    pub fn total_processes(&self) -> i64 {
        fallback(self.try_total_processes(), "total processes", INVALID_COUNT)
    }

    pub fn try_running_processes(&self) -> StatResult<i64> {
        self.try_keyed("procs_running")
    }

    pub fn running_processes(&self) -> i64 {
        fallback(self.try_running_processes(), "running processes", INVALID_COUNT)
    }
}
