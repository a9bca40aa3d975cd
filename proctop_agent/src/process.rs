//! Per-process facts from `/proc/<pid>/{stat,status,cmdline}`.
//!
//! A process can exit between any two reads, so every accessor degrades to a
//! sentinel instead of failing; the `try_*` forms keep the reason.

use serde::Serialize;
use tracing::trace;

use crate::error::{StatError, StatResult};
use crate::reader::{split_fields, Pid, Resource, ResourceReader};
use crate::sampler::process_utilization;
use crate::types::ProcessSnapshot;
use crate::users::AccountDirectory;

pub const NOT_AVAILABLE: &str = "N/A";
pub const UNKNOWN_USER: &str = "Unknown";

// 1-indexed positions in /proc/<pid>/stat
const UTIME_FIELD: usize = 14;
const CSTIME_FIELD: usize = 17;
const STARTTIME_FIELD: usize = 22;

/// CPU time of a process and its reaped children, in clock ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CpuTimes {
    pub utime: u64,
    pub stime: u64,
    pub cutime: u64,
    pub cstime: u64,
}

impl CpuTimes {
    pub fn total(&self) -> u64 {
        self.utime
            .saturating_add(self.stime)
            .saturating_add(self.cutime)
            .saturating_add(self.cstime)
    }
}

/// Tokenizes a stat line. A parenthesised comm counts as one field even when it
/// contains spaces, so later positions stay put.
pub fn stat_fields(line: &str) -> Vec<&str> {
    match (line.find('('), line.rfind(')')) {
        (Some(open), Some(close)) if open < close => {
            let mut fields = split_fields(&line[..open]);
            fields.push(&line[open..=close]);
            fields.extend(split_fields(&line[close + 1..]));
            fields
        }
        _ => split_fields(line),
    }
}

fn parse_field(fields: &[&str], position: usize, resource: Resource) -> StatResult<u64> {
    fields[position - 1]
        .parse()
        .map_err(|_| StatError::malformed(resource, "non-numeric stat field"))
}

/// Fields 14..=17: utime, stime, cutime, cstime.
pub fn parse_cpu_times(fields: &[&str], pid: Pid) -> StatResult<CpuTimes> {
    let resource = Resource::ProcessStat(pid);
    if fields.len() < CSTIME_FIELD {
        return Err(StatError::malformed(resource, "too few stat fields for cpu times"));
    }
    Ok(CpuTimes {
        utime: parse_field(fields, UTIME_FIELD, resource)?,
        stime: parse_field(fields, UTIME_FIELD + 1, resource)?,
        cutime: parse_field(fields, UTIME_FIELD + 2, resource)?,
        cstime: parse_field(fields, CSTIME_FIELD, resource)?,
    })
}

/// Field 22: start time in ticks since boot.
pub fn parse_start_ticks(fields: &[&str], pid: Pid) -> StatResult<u64> {
    let resource = Resource::ProcessStat(pid);
    if fields.len() < STARTTIME_FIELD {
        return Err(StatError::malformed(resource, "too few stat fields for start time"));
    }
    parse_field(fields, STARTTIME_FIELD, resource)
}

/// First value after `key` in a `Key:\tValue ...` status document.
pub fn status_value<'t>(text: &'t str, key: &str) -> Option<&'t str> {
    text.lines().find_map(|line| {
        let mut it = line.split_whitespace();
        (it.next()? == key).then(|| it.next()).flatten()
    })
}

/// kB to MiB with two decimals: 2048 -> "2.00".
pub fn format_mib(kib: u64) -> String {
    format!("{:.2}", kib as f64 / 1024.0)
}

/// Per-process view over a reader.
pub struct ProcessStats<'a, R: ?Sized> {
    reader: &'a R,
    ticks_per_sec: u64,
}

impl<'a, R: ResourceReader + ?Sized> ProcessStats<'a, R> {
    pub fn new(reader: &'a R, ticks_per_sec: u64) -> Self {
        Self {
            reader,
            ticks_per_sec,
        }
    }

    /// Command line with NUL separators shown as spaces; may be empty (kernel threads).
    pub fn try_command(&self, pid: Pid) -> StatResult<String> {
        let raw = self.reader.read_text(&Resource::ProcessCmdline(pid))?;
        Ok(raw.replace('\0', " ").trim_end().to_string())
    }

    pub fn command(&self, pid: Pid) -> String {
        match self.try_command(pid) {
            Ok(cmd) if !cmd.is_empty() => cmd,
            Ok(_) => NOT_AVAILABLE.to_string(),
            Err(e) => {
                trace!(pid, error = %e, "no command line");
                NOT_AVAILABLE.to_string()
            }
        }
    }

    fn stat_line(&self, pid: Pid) -> StatResult<String> {
        self.reader.read_line(&Resource::ProcessStat(pid))
    }

    pub fn try_cpu_times(&self, pid: Pid) -> StatResult<CpuTimes> {
        let line = self.stat_line(pid)?;
        parse_cpu_times(&stat_fields(&line), pid)
    }

    /// All four counters are 0 when the stat line is missing or short.
    pub fn cpu_times(&self, pid: Pid) -> CpuTimes {
        self.try_cpu_times(pid).unwrap_or_else(|e| {
            trace!(pid, error = %e, "cpu times unavailable");
            CpuTimes::default()
        })
    }

    /// CPU times and start ticks from a single read of the stat line.
    pub fn counters(&self, pid: Pid) -> (CpuTimes, Option<u64>) {
        match self.stat_line(pid) {
            Ok(line) => {
                let fields = stat_fields(&line);
                (
                    parse_cpu_times(&fields, pid).unwrap_or_default(),
                    parse_start_ticks(&fields, pid).ok(),
                )
            }
            Err(e) => {
                trace!(pid, error = %e, "stat unavailable");
                (CpuTimes::default(), None)
            }
        }
    }

    /// utime + stime + cutime + cstime.
    pub fn active_jiffies(&self, pid: Pid) -> u64 {
        self.cpu_times(pid).total()
    }

    pub fn try_start_ticks(&self, pid: Pid) -> StatResult<u64> {
        let line = self.stat_line(pid)?;
        parse_start_ticks(&stat_fields(&line), pid)
    }

    pub fn try_resident_kib(&self, pid: Pid) -> StatResult<u64> {
        let resource = Resource::ProcessStatus(pid);
        let text = self.reader.read_text(&resource)?;
        status_value(&text, "VmRSS:")
            .ok_or(StatError::malformed(resource, "no VmRSS line"))?
            .parse()
            .map_err(|_| StatError::malformed(resource, "non-numeric VmRSS"))
    }

    /// Resident set in MiB with two decimals, or "N/A".
    pub fn resident_memory(&self, pid: Pid) -> String {
        self.try_resident_kib(pid)
            .map(format_mib)
            .unwrap_or_else(|_| NOT_AVAILABLE.to_string())
    }

    /// Real uid, the first value of the `Uid:` line.
    pub fn try_owner_id(&self, pid: Pid) -> StatResult<String> {
        let resource = Resource::ProcessStatus(pid);
        let text = self.reader.read_text(&resource)?;
        status_value(&text, "Uid:")
            .map(str::to_string)
            .ok_or(StatError::malformed(resource, "no Uid line"))
    }

    pub fn owner_id(&self, pid: Pid) -> Option<String> {
        self.try_owner_id(pid).ok()
    }

    pub fn owner_name<D: AccountDirectory + ?Sized>(&self, pid: Pid, directory: &D) -> String {
        self.owner_id(pid)
            .and_then(|uid| directory.user_name(&uid))
            .unwrap_or_else(|| UNKNOWN_USER.to_string())
    }

    fn uptime_from_start(&self, start_ticks: u64, system_uptime: u64) -> i64 {
        let started = start_ticks / self.ticks_per_sec.max(1);
        system_uptime as i64 - started as i64
    }

    /// Seconds since the process started; 0 when the start time is unavailable.
    pub fn uptime(&self, pid: Pid, system_uptime: u64) -> i64 {
        self.try_start_ticks(pid)
            .map(|start| self.uptime_from_start(start, system_uptime))
            .unwrap_or(0)
    }

    /// Everything the display needs for one pid, read fresh. Never fails.
    pub fn snapshot<D: AccountDirectory + ?Sized>(
        &self,
        pid: Pid,
        directory: &D,
        system_uptime: u64,
    ) -> ProcessSnapshot {
        let (times, start_time_ticks) = self.counters(pid);
        let uptime_secs = start_time_ticks
            .map(|start| self.uptime_from_start(start, system_uptime))
            .unwrap_or(0);
        let resident_mib = self
            .try_resident_kib(pid)
            .ok()
            .map(|kib| kib as f64 / 1024.0);

        ProcessSnapshot {
            pid,
            command: self.command(pid),
            user: self.owner_name(pid, directory),
            resident_mib,
            times,
            start_time_ticks,
            uptime_secs,
            cpu_utilization: process_utilization(&times, uptime_secs, self.ticks_per_sec),
            recent_cpu: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Fixture;
    use crate::users::StaticAccounts;

    // pid 42, utime 300 stime 100 cutime 50 cstime 50, starttime 1000
    const STAT: &str = "42 (my prog) S 1 42 42 0 -1 4194560 100 0 0 0 300 100 50 50 20 0 1 0 1000 1000000 512 18446744073709551615";
    const STATUS: &str = "Name:\tmy prog\nUmask:\t0022\nState:\tS (sleeping)\nUid:\t1000\t1000\t1000\t1000\nVmRSS:\t    2048 kB\n";

    fn fixture() -> Fixture {
        let mut fx = Fixture::new();
        fx.add_process(42, STAT, STATUS, "/usr/bin/my\0--flag\0");
        fx
    }

    #[test]
    fn stat_fields_keep_comm_whole() {
        let f = stat_fields(STAT);
        assert_eq!(f[1], "(my prog)");
        assert_eq!(f[13], "300");
        assert_eq!(f[21], "1000");
        assert_eq!(stat_fields("1 2 3 4 5").len(), 5);
    }

    #[test]
    fn cpu_times_from_fields_14_to_17() {
        let fx = fixture();
        let ps = ProcessStats::new(&fx, 100);
        let t = ps.cpu_times(42);
        assert_eq!((t.utime, t.stime, t.cutime, t.cstime), (300, 100, 50, 50));
        assert_eq!(ps.active_jiffies(42), 500);
    }

    #[test]
    fn malformed_stat_line_is_zero_not_error() {
        let mut fx = Fixture::new();
        fx.add_process(5, "5 (x) S 1 2", "", "");
        let ps = ProcessStats::new(&fx, 100);
        assert!(matches!(ps.try_cpu_times(5), Err(StatError::Malformed { .. })));
        assert_eq!(ps.active_jiffies(5), 0);
        assert_eq!(ps.uptime(5, 1000), 0);
    }

    #[test]
    fn missing_process_is_absent() {
        let fx = Fixture::new();
        let ps = ProcessStats::new(&fx, 100);
        assert!(ps.try_cpu_times(9).unwrap_err().is_absent());
        assert_eq!(ps.command(9), NOT_AVAILABLE);
        assert_eq!(ps.resident_memory(9), NOT_AVAILABLE);
        assert_eq!(ps.owner_id(9), None);
    }

    #[test]
    fn command_joins_arguments() {
        let fx = fixture();
        let ps = ProcessStats::new(&fx, 100);
        assert_eq!(ps.command(42), "/usr/bin/my --flag");

        let mut fx = Fixture::new();
        fx.add_process(2, STAT, STATUS, "");
        assert_eq!(ProcessStats::new(&fx, 100).command(2), NOT_AVAILABLE);
    }

    #[test]
    fn resident_memory_in_mib() {
        let fx = fixture();
        let ps = ProcessStats::new(&fx, 100);
        assert_eq!(ps.resident_memory(42), "2.00");
        assert_eq!(format_mib(1536), "1.50");

        let mut fx = Fixture::new();
        fx.add_process(3, STAT, "Name:\tkthreadd\nUid:\t0\t0\t0\t0\n", "");
        assert_eq!(ProcessStats::new(&fx, 100).resident_memory(3), NOT_AVAILABLE);
    }

    #[test]
    fn owner_resolution() {
        let fx = fixture();
        let ps = ProcessStats::new(&fx, 100);
        assert_eq!(ps.owner_id(42).as_deref(), Some("1000"));
        let dir = StaticAccounts::new().with("1000", "alice");
        assert_eq!(ps.owner_name(42, &dir), "alice");
        assert_eq!(ps.owner_name(42, &StaticAccounts::new()), UNKNOWN_USER);
        assert_eq!(ps.owner_name(7, &dir), UNKNOWN_USER);
    }

    #[test]
    fn counters_read_times_and_start_together() {
        let fx = fixture();
        let ps = ProcessStats::new(&fx, 100);
        let (times, start) = ps.counters(42);
        assert_eq!(times.total(), 500);
        assert_eq!(start, Some(1000));

        let mut fx = Fixture::new();
        // 17 fields: cpu times present, start time missing
        fx.add_process(6, "6 (x) S 1 1 1 0 -1 0 0 0 0 0 7 1 0 0", "", "");
        let (times, start) = ProcessStats::new(&fx, 100).counters(6);
        assert_eq!(times.total(), 8);
        assert_eq!(start, None);
    }

    #[test]
    fn uptime_from_start_ticks() {
        let fx = fixture();
        let ps = ProcessStats::new(&fx, 100);
        // started at 1000 ticks = 10 s after boot
        assert_eq!(ps.uptime(42, 110), 100);
    }

    #[test]
    fn snapshot_assembles_all_fields() {
        let fx = fixture();
        let ps = ProcessStats::new(&fx, 100);
        let dir = StaticAccounts::new().with("1000", "alice");
        let snap = ps.snapshot(42, &dir, 20);
        assert_eq!(snap.pid, 42);
        assert_eq!(snap.user, "alice");
        assert_eq!(snap.command, "/usr/bin/my --flag");
        assert_eq!(snap.resident_mib, Some(2.0));
        assert_eq!(snap.start_time_ticks, Some(1000));
        assert_eq!(snap.uptime_secs, 10);
        // 5 s of cpu over 10 s alive
        assert_eq!(snap.cpu_utilization, 0.5);
    }

    #[test]
    fn snapshot_of_vanished_process_degrades() {
        let fx = Fixture::new();
        let snap = ProcessStats::new(&fx, 100).snapshot(77, &StaticAccounts::new(), 20);
        assert_eq!(snap.command, NOT_AVAILABLE);
        assert_eq!(snap.user, UNKNOWN_USER);
        assert_eq!(snap.resident_mib, None);
        assert_eq!(snap.uptime_secs, 0);
        assert_eq!(snap.cpu_utilization, 0.0);
    }
}
