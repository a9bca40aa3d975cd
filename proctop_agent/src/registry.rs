//! Tracked process set, reconciled against the live pid list on every refresh.
//!
//! New pids are inserted, known pids are re-read in place (their per-pid sampler
//! survives), vanished pids are evicted. A pid that exits and is reused between two
//! refreshes looks like the same process; that is not detected.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::process::ProcessStats;
use crate::reader::{Pid, ResourceReader};
use crate::sampler::{CpuSampler, UtilizationSample};
use crate::system::SystemStats;
use crate::types::ProcessSnapshot;
use crate::users::AccountDirectory;

/// Where a refresh gets its process data from.
pub trait SnapshotSource {
    fn live_pids(&self) -> Vec<Pid>;
    fn snapshot(&self, pid: Pid) -> ProcessSnapshot;
    /// System-wide jiffies, the denominator for per-pid recent utilization.
    fn total_jiffies(&self) -> u64;
}

/// Live `/proc` data for one refresh. System uptime and total jiffies are read once
/// up front so every pid in the pass is measured against the same instant.
pub struct LiveProcesses<'a, R: ?Sized, D: ?Sized> {
    system: SystemStats<'a, R>,
    stats: ProcessStats<'a, R>,
    directory: &'a D,
    uptime: u64,
    total_jiffies: u64,
}

impl<'a, R, D> LiveProcesses<'a, R, D>
where
    R: ResourceReader + ?Sized,
    D: AccountDirectory + ?Sized,
{
    pub fn new(reader: &'a R, directory: &'a D, ticks_per_sec: u64) -> Self {
        let system = SystemStats::new(reader);
        let uptime = system.uptime();
        let total_jiffies = system.total_jiffies();
        Self::at(reader, directory, ticks_per_sec, uptime, total_jiffies)
    }

    /// Same, with uptime and total jiffies the caller already read.
    pub fn at(
        reader: &'a R,
        directory: &'a D,
        ticks_per_sec: u64,
        uptime: u64,
        total_jiffies: u64,
    ) -> Self {
        Self {
            system: SystemStats::new(reader),
            stats: ProcessStats::new(reader, ticks_per_sec),
            directory,
            uptime,
            total_jiffies,
        }
    }
}

impl<R, D> SnapshotSource for LiveProcesses<'_, R, D>
where
    R: ResourceReader + ?Sized,
    D: AccountDirectory + ?Sized,
{
    fn live_pids(&self) -> Vec<Pid> {
        self.system.pids()
    }

    fn snapshot(&self, pid: Pid) -> ProcessSnapshot {
        self.stats.snapshot(pid, self.directory, self.uptime)
    }

    fn total_jiffies(&self) -> u64 {
        self.total_jiffies
    }
}

#[derive(Debug, Clone)]
struct Tracked {
    snapshot: ProcessSnapshot,
    sampler: CpuSampler,
}

/// What one refresh changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciled {
    pub inserted: Vec<Pid>,
    pub updated: usize,
    pub evicted: Vec<Pid>,
}

#[derive(Debug, Default)]
pub struct ProcessRegistry {
    tracked: HashMap<Pid, Tracked>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh<S: SnapshotSource + ?Sized>(&mut self, source: &S) -> Reconciled {
        let mut live = source.live_pids();
        live.sort_unstable();
        live.dedup();
        let total = source.total_jiffies();
        let mut out = Reconciled::default();

        let live_set: HashSet<Pid> = live.iter().copied().collect();
        self.tracked.retain(|pid, _| {
            let keep = live_set.contains(pid);
            if !keep {
                out.evicted.push(*pid);
            }
            keep
        });
        out.evicted.sort_unstable();

        for pid in live {
            let mut snapshot = source.snapshot(pid);
            let reading = UtilizationSample {
                active: snapshot.active_jiffies(),
                total,
            };
            match self.tracked.entry(pid) {
                Entry::Occupied(mut e) => {
                    let tracked = e.get_mut();
                    snapshot.recent_cpu = tracked.sampler.sample(reading);
                    tracked.snapshot = snapshot;
                    out.updated += 1;
                }
                Entry::Vacant(e) => {
                    let mut sampler = CpuSampler::new();
                    snapshot.recent_cpu = sampler.sample(reading);
                    e.insert(Tracked { snapshot, sampler });
                    out.inserted.push(pid);
                }
            }
        }

        debug!(
            inserted = out.inserted.len(),
            updated = out.updated,
            evicted = out.evicted.len(),
            "process registry reconciled"
        );
        out
    }

    /// Tracked processes by descending cpu utilization, ties by ascending pid.
    pub fn processes(&self) -> Vec<&ProcessSnapshot> {
        let mut list: Vec<&ProcessSnapshot> = self.tracked.values().map(|t| &t.snapshot).collect();
        list.sort_by(|a, b| {
            b.cpu_utilization
                .total_cmp(&a.cpu_utilization)
                .then(a.pid.cmp(&b.pid))
        });
        list
    }

    pub fn get(&self, pid: Pid) -> Option<&ProcessSnapshot> {
        self.tracked.get(&pid).map(|t| &t.snapshot)
    }

    /// Per-pid sampler state, exposed for inspection.
    pub fn sampler(&self, pid: Pid) -> Option<&CpuSampler> {
        self.tracked.get(&pid).map(|t| &t.sampler)
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.tracked.contains_key(&pid)
    }

    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::CpuTimes;

    #[derive(Default)]
    struct FakeSource {
        live: Vec<Pid>,
        cpu: HashMap<Pid, f32>,
        active: HashMap<Pid, u64>,
        total: u64,
    }

    impl FakeSource {
        fn proc(mut self, pid: Pid, cpu: f32, active: u64) -> Self {
            self.live.push(pid);
            self.cpu.insert(pid, cpu);
            self.active.insert(pid, active);
            self
        }

        fn total(mut self, total: u64) -> Self {
            self.total = total;
            self
        }
    }

    impl SnapshotSource for FakeSource {
        fn live_pids(&self) -> Vec<Pid> {
            self.live.clone()
        }

        fn snapshot(&self, pid: Pid) -> ProcessSnapshot {
            ProcessSnapshot {
                pid,
                command: format!("cmd{pid}"),
                user: "root".into(),
                resident_mib: None,
                times: CpuTimes {
                    utime: self.active.get(&pid).copied().unwrap_or(0),
                    ..CpuTimes::default()
                },
                start_time_ticks: Some(0),
                uptime_secs: 1,
                cpu_utilization: self.cpu.get(&pid).copied().unwrap_or(0.0),
                recent_cpu: 0.0,
            }
        }

        fn total_jiffies(&self) -> u64 {
            self.total
        }
    }

    fn pids(reg: &ProcessRegistry) -> Vec<Pid> {
        reg.processes().iter().map(|p| p.pid).collect()
    }

    #[test]
    fn reconcile_inserts_updates_and_evicts() {
        let mut reg = ProcessRegistry::new();
        let first = FakeSource::default()
            .proc(1, 0.1, 100)
            .proc(2, 0.2, 100)
            .proc(3, 0.3, 100)
            .total(1000);
        let r = reg.refresh(&first);
        assert_eq!(r.inserted, vec![1, 2, 3]);
        assert_eq!(r.updated, 0);
        assert!(r.evicted.is_empty());

        let second = FakeSource::default()
            .proc(2, 0.2, 600)
            .proc(3, 0.3, 100)
            .proc(4, 0.4, 900)
            .total(2000);
        let r = reg.refresh(&second);
        assert_eq!(r.inserted, vec![4]);
        assert_eq!(r.updated, 2);
        assert_eq!(r.evicted, vec![1]);
        assert!(!reg.contains(1));
        assert_eq!(reg.len(), 3);

        // pid 2 kept its sampler baseline from the first refresh
        assert_eq!(reg.get(2).unwrap().recent_cpu, 0.5);
        assert_eq!(reg.get(3).unwrap().recent_cpu, 0.0);
        assert_eq!(
            reg.sampler(2).unwrap().previous(),
            Some(UtilizationSample { active: 600, total: 2000 })
        );
        // pid 4 is new, no baseline yet
        assert_eq!(reg.get(4).unwrap().recent_cpu, 0.0);
    }

    #[test]
    fn order_is_descending_cpu_then_pid() {
        let mut reg = ProcessRegistry::new();
        let src = FakeSource::default()
            .proc(7, 0.5, 0)
            .proc(3, 0.5, 0)
            .proc(1, 0.9, 0);
        reg.refresh(&src);
        assert_eq!(pids(&reg), vec![1, 3, 7]);
    }

    #[test]
    fn empty_live_set_evicts_everything() {
        let mut reg = ProcessRegistry::new();
        reg.refresh(&FakeSource::default().proc(10, 0.0, 0).proc(11, 0.0, 0));
        let r = reg.refresh(&FakeSource::default());
        assert_eq!(r.evicted, vec![10, 11]);
        assert!(reg.is_empty());
        assert!(reg.processes().is_empty());
    }

    #[test]
    fn duplicate_live_pids_tracked_once() {
        let mut reg = ProcessRegistry::new();
        let mut src = FakeSource::default().proc(5, 0.1, 0);
        src.live.push(5);
        let r = reg.refresh(&src);
        assert_eq!(r.inserted, vec![5]);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn evicted_pid_starts_fresh_when_seen_again() {
        let mut reg = ProcessRegistry::new();
        reg.refresh(&FakeSource::default().proc(8, 0.0, 100).total(1000));
        reg.refresh(&FakeSource::default().total(1500));
        reg.refresh(&FakeSource::default().proc(8, 0.0, 400).total(2000));
        assert_eq!(reg.get(8).unwrap().recent_cpu, 0.0);
    }
}
