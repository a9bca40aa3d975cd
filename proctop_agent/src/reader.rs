//! Raw access to kernel-exposed text sources.
//!
//! `ResourceReader` is the only seam between the parsers and the OS: `ProcFs` reads the
//! real `/proc` tree (or any directory laid out like it), `Fixture` serves canned text
//! from memory. Nothing here knows what a field means.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::fs;
use std::path::PathBuf;

use tracing::trace;

use crate::error::{StatError, StatResult};

pub type Pid = u32;

pub const DEFAULT_PROC_ROOT: &str = "/proc";
pub const DEFAULT_OS_RELEASE: &str = "/etc/os-release";

/// A text source, identified by kind rather than by path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    /// Aggregate counters: `/proc/stat`.
    SystemStat,
    MemInfo,
    Uptime,
    OsRelease,
    /// Kernel version line: `/proc/version`.
    Version,
    /// Directory holding one entry per pid.
    ProcessRoot,
    ProcessCmdline(Pid),
    ProcessStatus(Pid),
    ProcessStat(Pid),
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::SystemStat => f.write_str("stat"),
            Resource::MemInfo => f.write_str("meminfo"),
            Resource::Uptime => f.write_str("uptime"),
            Resource::OsRelease => f.write_str("os-release"),
            Resource::Version => f.write_str("version"),
            Resource::ProcessRoot => f.write_str("process root"),
            Resource::ProcessCmdline(pid) => write!(f, "{pid}/cmdline"),
            Resource::ProcessStatus(pid) => write!(f, "{pid}/status"),
            Resource::ProcessStat(pid) => write!(f, "{pid}/stat"),
        }
    }
}

/// Split on whitespace runs. No quoting, no escaping.
pub fn split_fields(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

pub trait ResourceReader {
    /// Full content of a source.
    fn read_text(&self, resource: &Resource) -> StatResult<String>;

    /// Names of the immediate subdirectories of the process root.
    fn process_entries(&self) -> StatResult<Vec<String>>;

    /// First line of a source (without the newline).
    fn read_line(&self, resource: &Resource) -> StatResult<String> {
        let text = self.read_text(resource)?;
        Ok(text.lines().next().unwrap_or_default().to_string())
    }

    /// First line of a source split into whitespace-separated fields.
    fn read_fields(&self, resource: &Resource) -> StatResult<Vec<String>> {
        let line = self.read_line(resource)?;
        Ok(split_fields(&line).into_iter().map(str::to_string).collect())
    }
}

impl<T: ResourceReader + ?Sized> ResourceReader for &T {
    fn read_text(&self, resource: &Resource) -> StatResult<String> {
        (**self).read_text(resource)
    }

    fn process_entries(&self) -> StatResult<Vec<String>> {
        (**self).process_entries()
    }
}

/// Reads the local filesystem.
#[derive(Debug, Clone)]
pub struct ProcFs {
    proc_root: PathBuf,
    os_release: PathBuf,
}

impl ProcFs {
    pub fn new(proc_root: impl Into<PathBuf>, os_release: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
            os_release: os_release.into(),
        }
    }

    pub fn path(&self, resource: &Resource) -> PathBuf {
        let root = &self.proc_root;
        match resource {
            Resource::SystemStat => root.join("stat"),
            Resource::MemInfo => root.join("meminfo"),
            Resource::Uptime => root.join("uptime"),
            Resource::OsRelease => self.os_release.clone(),
            Resource::Version => root.join("version"),
            Resource::ProcessRoot => root.clone(),
            Resource::ProcessCmdline(pid) => root.join(pid.to_string()).join("cmdline"),
            Resource::ProcessStatus(pid) => root.join(pid.to_string()).join("status"),
            Resource::ProcessStat(pid) => root.join(pid.to_string()).join("stat"),
        }
    }
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new(DEFAULT_PROC_ROOT, DEFAULT_OS_RELEASE)
    }
}

impl ResourceReader for ProcFs {
    fn read_text(&self, resource: &Resource) -> StatResult<String> {
        let path = self.path(resource);
        // cmdline may carry arbitrary bytes; decode lossily rather than reject
        match fs::read(&path) {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) => {
                trace!(path = %path.display(), error = %e, "source unreadable");
                Err(StatError::absent(*resource))
            }
        }
    }

    fn process_entries(&self) -> StatResult<Vec<String>> {
        let entries = fs::read_dir(&self.proc_root).map_err(|e| {
            trace!(path = %self.proc_root.display(), error = %e, "process root unreadable");
            StatError::absent(Resource::ProcessRoot)
        })?;
        Ok(entries
            .flatten()
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|e| e.file_name().into_string().ok())
            .collect())
    }
}

/// In-memory sources for deterministic tests and demos.
#[derive(Debug, Clone, Default)]
pub struct Fixture {
    files: HashMap<Resource, String>,
    entries: BTreeSet<String>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, resource: Resource, text: impl Into<String>) -> Self {
        self.set(resource, text);
        self
    }

    pub fn set(&mut self, resource: Resource, text: impl Into<String>) {
        self.files.insert(resource, text.into());
    }

    pub fn remove(&mut self, resource: &Resource) {
        self.files.remove(resource);
    }

    /// Adds a directory entry under the process root that is not a process.
    pub fn add_entry(&mut self, name: impl Into<String>) {
        self.entries.insert(name.into());
    }

    pub fn add_process(&mut self, pid: Pid, stat: &str, status: &str, cmdline: &str) {
        self.entries.insert(pid.to_string());
        self.set(Resource::ProcessStat(pid), stat);
        self.set(Resource::ProcessStatus(pid), status);
        self.set(Resource::ProcessCmdline(pid), cmdline);
    }

    pub fn remove_process(&mut self, pid: Pid) {
        self.entries.remove(&pid.to_string());
        self.files.remove(&Resource::ProcessStat(pid));
        self.files.remove(&Resource::ProcessStatus(pid));
        self.files.remove(&Resource::ProcessCmdline(pid));
    }
}

impl ResourceReader for Fixture {
    fn read_text(&self, resource: &Resource) -> StatResult<String> {
        self.files
            .get(resource)
            .cloned()
            .ok_or(StatError::absent(*resource))
    }

    fn process_entries(&self) -> StatResult<Vec<String>> {
        Ok(self.entries.iter().cloned().collect())
    }
}
