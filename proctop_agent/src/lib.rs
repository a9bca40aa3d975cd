//! proctop_agent: single-host process and resource snapshots from `/proc`.
//!
//! Raw text sources are read through [`ResourceReader`], parsed by [`SystemStats`] and
//! [`ProcessStats`], turned into utilization by [`CpuSampler`], and reconciled into an
//! ordered process list by [`ProcessRegistry`]. [`Monitor`] ties them together.

pub mod clock;
pub mod config;
pub mod error;
pub mod process;
pub mod reader;
pub mod registry;
pub mod sampler;
pub mod state;
pub mod system;
pub mod types;
pub mod users;

pub use config::AgentConfig;
pub use error::{ConfigError, StatError, StatResult};
pub use process::{CpuTimes, ProcessStats};
pub use reader::{Fixture, Pid, ProcFs, Resource, ResourceReader};
pub use registry::{LiveProcesses, ProcessRegistry, Reconciled, SnapshotSource};
pub use sampler::{CpuSampler, UtilizationSample};
pub use state::Monitor;
pub use system::{CounterSet, StatReading, SystemStats};
pub use types::{ProcessSnapshot, Snapshot, SystemSummary};
pub use users::{AccountDirectory, StaticAccounts, SystemAccounts};
