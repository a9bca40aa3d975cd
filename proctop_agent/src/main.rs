//! Entry point for proctop_agent: refreshes on an interval and prints snapshots
//! as a text table or as one JSON document per line.

use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::thread;

use anyhow::Context;
use proctop_agent::{AgentConfig, Monitor, Snapshot};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct ParsedArgs {
    interval_ms: Option<u64>,
    count: u64,
    top: Option<usize>,
    proc_root: Option<PathBuf>,
    os_release: Option<PathBuf>,
    json: bool,
}

enum Cli {
    Run(ParsedArgs),
    Help(String),
}

fn usage(prog: &str) -> String {
    format!(
        "Usage: {prog} [--interval MS|-i MS] [--count N|-n N] [--top K|-k K] [--proc-root PATH] [--os-release PATH] [--json]"
    )
}

fn parse_num<T: std::str::FromStr>(flag: &str, v: Option<String>) -> Result<T, String> {
    let v = v.ok_or_else(|| format!("missing value for {flag}"))?;
    v.parse()
        .map_err(|_| format!("invalid value for {flag}: {v}"))
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Cli, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "proctop_agent".into());
    let mut parsed = ParsedArgs::default();

    while let Some(arg) = it.next() {
        // accept --flag=value as well as --flag value
        let (flag, inline) = match arg.split_once('=') {
            Some((f, v)) if f.starts_with("--") => (f.to_string(), Some(v.to_string())),
            _ => (arg.clone(), None),
        };
        let mut value = || inline.clone().or_else(|| it.next());
        match flag.as_str() {
            "-h" | "--help" => return Ok(Cli::Help(usage(&prog))),
            "--interval" | "-i" => parsed.interval_ms = Some(parse_num(&flag, value())?),
            "--count" | "-n" => parsed.count = parse_num(&flag, value())?,
            "--top" | "-k" => parsed.top = Some(parse_num(&flag, value())?),
            "--proc-root" => {
                parsed.proc_root = Some(value().ok_or("missing value for --proc-root")?.into())
            }
            "--os-release" => {
                parsed.os_release = Some(value().ok_or("missing value for --os-release")?.into())
            }
            "--json" => parsed.json = true,
            _ => return Err(format!("Unexpected argument: {arg}\n{}", usage(&prog))),
        }
    }
    Ok(Cli::Run(parsed))
}

impl ParsedArgs {
    /// Command-line flags win over file and environment settings.
    fn apply(&self, cfg: &mut AgentConfig) {
        if let Some(ms) = self.interval_ms {
            cfg.interval_ms = ms;
        }
        if let Some(k) = self.top {
            cfg.top = (k > 0).then_some(k);
        }
        if let Some(p) = &self.proc_root {
            cfg.proc_root = p.clone();
        }
        if let Some(p) = &self.os_release {
            cfg.os_release = p.clone();
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn write_table<W: Write>(out: &mut W, snap: &Snapshot) -> io::Result<()> {
    let s = &snap.system;
    writeln!(out, "OS: {}  Kernel: {}", s.os_name, s.kernel)?;
    writeln!(
        out,
        "CPU: {:5.1}%  Mem: {:5.1}%  Uptime: {}s  Processes: {} total, {} running",
        s.cpu_utilization * 100.0,
        s.mem_utilization * 100.0,
        s.uptime_secs,
        s.total_processes,
        s.running_processes
    )?;
    writeln!(
        out,
        "{:>7} {:<12} {:>6} {:>10} {:>9}  COMMAND",
        "PID", "USER", "CPU%", "RAM[MB]", "TIME+"
    )?;
    for p in &snap.processes {
        writeln!(
            out,
            "{:>7} {:<12} {:>6.1} {:>10} {:>9}  {}",
            p.pid,
            p.user,
            p.cpu_utilization * 100.0,
            p.ram(),
            p.uptime_secs.max(0),
            p.command
        )?;
    }
    writeln!(out)
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let parsed = match parse_args(env::args()) {
        Ok(Cli::Run(p)) => p,
        Ok(Cli::Help(msg)) => {
            println!("{msg}");
            return Ok(());
        }
        Err(msg) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
    };

    let mut cfg = AgentConfig::load().context("loading proctop config")?;
    parsed.apply(&mut cfg);
    info!(
        proc_root = %cfg.proc_root.display(),
        interval_ms = cfg.interval_ms,
        "sampler starting"
    );

    let mut monitor = Monitor::local(&cfg);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut emitted: u64 = 0;
    loop {
        monitor.refresh();
        let snap = monitor.snapshot(cfg.top);
        if parsed.json {
            serde_json::to_writer(&mut out, &snap).context("encoding snapshot")?;
            writeln!(out)?;
        } else {
            write_table(&mut out, &snap)?;
        }
        out.flush()?;

        emitted += 1;
        if parsed.count != 0 && emitted >= parsed.count {
            break;
        }
        thread::sleep(cfg.interval());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        std::iter::once("proctop_agent")
            .chain(v.iter().copied())
            .map(String::from)
            .collect()
    }

    fn run(v: &[&str]) -> ParsedArgs {
        match parse_args(args(v)) {
            Ok(Cli::Run(p)) => p,
            Ok(Cli::Help(_)) => panic!("unexpected help"),
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn short_long_and_assign_forms() {
        let p = run(&["-i", "250", "--count=3", "-k", "5", "--json"]);
        assert_eq!(p.interval_ms, Some(250));
        assert_eq!(p.count, 3);
        assert_eq!(p.top, Some(5));
        assert!(p.json);

        let p = run(&["--proc-root", "/tmp/p", "--os-release=/tmp/os"]);
        assert_eq!(p.proc_root, Some(PathBuf::from("/tmp/p")));
        assert_eq!(p.os_release, Some(PathBuf::from("/tmp/os")));
    }

    #[test]
    fn help_and_errors() {
        assert!(matches!(parse_args(args(&["--help"])), Ok(Cli::Help(_))));
        assert!(parse_args(args(&["--interval", "soon"])).is_err());
        assert!(parse_args(args(&["--count"])).is_err());
        assert!(parse_args(args(&["--bogus"])).is_err());
    }

    #[test]
    fn flags_override_config() {
        let mut cfg = AgentConfig::default();
        run(&["-i", "50", "-k", "0", "--proc-root", "/x"]).apply(&mut cfg);
        assert_eq!(cfg.interval_ms, 50);
        assert_eq!(cfg.top, None);
        assert_eq!(cfg.proc_root, PathBuf::from("/x"));
    }
}
