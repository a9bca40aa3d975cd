//! Entry point for the proctop TUI. Parses args and runs the App.

mod app;
mod history;
mod ui;

use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use app::App;
use proctop_agent::{AgentConfig, Monitor};
use tracing_subscriber::EnvFilter;

const LOG_FILE_ENV: &str = "PROCTOP_LOG_FILE";

#[derive(Debug, Default)]
struct ParsedArgs {
    interval_ms: Option<u64>,
    proc_root: Option<PathBuf>,
    os_release: Option<PathBuf>,
}

fn usage(prog: &str) -> String {
    format!("Usage: {prog} [--interval MS|-i MS] [--proc-root PATH] [--os-release PATH]")
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "proctop".into());
    let mut parsed = ParsedArgs::default();

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Err(usage(&prog)),
            "--interval" | "-i" => {
                let v = it.next().ok_or_else(|| usage(&prog))?;
                parsed.interval_ms = Some(
                    v.parse()
                        .map_err(|_| format!("invalid interval: {v}\n{}", usage(&prog)))?,
                );
            }
            "--proc-root" => parsed.proc_root = it.next().map(PathBuf::from),
            "--os-release" => parsed.os_release = it.next().map(PathBuf::from),
            _ if arg.starts_with("--interval=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    parsed.interval_ms = Some(
                        v.parse()
                            .map_err(|_| format!("invalid interval: {v}\n{}", usage(&prog)))?,
                    );
                }
            }
            _ if arg.starts_with("--proc-root=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        parsed.proc_root = Some(PathBuf::from(v));
                    }
                }
            }
            _ if arg.starts_with("--os-release=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        parsed.os_release = Some(PathBuf::from(v));
                    }
                }
            }
            _ => return Err(format!("Unexpected argument. {}", usage(&prog))),
        }
    }
    Ok(parsed)
}

// Only log when asked to: stderr would tear up the alternate screen.
fn init_tracing() -> anyhow::Result<()> {
    let Some(path) = env::var_os(LOG_FILE_ENV) else {
        return Ok(());
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {}", Path::new(&path).display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            return Ok(());
        }
    };
    init_tracing()?;

    let mut cfg = AgentConfig::load().context("loading proctop config")?;
    if let Some(ms) = parsed.interval_ms {
        cfg.interval_ms = ms;
    }
    if let Some(p) = parsed.proc_root {
        cfg.proc_root = p;
    }
    if let Some(p) = parsed.os_release {
        cfg.os_release = p;
    }
    tracing::info!(proc_root = %cfg.proc_root.display(), "proctop starting");

    let mut app = App::new(Monitor::local(&cfg), cfg.interval());
    app.run()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        std::iter::once("proctop")
            .chain(v.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn interval_and_paths() {
        let p = parse_args(args(&["-i", "200", "--proc-root", "/tmp/p", "--os-release=/tmp/os"]))
            .unwrap();
        assert_eq!(p.interval_ms, Some(200));
        assert_eq!(p.proc_root, Some(PathBuf::from("/tmp/p")));
        assert_eq!(p.os_release, Some(PathBuf::from("/tmp/os")));

        let p = parse_args(args(&["--interval=750"])).unwrap();
        assert_eq!(p.interval_ms, Some(750));
    }

    #[test]
    fn help_and_bad_input_return_usage() {
        let err = parse_args(args(&["--help"])).unwrap_err();
        assert!(err.starts_with("Usage: proctop"));
        assert!(parse_args(args(&["-i", "fast"])).is_err());
        assert!(parse_args(args(&["-i"])).is_err());
        assert!(parse_args(args(&["extra"])).unwrap_err().contains("Unexpected argument"));
    }
}
