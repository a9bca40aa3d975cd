//! Runs the agent binary against a fake /proc tree.
use assert_cmd::Command;
use std::fs;
use std::path::Path;

fn fake_proc(root: &Path) {
    fs::write(
        root.join("stat"),
        "cpu  10 0 10 80 0 0 0 0 0 0\nprocesses 3\nprocs_running 1\n",
    )
    .unwrap();
    fs::write(root.join("uptime"), "50.00 10.00\n").unwrap();
    fs::write(root.join("meminfo"), "MemTotal: 2000 kB\nMemAvailable: 1000 kB\n").unwrap();
    fs::write(root.join("version"), "Linux version 5.15.0-cli (x@y) #1\n").unwrap();
    fs::write(root.join("os-release"), "PRETTY_NAME=\"Test OS 1.0\"\n").unwrap();
    for (pid, utime) in [(1u32, 100u64), (2, 400)] {
        let dir = root.join(pid.to_string());
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("stat"),
            format!("{pid} (p{pid}) S 0 1 1 0 -1 0 0 0 0 0 {utime} 0 0 0 20 0 1 0 0 0 0"),
        )
        .unwrap();
        fs::write(dir.join("status"), "Uid:\t0\t0\t0\t0\nVmRSS:\t512 kB\n").unwrap();
        fs::write(dir.join("cmdline"), format!("prog{pid}\0")).unwrap();
    }
}

fn agent(config_home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_proctop_agent"));
    cmd.env("XDG_CONFIG_HOME", config_home)
        .env_remove("PROCTOP_PROC_ROOT")
        .env_remove("PROCTOP_OS_RELEASE")
        .env_remove("PROCTOP_INTERVAL_MS")
        .env_remove("PROCTOP_TOP")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_flags() {
    let td = tempfile::tempdir().unwrap();
    let out = agent(td.path()).arg("--help").output().unwrap();
    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stdout);
    assert!(text.contains("Usage:"));
    for flag in ["--interval", "--count", "--top", "--proc-root", "--json"] {
        assert!(text.contains(flag), "help is missing {flag}: {text}");
    }
}

#[test]
fn unknown_flag_exits_2() {
    let td = tempfile::tempdir().unwrap();
    let out = agent(td.path()).arg("--frobnicate").output().unwrap();
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Unexpected argument"));
}

#[test]
fn one_json_snapshot_from_fake_tree() {
    let td = tempfile::tempdir().unwrap();
    fake_proc(td.path());
    let root = td.path().to_str().unwrap().to_string();
    let os_release = td.path().join("os-release");
    let out = agent(td.path())
        .args(["--count", "1", "--json", "--proc-root", &root, "--os-release"])
        .arg(&os_release)
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let stdout = String::from_utf8(out.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 1);
    let v: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(v["system"]["os_name"], "Test OS 1.0");
    assert_eq!(v["system"]["kernel"], "5.15.0-cli");
    assert_eq!(v["system"]["total_processes"], 3);
    let procs = v["processes"].as_array().unwrap();
    assert_eq!(procs.len(), 2);
    assert_eq!(procs[0]["pid"], 2);
    assert_eq!(procs[0]["command"], "prog2");
    assert_eq!(procs[1]["pid"], 1);
}

#[test]
fn top_limits_table_rows() {
    let td = tempfile::tempdir().unwrap();
    fake_proc(td.path());
    let root = td.path().to_str().unwrap().to_string();
    let out = agent(td.path())
        .args(["-n", "1", "-k", "1", "--proc-root", &root])
        .output()
        .unwrap();
    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stdout);
    assert!(text.contains("Kernel: 5.15.0-cli"));
    assert!(text.contains("prog2"));
    assert!(!text.contains("prog1"));
}

#[test]
fn config_file_sets_proc_root() {
    let td = tempfile::tempdir().unwrap();
    fake_proc(td.path());
    let cfg_dir = td.path().join("proctop");
    fs::create_dir_all(&cfg_dir).unwrap();
    let cfg = serde_json::json!({
        "proc_root": td.path(),
        "os_release": td.path().join("os-release"),
    });
    fs::write(cfg_dir.join("config.json"), cfg.to_string()).unwrap();

    let out = agent(td.path()).args(["-n", "1", "--json"]).output().unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["system"]["os_name"], "Test OS 1.0");
}
