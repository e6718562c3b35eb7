use regex::Regex;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

struct TestContext {
    dir: TempDir,
    data_path: PathBuf,
    store_path: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let data_path = dir.path().join("mice.csv");
        let store_path = dir.path().join("results");

        let mut f = File::create(&data_path).unwrap();
        writeln!(f, "id,weight,intake,strain").unwrap();
        for i in 0..24 {
            let weight = 16.0 + ((i * 7) % 24) as f64 * 0.4;
            let intake = 3.0 + ((i * 5) % 11) as f64 * 0.1;
            // One subject without a recorded intake.
            let intake = if i == 5 { String::new() } else { format!("{:.2}", intake) };
            writeln!(f, "M{:02},{:.2},{},C57", i, weight, intake).unwrap();
        }

        Self {
            dir,
            data_path,
            store_path,
        }
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_cohortforge"))
            .args(args)
            .arg("--store")
            .arg(&self.store_path)
            .output()
            .expect("Failed to execute binary")
    }

    fn group(&self, extra: &[&str]) -> Output {
        let mut args = vec![
            "group",
            "--data",
            self.data_path.to_str().unwrap(),
            "--layers",
            "weight，intake",
            "--groups",
            "3",
            "--seed",
            "7",
        ];
        args.extend_from_slice(extra);
        self.run(&args)
    }
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).to_string()
}

fn first_id(text: &str) -> String {
    let re = Regex::new(r"ID: ([0-9A-F]{6})").unwrap();
    re.captures(text).expect("no result id in output")[1].to_string()
}

#[test]
fn test_cli_group_then_tune() {
    let ctx = TestContext::new();

    let out = ctx.group(&[]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let text = stdout(&out);
    let id = first_id(&text);
    assert!(text.contains("group_1"));
    assert!(ctx.store_path.join(format!("{}.json", id)).exists());

    let out = ctx.run(&["tune", "--id", &id, "--simulations", "50", "--seed", "1"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let text = stdout(&out);
    let tuned = first_id(&text);
    assert_ne!(tuned, id);
    assert!(text.contains(&format!("Parent: {}", id)));
    assert!(text.contains("Improvement"));

    let out = ctx.run(&["show"]);
    let listed: Vec<String> = stdout(&out).lines().map(str::to_string).collect();
    assert_eq!(listed.len(), 2);
    assert!(listed.contains(&id) && listed.contains(&tuned));
}

#[test]
fn test_cli_sweep_reports_each_size() {
    let ctx = TestContext::new();
    let out_path = ctx.dir.path().join("sweep.json");
    let out = ctx.run(&[
        "sweep",
        "--data",
        ctx.data_path.to_str().unwrap(),
        "--sizes",
        "8,8,8",
        "--sample-size",
        "2",
        "--iterations",
        "3",
        "--simulations",
        "20",
        "--seed",
        "3",
        "--out",
        out_path.to_str().unwrap(),
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(stdout(&out).contains("Best sample size"));

    let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out_path).unwrap()).unwrap();
    let trend = report["trend"].as_array().unwrap();
    let steps: Vec<u64> = trend.iter().map(|e| e["step"].as_u64().unwrap()).collect();
    assert_eq!(steps, vec![2, 3, 4]);
}

#[test]
fn test_cli_config_file_and_flag_override() {
    let ctx = TestContext::new();
    let cfg_path = ctx.dir.path().join("cfg.json");
    fs::write(&cfg_path, r#"{"search": {"trials": 3}}"#).unwrap();

    let out_path = ctx.dir.path().join("a.json");
    let out = ctx.group(&[
        "--config",
        cfg_path.to_str().unwrap(),
        "--out",
        out_path.to_str().unwrap(),
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let result: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out_path).unwrap()).unwrap();
    assert_eq!(result["trial_scores"].as_array().unwrap().len(), 3);

    let out_path = ctx.dir.path().join("b.json");
    let out = ctx.group(&[
        "--config",
        cfg_path.to_str().unwrap(),
        "--trials",
        "4",
        "--out",
        out_path.to_str().unwrap(),
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let result: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out_path).unwrap()).unwrap();
    assert_eq!(result["trial_scores"].as_array().unwrap().len(), 4);
}

#[test]
fn test_cli_errors_exit_nonzero() {
    let ctx = TestContext::new();

    let out = ctx.run(&["tune", "--id", "ABCDEF"]);
    assert!(!out.status.success());

    let out = ctx.group(&["--sizes", "8,8,7"]);
    assert!(!out.status.success());

    let out = ctx.run(&[
        "group",
        "--data",
        ctx.data_path.to_str().unwrap(),
        "--layers",
        "strain",
        "--groups",
        "2",
    ]);
    assert!(!out.status.success());
}
