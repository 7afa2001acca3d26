use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

// All state files live inside the temp dir.
fn write_config(dir: &Path, extra: &str) -> PathBuf {
    let root = dir.display();
    let toml = format!(
        r#"
[paths]
config_file = "{root}/config.json"
snapshot_file = "{root}/last_state.json"
log_file = "{root}/logs/data.csv"
status_model = "{root}/models/status_model.json"
moisture_model = "{root}/models/moisture_model.json"
training_csv = "{root}/data/training.csv"

[model]
min_training_rows = 10
{extra}
"#
    );
    let path = dir.join("drier.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn write_training_csv(dir: &Path, rows: usize) {
    let mut text =
        String::from("humidity_now,temperature_now,time_remaining,status_kering,moisture_content\n");
    for i in 0..rows {
        let h = 85.0 - i as f64 * 4.0;
        let t = 40.0 + i as f64;
        let rem = 300 - i as i64 * 20;
        let (status, m) = if i < rows / 2 {
            ("Basah", 45.0 - i as f64 * 2.0)
        } else {
            ("Kering", 14.0 - i as f64 * 0.2)
        };
        text.push_str(&format!("{h},{t},{rem},{status},{m}\n"));
    }
    fs::create_dir_all(dir.join("data")).unwrap();
    fs::write(dir.join("data/training.csv"), text).unwrap();
}

fn drier(cfg: &Path) -> Command {
    let mut cmd = Command::cargo_bin("drier").unwrap();
    cmd.arg("--config").arg(cfg).env_remove("RUST_LOG");
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["predict", "--temperature", "45"], 2, "required", "stderr")]
#[case(&["self-check"], 3, "No usable models", "stderr")]
#[case(&["set-target"], 2, "--moisture", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "");
    let mut cmd = drier(&cfg);
    for a in args {
        cmd.arg(a);
    }
    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => assert.stdout(predicate::str::contains(needle)),
        _ => assert.stderr(predicate::str::contains(needle)),
    };
}

#[test]
fn train_then_predict_then_status() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "");
    write_training_csv(dir.path(), 12);

    drier(&cfg)
        .arg("train")
        .assert()
        .success()
        .stdout(predicate::str::contains("trained on 12 rows"));
    assert!(dir.path().join("models/status_model.json").exists());

    drier(&cfg)
        .arg("self-check")
        .assert()
        .success()
        .stdout(predicate::str::contains("models: loaded"));

    let out = drier(&cfg)
        .args([
            "predict",
            "--temperature",
            "40",
            "--humidity",
            "85",
            "--time-remaining",
            "300",
            "--rtc",
            "07:30:00",
        ])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let state: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(state["clove_status"], "Basah");
    assert_eq!(state["heater_status"], "ON");
    assert_eq!(state["fan_status"], "ON");
    assert_eq!(state["rtc"], "07:30:00");

    let log = fs::read_to_string(dir.path().join("logs/data.csv")).unwrap();
    assert_eq!(log.lines().count(), 2);

    let out = drier(&cfg).arg("status").output().unwrap();
    assert!(out.status.success());
    let state: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(state["temperature_now"], 40.0);
    assert_eq!(state["humidity_now"], 85.0);
}

#[test]
fn overdue_reading_finishes_process() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "");
    write_training_csv(dir.path(), 12);

    let out = drier(&cfg)
        .args([
            "predict",
            "--temperature",
            "40",
            "--humidity",
            "85",
            "--time-remaining",
            "-5",
        ])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let state: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(state["process_finish"], true);
    assert_eq!(state["heater_status"], "OFF");
    assert_eq!(state["fan_status"], "OFF");
}

#[test]
fn set_target_persists_partial_update() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "");

    drier(&cfg)
        .args(["set-target", "--moisture", "12"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"target_moisture\":12"));
    let saved: serde_json::Value =
        serde_json::from_slice(&fs::read(dir.path().join("config.json")).unwrap()).unwrap();
    assert_eq!(saved, serde_json::json!({"target_moisture": 12, "target_time": 4}));

    let out = drier(&cfg).arg("status").output().unwrap();
    let state: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(state["target_moisture"], 12);
}

#[test]
fn too_few_training_rows() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "");
    write_training_csv(dir.path(), 5);
    drier(&cfg)
        .arg("train")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("at least 10"));
}

#[test]
fn bad_training_headers() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "");
    fs::create_dir_all(dir.path().join("data")).unwrap();
    fs::write(dir.path().join("data/training.csv"), "h,t,r,s,m\n1,2,3,Basah,4\n").unwrap();
    drier(&cfg)
        .arg("train")
        .assert()
        .failure()
        .stderr(predicate::str::contains("must have headers"));
}

#[test]
fn invalid_config_is_rejected_before_anything_runs() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "\n[control]\nheater_cutoff_c = 500.0\n");
    drier(&cfg)
        .arg("status")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("heater_cutoff_c"));
    assert!(!dir.path().join("last_state.json").exists());
}

#[test]
fn json_mode_errors_are_structured() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "");
    let out = drier(&cfg).args(["--json", "self-check"]).output().unwrap();
    assert_eq!(out.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&out.stderr);
    let last = stderr.lines().last().unwrap();
    let v: serde_json::Value = serde_json::from_str(last).unwrap();
    assert_eq!(v["reason"], "ModelUnavailable");
}
