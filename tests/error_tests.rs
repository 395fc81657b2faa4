//! Error scenario integration tests

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn dual_capture_bin(config_home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("dual-capture").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home.path());
    cmd
}

#[test]
fn config_get_unknown_key() {
    let home = TempDir::new().unwrap();
    dual_capture_bin(&home)
        .args(["config", "get", "api_key"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown key").and(predicate::str::contains("Valid keys")));
}

#[test]
fn config_set_unknown_key() {
    let home = TempDir::new().unwrap();
    dual_capture_bin(&home)
        .args(["config", "set", "unknown_key", "value"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown_key"));
}

#[test]
fn config_set_invalid_duration() {
    let home = TempDir::new().unwrap();
    dual_capture_bin(&home)
        .args(["config", "set", "duration", "invalid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid duration format"));
}

#[test]
fn config_set_compression_out_of_range() {
    let home = TempDir::new().unwrap();
    dual_capture_bin(&home)
        .args(["config", "set", "compression_level", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("between 0 and 8"));
}

#[test]
fn config_set_unknown_encoder_source() {
    let home = TempDir::new().unwrap();
    dual_capture_bin(&home)
        .args(["config", "set", "encoder_sources", "builtin,wasm"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("wasm").and(predicate::str::contains("flac-cli")));
}

#[test]
fn config_set_invalid_video_conversion() {
    let home = TempDir::new().unwrap();
    dual_capture_bin(&home)
        .args(["config", "set", "video_conversion", "transcode"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("relabel, remux"));
}

#[test]
fn config_set_invalid_boolean() {
    let home = TempDir::new().unwrap();
    dual_capture_bin(&home)
        .args(["config", "set", "notify", "maybe"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("'true' or 'false'"));
}

#[test]
fn config_init_twice_fails() {
    let home = TempDir::new().unwrap();
    dual_capture_bin(&home).args(["config", "init"]).assert().success();
    dual_capture_bin(&home)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn config_list_with_no_file() {
    let home = TempDir::new().unwrap();
    dual_capture_bin(&home)
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(not set)").and(predicate::str::contains("video_device")));
}

#[test]
fn malformed_config_file_reported() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join("dual-capture");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), "duration = [").unwrap();

    dual_capture_bin(&home)
        .args(["config", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config file"));
}
