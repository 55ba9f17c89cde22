//! Integration tests for the `devmon` binary.
//!
//! These cover argument parsing, configuration failures, and the one-shot
//! `check` command against a mock registry. None of them start the
//! long-running monitor with a valid configuration.
#![allow(clippy::unwrap_used)]

use std::io::{BufRead, BufReader, Write};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::NamedTempFile;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

const ISOLATED_VARS: &[&str] = &[
    "DEVMON_CONFIG",
    "DEVMON_LISTEN",
    "DEVMON_PROJECT",
    "DEVMON_POLL_INTERVAL",
    "DEVMON_DEVICE_TIMEOUT",
    "DEVMON_ACCESS_TOKEN_PATH",
    "DEVMON_LOG_FORMAT",
    "ADDRESS",
    "GCP_PROJECT",
    "DEVICE_TIMEOUT",
    "POLL_INTERVAL",
    "ACCESS_TOKEN_PATH",
    "DEVICE_LIST_PATH",
    "RUST_LOG",
];

const FAKE_HOME: &str = "/tmp/devmon-cli-test-nonexistent";

/// Build a [`Command`] for the `devmon` binary with env isolation.
///
/// Clears devmon's env vars and points config directories at a
/// nonexistent path so tests never touch a real configuration.
fn devmon_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("devmon");
    cmd.env("HOME", FAKE_HOME).env("XDG_CONFIG_HOME", FAKE_HOME);
    for var in ISOLATED_VARS {
        cmd.env_remove(var);
    }
    cmd
}

fn file_with(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn help_describes_the_tool() {
    devmon_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("offline")
            .and(predicate::str::contains("check"))
            .and(predicate::str::contains("--device-timeout")),
    );
}

#[test]
fn version_flag_prints_version() {
    devmon_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn unknown_flag_is_a_usage_error() {
    devmon_cmd().arg("--bogus").assert().code(2);
}

// ── Configuration failures ──────────────────────────────────────────

#[test]
fn timeout_below_poll_interval_exits_before_polling() {
    let token = file_with("token");
    devmon_cmd()
        .args(["--poll-interval", "60", "--device-timeout", "30"])
        .arg("--access-token")
        .arg(token.path())
        .assert()
        .code(3)
        .stderr(predicate::str::contains("device_timeout"));
}

#[test]
fn missing_access_token_file_is_fatal() {
    devmon_cmd()
        .args(["--access-token", "/nonexistent/devmon/token", "run"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("/nonexistent/devmon/token"));
}

#[test]
fn missing_device_list_is_fatal() {
    let token = file_with("token");
    devmon_cmd()
        .args(["--device-list", "/nonexistent/devmon/devices"])
        .arg("--access-token")
        .arg(token.path())
        .assert()
        .code(3);
}

#[test]
fn explicit_config_file_must_exist() {
    devmon_cmd()
        .args(["--config", "/nonexistent/devmon.toml", "config", "show"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn device_timeout_past_the_ceiling_is_fatal() {
    let token = file_with("token");
    devmon_cmd()
        .args(["--device-timeout", "18446744073709551615"])
        .arg("--access-token")
        .arg(token.path())
        .assert()
        .code(3)
        .stderr(predicate::str::contains("device_timeout"));
}

#[test]
fn invalid_listen_address_is_fatal() {
    let token = file_with("token");
    devmon_cmd()
        .args(["--host", "not-an-address"])
        .arg("--access-token")
        .arg(token.path())
        .assert()
        .code(3)
        .stderr(predicate::str::contains("listen"));
}

// ── config ──────────────────────────────────────────────────────────

#[test]
fn config_show_merges_file_and_flags() {
    let config = file_with(
        r#"
poll_interval = 10

[error_reporting]
project = "fleet"
api_key = "super-secret"
"#,
    );
    devmon_cmd()
        .arg("--config")
        .arg(config.path())
        .args(["--device-timeout", "120", "config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("poll_interval = 10")
                .and(predicate::str::contains("device_timeout = 120"))
                .and(predicate::str::contains("project = \"fleet\""))
                .and(predicate::str::contains("super-secret").not()),
        );
}

#[test]
fn config_path_prints_a_toml_path() {
    devmon_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn config_path_works_without_a_loadable_config() {
    devmon_cmd()
        .args(["--config", "/nonexistent/devmon.toml", "config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn unprefixed_env_vars_are_read() {
    devmon_cmd()
        .env("POLL_INTERVAL", "15")
        .env("DEVICE_TIMEOUT", "45")
        .env("GCP_PROJECT", "legacy-fleet")
        .env("ADDRESS", ":9191")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("poll_interval = 15")
                .and(predicate::str::contains("device_timeout = 45"))
                .and(predicate::str::contains("project = \"legacy-fleet\""))
                .and(predicate::str::contains("listen = \":9191\"")),
        );
}

#[test]
fn prefixed_env_vars_win_over_unprefixed() {
    devmon_cmd()
        .env("POLL_INTERVAL", "15")
        .env("DEVMON_POLL_INTERVAL", "20")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("poll_interval = 20"));
}

// ── check ───────────────────────────────────────────────────────────

async fn registry() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/devices"))
        .and(header("authorization", "Bearer fleet-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "d1", "name": "pump", "connected": false },
            { "id": "d2", "name": null, "connected": true },
            { "id": "d3", "name": "valve", "connected": true }
        ])))
        .mount(&server)
        .await;
    server
}

#[tokio::test(flavor = "multi_thread")]
async fn check_prints_monitored_devices() {
    let server = registry().await;
    let token = file_with("fleet-token\n");
    let devices = file_with("d1\nd2\n");

    devmon_cmd()
        .arg("--registry-url")
        .arg(format!("{}/v1/devices", server.uri()))
        .arg("--access-token")
        .arg(token.path())
        .arg("--device-list")
        .arg(devices.path())
        .arg("check")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("pump")
                .and(predicate::str::contains("offline"))
                .and(predicate::str::contains("valve").not())
                .and(predicate::str::contains("2 monitored, 1 offline")),
        );
}

#[tokio::test(flavor = "multi_thread")]
async fn check_json_output_is_parseable() {
    let server = registry().await;
    let token = file_with("fleet-token");

    let output = devmon_cmd()
        .arg("--registry-url")
        .arg(format!("{}/v1/devices", server.uri()))
        .arg("--access-token")
        .arg(token.path())
        .args(["check", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let devices: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let devices = devices.as_array().unwrap();
    assert_eq!(devices.len(), 3);
    assert_eq!(devices[0]["id"], "d1");
    assert_eq!(devices[0]["connected"], false);
    assert_eq!(devices[1]["name"], "");
}

#[tokio::test(flavor = "multi_thread")]
async fn check_with_rejected_token_exits_with_auth_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/devices"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_token"
        })))
        .mount(&server)
        .await;
    let token = file_with("stale");

    devmon_cmd()
        .arg("--registry-url")
        .arg(format!("{}/v1/devices", server.uri()))
        .arg("--access-token")
        .arg(token.path())
        .arg("check")
        .assert()
        .code(4);
}

// ── run ─────────────────────────────────────────────────────────────

/// Read JSON log lines until EOF, sending the status server address once
/// it is announced.
fn watch_status_addr(stderr: impl std::io::Read, found: std::sync::mpsc::Sender<String>) {
    for line in BufReader::new(stderr).lines() {
        let Ok(line) = line else { return };
        let Ok(event) = serde_json::from_str::<serde_json::Value>(&line) else {
            continue;
        };
        if event["fields"]["message"] != "status server listening" {
            continue;
        }
        if let Some(addr) = event["fields"]["addr"].as_str() {
            let _ = found.send(addr.to_owned());
        }
    }
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn sigterm_drains_and_exits_cleanly() {
    let server = registry().await;
    let token = file_with("fleet-token");

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_devmon"));
    cmd.env("HOME", FAKE_HOME).env("XDG_CONFIG_HOME", FAKE_HOME);
    for var in ISOLATED_VARS {
        cmd.env_remove(var);
    }
    let mut child = cmd
        .arg("--registry-url")
        .arg(format!("{}/v1/devices", server.uri()))
        .arg("--access-token")
        .arg(token.path())
        .args(["--host", "127.0.0.1:0", "--log-format", "json", "run"])
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    let stderr = child.stderr.take().unwrap();
    let (found, addr_rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || watch_status_addr(stderr, found));
    let addr = tokio::task::spawn_blocking(move || addr_rx.recv_timeout(Duration::from_secs(10)))
        .await
        .unwrap()
        .expect("status server address in logs");

    let resp = reqwest::get(format!("http://{addr}/_status/healthz"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");

    let status = Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let started = Instant::now();
    let exit = loop {
        if let Some(exit) = child.try_wait().unwrap() {
            break exit;
        }
        if started.elapsed() > Duration::from_secs(10) {
            child.kill().unwrap();
            panic!("devmon did not exit within 10s of SIGTERM");
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    };
    assert_eq!(exit.code(), Some(0));
}
