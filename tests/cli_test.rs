//! CLI integration tests
//!
//! Runs the `pacc-chat` binary with a missing config file so that only
//! defaults, environment variables and flags apply.

mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::NOW;

fn pacc(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pacc-chat").unwrap();
    cmd.arg("--config")
        .arg(dir.path().join("missing.yaml"))
        .env("PACC_CHAT_SESSION_FILE", dir.path().join("session.json"))
        .env_remove("PACC_CHAT_STORE")
        .env_remove("RUST_LOG");
    cmd
}

fn write_session(dir: &TempDir, token: &str, expiry: i64) {
    let body = json!({ "userToken": token, "userTokenExpiry": expiry.to_string() });
    std::fs::write(dir.path().join("session.json"), body.to_string()).unwrap();
}

fn far_future() -> i64 {
    chrono::Utc::now().timestamp_millis() + 3_600_000
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("pacc-chat")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("open"));
}

#[test]
fn test_send_requires_text() {
    let dir = TempDir::new().unwrap();
    pacc(&dir).arg("send").assert().failure();
}

#[test]
fn test_status_without_session() {
    let dir = TempDir::new().unwrap();
    pacc(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Sin sesión"));
}

#[test]
fn test_status_with_valid_session() {
    let dir = TempDir::new().unwrap();
    write_session(&dir, "tok-1", far_future());

    pacc(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Sesión activa"));
}

#[test]
fn test_status_with_expired_session_clears_it() {
    let dir = TempDir::new().unwrap();
    write_session(&dir, "tok-1", NOW);

    pacc(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Sin sesión"));
    assert!(!dir.path().join("session.json").exists());
}

#[test]
fn test_ephemeral_ignores_session_file() {
    let dir = TempDir::new().unwrap();
    write_session(&dir, "tok-1", far_future());

    pacc(&dir)
        .arg("--ephemeral")
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Sin sesión"));
}

#[test]
fn test_logout_removes_session_file() {
    let dir = TempDir::new().unwrap();
    write_session(&dir, "tok-1", far_future());

    pacc(&dir).arg("logout").assert().success();
    assert!(!dir.path().join("session.json").exists());
}

#[test]
fn test_send_without_session_fails() {
    let dir = TempDir::new().unwrap();
    pacc(&dir)
        .args(["send", "hola"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Authentication required"));
}

#[test]
fn test_invalid_api_url_is_rejected() {
    let dir = TempDir::new().unwrap();
    pacc(&dir)
        .args(["--api-url", "ftp://example.com", "status"])
        .assert()
        .failure();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_send_prints_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/consulta"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"message": "<p>Tiene 2 pólizas</p>"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    write_session(&dir, "tok-1", far_future());

    pacc(&dir)
        .arg("--api-url")
        .arg(format!("{}/api", server.uri()))
        .args(["send", "Mis", "pólizas"])
        .env("PACC_CHAT_HTML_POLICY", "text")
        .assert()
        .success()
        .stdout(predicate::str::contains("Tiene 2 pólizas"));
}

#[test]
fn test_login_with_flags_stores_session() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let server = runtime.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/get-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok-9"})))
            .mount(&server)
            .await;
        server
    });

    let dir = TempDir::new().unwrap();
    pacc(&dir)
        .arg("--api-url")
        .arg(format!("{}/api", server.uri()))
        .args(["login", "--nif", "12345678z", "--movil", "600111222"])
        .assert()
        .success();

    let stored = std::fs::read_to_string(dir.path().join("session.json")).unwrap();
    assert!(stored.contains("tok-9"));
}

#[test]
fn test_login_without_input_fails() {
    let dir = TempDir::new().unwrap();
    pacc(&dir)
        .arg("login")
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Authentication required"));
    assert!(!dir.path().join("session.json").exists());
}
