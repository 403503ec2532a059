//! Exit codes and shutdown behaviour of the `weather_osc` binary

mod common;

use std::process::Stdio;
use std::time::Duration;
#[cfg(unix)]
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

#[cfg(unix)]
use common::weather_body;
use common::{Reply, StubServer};
use weather_osc::config::{PartialConfig, PLACEHOLDER_API_KEY};

fn weather_osc() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_weather_osc"));
    cmd.env_remove("OPENWEATHER_API_KEY")
        .env_remove("RUST_LOG")
        .stdin(Stdio::null())
        .kill_on_drop(true);
    cmd
}

fn bridge_args(server: &StubServer) -> Vec<String> {
    [
        "--api-key", "test-key", "--location", "Paris", "--port", "47400", "--interval",
        "3600", "--api-url",
    ]
    .iter()
    .map(|s| s.to_string())
    .chain(std::iter::once(server.url.clone()))
    .collect()
}

#[tokio::test]
async fn test_missing_key_and_location_exits_with_failure() {
    let output = weather_osc().output().await.unwrap();
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--api-key and --location"), "{stderr}");
}

#[tokio::test]
async fn test_create_config_writes_example_and_exits_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weather.yaml");

    let output = weather_osc()
        .arg("--create-config")
        .arg(&path)
        .output()
        .await
        .unwrap();
    assert!(output.status.success());
    assert_eq!(
        PartialConfig::from_file(&path).unwrap(),
        PartialConfig::example()
    );
}

#[tokio::test]
async fn test_placeholder_config_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weather.yaml");
    PartialConfig::write_example(&path).unwrap();

    let output = weather_osc().arg("-c").arg(&path).output().await.unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains(PLACEHOLDER_API_KEY), "{stderr}");
}

#[tokio::test]
async fn test_invalid_key_is_logged_once_and_exits_with_failure() {
    let server = StubServer::start(vec![Reply::Json(
        401,
        r#"{"cod":401,"message":"Invalid API key."}"#.into(),
    )])
    .await;

    let output = tokio::time::timeout(
        Duration::from_secs(20),
        weather_osc().args(bridge_args(&server)).output(),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(
        stderr.matches("Invalid API key - check your configuration").count(),
        1,
        "{stderr}"
    );
    assert_eq!(server.requests().len(), 1);
}

#[cfg(unix)]
async fn assert_signal_shuts_down_cleanly(signal: &str) {
    let server = StubServer::start(vec![Reply::Json(200, weather_body(70.0, 5.0, None))]).await;
    let mut child = weather_osc()
        .args(bridge_args(&server))
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    let pid = child.id().unwrap();
    let mut lines = BufReader::new(child.stderr.take().unwrap()).lines();

    let log = tokio::time::timeout(Duration::from_secs(20), async {
        let mut log = String::new();
        // First cycle done: the loop is now sleeping and the handler is installed
        while let Some(line) = lines.next_line().await.unwrap() {
            let sent = line.contains("Sent - ");
            log.push_str(&line);
            log.push('\n');
            if sent {
                break;
            }
        }

        let kill = Command::new("kill")
            .arg(format!("-{signal}"))
            .arg(pid.to_string())
            .status()
            .await
            .unwrap();
        assert!(kill.success());

        while let Some(line) = lines.next_line().await.unwrap() {
            log.push_str(&line);
            log.push('\n');
        }
        log
    })
    .await
    .unwrap();

    let status = child.wait().await.unwrap();
    assert!(status.success(), "{signal}: {status:?}\n{log}");
    assert!(log.contains("Shutting down gracefully..."), "{signal}:\n{log}");
}

#[cfg(unix)]
#[tokio::test]
async fn test_sigint_shuts_down_cleanly() {
    assert_signal_shuts_down_cleanly("INT").await;
}

#[cfg(unix)]
#[tokio::test]
async fn test_sigterm_shuts_down_cleanly() {
    assert_signal_shuts_down_cleanly("TERM").await;
}
