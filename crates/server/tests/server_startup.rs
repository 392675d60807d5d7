use std::io::Write;
use std::net::TcpListener;
use std::path::Path;
use std::time::Duration;

use tempfile::{NamedTempFile, TempDir};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

/// Find an available port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Create a minimal valid config
fn minimal_config(port: u16, db_path: &Path) -> String {
    format!(
        r#"
[database]
path = "{}"

[server]
host = "127.0.0.1"
port = {}
"#,
        db_path.display(),
        port
    )
}

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

/// Spawn the server and return a handle
fn spawn_server(config_path: &Path) -> tokio::process::Child {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_mediacat"))
        .env("MEDIACAT_CONFIG", config_path)
        .env("RUST_LOG", "error") // Quiet logs during tests
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn server")
}

/// Issue a bare HTTP/1.1 GET and return the raw response.
async fn http_get(port: u16, path: &str) -> Option<String> {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.ok()?;
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: close\r\n\r\n",
        path
    );
    stream.write_all(request.as_bytes()).await.ok()?;
    let mut response = String::new();
    stream.read_to_string(&mut response).await.ok()?;
    Some(response)
}

/// Wait for server to be ready
async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    for _ in 0..max_attempts {
        if http_get(port, "/api/v1/health").await.is_some() {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    false
}

async fn run_to_exit(config_path: &Path) -> std::process::Output {
    timeout(
        Duration::from_secs(5),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_mediacat"))
            .env("MEDIACAT_CONFIG", config_path)
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command")
}

#[tokio::test]
async fn test_health_endpoint() {
    let temp_dir = TempDir::new().unwrap();
    let port = get_available_port();
    let config = write_config(&minimal_config(port, &temp_dir.path().join("catalog.db")));

    let mut server = spawn_server(config.path());
    assert!(
        wait_for_server(port, 100).await,
        "Server did not start in time"
    );

    let response = http_get(port, "/api/v1/health").await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains(r#""status":"ok""#));

    // Cleanup
    server.kill().await.ok();
}

#[tokio::test]
async fn test_startup_seeds_catalog() {
    let temp_dir = TempDir::new().unwrap();
    let port = get_available_port();
    let config = write_config(&minimal_config(port, &temp_dir.path().join("catalog.db")));

    let mut server = spawn_server(config.path());
    assert!(
        wait_for_server(port, 100).await,
        "Server did not start in time"
    );

    let response = http_get(port, "/api/v1/catalog/stats").await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains(r#""total_objects":7"#));

    server.kill().await.ok();
}

#[tokio::test]
async fn test_missing_config_file_exits_with_error() {
    let result = run_to_exit(Path::new("/nonexistent/config.toml")).await;
    assert!(!result.status.success());
}

#[tokio::test]
async fn test_invalid_config_exits_with_error() {
    let config = write_config(
        r#"
[server]
port = 0
"#,
    );
    let result = run_to_exit(config.path()).await;
    assert!(!result.status.success());
}

#[tokio::test]
async fn test_hidden_root_exits_with_error() {
    let config = write_config(
        r#"
[catalog]
hidden_subtrees = ["root"]
"#,
    );
    let result = run_to_exit(config.path()).await;
    assert!(!result.status.success());
}
