#![cfg(unix)]

use std::{
    path::Path,
    process::Stdio,
    time::{Duration, Instant},
};

use anyhow::{Context, Result, bail};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tokio::process::{Child, Command};

const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::test]
async fn cluster_serves_requests_from_every_worker() -> Result<()> {
    let binary = assert_cmd::cargo::cargo_bin!("users-api");
    let port = free_port()?;
    let mut primary = spawn_cluster(&binary, port, 2)?;
    let base = format!("http://127.0.0.1:{port}");
    let client = Client::new();

    let outcome = exercise_cluster(&client, &base).await;

    let _ = primary.kill().await;
    let _ = primary.wait().await;
    outcome
}

async fn exercise_cluster(client: &Client, base: &str) -> Result<()> {
    wait_until_serving(client, base).await?;

    let response = client
        .post(format!("{base}/api/users"))
        .json(&json!({ "username": "ada", "age": 36, "hobbies": [] }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = response.json().await?;
    assert!(created["id"].is_string());

    // Workers keep separate stores, so only the shape of the listing is stable.
    for _ in 0..10 {
        let response = Client::new()
            .get(format!("{base}/api/users"))
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        let listed: Value = response.json().await?;
        let users = listed.as_array().context("listing should be an array")?;
        assert!(users.len() <= 1);
    }

    let response = client.get(format!("{base}/api/users/1234567890")).send().await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

fn spawn_cluster(binary: &Path, port: u16, workers: usize) -> Result<Child> {
    Command::new(binary)
        .arg("cluster")
        .arg("--host")
        .arg("127.0.0.1")
        .arg("--port")
        .arg(port.to_string())
        .arg("--workers")
        .arg(workers.to_string())
        .env("RUST_LOG_STYLE", "never")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .context("failed to spawn cluster")
}

fn free_port() -> Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

async fn wait_until_serving(client: &Client, base: &str) -> Result<()> {
    let deadline = Instant::now() + STARTUP_TIMEOUT;
    loop {
        match client.get(format!("{base}/api/users")).send().await {
            Ok(response) if response.status() == StatusCode::OK => return Ok(()),
            Ok(_) | Err(_) if Instant::now() < deadline => {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            Ok(response) => bail!("cluster answered {} while starting", response.status()),
            Err(err) => return Err(err).context("cluster did not start in time"),
        }
    }
}
