use assert_cmd::Command;
use assert_cmd::cargo;
use http_utils::{ExecutorConfig, HttpError, RequestExecutor, RequestOptions};
use mockito::{Matcher, Server};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Widget {
    name: String,
    sizes: Vec<u32>,
}

/// Blocking listener that accepts connections and never answers.
fn spawn_silent_listener() -> (String, Arc<AtomicUsize>) {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&accepted);

    std::thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    counter.fetch_add(1, Ordering::SeqCst);
                    held.push(stream);
                }
                Err(_) => break,
            }
        }
    });

    (format!("http://{}", addr), accepted)
}

/// Async listener that stays silent for the first `silent` connections and
/// answers every later one with `body` as a 200 response.
async fn spawn_flaky_server(silent: usize, body: &'static str) -> (String, Arc<AtomicUsize>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&accepted);

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((mut socket, _)) = listener.accept().await {
            let seen = counter.fetch_add(1, Ordering::SeqCst);
            if seen < silent {
                held.push(socket);
                continue;
            }
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{}", addr), accepted)
}

/// Waits until `counter` reaches `expected`, or two seconds pass.
fn wait_for_count(counter: &AtomicUsize, expected: usize) -> usize {
    let deadline = Instant::now() + Duration::from_secs(2);
    while counter.load(Ordering::SeqCst) < expected && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    std::thread::sleep(Duration::from_millis(50));
    counter.load(Ordering::SeqCst)
}

#[test]
fn test_cli_get_prints_body() {
    let mut server = Server::new();
    let url = server.url();

    let mock = server
        .mock("GET", "/get")
        .match_header("x-id", "1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"value":42}"#)
        .create();

    Command::new(cargo::cargo_bin!("http-utils"))
        .arg("get")
        .arg(format!("{}/get", url))
        .arg("-H")
        .arg("X-Id: 1")
        .arg("--include")
        .assert()
        .success()
        .stdout(predicates::str::contains("HTTP 200"))
        .stdout(predicates::str::contains(r#"{"value":42}"#));

    mock.assert();
}

#[test]
fn test_cli_post_sends_json_body() {
    let mut server = Server::new();
    let url = server.url();

    let mock = server
        .mock("POST", "/post")
        .match_header("content-type", "application/json")
        .match_body(Matcher::JsonString(r#"{"name":"widget","sizes":[1,2]}"#.to_string()))
        .with_status(201)
        .create();

    Command::new(cargo::cargo_bin!("http-utils"))
        .arg("post")
        .arg(format!("{}/post", url))
        .arg("--data")
        .arg(r#"{"name":"widget","sizes":[1,2]}"#)
        .arg("-i")
        .assert()
        .success()
        .stdout(predicates::str::contains("HTTP 201"));

    mock.assert();
}

#[test]
fn test_cli_put_reads_body_from_file() {
    let mut server = Server::new();
    let url = server.url();

    let mock = server
        .mock("PUT", "/items/42")
        .match_body(Matcher::JsonString(r#"{"name":"bolt","sizes":[]}"#.to_string()))
        .with_status(200)
        .with_body("updated")
        .create();

    let mut body_file = NamedTempFile::new().unwrap();
    write!(body_file, r#"{{"name":"bolt","sizes":[]}}"#).unwrap();

    Command::new(cargo::cargo_bin!("http-utils"))
        .arg("put")
        .arg(format!("{}/items/{{id}}", url))
        .arg("--var")
        .arg("id=42")
        .arg("--data-file")
        .arg(body_file.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("updated"));

    mock.assert();
}

#[test]
fn test_cli_error_status_is_success_without_fail_flag() {
    let mut server = Server::new();
    let url = server.url();

    let _mock = server
        .mock("DELETE", "/items/9")
        .with_status(404)
        .with_body("no such item")
        .expect(2)
        .create();

    Command::new(cargo::cargo_bin!("http-utils"))
        .arg("delete")
        .arg(format!("{}/items/9", url))
        .assert()
        .success()
        .stdout(predicates::str::contains("no such item"));

    Command::new(cargo::cargo_bin!("http-utils"))
        .arg("delete")
        .arg(format!("{}/items/9", url))
        .arg("--fail")
        .assert()
        .failure()
        .stderr(predicates::str::contains("HTTP 404"));
}

#[test]
fn test_cli_retries_timeouts_then_fails() {
    let (url, accepted) = spawn_silent_listener();

    Command::new(cargo::cargo_bin!("http-utils"))
        .arg("get")
        .arg(format!("{}/slow", url))
        .arg("--read-timeout")
        .arg("200")
        .arg("--retries")
        .arg("2")
        .assert()
        .failure()
        .stderr(predicates::str::contains("timed out after 3 attempt(s)"));

    assert_eq!(wait_for_count(&accepted, 3), 3);
}

#[test]
fn test_cli_connection_refused_is_not_retried() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    Command::new(cargo::cargo_bin!("http-utils"))
        .arg("get")
        .arg(format!("http://{}/", addr))
        .arg("--retries")
        .arg("3")
        .assert()
        .failure()
        .stderr(predicates::str::contains("failed after 1 attempt(s)"));
}

#[test]
fn test_cli_unresolved_placeholder_sends_nothing() {
    let (url, accepted) = spawn_silent_listener();

    Command::new(cargo::cargo_bin!("http-utils"))
        .arg("get")
        .arg(format!("{}/users/{{id}}", url))
        .arg("--var")
        .arg("other=x")
        .assert()
        .failure()
        .stderr(predicates::str::contains("no value for URI variable 'id'"));

    assert_eq!(wait_for_count(&accepted, 1), 0);
}

#[tokio::test]
async fn test_executor_recovers_when_server_answers_third_connection() {
    let (url, accepted) = spawn_flaky_server(2, r#"{"value":42}"#).await;

    let options = RequestOptions::new()
        .with_header("X-Id", "1")
        .with_connect_timeout_ms(1000)
        .with_read_timeout_ms(300)
        .with_max_retries(3);

    let result: Option<serde_json::Value> = RequestExecutor::new(ExecutorConfig::default())
        .get_json(&format!("{}/get", url), options)
        .await
        .unwrap();

    assert_eq!(result, Some(serde_json::json!({"value": 42})));
    assert_eq!(accepted.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_executor_reports_every_attempt_on_exhaustion() {
    let (url, accepted) = spawn_flaky_server(usize::MAX, "").await;

    let options = RequestOptions::new()
        .with_json(&Widget {
            name: "gear".to_string(),
            sizes: vec![3],
        })
        .with_read_timeout_ms(200)
        .with_max_retries(2);

    let err = RequestExecutor::new(ExecutorConfig::default())
        .post(&format!("{}/post", url), options)
        .await
        .unwrap_err();

    assert!(matches!(err, HttpError::Timeout { attempts: 3, .. }), "got {err}");
    assert_eq!(accepted.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_executor_round_trips_posted_widget() {
    let mut server = Server::new_async().await;
    let widget = Widget {
        name: "sprocket".to_string(),
        sizes: vec![8, 16],
    };
    let json = serde_json::to_string(&widget).unwrap();

    let mock = server
        .mock("POST", "/echo")
        .match_body(Matcher::JsonString(json.clone()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json)
        .create_async()
        .await;

    let echoed: Option<Widget> = RequestExecutor::new(ExecutorConfig::default())
        .post_json(
            &format!("{}/echo", server.url()),
            RequestOptions::new().with_json(&widget),
        )
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(echoed, Some(widget));
}

#[tokio::test]
async fn test_executor_204_is_absent_result() {
    let mut server = Server::new_async().await;
    let _m = server
        .mock("GET", "/get")
        .with_status(204)
        .create_async()
        .await;

    let result: Option<Widget> = RequestExecutor::new(ExecutorConfig::default())
        .get_json(&format!("{}/get", server.url()), RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(result, None);
}

#[tokio::test]
async fn test_executor_sends_configured_user_agent() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/whoami")
        .match_header("user-agent", "inventory-sync/2.1")
        .match_header("accept", "application/json")
        .with_status(200)
        .create_async()
        .await;

    let config = ExecutorConfig::new()
        .with_user_agent("inventory-sync/2.1")
        .with_default_header("Accept", "application/json");

    let response = RequestExecutor::new(config)
        .get(&format!("{}/whoami", server.url()), RequestOptions::new())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(response.status(), 200);
}
