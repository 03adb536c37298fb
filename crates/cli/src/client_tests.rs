// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tokio::io::AsyncReadExt as _;
use tokio::net::UnixListener;

/// Serve one canned response and hand back the raw request we saw.
fn serve_once(
    socket: &Path,
    response: &'static str,
) -> tokio::task::JoinHandle<String> {
    let listener = UnixListener::bind(socket).unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 8192];
        let n = stream.read(&mut buf).await.unwrap();
        let request = String::from_utf8_lossy(&buf[..n]).to_string();
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();
        request
    })
}

fn client_in(dir: &Path) -> Client {
    let paths = ProjectPaths::new(dir);
    paths.ensure_dirs().unwrap();
    Client::new(dir)
}

fn http(status_line: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_line,
        body.len(),
        body
    )
}

#[tokio::test]
async fn health_is_true_on_200() {
    let temp = tempfile::tempdir().unwrap();
    let client = client_in(temp.path());
    let canned: &'static str =
        Box::leak(http("200 OK", r#"{"status":"ok"}"#).into_boxed_str());
    let server = serve_once(&client.socket_path().to_path_buf(), canned);

    assert!(client.health().await);
    let request = server.await.unwrap();
    assert!(request.starts_with("GET /health HTTP/1.1\r\n"));
}

#[tokio::test]
async fn health_is_false_without_daemon() {
    let temp = tempfile::tempdir().unwrap();
    let client = client_in(temp.path());
    assert!(!client.health().await);
}

#[tokio::test]
async fn api_errors_carry_status_and_message() {
    let temp = tempfile::tempdir().unwrap();
    let client = client_in(temp.path());
    let canned: &'static str =
        Box::leak(http("404 Not Found", r#"{"error":"session gone"}"#).into_boxed_str());
    let _server = serve_once(&client.socket_path().to_path_buf(), canned);

    let err = client.get_session("0123456789abcdef").await.unwrap_err();
    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "session gone");
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn stop_session_accepts_204() {
    let temp = tempfile::tempdir().unwrap();
    let client = client_in(temp.path());
    let canned: &'static str = "HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n";
    let server = serve_once(&client.socket_path().to_path_buf(), canned);

    client.stop_session("0123456789abcdef").await.unwrap();
    let request = server.await.unwrap();
    assert!(request.starts_with("DELETE /sessions/0123456789abcdef HTTP/1.1\r\n"));
}

#[tokio::test]
async fn start_session_posts_json_body() {
    let temp = tempfile::tempdir().unwrap();
    let client = client_in(temp.path());
    let session = orbital_core::SessionBuilder::new().build();
    let body = serde_json::to_string(&session).unwrap();
    let canned: &'static str = Box::leak(http("201 Created", &body).into_boxed_str());
    let server = serve_once(&client.socket_path().to_path_buf(), canned);

    let request = StartSessionRequest {
        spec_files: vec!["/p/spec.md".into()],
        ..Default::default()
    };
    let started = client.start_session(&request).await.unwrap();
    assert_eq!(started.id, session.id);

    let raw = server.await.unwrap();
    assert!(raw.starts_with("POST /sessions HTTP/1.1\r\n"));
    assert!(raw.contains("Content-Type: application/json"));
    assert!(raw.contains(r#""spec_files":["/p/spec.md"]"#));
}

#[tokio::test]
async fn shutdown_force_uses_query_param() {
    let temp = tempfile::tempdir().unwrap();
    let client = client_in(temp.path());
    let canned: &'static str =
        Box::leak(http("202 Accepted", r#"{"status":"shutting down"}"#).into_boxed_str());
    let server = serve_once(&client.socket_path().to_path_buf(), canned);

    let response = client.shutdown(true).await.unwrap();
    assert_eq!(response.status, "shutting down");
    let raw = server.await.unwrap();
    assert!(raw.starts_with("POST /shutdown?force=true HTTP/1.1\r\n"));
}

#[tokio::test]
async fn stream_output_parses_sse_frames() {
    let temp = tempfile::tempdir().unwrap();
    let client = client_in(temp.path());
    let first = serde_json::to_string(&OutputEvent::text("one")).unwrap();
    let second = serde_json::to_string(&OutputEvent::status("two")).unwrap();
    let canned: &'static str = Box::leak(
        format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\ndata: {}\n\ndata: {}\n\n",
            first, second
        )
        .into_boxed_str(),
    );
    let _server = serve_once(&client.socket_path().to_path_buf(), canned);

    let mut payloads = Vec::new();
    client
        .stream_output("0123456789abcdef", |event| payloads.push(event.payload.clone()))
        .await
        .unwrap();
    assert_eq!(payloads, vec!["one", "two"]);
}

#[tokio::test]
async fn stream_output_surfaces_api_errors() {
    let temp = tempfile::tempdir().unwrap();
    let client = client_in(temp.path());
    let canned: &'static str =
        Box::leak(http("404 Not Found", r#"{"error":"no session"}"#).into_boxed_str());
    let _server = serve_once(&client.socket_path().to_path_buf(), canned);

    let err = client
        .stream_output("0123456789abcdef", |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 404, .. }));
}
