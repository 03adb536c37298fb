// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-plane client: HTTP/1.1 over the project Unix socket.
//!
//! One request per connection, mirroring the daemon's framing. Typed
//! wrappers cover every endpoint; `stream_output` consumes the SSE
//! stream until the session finishes or the daemon goes away.

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use orbital_core::{OutputEvent, Session};
use orbital_daemon::protocol::{
    ErrorBody, MergeResponse, SessionListResponse, ShutdownResponse, StartSessionRequest,
    StatusResponse,
};
use orbital_storage::ProjectPaths;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon not reachable at {0}")]
    Unreachable(PathBuf),

    #[error("malformed response: {0}")]
    Protocol(String),

    #[error("daemon error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub struct Client {
    socket: PathBuf,
}

struct RawResponse {
    status: u16,
    body: Vec<u8>,
}

impl Client {
    pub fn new(project_dir: &Path) -> Self {
        Self { socket: ProjectPaths::new(project_dir).socket() }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket
    }

    async fn connect(&self) -> Result<UnixStream, ClientError> {
        UnixStream::connect(&self.socket)
            .await
            .map_err(|_| ClientError::Unreachable(self.socket.clone()))
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<RawResponse, ClientError> {
        let mut stream = self.connect().await?;
        let payload = body.map(|b| b.to_string()).unwrap_or_default();
        let head = match body {
            Some(_) => format!(
                "{} {} HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
                method,
                path,
                payload.len()
            ),
            None => format!("{} {} HTTP/1.1\r\n\r\n", method, path),
        };
        stream.write_all(head.as_bytes()).await?;
        stream.write_all(payload.as_bytes()).await?;

        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await?;
        parse_response(&raw)
    }

    /// Expect a 2xx with a JSON body of type `T`.
    async fn expect_json<T: DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T, ClientError> {
        let response = self.request(method, path, body).await?;
        if !(200..300).contains(&response.status) {
            return Err(api_error(&response));
        }
        serde_json::from_slice(&response.body)
            .map_err(|e| ClientError::Protocol(format!("bad body: {}", e)))
    }

    pub async fn health(&self) -> bool {
        matches!(
            self.request("GET", "/health", None).await,
            Ok(RawResponse { status: 200, .. })
        )
    }

    pub async fn status(&self) -> Result<StatusResponse, ClientError> {
        self.expect_json("GET", "/status", None).await
    }

    pub async fn list_sessions(&self) -> Result<SessionListResponse, ClientError> {
        self.expect_json("GET", "/sessions", None).await
    }

    pub async fn start_session(
        &self,
        req: &StartSessionRequest,
    ) -> Result<Session, ClientError> {
        let body = serde_json::to_value(req)
            .map_err(|e| ClientError::Protocol(e.to_string()))?;
        self.expect_json("POST", "/sessions", Some(&body)).await
    }

    pub async fn get_session(&self, id: &str) -> Result<Session, ClientError> {
        self.expect_json("GET", &format!("/sessions/{}", id), None).await
    }

    pub async fn stop_session(&self, id: &str) -> Result<(), ClientError> {
        let response = self.request("DELETE", &format!("/sessions/{}", id), None).await?;
        if response.status == 204 {
            Ok(())
        } else {
            Err(api_error(&response))
        }
    }

    pub async fn resume_session(&self, id: &str) -> Result<Session, ClientError> {
        self.expect_json(
            "POST",
            &format!("/sessions/{}/resume", id),
            Some(&serde_json::json!({})),
        )
        .await
    }

    pub async fn merge_session(&self, id: &str) -> Result<MergeResponse, ClientError> {
        self.expect_json(
            "POST",
            &format!("/sessions/{}/merge", id),
            Some(&serde_json::json!({})),
        )
        .await
    }

    pub async fn shutdown(&self, force: bool) -> Result<ShutdownResponse, ClientError> {
        let path = if force { "/shutdown?force=true" } else { "/shutdown" };
        self.expect_json("POST", path, Some(&serde_json::json!({}))).await
    }

    /// Consume the session's event stream: history first, then live
    /// events until the session finishes or the connection drops.
    pub async fn stream_output(
        &self,
        id: &str,
        mut on_event: impl FnMut(&OutputEvent),
    ) -> Result<(), ClientError> {
        let mut stream = self.connect().await?;
        stream
            .write_all(format!("GET /sessions/{}/output HTTP/1.1\r\n\r\n", id).as_bytes())
            .await?;

        let mut reader = BufReader::new(stream);
        let mut line = String::new();

        // Status line.
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Err(ClientError::Protocol("empty response".into()));
        }
        let status: u16 = line
            .split_whitespace()
            .nth(1)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| ClientError::Protocol(format!("bad status line: {:?}", line)))?;

        // Headers.
        let mut is_stream = false;
        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                return Err(ClientError::Protocol("truncated headers".into()));
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                break;
            }
            if trimmed.to_ascii_lowercase().starts_with("content-type:")
                && trimmed.contains("text/event-stream")
            {
                is_stream = true;
            }
        }

        if status != 200 || !is_stream {
            let mut body = Vec::new();
            reader.read_to_end(&mut body).await?;
            return Err(api_error(&RawResponse { status, body }));
        }

        // Event frames.
        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                return Ok(());
            }
            if let Some(data) = line.trim_end().strip_prefix("data: ") {
                match serde_json::from_str::<OutputEvent>(data) {
                    Ok(event) => on_event(&event),
                    Err(e) => {
                        return Err(ClientError::Protocol(format!("bad event frame: {}", e)));
                    }
                }
            }
        }
    }
}

fn parse_response(raw: &[u8]) -> Result<RawResponse, ClientError> {
    let text = String::from_utf8_lossy(raw);
    let mut sections = text.splitn(2, "\r\n\r\n");
    let head = sections.next().unwrap_or("");
    let body = sections.next().unwrap_or("").as_bytes().to_vec();
    let status: u16 = head
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ClientError::Protocol(format!("bad status line: {:?}", head)))?;
    Ok(RawResponse { status, body })
}

fn api_error(response: &RawResponse) -> ClientError {
    let message = serde_json::from_slice::<ErrorBody>(&response.body)
        .map(|b| b.error)
        .unwrap_or_else(|_| String::from_utf8_lossy(&response.body).trim().to_string());
    ClientError::Api { status: response.status, message }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
