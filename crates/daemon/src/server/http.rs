// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal HTTP/1.1 framing for the control plane.
//!
//! One request per connection (`Connection: close`). Bodies are JSON,
//! capped at 1 MiB. Streaming responses use server-sent events.

use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use orbital_core::OutputEvent;

/// Request-body cap.
pub const MAX_BODY: usize = 1024 * 1024;

const MAX_HEADERS: usize = 64;
const MAX_LINE: usize = 8 * 1024;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("request body too large ({0} bytes)")]
    BodyTooLarge(usize),

    #[error("connection closed")]
    Closed,

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// A parsed request.
#[derive(Debug)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    /// Header names lowercased.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Non-empty path segments, in order.
    pub fn segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn is_json(&self) -> bool {
        self.header("content-type")
            .map(|ct| ct.split(';').next().unwrap_or("").trim() == "application/json")
            .unwrap_or(false)
    }
}

async fn read_line<R: AsyncBufReadExt + Unpin>(reader: &mut R) -> Result<String, HttpError> {
    let mut line = String::new();
    let n = reader
        .take(MAX_LINE as u64)
        .read_line(&mut line)
        .await
        .map_err(|e| HttpError::Malformed(format!("bad header line: {}", e)))?;
    if n == 0 {
        return Err(HttpError::Closed);
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Parse one request from the stream.
pub async fn read_request<R: AsyncBufReadExt + Unpin>(
    reader: &mut R,
) -> Result<HttpRequest, HttpError> {
    let request_line = read_line(reader).await?;
    let mut parts = request_line.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| HttpError::Malformed("empty request line".into()))?
        .to_string();
    let target = parts
        .next()
        .ok_or_else(|| HttpError::Malformed("missing request target".into()))?;
    match parts.next() {
        Some(version) if version.starts_with("HTTP/1.") => {}
        other => {
            return Err(HttpError::Malformed(format!("bad http version: {:?}", other)));
        }
    }

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path.to_string(), parse_query(query)),
        None => (target.to_string(), HashMap::new()),
    };

    let mut headers = HashMap::new();
    loop {
        let line = read_line(reader).await?;
        if line.is_empty() {
            break;
        }
        if headers.len() >= MAX_HEADERS {
            return Err(HttpError::Malformed("too many headers".into()));
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| HttpError::Malformed(format!("bad header: {:?}", line)))?;
        headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
    }

    let content_length: usize = headers
        .get("content-length")
        .map(|v| v.parse())
        .transpose()
        .map_err(|_| HttpError::Malformed("bad content-length".into()))?
        .unwrap_or(0);
    if content_length > MAX_BODY {
        return Err(HttpError::BodyTooLarge(content_length));
    }

    let mut body = vec![0u8; content_length];
    if content_length > 0 {
        reader.read_exact(&mut body).await?;
    }

    Ok(HttpRequest { method, path, query, headers, body })
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

fn reason_for(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// A buffered response; built, then written in one shot.
#[derive(Debug)]
pub struct HttpResponse {
    status: u16,
    body: Vec<u8>,
}

impl HttpResponse {
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_else(|_| b"{}".to_vec());
        Self { status, body }
    }

    pub fn no_content() -> Self {
        Self { status: 204, body: Vec::new() }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub async fn write_to<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> std::io::Result<()> {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\nConnection: close\r\n",
            self.status,
            reason_for(self.status)
        );
        if self.status != 204 {
            head.push_str("Content-Type: application/json\r\n");
            head.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        }
        head.push_str("\r\n");
        writer.write_all(head.as_bytes()).await?;
        if self.status != 204 {
            writer.write_all(&self.body).await?;
        }
        writer.flush().await
    }
}

/// Server-sent-event stream over an already-accepted connection.
pub struct SseStream<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> SseStream<W> {
    /// Write the stream headers.
    pub async fn start(mut writer: W) -> std::io::Result<Self> {
        writer
            .write_all(
                b"HTTP/1.1 200 OK\r\n\
                  Content-Type: text/event-stream\r\n\
                  Cache-Control: no-cache\r\n\
                  Connection: close\r\n\r\n",
            )
            .await?;
        writer.flush().await?;
        Ok(Self { writer })
    }

    /// Send one event frame. An error means the client went away.
    pub async fn send(&mut self, event: &OutputEvent) -> std::io::Result<()> {
        let data = serde_json::to_string(event)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        self.writer.write_all(format!("data: {}\n\n", data).as_bytes()).await?;
        self.writer.flush().await
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
