// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Endpoint dispatch for the control plane.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use orbital_core::{validate_client_id, Error, SessionStatus};

use crate::config::DaemonConfig;
use crate::protocol::{
    ErrorBody, MergeResponse, SessionListResponse, ShutdownResponse, StartSessionRequest,
    StatusResponse,
};
use crate::registry::SessionRegistry;
use crate::runner::SessionRunner;
use crate::server::http::{HttpError, HttpRequest, HttpResponse, SseStream};

/// How long a merge may run before the endpoint answers 202 and lets it
/// continue in the background.
const MERGE_WAIT: Duration = Duration::from_millis(500);

/// Shared state for all request handlers.
pub(crate) struct ServerCtx {
    pub config: Arc<DaemonConfig>,
    pub registry: Arc<SessionRegistry>,
    pub runner: Arc<SessionRunner>,
    pub started_at: DateTime<Utc>,
    /// Cancelled by `POST /shutdown`; the lifecycle watches it.
    pub shutdown: CancellationToken,
}

fn error_response(err: &Error) -> HttpResponse {
    let status = match err {
        Error::NotFound(_) => 404,
        Error::Invalid(_) => 400,
        Error::Conflict(_) | Error::LimitExceeded(_) | Error::Cancelled => 409,
        Error::Io(_) | Error::ExternalTool(_) => 500,
    };
    HttpResponse::json(status, &ErrorBody::new(err.to_string()))
}

/// Dispatch one request and write its response.
pub(crate) async fn route<W: AsyncWrite + Unpin>(
    req: HttpRequest,
    ctx: &Arc<ServerCtx>,
    writer: &mut W,
) -> Result<(), HttpError> {
    let segments = req.segments();
    debug!(method = %req.method, path = %req.path, "request");

    if !req.body.is_empty() && !req.is_json() {
        error_response(&Error::Invalid("content-type must be application/json".into()))
            .write_to(writer)
            .await?;
        return Ok(());
    }

    let response = match (req.method.as_str(), segments.as_slice()) {
        ("GET", ["health"]) => HttpResponse::json(200, &serde_json::json!({"status": "ok"})),

        ("GET", ["status"]) => HttpResponse::json(
            200,
            &StatusResponse {
                pid: std::process::id(),
                started_at: ctx.started_at,
                project_dir: ctx.config.project_dir.clone(),
                sessions: ctx.registry.count_by_status(),
                total_cost: ctx.registry.total_cost(),
            },
        ),

        ("GET", ["sessions"]) => {
            let sessions = ctx.registry.list();
            let total = sessions.len();
            HttpResponse::json(200, &SessionListResponse { sessions, total })
        }

        ("POST", ["sessions"]) => start_session(&req, ctx).await,

        ("GET", ["sessions", id]) => match checked_id(id) {
            Ok(()) => match ctx.registry.get(id) {
                Some(session) => HttpResponse::json(200, &session),
                None => error_response(&Error::NotFound(format!("session {}", id))),
            },
            Err(e) => error_response(&e),
        },

        ("DELETE", ["sessions", id]) => match checked_id(id) {
            Ok(()) => match ctx.runner.stop(id) {
                Ok(_) => HttpResponse::no_content(),
                Err(e) => error_response(&e),
            },
            Err(e) => error_response(&e),
        },

        ("POST", ["sessions", id, "resume"]) => match checked_id(id) {
            Ok(()) => match ctx.runner.resume(id).await {
                Ok(session) => HttpResponse::json(200, &session),
                Err(e) => error_response(&e),
            },
            Err(e) => error_response(&e),
        },

        ("POST", ["sessions", id, "merge"]) => match checked_id(id) {
            Ok(()) => merge_session(id, ctx).await,
            Err(e) => error_response(&e),
        },

        ("GET", ["sessions", id, "output"]) => {
            return match checked_id(id) {
                Ok(()) => stream_output(id, ctx, writer).await,
                Err(e) => {
                    error_response(&e).write_to(writer).await?;
                    Ok(())
                }
            };
        }

        ("POST", ["shutdown"]) => {
            let response = shutdown(&req, ctx);
            let fire = response.status() == 202;
            response.write_to(writer).await?;
            if fire {
                info!("shutdown requested over control plane");
                ctx.shutdown.cancel();
            }
            return Ok(());
        }

        _ => HttpResponse::json(
            404,
            &ErrorBody::new(format!("no route for {} {}", req.method, req.path)),
        ),
    };

    response.write_to(writer).await?;
    Ok(())
}

fn checked_id(id: &str) -> Result<(), Error> {
    validate_client_id(id)
}

async fn start_session(req: &HttpRequest, ctx: &Arc<ServerCtx>) -> HttpResponse {
    if !req.is_json() {
        return error_response(&Error::Invalid("content-type must be application/json".into()));
    }
    let body: StartSessionRequest = match serde_json::from_slice(&req.body) {
        Ok(body) => body,
        Err(e) => {
            return error_response(&Error::Invalid(format!("bad request body: {}", e)));
        }
    };
    match ctx.runner.start(body).await {
        Ok(session) => HttpResponse::json(201, &session),
        Err(e) => error_response(&e),
    }
}

/// 200 when the merge settles within [`MERGE_WAIT`], else 202 while it
/// continues in the background.
async fn merge_session(id: &str, ctx: &Arc<ServerCtx>) -> HttpResponse {
    let runner = Arc::clone(&ctx.runner);
    let id = id.to_string();
    let mut task = tokio::spawn(async move { runner.merge(&id).await });

    match tokio::time::timeout(MERGE_WAIT, &mut task).await {
        Ok(Ok(Ok(session))) => {
            HttpResponse::json(200, &MergeResponse { status: session.status.to_string() })
        }
        Ok(Ok(Err(e))) => error_response(&e),
        Ok(Err(join_err)) => {
            error_response(&Error::ExternalTool(format!("merge task failed: {}", join_err)))
        }
        Err(_elapsed) => {
            // The spawned merge keeps running; its terminal transition
            // lands in the registry as usual.
            HttpResponse::json(202, &MergeResponse { status: "merging".into() })
        }
    }
}

fn shutdown(req: &HttpRequest, ctx: &Arc<ServerCtx>) -> HttpResponse {
    let force = req
        .query
        .get("force")
        .map(|v| v == "true" || v == "1" || v.is_empty())
        .unwrap_or(false);
    let counts = ctx.registry.count_by_status();
    let running = counts.get(&SessionStatus::Running).copied().unwrap_or(0)
        + counts.get(&SessionStatus::Merging).copied().unwrap_or(0);

    if running > 0 && !force {
        return HttpResponse::json(
            409,
            &ErrorBody {
                error: "sessions are running".into(),
                running_sessions: Some(running),
                hint: Some("stop sessions first or pass ?force=true".into()),
            },
        );
    }
    HttpResponse::json(202, &ShutdownResponse { status: "shutting down".into() })
}

/// History first, then live events until the session completes or the
/// client disconnects.
async fn stream_output<W: AsyncWrite + Unpin>(
    id: &str,
    ctx: &Arc<ServerCtx>,
    writer: &mut W,
) -> Result<(), HttpError> {
    let mut sub = match ctx.registry.subscribe(id) {
        Ok(sub) => sub,
        Err(e) => {
            error_response(&e).write_to(writer).await?;
            return Ok(());
        }
    };

    let mut sse = SseStream::start(writer).await?;
    let mut client_gone = false;
    for event in &sub.history {
        if sse.send(event).await.is_err() {
            client_gone = true;
            break;
        }
    }

    while !client_gone {
        tokio::select! {
            received = sub.rx.recv() => match received {
                Some(event) => {
                    if sse.send(&event).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            _ = sub.done.cancelled() => {
                // Flush whatever the broadcaster queued before the
                // terminal transition, then end the stream.
                while let Ok(event) = sub.rx.try_recv() {
                    if sse.send(&event).await.is_err() {
                        break;
                    }
                }
                break;
            }
        }
    }

    ctx.registry.unsubscribe(id, sub.subscriber_id);
    Ok(())
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
