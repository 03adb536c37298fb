// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-plane server: HTTP/1.1 over the project Unix socket.
//!
//! Connections are accepted in a loop and handled on their own tasks,
//! one request per connection. The accept loop stops when the shutdown
//! token fires.

pub mod http;
mod routes;

use chrono::Utc;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::config::DaemonConfig;
use crate::protocol::ErrorBody;
use crate::registry::SessionRegistry;
use crate::runner::SessionRunner;
use http::{read_request, HttpError, HttpResponse};
use routes::{route, ServerCtx};

pub struct Server {
    ctx: Arc<ServerCtx>,
}

impl Server {
    pub fn new(
        config: Arc<DaemonConfig>,
        registry: Arc<SessionRegistry>,
        runner: Arc<SessionRunner>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            ctx: Arc::new(ServerCtx {
                config,
                registry,
                runner,
                started_at: Utc::now(),
                shutdown,
            }),
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.ctx.shutdown.clone()
    }

    /// Accept connections until shutdown.
    pub async fn run(self, listener: UnixListener) {
        loop {
            tokio::select! {
                _ = self.ctx.shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        let ctx = Arc::clone(&self.ctx);
                        tokio::spawn(async move {
                            let (reader, mut writer) = stream.into_split();
                            let mut reader = BufReader::new(reader);
                            match read_request(&mut reader).await {
                                Ok(req) => {
                                    if let Err(e) = route(req, &ctx, &mut writer).await {
                                        debug!(error = %e, "connection error");
                                    }
                                }
                                Err(HttpError::Closed) => {}
                                Err(e @ HttpError::BodyTooLarge(_)) => {
                                    let _ = HttpResponse::json(413, &ErrorBody::new(e.to_string()))
                                        .write_to(&mut writer)
                                        .await;
                                }
                                Err(e) => {
                                    let _ = HttpResponse::json(400, &ErrorBody::new(e.to_string()))
                                        .write_to(&mut writer)
                                        .await;
                                }
                            }
                        });
                    }
                    Err(e) => error!(error = %e, "accept failed"),
                }
            }
        }
        debug!("control-plane accept loop stopped");
    }
}
