//! HTTP server lifecycle
//!
//! Provides /.well-known/webfinger and /healthz. A [`Server`] is bound first
//! and then served until its cancellation token fires, after which in-flight
//! requests get a bounded grace period to finish.

use crate::config::Config;
use crate::context::{attach_context, ServerContext};
use crate::error::{FingerError, Result};
use crate::handler;
use crate::middleware;
use crate::reader::FingerFiles;
use axum::middleware::from_fn_with_state;
use axum::response::Json;
use axum::routing::{any, get};
use axum::Router;
use serde::Serialize;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use webfinger_store::IdentityTable;

/// Where a bound server is in its lifecycle. Before `Bound` no [`Server`] exists;
/// a failed bind never produces one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Bound,
    Serving,
    ShuttingDown,
    Stopped,
    Failed,
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Create the HTTP router
pub fn create_router(table: Arc<IdentityTable>, shutdown: CancellationToken) -> Router {
    let routes = Router::new()
        .route("/.well-known/webfinger", any(handler::webfinger))
        .route("/healthz", get(health))
        .with_state(table);

    middleware::wrap(routes)
        .layer(from_fn_with_state(
            ServerContext::new(shutdown),
            attach_context,
        ))
        .layer(CorsLayer::permissive())
}

/// Liveness probe, independent of the identity table
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// A bound listener waiting to be served
pub struct Server {
    listener: TcpListener,
    addr: SocketAddr,
    table: Arc<IdentityTable>,
    shutdown_timeout: Duration,
    phase: watch::Sender<Phase>,
}

impl Server {
    /// Bind to `config.addr()`. A missing table serves as an empty one.
    pub async fn bind(config: &Config, table: Option<Arc<IdentityTable>>) -> Result<Self> {
        let addr = config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| FingerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local = listener.local_addr().map_err(|source| FingerError::Bind {
            addr: addr.clone(),
            source,
        })?;

        info!(addr = %local, "Bound HTTP listener");

        Ok(Self {
            listener,
            addr: local,
            table: table.unwrap_or_default(),
            shutdown_timeout: config.shutdown_timeout,
            phase: watch::Sender::new(Phase::Bound),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Follow phase changes of this server
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Serve until `shutdown` is cancelled, then drain within the grace period.
    pub async fn serve(self, shutdown: CancellationToken) -> Result<()> {
        let Server {
            listener,
            addr,
            table,
            shutdown_timeout,
            phase,
        } = self;

        let router = create_router(table, shutdown.clone());
        let server = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.clone().cancelled_owned())
            .into_future();
        tokio::pin!(server);

        phase.send_replace(Phase::Serving);
        info!(addr = %addr, "Serving webfinger");

        tokio::select! {
            biased;
            () = shutdown.cancelled() => {}
            result = &mut server => {
                // Only reachable if the accept loop gives up before cancellation.
                phase.send_replace(Phase::Failed);
                error!("HTTP server stopped unexpectedly");
                return result.map_err(FingerError::Serve);
            }
        }

        phase.send_replace(Phase::ShuttingDown);
        info!(grace = ?shutdown_timeout, "Shutting down HTTP server");

        match tokio::time::timeout(shutdown_timeout, server).await {
            Ok(Ok(())) => {
                phase.send_replace(Phase::Stopped);
                info!("HTTP server stopped");
                Ok(())
            }
            Ok(Err(e)) => {
                phase.send_replace(Phase::Failed);
                Err(FingerError::Serve(e))
            }
            Err(_) => {
                phase.send_replace(Phase::Failed);
                warn!(grace = ?shutdown_timeout, "In-flight requests did not finish in time");
                Err(FingerError::ShutdownTimeout(shutdown_timeout))
            }
        }
    }
}

/// Bind and serve `table` until `shutdown` is cancelled.
pub async fn start_server(
    shutdown: CancellationToken,
    config: &Config,
    table: Option<Arc<IdentityTable>>,
) -> Result<()> {
    Server::bind(config, table).await?.serve(shutdown).await
}

/// Load both documents, build the table, then serve it.
///
/// Any read, parse or validation failure is returned before a socket is bound.
pub async fn run(config: &Config, shutdown: CancellationToken) -> Result<()> {
    let table = FingerFiles::read(config).await?.into_table()?;
    info!("Loaded {} webfingers", table.len());

    start_server(shutdown, config, Some(Arc::new(table))).await
}
