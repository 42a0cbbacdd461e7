//! fingerd - WebFinger discovery server
//!
//! Serves `GET /.well-known/webfinger?resource=<id>` from an immutable
//! identity table built at startup from two YAML documents, plus a
//! `/healthz` liveness probe.

pub mod config;
pub mod context;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod reader;
pub mod server;
pub mod telemetry;

pub use config::Config;
pub use context::RequestContext;
pub use error::{FingerError, ProtocolError, Result};
pub use server::{create_router, run, start_server, Phase, Server};
