use crate::context::RequestContext;
use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::error;

const INTERNAL_SERVER_ERROR_BODY: &str = "Internal Server Error\n";

/// A panic raised while handling one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeFault {
    detail: String,
}

impl RuntimeFault {
    fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let detail = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self { detail }
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl fmt::Display for RuntimeFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler panicked: {}", self.detail)
    }
}

impl std::error::Error for RuntimeFault {}

/// The client only ever sees the generic body; the detail stays in the logs.
impl IntoResponse for RuntimeFault {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            INTERNAL_SERVER_ERROR_BODY,
        )
            .into_response()
    }
}

/// Drive `future` to completion, turning a panic into a [`RuntimeFault`].
pub async fn supervise<F, T>(future: F) -> Result<T, RuntimeFault>
where
    F: Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(RuntimeFault::from_panic)
}

/// Contain a panic in the wrapped chain to this one request and answer 500.
pub async fn recoverer(req: Request, next: Next) -> Response {
    let ctx = RequestContext::of(&req);
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match supervise(next.run(req)).await {
        Ok(response) => response,
        Err(fault) => {
            let status = StatusCode::INTERNAL_SERVER_ERROR.as_u16();
            ctx.span().in_scope(|| {
                error!(
                    method = %method,
                    path = %path,
                    status,
                    error = %fault,
                    "Recovered from panic while handling request"
                )
            });
            fault.into_response()
        }
    }
}
