//! Per-request context carried explicitly through request extensions
//!
//! The outermost layer creates one [`RequestContext`] per request holding the
//! request's tracing span and a cancellation token derived from the server's
//! shutdown token. Middleware reads it with [`RequestContext::of`] and
//! handlers take it as an extractor.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use std::convert::Infallible;
use tokio_util::sync::CancellationToken;
use tracing::{info_span, Instrument, Span};

#[derive(Debug, Clone)]
pub struct RequestContext {
    span: Span,
    shutdown: CancellationToken,
}

impl RequestContext {
    pub fn new(span: Span, shutdown: CancellationToken) -> Self {
        Self { span, shutdown }
    }

    /// Context attached to `req`, or a detached one if none was attached.
    pub fn of(req: &Request) -> Self {
        req.extensions()
            .get::<Self>()
            .cloned()
            .unwrap_or_else(Self::detached)
    }

    fn detached() -> Self {
        Self::new(Span::current(), CancellationToken::new())
    }

    /// Span that request-scoped events are recorded in
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Cancelled when the server starts shutting down
    pub fn shutdown(&self) -> &CancellationToken {
        &self.shutdown
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Self>()
            .cloned()
            .unwrap_or_else(Self::detached))
    }
}

/// Server-wide values every request context is derived from
#[derive(Debug, Clone)]
pub struct ServerContext {
    shutdown: CancellationToken,
}

impl ServerContext {
    pub fn new(shutdown: CancellationToken) -> Self {
        Self { shutdown }
    }
}

/// Attach a fresh [`RequestContext`] and run the rest of the chain inside its span
pub async fn attach_context(
    State(server): State<ServerContext>,
    mut req: Request,
    next: Next,
) -> Response {
    let span = info_span!(
        "request",
        method = %req.method(),
        path = %req.uri().path(),
    );
    let ctx = RequestContext::new(span.clone(), server.shutdown.child_token());
    req.extensions_mut().insert(ctx);

    next.run(req).instrument(span).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::middleware::from_fn_with_state;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    #[test]
    fn test_missing_context_is_detached() {
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let ctx = RequestContext::of(&req);
        assert!(!ctx.shutdown().is_cancelled());
    }

    #[tokio::test]
    async fn test_context_follows_server_shutdown() {
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let router = Router::new()
            .route(
                "/",
                get(|ctx: RequestContext| async move {
                    if ctx.shutdown().is_cancelled() {
                        StatusCode::SERVICE_UNAVAILABLE.into_response()
                    } else {
                        StatusCode::OK.into_response()
                    }
                }),
            )
            .layer(from_fn_with_state(
                ServerContext::new(shutdown),
                attach_context,
            ));

        let response = router
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
