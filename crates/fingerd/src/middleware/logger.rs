use super::recorder::ResponseRecorder;
use crate::context::RequestContext;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use std::time::Instant;
use tracing::info;

/// Log method, path, status and duration once the wrapped handler returns.
pub async fn request_logger(req: Request, next: Next) -> Response {
    let ctx = RequestContext::of(&req);
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let mut recorder = ResponseRecorder::new(ctx.span().clone());
    let response = recorder.record(next.run(req).await);

    let status = recorder.status().map(|s| s.as_u16()).unwrap_or_default();
    ctx.span().in_scope(|| {
        info!(
            method = %method,
            path = %path,
            status,
            duration = ?started.elapsed(),
            "Request completed"
        )
    });

    response
}
