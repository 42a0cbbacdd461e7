//! WebFinger protocol handler for `/.well-known/webfinger`

use crate::context::RequestContext;
use crate::error::ProtocolError;
use axum::extract::{RawQuery, State};
use axum::http::{header, HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;
use tracing::debug;
use webfinger_store::IdentityTable;

pub const JRD_CONTENT_TYPE: &str = "application/jrd+json";

/// Answer a WebFinger query from the shared identity table.
pub async fn webfinger(
    State(table): State<Arc<IdentityTable>>,
    ctx: RequestContext,
    method: Method,
    RawQuery(query): RawQuery,
) -> Result<Response, ProtocolError> {
    if method != Method::GET {
        return Err(ProtocolError::MethodNotAllowed);
    }

    let resource = query
        .as_deref()
        .and_then(resource_param)
        .filter(|r| !r.is_empty())
        .ok_or(ProtocolError::MissingResource)?;

    let Some(finger) = table.lookup(&resource) else {
        ctx.span()
            .in_scope(|| debug!(resource = %resource, "Webfinger not found"));
        return Err(ProtocolError::NotFound);
    };

    // Json sets application/json; the header part overrides it.
    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static(JRD_CONTENT_TYPE))],
        Json(finger),
    )
        .into_response())
}

/// First `resource` value in a urlencoded query string
fn resource_param(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "resource")
        .map(|(_, value)| value.into_owned())
}
