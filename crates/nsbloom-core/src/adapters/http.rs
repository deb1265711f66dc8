//! HTTP transport for the request router
//!
//! Every method on `/` reaches the same handler. Parameters come from the
//! query string and, for `application/x-www-form-urlencoded` bodies, from the
//! body; the query string wins when both carry a value. Both are decoded to
//! raw bytes so keys need not be UTF-8.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{RawQuery, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{Json, Router};
use nsbloom_filters::MembershipFilter;
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::service::{Reply, RequestParams, ServerContext};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Build the axum router serving `context`
pub fn build_router<F>(context: Arc<ServerContext<F>>) -> Router
where
    F: MembershipFilter + 'static,
{
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(context.config().http.max_body_bytes));

    Router::new()
        .route("/", any(handle_request::<F>))
        .fallback(unhandled)
        .layer(middleware)
        .with_state(context)
}

async fn handle_request<F>(
    State(context): State<Arc<ServerContext<F>>>,
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response
where
    F: MembershipFilter + 'static,
{
    let mut params = RequestParams::from_urlencoded(query.as_deref().unwrap_or_default().as_bytes());

    if is_form(&headers) {
        match body {
            Ok(body) => params = params.or(RequestParams::from_urlencoded(&body)),
            // Oversized or unreadable form bodies are refused, never treated as empty
            Err(rejection) => {
                debug!(error = %rejection, "Rejected form body");
                return rejection.into_response();
            }
        }
    }

    // Lazy namespace creation writes to disk
    let reply =
        tokio::task::spawn_blocking(move || context.router().handle(&method, &params)).await;

    match reply {
        Ok(reply) => reply.into_response(),
        Err(e) => {
            error!(error = %e, "Request handler panicked");
            Reply::Internal.into_response()
        }
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
}

async fn unhandled() -> StatusCode {
    StatusCode::BAD_REQUEST
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Reply::Added(id) => Json(json!({ "ok": id })).into_response(),
            Reply::Exists => Json(json!({ "error": "exists" })).into_response(),
            Reply::Member(hit) => (
                [(header::CONTENT_TYPE, "text/plain")],
                if hit { "1" } else { "0" },
            )
                .into_response(),
            Reply::Metrics(snapshot) => Json(snapshot).into_response(),
            Reply::Unhandled => StatusCode::BAD_REQUEST.into_response(),
            Reply::KeyTooLong => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "key too long" })),
            )
                .into_response(),
            Reply::InvalidNamespace => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "invalid namespace" })),
            )
                .into_response(),
            Reply::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "internal error" })),
            )
                .into_response(),
        }
    }
}
