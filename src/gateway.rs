//! Fallback handler feeding every non-admin request into an engine.
//!
//! [`dispatch_handler`] resolves the caller identity, fetches (or
//! creates) that identity's engine, adapts the Axum request into an
//! [`exchange::Request`](crate::exchange::Request), and runs the head
//! chain. Dispatch errors answer `500` with the error text. Every
//! request ends with one access-log line.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};

use crate::exchange;
use crate::identity::identity_from_headers;
use crate::server::AppState;

#[allow(clippy::cast_possible_truncation)]
pub async fn dispatch_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
    req_headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let correlation_id = req_headers
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);
    let identity = identity_from_headers(&req_headers, &state.identity_cookie);
    let url = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_string(), ToString::to_string);

    let mut request = exchange::Request::new(method.clone(), url)
        .with_headers(req_headers)
        .with_body(body)
        .with_client_ip(addr.ip().to_string());
    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        request.headers.insert("x-correlation-id", value);
    }

    let outcome = match state.instances.instance(&identity).await {
        Ok(engine) => {
            let mut res = exchange::Response::new();
            engine.dispatch(request, &mut res).await.map(|()| res)
        }
        Err(e) => Err(e),
    };

    let mut response = match outcome {
        Ok(res) => {
            state.stats.dispatched.fetch_add(1, Ordering::Relaxed);
            res.into_http()
        }
        Err(e) => {
            state.stats.failed.fetch_add(1, Ordering::Relaxed);
            tracing::error!(
                correlation_id = %correlation_id,
                identity = %identity,
                path = %uri.path(),
                error = %e,
                "dispatch failed"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    };

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response.headers_mut().insert("x-correlation-id", value);
    }

    tracing::info!(
        correlation_id = %correlation_id,
        identity = %identity,
        method = %method,
        path = %uri.path(),
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "request served"
    );

    response
}
