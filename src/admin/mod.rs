//! Administrative routes, mounted under the configured admin prefix.
//!
//! Every operation acts on the engine of the caller's identity, so two
//! test runners with different identity cookies can drive scenarios
//! independently. Errors come back as JSON: `404` when a plugin, head or
//! test does not exist, `400` otherwise.

mod handlers;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::error::HydraError;
use crate::server::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::overview))
        .route("/plugins", get(handlers::list_plugins))
        .route("/plugins/{plugin}", get(handlers::show_plugin))
        .route("/plugins/{plugin}/heads/{head}", get(handlers::show_head))
        .route(
            "/plugins/{plugin}/heads/{head}/attach",
            post(handlers::attach_head),
        )
        .route(
            "/plugins/{plugin}/heads/{head}/detach",
            post(handlers::detach_head),
        )
        .route("/tests/{plugin}/{test}/start", post(handlers::start_test))
        .route("/tests/stop", post(handlers::stop_test))
        .route("/tests/results", get(handlers::test_results))
}

#[derive(Debug)]
pub struct AdminError(pub HydraError);

impl From<HydraError> for AdminError {
    fn from(e: HydraError) -> Self {
        Self(e)
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let (status, kind) = if self.0.is_not_found() {
            (StatusCode::NOT_FOUND, "not_found")
        } else {
            (StatusCode::BAD_REQUEST, "bad_request")
        };
        (
            status,
            Json(serde_json::json!({
                "error": kind,
                "message": self.0.to_string(),
            })),
        )
            .into_response()
    }
}
