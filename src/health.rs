//! `GET /health` endpoint handler.
//!
//! Returns a [`HealthResponse`] JSON payload containing the server
//! version, build metadata, uptime, config source metadata, loaded
//! plugin counts, live engine instances, and cumulative request
//! statistics.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::server::AppState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub build: BuildInfo,
    pub uptime_seconds: u64,
    pub config: ConfigHealth,
    pub instances: Vec<String>,
    pub stats: StatsResponse,
}

#[derive(Serialize, Deserialize)]
pub struct BuildInfo {
    pub git: String,
    pub profile: String,
}

#[derive(Serialize, Deserialize)]
pub struct ConfigHealth {
    pub source: String,
    pub version: String,
    pub loaded_ago_seconds: u64,
    pub plugins: usize,
    pub heads: usize,
    pub tests: usize,
}

#[derive(Serialize, Deserialize)]
pub struct StatsResponse {
    pub requests_dispatched: u64,
    pub requests_failed: u64,
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let loaded = &state.config;

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        build: BuildInfo {
            git: env!("HYDRA_GIT_SHORT").to_string(),
            profile: env!("HYDRA_BUILD_PROFILE").to_string(),
        },
        uptime_seconds: state.start_time.elapsed().as_secs(),
        config: ConfigHealth {
            source: loaded.source_name.clone(),
            version: loaded.version.short().to_string(),
            loaded_ago_seconds: loaded.loaded_at.elapsed().as_secs(),
            plugins: loaded.plugins,
            heads: loaded.heads,
            tests: loaded.tests,
        },
        instances: state.instances.identities(),
        stats: StatsResponse {
            requests_dispatched: state.stats.dispatched.load(Ordering::Relaxed),
            requests_failed: state.stats.failed.load(Ordering::Relaxed),
        },
    })
}
