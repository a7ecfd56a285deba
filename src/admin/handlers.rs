use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use super::AdminError;
use crate::engine::registry::{HeadSummary, PluginSummary};
use crate::engine::scenario::{ResultTable, ScenarioRef};
use crate::engine::Engine;
use crate::identity::identity_from_headers;
use crate::server::AppState;

#[derive(Serialize)]
pub struct Overview {
    pub identity: String,
    pub plugins: Vec<PluginSummary>,
    pub current_test: ScenarioRef,
    pub results: ResultTable,
}

#[derive(Serialize)]
pub struct HeadState {
    pub plugin: String,
    pub head: String,
    pub attached: bool,
}

async fn engine_for(state: &AppState, headers: &HeaderMap) -> Result<(String, Arc<Engine>), AdminError> {
    let identity = identity_from_headers(headers, &state.identity_cookie);
    let engine = state.instances.instance(&identity).await?;
    Ok((identity, engine))
}

pub async fn overview(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Overview>, AdminError> {
    let (identity, engine) = engine_for(&state, &headers).await?;
    Ok(Json(Overview {
        identity,
        plugins: engine.plugins(),
        current_test: engine.active_scenario(),
        results: engine.test_results(),
    }))
}

pub async fn list_plugins(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<PluginSummary>>, AdminError> {
    let (_, engine) = engine_for(&state, &headers).await?;
    Ok(Json(engine.plugins()))
}

pub async fn show_plugin(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(plugin): Path<String>,
) -> Result<Json<PluginSummary>, AdminError> {
    let (_, engine) = engine_for(&state, &headers).await?;
    Ok(Json(engine.plugin(&plugin)?))
}

pub async fn show_head(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((plugin, head)): Path<(String, String)>,
) -> Result<Json<HeadSummary>, AdminError> {
    let (_, engine) = engine_for(&state, &headers).await?;
    Ok(Json(engine.find_head(&plugin, &head)?))
}

pub async fn attach_head(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((plugin, head)): Path<(String, String)>,
) -> Result<Json<HeadState>, AdminError> {
    let (_, engine) = engine_for(&state, &headers).await?;
    engine.attach_head(&plugin, &head)?;
    Ok(Json(HeadState {
        plugin,
        head,
        attached: true,
    }))
}

pub async fn detach_head(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((plugin, head)): Path<(String, String)>,
) -> Result<Json<HeadState>, AdminError> {
    let (_, engine) = engine_for(&state, &headers).await?;
    engine.detach_head(&plugin, &head)?;
    Ok(Json(HeadState {
        plugin,
        head,
        attached: false,
    }))
}

pub async fn start_test(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((plugin, test)): Path<(String, String)>,
) -> Result<Json<ScenarioRef>, AdminError> {
    let (identity, engine) = engine_for(&state, &headers).await?;
    engine.start_scenario(&plugin, &test)?;
    tracing::info!(identity = %identity, plugin = %plugin, test = %test, "test started via admin");
    Ok(Json(engine.active_scenario()))
}

pub async fn stop_test(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ScenarioRef>, AdminError> {
    let (_, engine) = engine_for(&state, &headers).await?;
    engine.stop_scenario();
    Ok(Json(engine.active_scenario()))
}

pub async fn test_results(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ResultTable>, AdminError> {
    let (_, engine) = engine_for(&state, &headers).await?;
    Ok(Json(engine.test_results()))
}
