//! Integration tests for the HTTP server: dispatch through head chains,
//! the admin routes, identity isolation, dispatch failures, health, and
//! graceful shutdown.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use hydra::config::model::{AdminConfig, IdentityConfig};
use hydra::config::sources::file_source::FileSource;
use hydra::config::{ConfigSource, ConfigVersion};
use hydra::engine::Next;
use hydra::error::HydraError;
use hydra::exchange::{Request, Response};
use hydra::health::HealthResponse;
use hydra::heads::static_head::StaticHead;
use hydra::heads::{Head, HeadSpec, PathPattern};
use hydra::plugins::{PluginContext, PluginDefinition, PluginEnv, PluginFactory};
use hydra::server::{self, AppState, LoadedConfig, Limits};
use serde_json::Value;

const COOKIE: &str = "hydra-identity";

async fn start_test_server() -> (SocketAddr, tokio::sync::oneshot::Sender<()>) {
    start_with_vars(&[]).await
}

async fn start_with_vars(vars: &[(&str, &str)]) -> (SocketAddr, tokio::sync::oneshot::Sender<()>) {
    let source = FileSource::new(PathBuf::from("demos/hydra.yaml")).unwrap();
    let (config, version) = source.load().await.unwrap();

    let mut env = PluginEnv::new(server::build_http_client());
    env.extra_vars = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();

    let state = AppState::new(config, version, source.name(), &source.base_dir(), env)
        .await
        .unwrap();
    serve(state).await
}

/// Server over a single [`Flaky`] plugin instead of the demo config.
async fn start_flaky_server() -> (SocketAddr, tokio::sync::oneshot::Sender<()>) {
    let loaded = LoadedConfig {
        version: ConfigVersion::Hash("flaky".into()),
        source_name: "inline".into(),
        plugins: 1,
        heads: 2,
        tests: 0,
        loaded_at: Instant::now(),
    };
    let state = AppState::with_factories(
        loaded,
        &AdminConfig::default(),
        &IdentityConfig::default(),
        vec![Arc::new(Flaky::default())],
        PluginEnv::new(server::build_http_client()),
    )
    .await
    .unwrap();
    serve(state).await
}

async fn serve(state: AppState) -> (SocketAddr, tokio::sync::oneshot::Sender<()>) {
    let router = server::build_router(Arc::new(state), Limits::default());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .await
        .unwrap();
    });

    (addr, shutdown_tx)
}

/// Resumes its continuation twice.
struct Greedy;

#[async_trait]
impl Head for Greedy {
    fn can_handle(&self, path: &str) -> bool {
        path == "/greedy"
    }

    async fn handle(&self, req: Request, res: &mut Response, next: &Next) -> Result<(), HydraError> {
        next.run(req.clone(), res).await?;
        next.run(req, res).await
    }
}

/// Plugin whose second build fails: the default identity loads at
/// startup, the first other identity to show up does not.
#[derive(Default)]
struct Flaky {
    builds: AtomicUsize,
}

impl PluginFactory for Flaky {
    fn name(&self) -> &str {
        "flaky"
    }

    fn build(&self, _ctx: &PluginContext) -> Result<PluginDefinition, HydraError> {
        if self.builds.fetch_add(1, Ordering::SeqCst) == 1 {
            return Err(HydraError::InvalidPlugin("flaky refused to load".into()));
        }
        Ok(PluginDefinition {
            name: "flaky".into(),
            heads: vec![
                HeadSpec::named("greedy", Greedy),
                HeadSpec::named(
                    "ok",
                    StaticHead::new(PathPattern::new("/.*").unwrap(), "fine"),
                ),
            ],
            tests: Default::default(),
        })
    }
}

fn as_identity(req: reqwest::RequestBuilder, identity: &str) -> reqwest::RequestBuilder {
    req.header("cookie", format!("{COOKIE}={identity}"))
}

#[tokio::test]
async fn health_endpoint_returns_healthy() {
    let (addr, shutdown) = start_test_server().await;

    let url = format!("http://{addr}/health");
    let resp = reqwest::get(&url).await.unwrap();
    assert_eq!(resp.status(), 200);

    let health: HealthResponse = resp.json().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
    assert_eq!(health.config.source, "yaml");
    assert_eq!(health.config.version.len(), 8);
    assert_eq!(health.config.plugins, 2);
    assert_eq!(health.config.heads, 4);
    assert_eq!(health.instances, vec!["*default*"]);
    assert_eq!(health.stats.requests_dispatched, 0);
    assert_eq!(health.stats.requests_failed, 0);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn static_fixture_is_served() {
    let (addr, shutdown) = start_test_server().await;

    let resp = reqwest::get(format!("http://{addr}/api/products")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "application/json");
    assert!(resp.headers().contains_key("x-correlation-id"));
    let products: Value = resp.json().await.unwrap();
    assert_eq!(products[1]["name"], "kettle");

    let _ = shutdown.send(());
}

#[tokio::test]
async fn filter_rewrites_the_next_head_body() {
    let (addr, shutdown) = start_test_server().await;

    let body = reqwest::get(format!("http://{addr}/api/price/7"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, r#"{"amount":10,"currency":"EUR"}"#);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn extra_vars_override_plugin_config() {
    let (addr, shutdown) = start_with_vars(&[("currency", "GBP")]).await;

    let body = reqwest::get(format!("http://{addr}/api/price/7"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("GBP"));

    let _ = shutdown.send(());
}

#[tokio::test]
async fn unmatched_path_returns_404() {
    let (addr, shutdown) = start_test_server().await;

    let resp = reqwest::get(format!("http://{addr}/nonexistent")).await.unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.text().await.unwrap(), "Not Found");

    let _ = shutdown.send(());
}

#[tokio::test]
async fn detached_proxy_is_attached_through_admin() {
    let (addr, shutdown) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = reqwest::get(format!("http://{addr}/live/status")).await.unwrap();
    assert_eq!(resp.status(), 404);

    let head: Value = reqwest::get(format!("http://{addr}/hydra-admin/plugins/backend/heads/upstream"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(head["kind"], "proxy");
    assert_eq!(head["attached"], false);

    let resp = client
        .post(format!("http://{addr}/hydra-admin/plugins/backend/heads/upstream/attach"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let head: Value = resp.json().await.unwrap();
    assert_eq!(head["attached"], true);

    // Nothing listens on the discard port: the proxy head answers 502.
    let resp = reqwest::get(format!("http://{addr}/live/status")).await.unwrap();
    assert_eq!(resp.status(), 502);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn admin_reports_unknown_names_as_404() {
    let (addr, shutdown) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{addr}/hydra-admin/plugins/shop/heads/nope/detach"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let error: Value = resp.json().await.unwrap();
    assert_eq!(error["error"], "not_found");
    assert!(error["message"].as_str().unwrap().contains("nope"));

    let resp = client
        .post(format!("http://{addr}/hydra-admin/tests/shop/missing/start"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn scenario_assertions_are_recorded() {
    let (addr, shutdown) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{addr}/hydra-admin/tests/shop/checkout/start"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let active: Value = resp.json().await.unwrap();
    assert_eq!(active["plugin"], "shop");
    assert_eq!(active["test"], "checkout");

    let resp = client
        .post(format!("http://{addr}/api/checkout"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("item=teapot")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.text().await.unwrap(), r#"{"status":"ok"}"#);

    let results: Value = reqwest::get(format!("http://{addr}/hydra-admin/tests/results"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let checkout = &results["shop"]["checkout"];
    assert_eq!(checkout["outcome"], "pass");
    assert_eq!(checkout["passes"].as_array().unwrap().len(), 2);
    assert!(checkout["failures"].as_array().unwrap().is_empty());

    let resp = client
        .post(format!("http://{addr}/hydra-admin/tests/stop"))
        .send()
        .await
        .unwrap();
    let active: Value = resp.json().await.unwrap();
    assert_eq!(active["plugin"], "*default*");

    // Test heads are gone once the scenario stops.
    let resp = client
        .post(format!("http://{addr}/api/checkout"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn identities_are_isolated() {
    let (addr, shutdown) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = as_identity(
        client.post(format!("http://{addr}/hydra-admin/tests/shop/out-of-stock/start")),
        "alice",
    )
    .send()
    .await
    .unwrap();
    assert_eq!(resp.status(), 200);

    let alice = as_identity(client.get(format!("http://{addr}/api/products")), "alice")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(alice, "[]");

    let default: Value = client
        .get(format!("http://{addr}/api/products"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(default.as_array().unwrap().len(), 2);

    let overview: Value = as_identity(client.get(format!("http://{addr}/hydra-admin")), "alice")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(overview["identity"], "alice");
    assert_eq!(overview["current_test"]["test"], "out-of-stock");

    let health: HealthResponse = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health.instances, vec!["*default*", "alice"]);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn dispatch_error_answers_500() {
    let (addr, shutdown) = start_flaky_server().await;

    let resp = reqwest::get(format!("http://{addr}/greedy")).await.unwrap();
    assert_eq!(resp.status(), 500);
    assert!(resp.headers().contains_key("x-correlation-id"));
    let body = resp.text().await.unwrap();
    assert!(body.contains("greedy"));
    assert!(body.contains("more than once"));

    let resp = reqwest::get(format!("http://{addr}/other")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "fine");

    let health: HealthResponse = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health.stats.requests_failed, 1);
    assert_eq!(health.stats.requests_dispatched, 1);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn plugin_load_failure_for_new_identity_answers_500_and_retries() {
    let (addr, shutdown) = start_flaky_server().await;
    let client = reqwest::Client::new();

    let resp = as_identity(client.get(format!("http://{addr}/other")), "bob")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    assert!(resp.text().await.unwrap().contains("flaky refused to load"));

    let health: HealthResponse = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health.instances, vec!["*default*"]);

    let resp = as_identity(client.get(format!("http://{addr}/other")), "bob")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "fine");

    let _ = shutdown.send(());
}

#[tokio::test]
async fn graceful_shutdown_works() {
    let (addr, shutdown) = start_test_server().await;

    // Verify server is running
    let url = format!("http://{addr}/health");
    assert!(reqwest::get(&url).await.is_ok());

    // Send shutdown
    let _ = shutdown.send(());

    // Give it a moment to shut down
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    // Server should no longer accept connections
    let result = reqwest::get(&url).await;
    assert!(result.is_err());
}
