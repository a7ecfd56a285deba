//! Axum server setup, shared application state, and graceful shutdown.
//!
//! Contains [`AppState`] (the `Arc`-shared state holding the engine
//! instances, config metadata, stats, and uptime), [`build_router`] for
//! constructing the Axum router with middleware layers,
//! [`build_http_client`] for the connection-pooled hyper client used by
//! proxy heads, and [`shutdown_signal`] for SIGTERM / Ctrl+C handling.

use std::path::Path;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::routing::get;
use axum::Router;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::admin;
use crate::config::model::{AdminConfig, Config, IdentityConfig};
use crate::config::ConfigVersion;
use crate::engine::instances::{InstanceManager, DEFAULT_IDENTITY};
use crate::error::HydraError;
use crate::gateway::dispatch_handler;
use crate::health::health_handler;
use crate::plugins::declarative::DeclarativePlugin;
use crate::plugins::{PluginEnv, PluginFactory};

/// What was loaded at startup, reported by `/health`.
#[derive(Debug)]
pub struct LoadedConfig {
    pub version: ConfigVersion,
    pub source_name: String,
    pub plugins: usize,
    pub heads: usize,
    pub tests: usize,
    pub loaded_at: Instant,
}

#[derive(Debug)]
pub struct Stats {
    pub dispatched: AtomicU64,
    pub failed: AtomicU64,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            dispatched: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }
}

pub type HttpsConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;
pub type HttpClient = Client<HttpsConnector, http_body_util::Full<bytes::Bytes>>;

pub struct AppState {
    pub instances: InstanceManager,
    pub config: LoadedConfig,
    /// Cookie carrying the caller identity.
    pub identity_cookie: String,
    /// Mount point of the admin routes, `None` when disabled.
    pub admin_prefix: Option<String>,
    pub start_time: Instant,
    pub stats: Stats,
}

impl AppState {
    /// Build the state for a validated config.
    ///
    /// The default identity's engine is created eagerly, so a plugin that
    /// fails to load aborts startup instead of the first request.
    pub async fn new(
        config: Config,
        version: ConfigVersion,
        source_name: &str,
        base_dir: &Path,
        env: PluginEnv,
    ) -> Result<Self, HydraError> {
        let loaded = LoadedConfig {
            version,
            source_name: source_name.to_string(),
            plugins: config.plugins.len(),
            heads: config.total_heads(),
            tests: config.total_tests(),
            loaded_at: Instant::now(),
        };
        let Config {
            admin,
            identity,
            plugins,
            ..
        } = config;

        let factories: Vec<Arc<dyn PluginFactory>> = plugins
            .into_iter()
            .map(|plugin| Arc::new(DeclarativePlugin::new(plugin, base_dir)) as Arc<dyn PluginFactory>)
            .collect();
        Self::with_factories(loaded, &admin, &identity, factories, env).await
    }

    /// Build the state around arbitrary plugin factories.
    pub async fn with_factories(
        loaded: LoadedConfig,
        admin: &AdminConfig,
        identity: &IdentityConfig,
        factories: Vec<Arc<dyn PluginFactory>>,
        env: PluginEnv,
    ) -> Result<Self, HydraError> {
        let instances = InstanceManager::new(factories, env);
        instances.instance(DEFAULT_IDENTITY).await?;

        Ok(Self {
            instances,
            config: loaded,
            identity_cookie: identity.cookie.clone(),
            admin_prefix: admin.enabled.then(|| admin.prefix.clone()),
            start_time: Instant::now(),
            stats: Stats::new(),
        })
    }
}

/// Request-level limits applied around every route.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_body: usize,
    pub request_timeout: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_body: 1_048_576,
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[must_use]
pub fn build_http_client() -> HttpClient {
    // When multiple rustls crypto providers are compiled in, rustls cannot
    // auto-detect which one to use. Explicitly install `ring`.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .build();
    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(30))
        .build(https)
}

pub fn build_router(state: Arc<AppState>, limits: Limits) -> Router {
    let mut router = Router::new().route("/health", get(health_handler));
    if let Some(prefix) = &state.admin_prefix {
        router = router.nest(prefix, admin::router());
    }

    router
        .fallback(dispatch_handler)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(limits.max_body))
                .layer(TimeoutLayer::new(limits.request_timeout)),
        )
        .with_state(state)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
