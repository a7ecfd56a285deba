//! `hydra run`: start the mock server.
//!
//! Loads and validates the config file, builds the engine for the
//! default identity (so plugin errors abort startup), and serves the
//! Axum router until Ctrl+C or SIGTERM.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::cli::RunArgs;
use crate::config::sources::file_source::FileSource;
use crate::config::ConfigSource;
use crate::error::HydraError;
use crate::logging;
use crate::plugins::PluginEnv;
use crate::server::{self, AppState, Limits};

const CANDIDATES: &[&str] = &["hydra.yaml", "hydra.yml", "hydra.json", "hydra.toml"];

pub async fn execute(args: RunArgs) -> Result<(), HydraError> {
    let log_format = logging::resolve_format(args.pretty, args.json);
    logging::init(&args.log_level, log_format);

    let source = resolve_file_source(args.config.as_deref()).await?;
    let (config, version) = source.load().await?;

    let mut env = PluginEnv::new(server::build_http_client());
    env.extra_vars = args.extra_vars();
    env.proxy_timeout = Duration::from_millis(args.timeout.unwrap_or(config.defaults.proxy_timeout));

    let plugin_count = config.plugins.len();
    let admin_prefix = config.admin.enabled.then(|| config.admin.prefix.clone());
    let version_short = version.short().to_string();

    let state = Arc::new(
        AppState::new(config, version, source.name(), &source.base_dir(), env).await?,
    );

    let limits = Limits {
        max_body: args.max_body,
        request_timeout: Duration::from_millis(args.request_timeout),
    };
    let router = server::build_router(state, limits);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        plugins = plugin_count,
        config_version = %version_short,
        admin = admin_prefix.as_deref().unwrap_or("disabled"),
        "hydra started"
    );

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(server::shutdown_signal())
    .await?;

    tracing::info!("hydra stopped");
    Ok(())
}

async fn resolve_file_source(explicit: Option<&Path>) -> Result<FileSource, HydraError> {
    if let Some(path) = explicit {
        return FileSource::new(path.to_path_buf());
    }

    // Auto-detect in current directory
    for name in CANDIDATES {
        let path = PathBuf::from(name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::info!(path = %path.display(), "auto-detected config file");
            return FileSource::new(path);
        }
    }

    Err(HydraError::NoConfigSource {
        hint: "Provide --config <file> or create ./hydra.yaml.".into(),
    })
}
