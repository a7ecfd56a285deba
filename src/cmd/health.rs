//! `hydra health`: query `GET /health` on a running server.
//!
//! Uses the same pooled client as proxy heads, so `https://` targets work
//! too. Prints a short summary, or the raw JSON with `--json`.

use std::fmt::Write as _;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::ACCEPT;

use crate::cli::HealthArgs;
use crate::error::HydraError;
use crate::health::HealthResponse;
use crate::server::build_http_client;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn execute(args: HealthArgs) -> Result<(), HydraError> {
    let body = fetch(&args.url).await?;

    if args.json {
        println!("{}", String::from_utf8_lossy(&body));
        return Ok(());
    }

    match serde_json::from_slice::<HealthResponse>(&body) {
        Ok(health) => print!("{}", summary(&args.url, &health)),
        Err(e) => {
            eprintln!("Unexpected health payload: {e}");
            println!("{}", String::from_utf8_lossy(&body));
        }
    }
    Ok(())
}

fn request_failed(e: impl std::error::Error + Send + Sync + 'static) -> HydraError {
    HydraError::HttpRequest {
        source: Box::new(e),
    }
}

async fn fetch(base: &str) -> Result<Bytes, HydraError> {
    let uri: hyper::Uri = format!("{}/health", base.trim_end_matches('/'))
        .parse()
        .map_err(|e: hyper::http::uri::InvalidUri| HydraError::UriParse {
            source: Box::new(e),
        })?;
    let req = hyper::Request::get(uri)
        .header(ACCEPT, "application/json")
        .body(Full::new(Bytes::new()))
        .map_err(request_failed)?;

    let response = tokio::time::timeout(HEALTH_TIMEOUT, build_http_client().request(req))
        .await
        .map_err(|_| HydraError::HttpRequest {
            source: format!("no answer within {}s", HEALTH_TIMEOUT.as_secs()).into(),
        })?
        .map_err(request_failed)?;

    let status = response.status();
    if !status.is_success() {
        return Err(HydraError::HealthCheckFailed(status));
    }
    Ok(response
        .into_body()
        .collect()
        .await
        .map_err(request_failed)?
        .to_bytes())
}

fn summary(url: &str, health: &HealthResponse) -> String {
    let config = &health.config;
    let instances = if health.instances.is_empty() {
        "none".to_string()
    } else {
        health.instances.join(", ")
    };

    let mut out = String::new();
    let _ = writeln!(out, "\u{2713} hydra {} is {} ({url})", health.version, health.status);
    let _ = writeln!(
        out,
        "  up {} (build {}, {})",
        format_uptime(health.uptime_seconds),
        health.build.git,
        health.build.profile
    );
    let _ = writeln!(
        out,
        "  config   {} {} loaded {} ago",
        config.source,
        config.version,
        format_uptime(config.loaded_ago_seconds)
    );
    let _ = writeln!(
        out,
        "  plugins  {} ({} heads, {} tests)",
        config.plugins, config.heads, config.tests
    );
    let _ = writeln!(out, "  identities  {instances}");
    let _ = writeln!(
        out,
        "  requests {} dispatched, {} failed",
        health.stats.requests_dispatched, health.stats.requests_failed
    );
    out
}

fn format_uptime(seconds: u64) -> String {
    match (seconds / 3600, seconds % 3600 / 60, seconds % 60) {
        (0, 0, s) => format!("{s}s"),
        (0, m, s) => format!("{m}m {s}s"),
        (h, m, s) => format!("{h}h {m}m {s}s"),
    }
}
