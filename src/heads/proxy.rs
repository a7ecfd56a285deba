//! Head forwarding requests to an upstream server.
//!
//! Requests under `mount_path` are sent to `proxy_to` with the mount
//! prefix replaced by the upstream base path. The upstream body is
//! collected in full so filter heads earlier in the chain can rewrite it.
//! Upstream failures and timeouts answer `502 Bad Gateway`; they are not
//! dispatch errors.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::http::StatusCode;
use http_body_util::{BodyExt, Full};

use super::headers::{build_forwarded_headers, strip_response_hop_by_hop};
use super::Head;
use crate::engine::Next;
use crate::error::HydraError;
use crate::exchange::{Request, Response};
use crate::server::HttpClient;

pub struct ProxyHead {
    mount_path: String,
    proxy_to: url::Url,
    set_host_header: bool,
    timeout: Duration,
    client: HttpClient,
}

impl ProxyHead {
    #[must_use]
    pub fn new(mount_path: &str, proxy_to: url::Url, client: HttpClient) -> Self {
        Self {
            mount_path: mount_path.trim_end_matches('/').to_string(),
            proxy_to,
            set_host_header: false,
            timeout: Duration::from_millis(5000),
            client,
        }
    }

    #[must_use]
    pub const fn with_host_header(mut self, set_host_header: bool) -> Self {
        self.set_host_header = set_host_header;
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Upstream URL for a request URL (path plus optional query).
    fn target_for(&self, url: &str) -> String {
        let rest = url.get(self.mount_path.len()..).unwrap_or("");
        let base = self.proxy_to.as_str().trim_end_matches('/');
        if rest.is_empty() || rest.starts_with('?') {
            format!("{base}/{rest}")
        } else {
            format!("{base}{rest}")
        }
    }

    async fn forward(&self, req: &Request, target: &str) -> Result<Response, String> {
        let parsed = url::Url::parse(target).map_err(|e| format!("invalid upstream URL: {e}"))?;
        let correlation_id = req
            .headers
            .get("x-correlation-id")
            .and_then(|v| v.to_str().ok());
        let headers = build_forwarded_headers(
            &req.headers,
            req.client_ip.as_deref(),
            &parsed,
            self.set_host_header,
            correlation_id,
        );

        let mut builder = hyper::Request::builder()
            .method(req.method.clone())
            .uri(target);
        for (key, value) in &headers {
            builder = builder.header(key, value);
        }
        let upstream_req = builder
            .body(Full::new(req.raw_body.clone()))
            .map_err(|e| e.to_string())?;

        let upstream = tokio::time::timeout(self.timeout, self.client.request(upstream_req))
            .await
            .map_err(|_| "request timed out".to_string())?
            .map_err(|e| e.to_string())?;

        let status = upstream.status();
        let mut resp_headers = upstream.headers().clone();
        let body = upstream
            .into_body()
            .collect()
            .await
            .map_err(|e| format!("body read error: {e}"))?
            .to_bytes();

        strip_response_hop_by_hop(&mut resp_headers);
        let mut res = Response::new();
        res.status = status;
        res.headers = resp_headers;
        res.send(body);
        Ok(res)
    }
}

#[async_trait]
impl Head for ProxyHead {
    fn kind(&self) -> &'static str {
        "proxy"
    }

    fn can_handle(&self, path: &str) -> bool {
        self.mount_path.is_empty()
            || path
                .strip_prefix(&self.mount_path)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }

    #[allow(clippy::cast_possible_truncation)]
    async fn handle(&self, req: Request, res: &mut Response, _next: &Next) -> Result<(), HydraError> {
        let target = self.target_for(&req.url);
        let start = Instant::now();

        match self.forward(&req, &target).await {
            Ok(upstream) => {
                tracing::info!(
                    target = %target,
                    status = upstream.status.as_u16(),
                    latency_ms = start.elapsed().as_millis() as u64,
                    "upstream responded"
                );
                *res = upstream;
            }
            Err(error) => {
                tracing::warn!(
                    target = %target,
                    error = %error,
                    latency_ms = start.elapsed().as_millis() as u64,
                    "upstream request failed"
                );
                res.status = StatusCode::BAD_GATEWAY;
                res.send(format!("Bad Gateway: {error}"));
            }
        }
        Ok(())
    }
}
