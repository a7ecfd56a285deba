//! Header construction for proxied requests and hop-by-hop stripping.
//!
//! [`build_forwarded_headers`] clones the original client headers,
//! strips hop-by-hop headers, optionally rewrites `Host` to the upstream,
//! and appends proxy metadata (`X-Forwarded-For`, `X-Real-IP`, `Via`,
//! `X-Correlation-Id`).

use std::sync::LazyLock;

use axum::http::{HeaderMap, HeaderName, HeaderValue};

static HOP_BY_HOP: LazyLock<Vec<HeaderName>> = LazyLock::new(|| {
    [
        "connection",
        "keep-alive",
        "transfer-encoding",
        "te",
        "trailer",
        "upgrade",
        "proxy-authorization",
        "proxy-authenticate",
    ]
    .iter()
    .filter_map(|name| name.parse::<HeaderName>().ok())
    .collect()
});

/// Strip hop-by-hop headers and `content-length` from an upstream response.
///
/// The upstream body is fully collected before it reaches the chain, and
/// filter heads may change its length, so the wire layer recomputes
/// `content-length`.
pub fn strip_response_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
    headers.remove(hyper::header::CONTENT_LENGTH);
}

pub fn build_forwarded_headers(
    original: &HeaderMap,
    client_ip: Option<&str>,
    target_url: &url::Url,
    set_host_header: bool,
    correlation_id: Option<&str>,
) -> HeaderMap {
    let mut headers = original.clone();

    for header_name in HOP_BY_HOP.iter() {
        headers.remove(header_name);
    }

    if set_host_header {
        if let Some(host) = target_url.host_str() {
            let host_value = target_url
                .port()
                .map_or_else(|| host.to_string(), |port| format!("{host}:{port}"));
            if let Ok(val) = HeaderValue::from_str(&host_value) {
                headers.insert("host", val);
            }
        }
    }

    if let Some(client_ip) = client_ip {
        let xff = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .map_or_else(
                || client_ip.to_string(),
                |existing| format!("{existing}, {client_ip}"),
            );
        if let Ok(val) = HeaderValue::from_str(&xff) {
            headers.insert("x-forwarded-for", val);
        }

        let real_ip = xff.split(',').next().unwrap_or(client_ip).trim();
        if let Ok(val) = HeaderValue::from_str(real_ip) {
            headers.insert("x-real-ip", val);
        }
    }

    headers.insert("via", HeaderValue::from_static("1.1 hydra"));

    if let Some(correlation_id) = correlation_id {
        if let Ok(val) = HeaderValue::from_str(correlation_id) {
            headers.insert("x-correlation-id", val);
        }
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_hop_by_hop() {
        let mut original = HeaderMap::new();
        original.insert("connection", "keep-alive".parse().unwrap());
        original.insert("content-type", "application/json".parse().unwrap());

        let target = url::Url::parse("http://target:8080").unwrap();
        let result = build_forwarded_headers(&original, Some("10.0.0.1"), &target, false, None);

        assert!(result.get("connection").is_none());
        assert!(result.get("content-type").is_some());
        assert_eq!(result.get("via").unwrap(), "1.1 hydra");
    }

    #[test]
    fn host_is_rewritten_only_on_request() {
        let mut original = HeaderMap::new();
        original.insert("host", "mock.local:3000".parse().unwrap());
        let target = url::Url::parse("http://backend:9090/path").unwrap();

        let kept = build_forwarded_headers(&original, None, &target, false, None);
        assert_eq!(kept.get("host").unwrap(), "mock.local:3000");

        let rewritten = build_forwarded_headers(&original, None, &target, true, None);
        assert_eq!(rewritten.get("host").unwrap(), "backend:9090");
    }

    #[test]
    fn appends_x_forwarded_for() {
        let mut original = HeaderMap::new();
        original.insert("x-forwarded-for", "1.2.3.4".parse().unwrap());

        let target = url::Url::parse("http://target:8080").unwrap();
        let result = build_forwarded_headers(&original, Some("10.0.0.1"), &target, false, None);

        assert_eq!(result.get("x-forwarded-for").unwrap(), "1.2.3.4, 10.0.0.1");
        assert_eq!(result.get("x-real-ip").unwrap(), "1.2.3.4");
    }

    #[test]
    fn sets_correlation_id() {
        let target = url::Url::parse("http://target:8080").unwrap();
        let result =
            build_forwarded_headers(&HeaderMap::new(), None, &target, false, Some("my-correlation-id"));
        assert_eq!(result.get("x-correlation-id").unwrap(), "my-correlation-id");
    }

    #[test]
    fn response_stripping_drops_content_length() {
        let mut headers = HeaderMap::new();
        headers.insert("content-length", "12".parse().unwrap());
        headers.insert("transfer-encoding", "chunked".parse().unwrap());
        headers.insert("etag", "\"abc\"".parse().unwrap());
        strip_response_hop_by_hop(&mut headers);
        assert_eq!(headers.len(), 1);
        assert!(headers.get("etag").is_some());
    }
}
