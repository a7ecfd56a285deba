//! Caller identity from the request cookie.
//!
//! Each identity gets its own engine instance. Requests without the
//! identity cookie, or with an empty value, share [`DEFAULT_IDENTITY`].

use axum::http::header::COOKIE;
use axum::http::HeaderMap;

pub use crate::engine::instances::DEFAULT_IDENTITY;

/// Value of `cookie_name` across all `Cookie` headers, first match wins.
#[must_use]
pub fn cookie_value<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.trim_matches('"'))
}

#[must_use]
pub fn identity_from_headers(headers: &HeaderMap, cookie_name: &str) -> String {
    cookie_value(headers, cookie_name)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_IDENTITY)
        .to_string()
}
