//! Request and response values passed along a head chain.
//!
//! [`Request`] is an owned snapshot of the inbound HTTP request (URL,
//! method, headers, raw body and parsed form parameters). [`Response`]
//! is the mutable response heads write into; [`Response::send`] marks it
//! as finished. Both are plain values so a head can hand a modified copy
//! to the rest of the chain, or run the chain into a scratch response.

use std::collections::HashMap;

use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::IntoResponse;
use bytes::Bytes;

#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Path plus query string, as received.
    pub url: String,
    pub headers: HeaderMap,
    pub raw_body: Bytes,
    pub body_params: HashMap<String, String>,
    pub client_ip: Option<String>,
}

impl Request {
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            raw_body: Bytes::new(),
            body_params: HashMap::new(),
            client_ip: None,
        }
    }

    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Attach a body and parse it as `application/x-www-form-urlencoded`.
    ///
    /// Bodies that are not form-encoded simply yield whatever pairs the
    /// lenient parser finds; the raw bytes are always kept.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.raw_body = body.into();
        self.body_params = url::form_urlencoded::parse(&self.raw_body)
            .into_owned()
            .collect();
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }

    /// The URL path without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.url.split_once('?').map_or(self.url.as_str(), |(p, _)| p)
    }

    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.url.split_once('?').map(|(_, q)| q)
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    sent: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            sent: false,
        }
    }

    /// Write the final body. Later writes replace earlier ones.
    pub fn send(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
        self.sent = true;
    }

    #[must_use]
    pub const fn is_sent(&self) -> bool {
        self.sent
    }

    /// Convert into an Axum response for the wire.
    #[must_use]
    pub fn into_http(self) -> axum::response::Response {
        (self.status, self.headers, self.body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_strips_query() {
        let req = Request::get("/search?q=hydra&page=2");
        assert_eq!(req.path(), "/search");
        assert_eq!(req.query(), Some("q=hydra&page=2"));

        let req = Request::get("/plain");
        assert_eq!(req.path(), "/plain");
        assert_eq!(req.query(), None);
    }

    #[test]
    fn body_params_are_parsed() {
        let req = Request::new(Method::POST, "/login").with_body("user=ann&pass=s%20cret");
        assert_eq!(req.body_params["user"], "ann");
        assert_eq!(req.body_params["pass"], "s cret");
        assert_eq!(&req.raw_body[..], b"user=ann&pass=s%20cret");
    }

    #[test]
    fn send_marks_response_finished() {
        let mut res = Response::new();
        assert!(!res.is_sent());
        res.send("done");
        assert!(res.is_sent());
        assert_eq!(&res.body[..], b"done");
    }
}
