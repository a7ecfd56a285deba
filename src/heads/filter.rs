//! Head that rewrites the body produced by the rest of the chain.
//!
//! [`FilterHead`] runs the remaining chain into a scratch [`Response`],
//! passes the collected body through a [`BodyFilter`], and copies status,
//! headers and the filtered body into the real response.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::header::CONTENT_LENGTH;
use bytes::Bytes;
use regex::Regex;

use super::{Head, PathPattern};
use crate::engine::Next;
use crate::error::HydraError;
use crate::exchange::{Request, Response};

pub trait BodyFilter: Send + Sync {
    fn filter(&self, body: &[u8]) -> Bytes;
}

impl<F> BodyFilter for F
where
    F: Fn(&[u8]) -> Bytes + Send + Sync,
{
    fn filter(&self, body: &[u8]) -> Bytes {
        self(body)
    }
}

/// Ordered regex replacements over the body decoded as UTF-8 (lossy).
#[derive(Debug, Clone, Default)]
pub struct ReplaceFilter {
    rules: Vec<(Regex, String)>,
}

impl ReplaceFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn rule(mut self, pattern: Regex, replacement: impl Into<String>) -> Self {
        self.rules.push((pattern, replacement.into()));
        self
    }
}

impl BodyFilter for ReplaceFilter {
    fn filter(&self, body: &[u8]) -> Bytes {
        let mut text = String::from_utf8_lossy(body).into_owned();
        for (pattern, replacement) in &self.rules {
            text = pattern.replace_all(&text, replacement.as_str()).into_owned();
        }
        Bytes::from(text)
    }
}

pub struct FilterHead {
    pattern: PathPattern,
    filter: Arc<dyn BodyFilter>,
}

impl FilterHead {
    pub fn new(pattern: PathPattern, filter: impl BodyFilter + 'static) -> Self {
        Self {
            pattern,
            filter: Arc::new(filter),
        }
    }
}

#[async_trait]
impl Head for FilterHead {
    fn kind(&self) -> &'static str {
        "filter"
    }

    fn can_handle(&self, path: &str) -> bool {
        self.pattern.matches(path)
    }

    async fn handle(&self, req: Request, res: &mut Response, next: &Next) -> Result<(), HydraError> {
        let mut scratch = Response::new();
        next.run(req, &mut scratch).await?;

        let body = self.filter.filter(&scratch.body);
        res.status = scratch.status;
        res.headers = scratch.headers;
        res.headers.remove(CONTENT_LENGTH);
        res.send(body);
        Ok(())
    }
}
