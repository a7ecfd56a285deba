//! Head serving fixed content.

use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;

use super::{Head, PathPattern};
use crate::engine::Next;
use crate::error::HydraError;
use crate::exchange::{Request, Response};

#[derive(Debug, Clone)]
pub struct StaticHead {
    pattern: PathPattern,
    content: Bytes,
    status: StatusCode,
    headers: HeaderMap,
}

impl StaticHead {
    pub fn new(pattern: PathPattern, content: impl Into<Bytes>) -> Self {
        Self {
            pattern,
            content: content.into(),
            status: StatusCode::OK,
            headers: HeaderMap::new(),
        }
    }

    #[must_use]
    pub const fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

#[async_trait]
impl Head for StaticHead {
    fn kind(&self) -> &'static str {
        "static"
    }

    fn can_handle(&self, path: &str) -> bool {
        self.pattern.matches(path)
    }

    async fn handle(&self, _req: Request, res: &mut Response, _next: &Next) -> Result<(), HydraError> {
        res.status = self.status;
        for (name, value) in &self.headers {
            res.headers.insert(name, value.clone());
        }
        res.send(self.content.clone());
        Ok(())
    }
}
