//! Small heads used by unit tests across the crate.

use std::collections::BTreeMap;

use async_trait::async_trait;
use axum::http::HeaderValue;

use crate::engine::Next;
use crate::error::HydraError;
use crate::exchange::{Request, Response};
use crate::heads::{Head, HeadSpec};
use crate::plugins::PluginDefinition;

pub fn plugin(name: &str, heads: Vec<HeadSpec>) -> PluginDefinition {
    PluginDefinition {
        name: name.to_string(),
        heads,
        tests: BTreeMap::new(),
    }
}

/// Answers an exact path with a fixed body.
pub struct PathHead {
    path: String,
    body: &'static str,
}

impl PathHead {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            body: "ok",
        }
    }

    pub const fn with_body(mut self, body: &'static str) -> Self {
        self.body = body;
        self
    }
}

#[async_trait]
impl Head for PathHead {
    fn can_handle(&self, path: &str) -> bool {
        self.path == "/.*" || self.path == path
    }

    async fn handle(&self, _req: Request, res: &mut Response, _next: &Next) -> Result<(), HydraError> {
        res.send(self.body);
        Ok(())
    }
}

/// Adds an `x-visited` header and passes the request on.
pub struct ChainHead {
    path: String,
    label: &'static str,
}

impl ChainHead {
    pub fn new(path: &str, label: &'static str) -> Self {
        Self {
            path: path.to_string(),
            label,
        }
    }
}

#[async_trait]
impl Head for ChainHead {
    fn can_handle(&self, path: &str) -> bool {
        self.path == path
    }

    async fn handle(&self, req: Request, res: &mut Response, next: &Next) -> Result<(), HydraError> {
        res.headers
            .append("x-visited", HeaderValue::from_static(self.label));
        next.run(req, res).await
    }
}

/// Misbehaves by resuming its chain twice.
pub struct TwiceHead {
    path: String,
}

impl TwiceHead {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
        }
    }
}

#[async_trait]
impl Head for TwiceHead {
    fn can_handle(&self, path: &str) -> bool {
        self.path == path
    }

    async fn handle(&self, req: Request, res: &mut Response, next: &Next) -> Result<(), HydraError> {
        next.run(req.clone(), res).await?;
        next.run(req, res).await
    }
}
