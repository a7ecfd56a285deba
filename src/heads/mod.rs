//! The head capability contract and the built-in head kinds.
//!
//! A [`Head`] decides whether it can handle a path and, when dispatched,
//! either finishes the response or hands the request to the rest of the
//! chain through [`Next`](crate::engine::Next). Heads are registered
//! inside plugins as [`HeadSpec`] values; the registry assigns the final
//! name and owns the attached flag.
//!
//! Built-in kinds: [`StaticHead`](static_head::StaticHead),
//! [`FilterHead`](filter::FilterHead), [`ProxyHead`](proxy::ProxyHead)
//! and [`ExpectHead`](expect::ExpectHead).

pub mod expect;
pub mod filter;
pub mod headers;
pub mod proxy;
pub mod static_head;

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use crate::engine::Next;
use crate::error::HydraError;
use crate::exchange::{Request, Response};

// async_trait is required here because heads are stored as Arc<dyn Head>
// and native async fn in traits does not support dyn dispatch.
#[async_trait]
pub trait Head: Send + Sync {
    /// Short label shown by the administrative surface.
    fn kind(&self) -> &'static str {
        "custom"
    }

    /// Called with no engine lock held.
    fn can_handle(&self, path: &str) -> bool;

    async fn handle(
        &self,
        req: Request,
        res: &mut Response,
        next: &Next,
    ) -> Result<(), HydraError>;
}

/// A head as declared by plugin code, before registration.
#[derive(Clone)]
pub struct HeadSpec {
    pub name: Option<String>,
    pub attached: bool,
    pub head: Arc<dyn Head>,
}

impl HeadSpec {
    pub fn new(head: impl Head + 'static) -> Self {
        Self {
            name: None,
            attached: true,
            head: Arc::new(head),
        }
    }

    pub fn named(name: impl Into<String>, head: impl Head + 'static) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(head)
        }
    }

    #[must_use]
    pub fn detached(mut self) -> Self {
        self.attached = false;
        self
    }
}

impl std::fmt::Debug for HeadSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadSpec")
            .field("name", &self.name)
            .field("kind", &self.head.kind())
            .field("attached", &self.attached)
            .finish()
    }
}

/// A regular expression matched against the whole request path.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    regex: Regex,
}

impl PathPattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{pattern})$"))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}
