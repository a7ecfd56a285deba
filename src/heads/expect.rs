//! Scenario helper head that asserts on incoming requests.
//!
//! Each configured expectation is checked through the engine's assertion
//! functions, so results land on whichever scenario is active, and the
//! request then continues down the chain unchanged.

use async_trait::async_trait;
use axum::http::{HeaderName, Method};

use super::{Head, PathPattern};
use crate::engine::assert::Assertions;
use crate::engine::Next;
use crate::error::HydraError;
use crate::exchange::{Request, Response};

pub struct ExpectHead {
    pattern: PathPattern,
    assert: Assertions,
    message: Option<String>,
    method: Option<Method>,
    headers: Vec<(HeaderName, String)>,
    body_contains: Option<String>,
}

impl ExpectHead {
    #[must_use]
    pub const fn new(pattern: PathPattern, assert: Assertions) -> Self {
        Self {
            pattern,
            assert,
            message: None,
            method: None,
            headers: Vec::new(),
            body_contains: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn expect_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    #[must_use]
    pub fn expect_header(mut self, name: HeaderName, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    #[must_use]
    pub fn expect_body_containing(mut self, needle: impl Into<String>) -> Self {
        self.body_contains = Some(needle.into());
        self
    }

    fn label(&self, what: &str) -> String {
        match &self.message {
            Some(message) => format!("{message}: {what}"),
            None => what.to_string(),
        }
    }
}

#[async_trait]
impl Head for ExpectHead {
    fn kind(&self) -> &'static str {
        "expect"
    }

    fn can_handle(&self, path: &str) -> bool {
        self.pattern.matches(path)
    }

    async fn handle(&self, req: Request, res: &mut Response, next: &Next) -> Result<(), HydraError> {
        if let Some(method) = &self.method {
            let label = self.label(&format!("method is {method}"));
            self.assert.equal(&req.method, method, Some(&label));
        }

        for (name, expected) in &self.headers {
            let actual = req.headers.get(name).and_then(|v| v.to_str().ok());
            let label = self.label(&format!("header {name} is '{expected}'"));
            self.assert.equal(actual, Some(expected.as_str()), Some(&label));
        }

        if let Some(needle) = &self.body_contains {
            let body = String::from_utf8_lossy(&req.raw_body);
            let label = self.label(&format!("body contains '{needle}'"));
            self.assert.ok(body.contains(needle.as_str()), Some(&label));
        }

        next.run(req, res).await
    }
}
