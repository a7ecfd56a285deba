//! Assertion functions handed to plugin and scenario code.
//!
//! Every call records its outcome against the scenario that is active on
//! the owning engine at call time and returns whether it passed. A failed
//! assertion is an outcome, not an error; anything else going wrong inside
//! the checked expression (a panic) propagates untouched.

use std::fmt::Debug;
use std::sync::Weak;

use regex::Regex;

use super::scenario::UNNAMED_ASSERTION;
use super::Engine;

#[derive(Clone)]
pub struct Assertions {
    engine: Weak<Engine>,
}

impl Assertions {
    pub(crate) const fn new(engine: Weak<Engine>) -> Self {
        Self { engine }
    }

    pub fn ok(&self, value: bool, message: Option<&str>) -> bool {
        self.record(value, message)
    }

    pub fn equal<T: PartialEq + Debug>(&self, actual: T, expected: T, message: Option<&str>) -> bool {
        let passed = actual == expected;
        if !passed {
            tracing::debug!(actual = ?actual, expected = ?expected, "equal assertion failed");
        }
        self.record(passed, message)
    }

    pub fn not_equal<T: PartialEq + Debug>(
        &self,
        actual: T,
        unexpected: T,
        message: Option<&str>,
    ) -> bool {
        let passed = actual != unexpected;
        if !passed {
            tracing::debug!(actual = ?actual, "not_equal assertion failed");
        }
        self.record(passed, message)
    }

    pub fn matches(&self, actual: &str, pattern: &Regex, message: Option<&str>) -> bool {
        self.record(pattern.is_match(actual), message)
    }

    pub fn fail(&self, message: Option<&str>) -> bool {
        self.record(false, message)
    }

    fn record(&self, passed: bool, message: Option<&str>) -> bool {
        let message = message.unwrap_or(UNNAMED_ASSERTION);
        match self.engine.upgrade() {
            Some(engine) => engine.record_assertion(passed, message),
            None => tracing::warn!(message, passed, "assertion outlived its engine, not recorded"),
        }
        passed
    }
}
