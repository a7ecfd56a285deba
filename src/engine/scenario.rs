//! Active scenario pointer and per-scenario assertion results.

use std::collections::BTreeMap;

use serde::Serialize;

/// Sentinel plugin and test name used when no scenario was started.
pub const DEFAULT_SCENARIO: &str = "*default*";

pub const UNNAMED_ASSERTION: &str = "*unnamed-assertion*";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioRef {
    pub plugin: String,
    pub test: String,
}

impl ScenarioRef {
    #[must_use]
    pub fn new(plugin: impl Into<String>, test: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            test: test.into(),
        }
    }

    #[must_use]
    pub fn default_scenario() -> Self {
        Self::new(DEFAULT_SCENARIO, DEFAULT_SCENARIO)
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        self.plugin == DEFAULT_SCENARIO && self.test == DEFAULT_SCENARIO
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
    #[default]
    Unset,
    Pass,
    Fail,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TestResult {
    pub outcome: TestOutcome,
    pub passes: Vec<String>,
    pub failures: Vec<String>,
}

impl TestResult {
    /// Record one assertion. A failure is sticky: later passes are
    /// appended but never flip the outcome back.
    pub fn record(&mut self, passed: bool, message: &str) {
        if passed {
            self.passes.push(message.to_string());
            if self.outcome == TestOutcome::Unset {
                self.outcome = TestOutcome::Pass;
            }
        } else {
            self.failures.push(message.to_string());
            self.outcome = TestOutcome::Fail;
        }
    }
}

/// Results keyed by plugin name, then test name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResultTable(BTreeMap<String, BTreeMap<String, TestResult>>);

impl ResultTable {
    /// Table holding an empty result for the default scenario.
    #[must_use]
    pub fn with_default() -> Self {
        let mut table = Self::default();
        table.reset(&ScenarioRef::default_scenario());
        table
    }

    #[must_use]
    pub fn get(&self, scenario: &ScenarioRef) -> Option<&TestResult> {
        self.0.get(&scenario.plugin)?.get(&scenario.test)
    }

    /// Replace any prior result for `scenario` with an empty one.
    pub fn reset(&mut self, scenario: &ScenarioRef) {
        self.0
            .entry(scenario.plugin.clone())
            .or_default()
            .insert(scenario.test.clone(), TestResult::default());
    }

    pub fn record(&mut self, scenario: &ScenarioRef, passed: bool, message: &str) {
        self.0
            .entry(scenario.plugin.clone())
            .or_default()
            .entry(scenario.test.clone())
            .or_default()
            .record(passed, message);
    }
}
