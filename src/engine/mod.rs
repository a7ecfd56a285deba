//! The dispatch and test-state engine.
//!
//! One [`Engine`] is the complete routing state for a single identity:
//! the plugin [`Registry`](registry::Registry), the active scenario and
//! the assertion [`ResultTable`](scenario::ResultTable), all behind a
//! single lock. [`Engine::dispatch`] resolves the first matching head and
//! passes it a [`Next`] continuation that resumes the scan strictly after
//! that head.
//!
//! The lock is only held while resolving or mutating state, never while
//! a head runs, so heads may await I/O and other requests (or the
//! administrative surface) can proceed meanwhile.

pub mod assert;
pub mod instances;
pub mod registry;
pub mod scenario;

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use parking_lot::Mutex;

use crate::error::HydraError;
use crate::exchange::{Request, Response};
use crate::heads::HeadSpec;
use crate::plugins::PluginDefinition;
use assert::Assertions;
use registry::{HeadSummary, Match, PluginSummary, Registry};
use scenario::{ResultTable, ScenarioRef, TestResult};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

struct EngineState {
    registry: Registry,
    scenario: ScenarioRef,
    results: ResultTable,
}

pub struct Engine {
    state: Mutex<EngineState>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(EngineState {
                registry: Registry::new(),
                scenario: ScenarioRef::default_scenario(),
                results: ResultTable::with_default(),
            }),
        }
    }

    /// Assertion functions bound to this engine's active scenario.
    #[must_use]
    pub fn assertions(self: &Arc<Self>) -> Assertions {
        Assertions::new(Arc::downgrade(self))
    }

    pub fn register_plugin(&self, definition: PluginDefinition) -> Result<(), HydraError> {
        let name = definition.name.clone();
        self.state.lock().registry.register_plugin(definition)?;
        tracing::debug!(plugin = %name, "plugin registered");
        Ok(())
    }

    pub fn register_dynamic_head(&self, spec: HeadSpec) -> Result<String, HydraError> {
        let name = self.state.lock().registry.register_dynamic_head(spec)?;
        tracing::info!(head = %name, "dynamic head registered");
        Ok(name)
    }

    pub fn plugin(&self, name: &str) -> Result<PluginSummary, HydraError> {
        Ok(self.state.lock().registry.plugin(name)?.summary())
    }

    #[must_use]
    pub fn plugin_names(&self) -> Vec<String> {
        self.state.lock().registry.plugin_names()
    }

    #[must_use]
    pub fn plugins(&self) -> Vec<PluginSummary> {
        self.state
            .lock()
            .registry
            .plugins()
            .map(registry::Plugin::summary)
            .collect()
    }

    pub fn find_head(&self, plugin: &str, head: &str) -> Result<HeadSummary, HydraError> {
        let state = self.state.lock();
        let entry = state.registry.find_head(plugin, head)?;
        Ok(HeadSummary {
            name: entry.name().to_string(),
            kind: entry.head().kind(),
            attached: entry.is_attached(),
        })
    }

    pub fn attach_head(&self, plugin: &str, head: &str) -> Result<(), HydraError> {
        self.state.lock().registry.attach_head(plugin, head)?;
        tracing::info!(plugin, head, "head attached");
        Ok(())
    }

    pub fn detach_head(&self, plugin: &str, head: &str) -> Result<(), HydraError> {
        self.state.lock().registry.detach_head(plugin, head)?;
        tracing::info!(plugin, head, "head detached");
        Ok(())
    }

    pub fn is_head_attached(&self, plugin: &str, head: &str) -> Result<bool, HydraError> {
        self.state.lock().registry.is_head_attached(plugin, head)
    }

    /// First matching head after `after`. `can_handle` runs with the
    /// engine unlocked, so heads may query the engine or record
    /// assertions from it.
    #[must_use]
    pub fn resolve(&self, path: &str, after: Option<&Match>) -> Option<Match> {
        let candidates = self.state.lock().registry.candidates(after);
        candidates.into_iter().find(|m| m.handler.can_handle(path))
    }

    /// Route `req` through the head chain, writing into `res`.
    pub async fn dispatch(self: &Arc<Self>, req: Request, res: &mut Response) -> Result<(), HydraError> {
        self.dispatch_after(req, res, None).await
    }

    async fn dispatch_after(
        self: &Arc<Self>,
        req: Request,
        res: &mut Response,
        after: Option<Match>,
    ) -> Result<(), HydraError> {
        let Some(matched) = self.resolve(req.path(), after.as_ref()) else {
            tracing::debug!(path = %req.path(), "no head matched");
            res.status = StatusCode::NOT_FOUND;
            res.send("Not Found");
            return Ok(());
        };

        tracing::debug!(
            path = %req.path(),
            plugin = %matched.plugin,
            head = %matched.head,
            "head matched"
        );
        res.status = StatusCode::OK;
        let handler = Arc::clone(&matched.handler);
        let next = Next {
            engine: Arc::clone(self),
            from: matched,
            used: AtomicBool::new(false),
        };
        handler.handle(req, res, &next).await
    }

    /// Activate a test: its heads go live and its result is reset.
    ///
    /// The current scenario is stopped first, so on error no scenario is
    /// active.
    pub fn start_scenario(&self, plugin: &str, test: &str) -> Result<(), HydraError> {
        let mut state = self.state.lock();
        Self::stop_locked(&mut state);

        let heads = state
            .registry
            .plugin(plugin)
            .ok()
            .and_then(|p| p.tests().get(test))
            .map(|t| t.heads.clone())
            .ok_or_else(|| HydraError::InvalidTestReference {
                plugin: plugin.to_string(),
                test: test.to_string(),
            })?;

        let scenario = ScenarioRef::new(plugin, test);
        state.registry.load_scenario_heads(heads)?;
        state.results.reset(&scenario);
        state.scenario = scenario;
        drop(state);

        tracing::info!(plugin, test, "scenario started");
        Ok(())
    }

    pub fn stop_scenario(&self) {
        let mut state = self.state.lock();
        Self::stop_locked(&mut state);
    }

    fn stop_locked(state: &mut EngineState) {
        if !state.scenario.is_default() {
            tracing::info!(
                plugin = %state.scenario.plugin,
                test = %state.scenario.test,
                "scenario stopped"
            );
        }
        state.scenario = ScenarioRef::default_scenario();
        state.registry.clear_scenario_heads();
    }

    #[must_use]
    pub fn active_scenario(&self) -> ScenarioRef {
        self.state.lock().scenario.clone()
    }

    #[must_use]
    pub fn test_results(&self) -> ResultTable {
        self.state.lock().results.clone()
    }

    #[must_use]
    pub fn test_result(&self, scenario: &ScenarioRef) -> Option<TestResult> {
        self.state.lock().results.get(scenario).cloned()
    }

    pub(crate) fn record_assertion(&self, passed: bool, message: &str) {
        let mut state = self.state.lock();
        let EngineState {
            scenario, results, ..
        } = &mut *state;
        results.record(scenario, passed, message);
    }
}

/// Continuation handed to a head: resumes dispatch after that head.
pub struct Next {
    engine: Arc<Engine>,
    from: Match,
    used: AtomicBool,
}

impl Next {
    /// The head this continuation resumes after.
    #[must_use]
    pub const fn current(&self) -> &Match {
        &self.from
    }

    /// Dispatch `req` to the next eligible head. A continuation resumes
    /// its chain once; a second call fails.
    pub fn run<'a>(&'a self, req: Request, res: &'a mut Response) -> BoxFuture<'a, Result<(), HydraError>> {
        Box::pin(async move {
            if self.used.swap(true, Ordering::SeqCst) {
                return Err(HydraError::InvalidContinuationArguments {
                    plugin: self.from.plugin.clone(),
                    head: self.from.head.clone(),
                });
            }
            self.engine
                .dispatch_after(req, res, Some(self.from.clone()))
                .await
        })
    }
}
