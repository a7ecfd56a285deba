//! Plugin definitions and the factories that build them per instance.
//!
//! A [`PluginFactory`] is loaded once and asked to [`build`] a fresh
//! [`PluginDefinition`] for every engine instance, receiving a
//! [`PluginContext`] with the instance-bound assertion functions, the
//! fixture loader for the plugin directory, and the merged plugin config.
//! [`declarative::DeclarativePlugin`] is the factory for plugins
//! described in the config file.
//!
//! [`build`]: PluginFactory::build

pub mod declarative;
pub mod fixtures;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::assert::Assertions;
use crate::error::HydraError;
use crate::heads::HeadSpec;
use crate::server::HttpClient;
use fixtures::Fixtures;

/// A named bundle of heads plus inert test scenarios.
#[derive(Debug, Clone, Default)]
pub struct PluginDefinition {
    pub name: String,
    pub heads: Vec<HeadSpec>,
    pub tests: BTreeMap<String, TestDefinition>,
}

#[derive(Debug, Clone, Default)]
pub struct TestDefinition {
    pub heads: Vec<HeadSpec>,
}

pub trait PluginFactory: Send + Sync {
    fn name(&self) -> &str;

    /// Installation directory; fixtures resolve under `<dir>/fixtures`.
    fn directory(&self) -> Option<&Path> {
        None
    }

    /// Plugin-level config, merged over the process-wide extra variables.
    fn config(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn build(&self, ctx: &PluginContext) -> Result<PluginDefinition, HydraError>;
}

/// Settings shared by every plugin of every instance.
#[derive(Clone)]
pub struct PluginEnv {
    pub http_client: HttpClient,
    pub extra_vars: BTreeMap<String, String>,
    pub proxy_timeout: Duration,
}

impl PluginEnv {
    #[must_use]
    pub fn new(http_client: HttpClient) -> Self {
        Self {
            http_client,
            extra_vars: BTreeMap::new(),
            proxy_timeout: Duration::from_millis(5000),
        }
    }
}

pub struct PluginContext {
    pub config: BTreeMap<String, String>,
    pub assert: Assertions,
    pub fixtures: Fixtures,
    pub env: PluginEnv,
}

impl PluginContext {
    pub(crate) fn for_factory(factory: &dyn PluginFactory, assert: Assertions, env: &PluginEnv) -> Self {
        let mut config = env.extra_vars.clone();
        // Command-line variables win over the plugin's own defaults.
        for (key, value) in factory.config() {
            config.entry(key).or_insert(value);
        }
        let directory = factory
            .directory()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Self {
            config,
            assert,
            fixtures: Fixtures::new(directory),
            env: env.clone(),
        }
    }

    /// Replace `${key}` occurrences with values from the plugin config.
    /// Unknown keys are left untouched.
    #[must_use]
    pub fn interpolate(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (key, value) in &self.config {
            out = out.replace(&format!("${{{key}}}"), value);
        }
        out
    }
}
