//! Ordered plugin registry and head resolution.
//!
//! The [`Registry`] keeps plugins in registration order and heads in
//! registration order within each plugin; concatenated, they form the
//! global order that [`Registry::resolve`] scans. Two reserved plugins
//! ([`DYNAMIC_PLUGIN`] and [`SCENARIO_PLUGIN`]) are ordinary entries
//! created by [`Registry::new`], so neither registration nor resolution
//! branches on plugin identity.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use crate::error::HydraError;
use crate::heads::{Head, HeadSpec};
use crate::plugins::{PluginDefinition, TestDefinition};

/// Reserved plugin holding heads registered at runtime.
pub const DYNAMIC_PLUGIN: &str = "*dynamic*";

/// Reserved plugin holding the heads of the active scenario.
pub const SCENARIO_PLUGIN: &str = "*current-test*";

const ANONYMOUS_PREFIX: &str = "anonymousHead";

/// Plugin names must be non-empty and use only ASCII letters, digits,
/// `_` and `-`.
#[must_use]
pub fn is_valid_plugin_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

pub struct HeadEntry {
    name: String,
    attached: bool,
    head: Arc<dyn Head>,
}

impl HeadEntry {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.attached
    }

    #[must_use]
    pub fn head(&self) -> &Arc<dyn Head> {
        &self.head
    }

    pub fn attach(&mut self) {
        self.attached = true;
    }

    pub fn detach(&mut self) {
        self.attached = false;
    }
}

pub struct Plugin {
    name: String,
    heads: Vec<HeadEntry>,
    tests: BTreeMap<String, TestDefinition>,
}

impl Plugin {
    fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            heads: Vec::new(),
            tests: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn heads(&self) -> &[HeadEntry] {
        &self.heads
    }

    #[must_use]
    pub const fn tests(&self) -> &BTreeMap<String, TestDefinition> {
        &self.tests
    }

    #[must_use]
    pub fn summary(&self) -> PluginSummary {
        PluginSummary {
            name: self.name.clone(),
            heads: self
                .heads
                .iter()
                .map(|h| HeadSummary {
                    name: h.name.clone(),
                    kind: h.head.kind(),
                    attached: h.attached,
                })
                .collect(),
            tests: self.tests.keys().cloned().collect(),
        }
    }

    /// Name and append `specs`, all or nothing.
    ///
    /// Unnamed heads become `anonymousHead<N>`, with `N` counting up from
    /// zero for this batch and skipping names already taken. Any name
    /// clash, explicit or generated, rejects the whole batch.
    fn add_heads(&mut self, specs: Vec<HeadSpec>) -> Result<Vec<String>, HydraError> {
        let mut taken: HashSet<String> = self.heads.iter().map(|h| h.name.clone()).collect();
        let mut anonymous = 0usize;
        let mut named = Vec::with_capacity(specs.len());

        for spec in specs {
            let name = match spec.name {
                Some(name) => name,
                None => loop {
                    let candidate = format!("{ANONYMOUS_PREFIX}{anonymous}");
                    anonymous += 1;
                    if !taken.contains(&candidate) {
                        break candidate;
                    }
                },
            };
            if !taken.insert(name.clone()) {
                return Err(HydraError::DuplicateHeadName {
                    plugin: self.name.clone(),
                    head: name,
                });
            }
            named.push(HeadEntry {
                name,
                attached: spec.attached,
                head: spec.head,
            });
        }

        let names = named.iter().map(|h| h.name.clone()).collect();
        self.heads.extend(named);
        Ok(names)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PluginSummary {
    pub name: String,
    pub heads: Vec<HeadSummary>,
    pub tests: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeadSummary {
    pub name: String,
    pub kind: &'static str,
    pub attached: bool,
}

/// A resolved head: its position in the global order plus the handler.
#[derive(Clone)]
pub struct Match {
    pub plugin: String,
    pub head: String,
    pub handler: Arc<dyn Head>,
}

impl Match {
    fn is(&self, plugin: &str, head: &str) -> bool {
        self.plugin == plugin && self.head == head
    }
}

impl std::fmt::Debug for Match {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Match")
            .field("plugin", &self.plugin)
            .field("head", &self.head)
            .finish_non_exhaustive()
    }
}

pub struct Registry {
    plugins: Vec<Plugin>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            plugins: vec![Plugin::empty(DYNAMIC_PLUGIN), Plugin::empty(SCENARIO_PLUGIN)],
        }
    }

    pub fn register_plugin(&mut self, definition: PluginDefinition) -> Result<(), HydraError> {
        let PluginDefinition { name, heads, tests } = definition;

        if !is_valid_plugin_name(&name) {
            return Err(HydraError::InvalidPlugin(format!(
                "invalid plugin name '{name}'"
            )));
        }
        if heads.is_empty() && tests.is_empty() {
            return Err(HydraError::InvalidPlugin(format!(
                "plugin '{name}' has no heads and no tests"
            )));
        }
        if self.find(&name).is_some() {
            return Err(HydraError::InvalidConfiguration(format!(
                "duplicate plugin '{name}'"
            )));
        }

        let mut plugin = Plugin::empty(&name);
        plugin.tests = tests;
        plugin.add_heads(heads)?;
        self.plugins.push(plugin);
        Ok(())
    }

    /// Append a head to the dynamic plugin and return its final name.
    pub fn register_dynamic_head(&mut self, spec: HeadSpec) -> Result<String, HydraError> {
        let plugin = self.find_mut(DYNAMIC_PLUGIN).ok_or_else(|| {
            HydraError::Internal("couldn't find the dynamic head plugin".into())
        })?;
        let mut names = plugin.add_heads(vec![spec])?;
        names
            .pop()
            .ok_or_else(|| HydraError::Internal("dynamic head was not registered".into()))
    }

    pub fn plugin(&self, name: &str) -> Result<&Plugin, HydraError> {
        self.find(name)
            .ok_or_else(|| HydraError::PluginNotFound(name.to_string()))
    }

    #[must_use]
    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins.iter().map(|p| p.name.clone()).collect()
    }

    pub fn plugins(&self) -> impl Iterator<Item = &Plugin> {
        self.plugins.iter()
    }

    pub fn find_head(&self, plugin: &str, head: &str) -> Result<&HeadEntry, HydraError> {
        self.find(plugin)
            .and_then(|p| p.heads.iter().find(|h| h.name == head))
            .ok_or_else(|| HydraError::HeadNotFound {
                plugin: plugin.to_string(),
                head: head.to_string(),
            })
    }

    pub fn find_head_mut(&mut self, plugin: &str, head: &str) -> Result<&mut HeadEntry, HydraError> {
        self.find_mut(plugin)
            .and_then(|p| p.heads.iter_mut().find(|h| h.name == head))
            .ok_or_else(|| HydraError::HeadNotFound {
                plugin: plugin.to_string(),
                head: head.to_string(),
            })
    }

    pub fn attach_head(&mut self, plugin: &str, head: &str) -> Result<(), HydraError> {
        self.find_head_mut(plugin, head)?.attach();
        Ok(())
    }

    pub fn detach_head(&mut self, plugin: &str, head: &str) -> Result<(), HydraError> {
        self.find_head_mut(plugin, head)?.detach();
        Ok(())
    }

    pub fn is_head_attached(&self, plugin: &str, head: &str) -> Result<bool, HydraError> {
        Ok(self.find_head(plugin, head)?.is_attached())
    }

    /// First attached head, in global order, that can handle `path`.
    ///
    /// With `after`, heads up to and including the one identified by
    /// `after` (plugin name + head name) are skipped. If that head is no
    /// longer registered nothing becomes eligible and the scan yields
    /// `None`.
    #[must_use]
    pub fn resolve(&self, path: &str, after: Option<&Match>) -> Option<Match> {
        self.candidates(after)
            .into_iter()
            .find(|m| m.handler.can_handle(path))
    }

    /// Attached heads eligible after `after`, in global order, without
    /// consulting `can_handle`.
    #[must_use]
    pub fn candidates(&self, after: Option<&Match>) -> Vec<Match> {
        let mut eligible = after.is_none();
        let mut found = Vec::new();
        for plugin in &self.plugins {
            for entry in &plugin.heads {
                if eligible && entry.attached {
                    found.push(Match {
                        plugin: plugin.name.clone(),
                        head: entry.name.clone(),
                        handler: Arc::clone(&entry.head),
                    });
                }
                if after.is_some_and(|m| m.is(&plugin.name, &entry.name)) {
                    eligible = true;
                }
            }
        }
        found
    }

    /// Copy a test's heads into the scenario plugin.
    pub(crate) fn load_scenario_heads(&mut self, heads: Vec<HeadSpec>) -> Result<(), HydraError> {
        let plugin = self.find_mut(SCENARIO_PLUGIN).ok_or_else(|| {
            HydraError::Internal("couldn't find the current scenario plugin".into())
        })?;
        plugin.add_heads(heads).map(|_| ())
    }

    /// Empty the scenario plugin without moving it in the plugin order.
    pub(crate) fn clear_scenario_heads(&mut self) {
        if let Some(plugin) = self.find_mut(SCENARIO_PLUGIN) {
            plugin.heads.clear();
        }
    }

    fn find(&self, name: &str) -> Option<&Plugin> {
        self.plugins.iter().find(|p| p.name == name)
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut Plugin> {
        self.plugins.iter_mut().find(|p| p.name == name)
    }
}
