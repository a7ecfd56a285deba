//! One engine per caller identity.
//!
//! [`InstanceManager::instance`] memoizes engines by identity key. Each
//! identity owns a slot that is initialized at most once; the map lock is
//! only held to look up or insert that slot, never while plugins load.
//! Plugin loading reads fixtures and test files from disk, so it runs on
//! the blocking pool. Concurrent first requests for the same identity wait
//! on the same slot and get the same engine, while requests for other
//! identities proceed. A failed build leaves the slot empty: the error
//! goes to the caller and the next request for that identity tries again.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OnceCell;

use super::Engine;
use crate::error::HydraError;
use crate::plugins::{PluginContext, PluginEnv, PluginFactory};

/// Identity used when a request carries no identity of its own.
pub const DEFAULT_IDENTITY: &str = "*default*";

type Slot = Arc<OnceCell<Arc<Engine>>>;

pub struct InstanceManager {
    factories: Arc<[Arc<dyn PluginFactory>]>,
    env: PluginEnv,
    instances: Mutex<HashMap<String, Slot>>,
}

impl InstanceManager {
    #[must_use]
    pub fn new(factories: Vec<Arc<dyn PluginFactory>>, env: PluginEnv) -> Self {
        Self {
            factories: factories.into(),
            env,
            instances: Mutex::new(HashMap::new()),
        }
    }

    pub async fn instance(&self, identity: &str) -> Result<Arc<Engine>, HydraError> {
        let slot = self.slot(identity);
        let engine = slot.get_or_try_init(|| self.summon(identity)).await?;
        Ok(Arc::clone(engine))
    }

    /// Identities with a live engine, sorted.
    #[must_use]
    pub fn identities(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .instances
            .lock()
            .iter()
            .filter(|(_, slot)| slot.initialized())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    #[must_use]
    pub fn plugin_count(&self) -> usize {
        self.factories.len()
    }

    fn slot(&self, identity: &str) -> Slot {
        let mut instances = self.instances.lock();
        if let Some(slot) = instances.get(identity) {
            return Arc::clone(slot);
        }
        let slot = Slot::default();
        instances.insert(identity.to_string(), Arc::clone(&slot));
        slot
    }

    async fn summon(&self, identity: &str) -> Result<Arc<Engine>, HydraError> {
        let factories = Arc::clone(&self.factories);
        let env = self.env.clone();
        let identity = identity.to_string();
        tokio::task::spawn_blocking(move || build_engine(&identity, &factories, &env))
            .await
            .map_err(|e| HydraError::Internal(format!("instance build task failed: {e}")))?
    }
}

fn build_engine(
    identity: &str,
    factories: &[Arc<dyn PluginFactory>],
    env: &PluginEnv,
) -> Result<Arc<Engine>, HydraError> {
    let engine = Arc::new(Engine::new());
    for factory in factories {
        let ctx = PluginContext::for_factory(factory.as_ref(), engine.assertions(), env);
        let definition = factory.build(&ctx).map_err(|e| {
            tracing::error!(identity, plugin = factory.name(), error = %e, "plugin failed to load");
            e
        })?;
        engine.register_plugin(definition)?;
    }
    tracing::info!(identity, plugins = factories.len(), "instance created");
    Ok(engine)
}
