//! Lifecycle controller that orchestrates whole load batches.
//!
//! Sequences loader → register for an ordered list of plugin ids and
//! emits the status event stream. One plugin's loader failure, missing
//! dependencies, registration failure, or hook failure never aborts
//! processing of the remaining ids.

use crate::core::{Error, Result};
use crate::descriptor::PluginDescriptor;
use crate::lifecycle::events::StatusEvent;
use crate::registry::plugins::{PluginRegistry, RegistrationOutcome};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Resolves a plugin id to its descriptor.
///
/// Loading may be asynchronous (network, bundle resolution); the
/// registration work that follows is synchronous. A loader distinguishes
/// an unknown id ([`Error::DescriptorNotFound`]) from a failed load.
#[async_trait]
pub trait PluginLoader: Send + Sync {
    /// Produce the descriptor for a plugin id.
    async fn load(&self, id: &str) -> Result<PluginDescriptor>;
}

/// Loader backed by an in-memory map of pre-built descriptors.
///
/// Each descriptor is handed out once; descriptors carry hooks and are
/// created once per load, matching the loader contract.
#[derive(Default)]
pub struct StaticLoader {
    descriptors: Mutex<HashMap<String, PluginDescriptor>>,
}

impl StaticLoader {
    /// Create an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor, keyed by its id.
    pub fn insert(&self, descriptor: PluginDescriptor) {
        if let Ok(mut descriptors) = self.descriptors.lock() {
            descriptors.insert(descriptor.id.clone(), descriptor);
        }
    }
}

#[async_trait]
impl PluginLoader for StaticLoader {
    async fn load(&self, id: &str) -> Result<PluginDescriptor> {
        self.descriptors
            .lock()
            .map_err(|_| Error::Internal("loader poisoned".to_string()))?
            .remove(id)
            .ok_or_else(|| Error::DescriptorNotFound(id.to_string()))
    }
}

/// Per-batch result buckets reported at `LoadingComplete`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    /// Plugins registered (including those whose initialize hook failed)
    pub succeeded: Vec<String>,
    /// Plugins that loaded or registered unsuccessfully
    pub failed: Vec<String>,
    /// Ids the loader had no descriptor for
    pub not_found: Vec<String>,
}

/// Orchestrates load batches and unloads against a plugin registry.
pub struct LifecycleController {
    registry: Arc<PluginRegistry>,
}

impl LifecycleController {
    /// Create a controller over a registry.
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self { registry }
    }

    /// The underlying registry.
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Load and register an ordered batch of plugin ids.
    ///
    /// Phase one loads every descriptor; phase two registers them in
    /// request order. Plugin-level `dependencies` are validated against
    /// the union of already-registered plugins and this batch's
    /// successfully-loaded ids, so dependents may precede their
    /// dependencies within a batch.
    pub async fn load_plugins(&self, ids: &[String], loader: &dyn PluginLoader) -> LoadSummary {
        let events = self.registry.events().clone();
        events.emit(StatusEvent::LoadingStarted {
            requested: ids.to_vec(),
        });

        let mut summary = LoadSummary::default();
        let mut loaded: Vec<PluginDescriptor> = Vec::new();

        for id in ids {
            events.emit(StatusEvent::LoadingPlugin { id: id.clone() });
            match loader.load(id).await {
                Ok(descriptor) => {
                    events.emit(StatusEvent::LoadedPlugin { id: id.clone() });
                    loaded.push(descriptor);
                }
                Err(e @ Error::DescriptorNotFound(_)) => {
                    tracing::warn!(plugin = %id, "no descriptor for plugin id");
                    events.emit(StatusEvent::LoadError {
                        id: id.clone(),
                        reason: e.to_string(),
                    });
                    summary.not_found.push(id.clone());
                }
                Err(e) => {
                    tracing::error!(plugin = %id, "failed to load plugin: {e}");
                    events.emit(StatusEvent::LoadError {
                        id: id.clone(),
                        reason: e.to_string(),
                    });
                    summary.failed.push(id.clone());
                }
            }
        }

        events.emit(StatusEvent::RegistrationStarted);
        let loaded_ids: HashSet<String> = loaded.iter().map(|d| d.id.clone()).collect();

        for descriptor in loaded {
            let id = descriptor.id.clone();
            events.emit(StatusEvent::RegisteringPlugin { id: id.clone() });

            let missing: Vec<String> = descriptor
                .dependencies
                .iter()
                .filter(|dep| !loaded_ids.contains(*dep) && !self.registry.is_registered(dep))
                .cloned()
                .collect();
            if !missing.is_empty() {
                tracing::warn!(
                    plugin = %id,
                    missing = ?missing,
                    "required plugins absent, skipping registration"
                );
                events.emit(StatusEvent::DependencyError {
                    id: id.clone(),
                    missing,
                });
                summary.failed.push(id);
                continue;
            }

            match self.registry.register(descriptor) {
                Ok(RegistrationOutcome::Registered) => {
                    events.emit(StatusEvent::RegisteredPlugin { id: id.clone() });
                    summary.succeeded.push(id);
                }
                // InitError already emitted by the registry; the plugin
                // is registered with its contributions live.
                Ok(RegistrationOutcome::InitFailed { .. }) => {
                    summary.succeeded.push(id);
                }
                // RegisterError already emitted by the registry.
                Err(_) => {
                    summary.failed.push(id);
                }
            }
        }

        // Starvation diagnostics: batches whose initializers never
        // arrived stay silently pending, but observably so.
        for (plugin_id, missing) in self.registry.pending_toolbar_diagnostics() {
            tracing::warn!(
                plugin = %plugin_id,
                missing = ?missing,
                "toolbar items pending on unregistered initializers"
            );
            events.emit(StatusEvent::ToolbarItemsPending { plugin_id, missing });
        }

        events.emit(StatusEvent::LoadingComplete {
            succeeded: summary.succeeded.clone(),
            failed: summary.failed.clone(),
            not_found: summary.not_found.clone(),
        });
        summary
    }

    /// Unload one plugin; events are emitted by the registry. An absent
    /// id is a no-op.
    pub fn unload_plugin(&self, id: &str) {
        self.registry.unregister(id);
    }
}
