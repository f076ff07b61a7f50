//! Plugin registry: the top-level map of plugin id to descriptor.
//!
//! Gate-keeps duplicate ids and drives the contribution registries, the
//! toolbar resolver, and the execution context provider. Registration is
//! sequential; the host never interleaves two `register` calls.

use crate::context::{ContextProvider, HostHandle};
use crate::core::{now, Error, Result, Timestamp};
use crate::descriptor::{
    ComponentConfig, FunctionConfig, Manager, PanelConfig, PluginDescriptor, ToolbarItemConfig,
};
use crate::lifecycle::events::{StatusBus, StatusEvent};
use crate::registry::contributions::{Registries, WidgetDefiner};
use crate::registry::toolbar::ToolbarResolver;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Outcome of a successful `register` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Contributions live, initialize hook completed (or absent).
    Registered,
    /// Contributions live, but the initialize hook failed. The plugin
    /// still counts as registered.
    InitFailed { reason: String },
}

struct StoredPlugin {
    descriptor: Arc<PluginDescriptor>,
    registered_at: Timestamp,
}

/// Identity and registration time of one registered plugin.
#[derive(Clone, Debug, Serialize)]
pub struct PluginSummary {
    /// Plugin id
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// When the plugin was registered
    pub registered_at: Timestamp,
}

/// Central plugin registry.
///
/// Owns the contribution registries and the toolbar resolver; exposes
/// the outward query surface consumed by toolbar renderers, panel
/// openers, and function invokers.
pub struct PluginRegistry {
    plugins: RwLock<HashMap<String, StoredPlugin>>,
    registries: Arc<Registries>,
    resolver: ToolbarResolver,
    provider: ContextProvider,
    events: Arc<StatusBus>,
}

impl PluginRegistry {
    /// Create a registry with its own event bus.
    pub fn new(definer: Arc<dyn WidgetDefiner>) -> Self {
        Self::with_events(definer, Arc::new(StatusBus::new()))
    }

    /// Create a registry over an existing event bus.
    pub fn with_events(definer: Arc<dyn WidgetDefiner>, events: Arc<StatusBus>) -> Self {
        let registries = Arc::new(Registries::new(definer, events.clone()));
        Self {
            plugins: RwLock::new(HashMap::new()),
            provider: ContextProvider::new(registries.clone()),
            registries,
            resolver: ToolbarResolver::new(),
            events,
        }
    }

    /// The status event bus.
    pub fn events(&self) -> &Arc<StatusBus> {
        &self.events
    }

    /// The underlying contribution registries.
    pub fn registries(&self) -> &Arc<Registries> {
        &self.registries
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Register a plugin descriptor.
    ///
    /// A duplicate id is soft-rejected: warned, reported as a
    /// `RegisterError` event, and the registry is left unchanged. An
    /// initialize hook failure is isolated: the plugin stays registered
    /// with its contributions live, and the failure is reported as an
    /// `InitError` event and in the returned outcome.
    pub fn register(&self, descriptor: PluginDescriptor) -> Result<RegistrationOutcome> {
        let id = descriptor.id.clone();

        let taken = self
            .plugins
            .read()
            .map(|p| p.contains_key(&id))
            .unwrap_or(false);
        if taken {
            tracing::warn!(plugin = %id, "plugin id already registered, skipping");
            self.events.emit(StatusEvent::RegisterError {
                id: id.clone(),
                reason: "duplicate plugin id".to_string(),
            });
            return Err(Error::DuplicatePlugin(id));
        }

        let descriptor = Arc::new(descriptor);
        if let Ok(mut plugins) = self.plugins.write() {
            plugins.insert(
                id.clone(),
                StoredPlugin {
                    descriptor: descriptor.clone(),
                    registered_at: now(),
                },
            );
        }

        self.registries.register_contributions(&descriptor);

        // Toolbar contributions always go through the pending queue.
        self.resolver.enqueue(&id, descriptor.toolbar_items.clone());
        let widget_items: Vec<ToolbarItemConfig> = descriptor
            .toolbar_widgets
            .iter()
            .cloned()
            .map(|w| w.into_item())
            .collect();
        self.resolver.enqueue(&id, widget_items);

        // Tail drain: this plugin's functions may unblock batches queued
        // by plugins loaded earlier.
        self.resolver.drain(&self.registries);

        let outcome = match descriptor.hooks.as_ref() {
            Some(hooks) => match hooks.initialize() {
                Ok(()) => RegistrationOutcome::Registered,
                Err(e) => {
                    let reason = e.to_string();
                    tracing::warn!(
                        plugin = %id,
                        "initialize hook failed, plugin stays registered: {reason}"
                    );
                    self.events.emit(StatusEvent::InitError {
                        id: id.clone(),
                        reason: reason.clone(),
                    });
                    RegistrationOutcome::InitFailed { reason }
                }
            },
            None => RegistrationOutcome::Registered,
        };

        tracing::info!(plugin = %id, name = %descriptor.name, "plugin registered");
        Ok(outcome)
    }

    /// Unregister a plugin and delete every entry it owns.
    ///
    /// An absent id is a no-op. Safe to call even when the plugin's
    /// initialize hook never completed. A dispose hook failure is
    /// reported and never re-thrown.
    pub fn unregister(&self, id: &str) {
        let stored = self
            .plugins
            .read()
            .ok()
            .and_then(|p| p.get(id).map(|s| s.descriptor.clone()));
        let Some(stored) = stored else {
            tracing::debug!(plugin = %id, "unregister of unknown plugin id, nothing to do");
            return;
        };

        self.events.emit(StatusEvent::Disposing { id: id.to_string() });
        match stored.hooks.as_ref().map(|hooks| hooks.dispose()) {
            Some(Err(e)) => {
                let reason = e.to_string();
                tracing::warn!(plugin = %id, "dispose hook failed: {reason}");
                self.events.emit(StatusEvent::DisposeError {
                    id: id.to_string(),
                    reason,
                });
            }
            _ => {
                self.events.emit(StatusEvent::Disposed { id: id.to_string() });
            }
        }

        self.registries.remove_plugin(id);
        self.resolver.remove_plugin(id);
        if let Ok(mut plugins) = self.plugins.write() {
            plugins.remove(id);
        }

        tracing::info!(plugin = %id, "plugin unregistered");
        self.events.emit(StatusEvent::Unloaded { id: id.to_string() });
    }

    /// Install the host api handle: a one-time startup call that also
    /// retroactively injects the handle into live manager instances.
    pub fn set_host_api(&self, handle: HostHandle) {
        self.registries.set_host_handle(handle);
    }

    // ── Query surface ────────────────────────────────────────────────

    /// Whether a plugin id is currently registered.
    pub fn is_registered(&self, id: &str) -> bool {
        self.plugins
            .read()
            .map(|p| p.contains_key(id))
            .unwrap_or(false)
    }

    /// Number of registered plugins.
    pub fn plugin_count(&self) -> usize {
        self.plugins.read().map(|p| p.len()).unwrap_or(0)
    }

    /// Identity and registration time of all registered plugins.
    pub fn registered_plugins(&self) -> Vec<PluginSummary> {
        self.plugins
            .read()
            .map(|p| {
                p.values()
                    .map(|s| PluginSummary {
                        id: s.descriptor.id.clone(),
                        name: s.descriptor.name.clone(),
                        registered_at: s.registered_at,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Sorted toolbar items for a surface.
    pub fn toolbar_items_for_target(&self, surface: &str) -> Vec<ToolbarItemConfig> {
        self.registries.toolbar_items_for_target(surface)
    }

    /// Panel config by component name.
    pub fn get_panel_config(&self, component_name: &str) -> Option<PanelConfig> {
        self.registries.get_panel_config(component_name)
    }

    /// Component config by tag.
    pub fn get_component_config(&self, tag: &str) -> Option<ComponentConfig> {
        self.registries.get_component_config(tag)
    }

    /// Function config by id.
    pub fn get_function_config(&self, id: &str) -> Option<FunctionConfig> {
        self.registries.get_function_config(id)
    }

    /// Manager instance by id, constructed lazily on first lookup.
    pub fn get_manager_instance(&self, id: &str) -> Option<Arc<dyn Manager>> {
        self.registries.get_manager_instance(id)
    }

    /// Invoke a registered function with a freshly built context.
    pub fn execute_function(
        &self,
        id: &str,
        args: &[serde_json::Value],
    ) -> Result<serde_json::Value> {
        self.provider.execute_function(id, args)
    }

    /// Starvation report for toolbar batches still pending.
    pub fn pending_toolbar_diagnostics(&self) -> Vec<(String, Vec<String>)> {
        self.resolver.pending_diagnostics(&self.registries)
    }
}
