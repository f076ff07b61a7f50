//! Contribution registries: typed key/value maps for everything a
//! plugin contributes.
//!
//! Every entry is tagged with its owning plugin id, which is the sole
//! teardown mechanism: removing a plugin deletes exactly its entries and
//! never a key later re-registered by a different plugin. All keyed
//! registries are first-registration-wins; duplicates are warned,
//! reported on the status bus, and skipped.

use crate::context::HostHandle;
use crate::core::Result;
use crate::descriptor::{
    ComponentConfig, FunctionConfig, Manager, ManagerCtor, PanelConfig, PluginDescriptor,
    Registered, ToolbarItemConfig,
};
use crate::lifecycle::events::{ContributionKind, StatusBus, StatusEvent};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// Seam to the host's widget runtime.
///
/// Invoked once per new component tag. Implementations must reject or
/// tolerate duplicate tags without panicking; a rejection is logged and
/// the component is skipped, the rest of the plugin registers normally.
pub trait WidgetDefiner: Send + Sync {
    /// Define a widget tag backed by the given component.
    fn define(&self, tag: &str, component: &ComponentConfig) -> Result<()>;
}

/// Definer that accepts every tag; for hosts without a widget runtime.
#[derive(Default)]
pub struct NullWidgetDefiner;

impl WidgetDefiner for NullWidgetDefiner {
    fn define(&self, _tag: &str, _component: &ComponentConfig) -> Result<()> {
        Ok(())
    }
}

/// Definer that records definitions and rejects duplicate tags, the way
/// a real widget runtime would. Ships for tests and headless hosts.
#[derive(Default)]
pub struct RecordingWidgetDefiner {
    defined: Mutex<Vec<String>>,
}

impl RecordingWidgetDefiner {
    /// Create an empty definer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags defined so far, in definition order.
    pub fn defined_tags(&self) -> Vec<String> {
        self.defined.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

impl WidgetDefiner for RecordingWidgetDefiner {
    fn define(&self, tag: &str, _component: &ComponentConfig) -> Result<()> {
        let mut defined = self
            .defined
            .lock()
            .map_err(|_| crate::core::Error::Internal("definer poisoned".to_string()))?;
        if defined.iter().any(|t| t == tag) {
            return Err(crate::core::Error::WidgetDefinition {
                tag: tag.to_string(),
                reason: "tag already defined".to_string(),
            });
        }
        defined.push(tag.to_string());
        Ok(())
    }
}

/// A manager singleton slot: constructor plus the lazily built instance.
struct ManagerEntry {
    plugin_id: String,
    ctor: ManagerCtor,
    instance: Option<Arc<dyn Manager>>,
    /// Handle already pushed into the instance, for idempotent re-injection.
    pushed: Option<HostHandle>,
}

/// The five contribution registries plus the host api handle.
///
/// An explicit value constructed once per engine or test instance and
/// threaded through every operation; no module-level mutable state.
/// Interior locks exist for re-entrant lookups during `execute`; no lock
/// is ever held across plugin-supplied code (hooks, constructors,
/// function bodies, `set_dependencies`).
pub struct Registries {
    components: RwLock<HashMap<String, Registered<ComponentConfig>>>,
    panels: RwLock<HashMap<String, Registered<PanelConfig>>>,
    functions: RwLock<HashMap<String, Registered<FunctionConfig>>>,
    managers: RwLock<HashMap<String, ManagerEntry>>,
    /// Live per-surface toolbar lists, always sorted (see `resort`).
    toolbars: RwLock<HashMap<String, Vec<Registered<ToolbarItemConfig>>>>,
    host: RwLock<Option<HostHandle>>,
    definer: Arc<dyn WidgetDefiner>,
    events: Arc<StatusBus>,
}

impl Registries {
    /// Create empty registries over a widget definer and event bus.
    pub fn new(definer: Arc<dyn WidgetDefiner>, events: Arc<StatusBus>) -> Self {
        Self {
            components: RwLock::new(HashMap::new()),
            panels: RwLock::new(HashMap::new()),
            functions: RwLock::new(HashMap::new()),
            managers: RwLock::new(HashMap::new()),
            toolbars: RwLock::new(HashMap::new()),
            host: RwLock::new(None),
            definer,
            events,
        }
    }

    // ── Population ───────────────────────────────────────────────────

    /// Register a plugin's keyed contributions (components, panels,
    /// functions, managers). Toolbar items are never written here; they
    /// are routed through the resolver.
    pub fn register_contributions(&self, plugin: &PluginDescriptor) {
        for component in &plugin.components {
            self.register_component(&plugin.id, component);
        }

        for panel in &plugin.panels {
            if self.key_taken(&self.panels, &panel.component_name) {
                self.skip(&plugin.id, ContributionKind::Panel, &panel.component_name);
                continue;
            }
            if let Ok(mut panels) = self.panels.write() {
                panels.insert(
                    panel.component_name.clone(),
                    Registered::new(&plugin.id, panel.clone()),
                );
            }
        }

        for function in &plugin.functions {
            if self.key_taken(&self.functions, &function.id) {
                self.skip(&plugin.id, ContributionKind::Function, &function.id);
                continue;
            }
            if let Ok(mut functions) = self.functions.write() {
                functions.insert(
                    function.id.clone(),
                    Registered::new(&plugin.id, function.clone()),
                );
            }
        }

        for manager in &plugin.managers {
            let taken = self
                .managers
                .read()
                .map(|m| m.contains_key(&manager.id))
                .unwrap_or(false);
            if taken {
                self.skip(&plugin.id, ContributionKind::Manager, &manager.id);
                continue;
            }
            if let Ok(mut managers) = self.managers.write() {
                managers.insert(
                    manager.id.clone(),
                    ManagerEntry {
                        plugin_id: plugin.id.clone(),
                        ctor: manager.constructor.clone(),
                        instance: None,
                        pushed: None,
                    },
                );
            }
        }
    }

    fn register_component(&self, plugin_id: &str, component: &ComponentConfig) {
        if self.key_taken(&self.components, &component.tag) {
            self.skip(plugin_id, ContributionKind::Component, &component.tag);
            return;
        }
        // Definer runs outside any registry lock; registration is
        // sequential so the check-then-insert gap is not observable.
        if let Err(e) = self.definer.define(&component.tag, component) {
            tracing::warn!(
                plugin = %plugin_id,
                tag = %component.tag,
                "widget definition rejected, skipping component: {e}"
            );
            self.skip(plugin_id, ContributionKind::Component, &component.tag);
            return;
        }
        if let Ok(mut components) = self.components.write() {
            components.insert(
                component.tag.clone(),
                Registered::new(plugin_id, component.clone()),
            );
        }
    }

    fn key_taken<T>(&self, map: &RwLock<HashMap<String, Registered<T>>>, key: &str) -> bool {
        map.read().map(|m| m.contains_key(key)).unwrap_or(false)
    }

    fn skip(&self, plugin_id: &str, registry: ContributionKind, key: &str) {
        tracing::warn!(
            plugin = %plugin_id,
            registry = ?registry,
            key = %key,
            "contribution key already registered, first registration wins"
        );
        self.events.emit(StatusEvent::ContributionSkipped {
            plugin_id: plugin_id.to_string(),
            registry,
            key: key.to_string(),
        });
    }

    // ── Teardown ─────────────────────────────────────────────────────

    /// Delete every entry owned by the plugin across all registries.
    pub fn remove_plugin(&self, plugin_id: &str) {
        if let Ok(mut components) = self.components.write() {
            components.retain(|_, entry| entry.plugin_id != plugin_id);
        }
        if let Ok(mut panels) = self.panels.write() {
            panels.retain(|_, entry| entry.plugin_id != plugin_id);
        }
        if let Ok(mut functions) = self.functions.write() {
            functions.retain(|_, entry| entry.plugin_id != plugin_id);
        }
        if let Ok(mut managers) = self.managers.write() {
            managers.retain(|_, entry| entry.plugin_id != plugin_id);
        }
        if let Ok(mut toolbars) = self.toolbars.write() {
            for items in toolbars.values_mut() {
                items.retain(|entry| entry.plugin_id != plugin_id);
            }
            toolbars.retain(|_, items| !items.is_empty());
        }
    }

    // ── Host api handle ──────────────────────────────────────────────

    /// Install the host api handle and retroactively push it into every
    /// already-constructed manager instance.
    ///
    /// Idempotent: each instance receives `set_dependencies` exactly once
    /// per distinct handle value.
    pub fn set_host_handle(&self, handle: HostHandle) {
        if let Ok(mut host) = self.host.write() {
            *host = Some(handle.clone());
        }

        // Collect targets first so no lock is held across plugin code.
        let targets: Vec<(String, Arc<dyn Manager>)> = match self.managers.read() {
            Ok(managers) => managers
                .iter()
                .filter(|(_, entry)| !pushed_same(&entry.pushed, &handle))
                .filter_map(|(id, entry)| {
                    entry.instance.as_ref().map(|i| (id.clone(), i.clone()))
                })
                .collect(),
            Err(_) => Vec::new(),
        };

        for (id, instance) in targets {
            instance.set_dependencies(&handle);
            if let Ok(mut managers) = self.managers.write() {
                if let Some(entry) = managers.get_mut(&id) {
                    entry.pushed = Some(handle.clone());
                }
            }
        }
    }

    /// The installed host api handle, if any.
    pub fn host_handle(&self) -> Option<HostHandle> {
        self.host.read().ok().and_then(|h| h.clone())
    }

    // ── Toolbar surface lists ────────────────────────────────────────

    /// Atomically append a resolved batch to its surface lists and
    /// re-sort each touched surface. Called by the resolver only.
    pub(crate) fn commit_toolbar_batch(&self, batch: Vec<Registered<ToolbarItemConfig>>) {
        let Ok(mut toolbars) = self.toolbars.write() else {
            return;
        };
        let mut touched: Vec<String> = Vec::new();
        for entry in batch {
            let surface = entry.value.target.clone();
            toolbars.entry(surface.clone()).or_default().push(entry);
            if !touched.contains(&surface) {
                touched.push(surface);
            }
        }
        for surface in touched {
            if let Some(items) = toolbars.get_mut(&surface) {
                resort(items);
            }
        }
    }

    /// Sorted snapshot of the live toolbar items for a surface.
    pub fn toolbar_items_for_target(&self, surface: &str) -> Vec<ToolbarItemConfig> {
        self.toolbars
            .read()
            .ok()
            .and_then(|t| {
                t.get(surface)
                    .map(|items| items.iter().map(|e| e.value.clone()).collect())
            })
            .unwrap_or_default()
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Panel config by component name.
    pub fn get_panel_config(&self, component_name: &str) -> Option<PanelConfig> {
        self.panels
            .read()
            .ok()
            .and_then(|p| p.get(component_name).map(|e| e.value.clone()))
    }

    /// Component config by tag.
    pub fn get_component_config(&self, tag: &str) -> Option<ComponentConfig> {
        self.components
            .read()
            .ok()
            .and_then(|c| c.get(tag).map(|e| e.value.clone()))
    }

    /// Function config by id.
    pub fn get_function_config(&self, id: &str) -> Option<FunctionConfig> {
        self.functions
            .read()
            .ok()
            .and_then(|f| f.get(id).map(|e| e.value.clone()))
    }

    /// Whether a function id is registered.
    pub fn has_function(&self, id: &str) -> bool {
        self.functions
            .read()
            .map(|f| f.contains_key(id))
            .unwrap_or(false)
    }

    /// Manager instance by id, constructed lazily on first lookup.
    ///
    /// Construction performs the one-shot dependency push when a host
    /// handle is already installed.
    pub fn get_manager_instance(&self, id: &str) -> Option<Arc<dyn Manager>> {
        // Fast path: already constructed.
        if let Ok(managers) = self.managers.read() {
            match managers.get(id) {
                Some(entry) => {
                    if let Some(instance) = &entry.instance {
                        return Some(instance.clone());
                    }
                }
                None => return None,
            }
        }

        // Construct outside the lock; the ctor is plugin code.
        let ctor = self
            .managers
            .read()
            .ok()
            .and_then(|m| m.get(id).map(|entry| entry.ctor.clone()))?;
        let instance = ctor();

        let instance = match self.managers.write() {
            Ok(mut managers) => {
                let entry = managers.get_mut(id)?;
                match &entry.instance {
                    // A re-entrant ctor already populated the slot; keep
                    // the singleton.
                    Some(existing) => existing.clone(),
                    None => {
                        entry.instance = Some(instance.clone());
                        instance
                    }
                }
            }
            Err(_) => return None,
        };

        if let Some(handle) = self.host_handle() {
            let needs_push = self
                .managers
                .read()
                .map(|m| {
                    m.get(id)
                        .map(|entry| !pushed_same(&entry.pushed, &handle))
                        .unwrap_or(false)
                })
                .unwrap_or(false);
            if needs_push {
                instance.set_dependencies(&handle);
                if let Ok(mut managers) = self.managers.write() {
                    if let Some(entry) = managers.get_mut(id) {
                        entry.pushed = Some(handle.clone());
                    }
                }
            }
        }

        Some(instance)
    }

    /// Number of registered panels.
    pub fn panel_count(&self) -> usize {
        self.panels.read().map(|p| p.len()).unwrap_or(0)
    }

    /// Number of registered components.
    pub fn component_count(&self) -> usize {
        self.components.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Number of registered functions.
    pub fn function_count(&self) -> usize {
        self.functions.read().map(|f| f.len()).unwrap_or(0)
    }

    /// Number of registered manager slots.
    pub fn manager_count(&self) -> usize {
        self.managers.read().map(|m| m.len()).unwrap_or(0)
    }
}

fn pushed_same(pushed: &Option<HostHandle>, handle: &HostHandle) -> bool {
    pushed
        .as_ref()
        .map(|p| Arc::ptr_eq(p, handle))
        .unwrap_or(false)
}

/// Stable sort: ascending `order`, `None` after all explicit orders,
/// ties keep their current (registration) order.
fn resort(items: &mut [Registered<ToolbarItemConfig>]) {
    items.sort_by_key(|entry| (entry.value.order.is_none(), entry.value.order.unwrap_or(0)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ManagerConfig, PanelActivation, PluginDescriptor};
    use serde_json::json;
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registries() -> (Arc<Registries>, Arc<crate::lifecycle::events::RecordingSink>) {
        let bus = Arc::new(StatusBus::new());
        let sink = Arc::new(crate::lifecycle::events::RecordingSink::new());
        bus.subscribe(sink.clone());
        (
            Arc::new(Registries::new(Arc::new(RecordingWidgetDefiner::new()), bus)),
            sink,
        )
    }

    struct CountingManager {
        pushes: AtomicUsize,
    }

    impl Manager for CountingManager {
        fn set_dependencies(&self, _host: &HostHandle) {
            self.pushes.fetch_add(1, Ordering::SeqCst);
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn counting_manager_plugin(plugin_id: &str, manager_id: &str) -> PluginDescriptor {
        PluginDescriptor::new(plugin_id, plugin_id).with_manager(ManagerConfig::new(
            manager_id,
            || {
                Arc::new(CountingManager {
                    pushes: AtomicUsize::new(0),
                })
            },
        ))
    }

    #[test]
    fn test_first_registration_wins() {
        let (registries, sink) = registries();

        let first = PluginDescriptor::new("a", "A")
            .with_panel(PanelConfig::new("shared-panel", "From A"));
        let second = PluginDescriptor::new("b", "B")
            .with_panel(PanelConfig::new("shared-panel", "From B"));

        registries.register_contributions(&first);
        registries.register_contributions(&second);

        assert_eq!(registries.panel_count(), 1);
        assert_eq!(
            registries.get_panel_config("shared-panel").unwrap().title,
            "From A"
        );
        let events = sink.take();
        assert!(events.iter().any(|e| matches!(
            e,
            StatusEvent::ContributionSkipped {
                plugin_id,
                registry: ContributionKind::Panel,
                ..
            } if plugin_id == "b"
        )));
    }

    #[test]
    fn test_removal_is_ownership_scoped() {
        let (registries, _sink) = registries();

        let a = PluginDescriptor::new("a", "A")
            .with_panel(PanelConfig::new("panel-a", "A"))
            .with_function(FunctionConfig::new("fn-a", |_, _| Ok(json!(null))))
            .with_component(ComponentConfig::new("tag-a", "WidgetA"));
        let b = PluginDescriptor::new("b", "B")
            .with_panel(PanelConfig::new("panel-b", "B"))
            .with_function(FunctionConfig::new("fn-b", |_, _| Ok(json!(null))));

        registries.register_contributions(&a);
        registries.register_contributions(&b);
        registries.remove_plugin("a");

        assert!(registries.get_panel_config("panel-a").is_none());
        assert!(registries.get_component_config("tag-a").is_none());
        assert!(!registries.has_function("fn-a"));
        assert!(registries.get_panel_config("panel-b").is_some());
        assert!(registries.has_function("fn-b"));
    }

    #[test]
    fn test_removal_keeps_rebound_keys() {
        let (registries, _sink) = registries();

        let a = PluginDescriptor::new("a", "A")
            .with_panel(PanelConfig::new("shared", "From A"));
        let b = PluginDescriptor::new("b", "B")
            .with_panel(PanelConfig::new("shared", "From B"));

        registries.register_contributions(&a);
        registries.remove_plugin("a");
        // The key is free again; B takes it.
        registries.register_contributions(&b);
        // Removing A again must not delete B's entry under the same key.
        registries.remove_plugin("a");

        assert_eq!(registries.get_panel_config("shared").unwrap().title, "From B");
    }

    #[test]
    fn test_duplicate_component_tag_does_not_reach_definer() {
        let bus = Arc::new(StatusBus::new());
        let definer = Arc::new(RecordingWidgetDefiner::new());
        let registries = Registries::new(definer.clone(), bus);

        let a = PluginDescriptor::new("a", "A")
            .with_component(ComponentConfig::new("shared-tag", "WidgetA"));
        let b = PluginDescriptor::new("b", "B")
            .with_component(ComponentConfig::new("shared-tag", "WidgetB"));

        registries.register_contributions(&a);
        registries.register_contributions(&b);

        assert_eq!(definer.defined_tags(), vec!["shared-tag".to_string()]);
        assert_eq!(registries.component_count(), 1);
    }

    #[test]
    fn test_definer_rejection_skips_component_only() {
        struct RejectAll;
        impl WidgetDefiner for RejectAll {
            fn define(&self, tag: &str, _component: &ComponentConfig) -> Result<()> {
                Err(crate::core::Error::WidgetDefinition {
                    tag: tag.to_string(),
                    reason: "runtime refused".to_string(),
                })
            }
        }

        let bus = Arc::new(StatusBus::new());
        let registries = Registries::new(Arc::new(RejectAll), bus);

        let plugin = PluginDescriptor::new("a", "A")
            .with_component(ComponentConfig::new("tag", "Widget"))
            .with_panel(PanelConfig::new("panel", "Panel"));
        registries.register_contributions(&plugin);

        assert_eq!(registries.component_count(), 0);
        assert_eq!(registries.panel_count(), 1);
    }

    #[test]
    fn test_manager_is_singleton() {
        let (registries, _sink) = registries();
        registries.register_contributions(&counting_manager_plugin("a", "modal-manager"));

        let first = registries.get_manager_instance("modal-manager").unwrap();
        let second = registries.get_manager_instance("modal-manager").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_manager_push_on_lazy_construction() {
        let (registries, _sink) = registries();
        registries.register_contributions(&counting_manager_plugin("a", "modal-manager"));
        registries.set_host_handle(Arc::new("dock"));

        let instance = registries.get_manager_instance("modal-manager").unwrap();
        let manager = instance.as_any().downcast_ref::<CountingManager>().unwrap();
        assert_eq!(manager.pushes.load(Ordering::SeqCst), 1);

        // Repeat lookups never re-push the same handle.
        registries.get_manager_instance("modal-manager").unwrap();
        assert_eq!(manager.pushes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_manager_retroactive_push_is_idempotent() {
        let (registries, _sink) = registries();
        registries.register_contributions(&counting_manager_plugin("a", "modal-manager"));

        // Constructed before the handle exists: no push yet.
        let instance = registries.get_manager_instance("modal-manager").unwrap();
        let manager = instance.as_any().downcast_ref::<CountingManager>().unwrap();
        assert_eq!(manager.pushes.load(Ordering::SeqCst), 0);

        let handle: HostHandle = Arc::new("dock");
        registries.set_host_handle(handle.clone());
        assert_eq!(manager.pushes.load(Ordering::SeqCst), 1);

        // Same handle value again: no second push.
        registries.set_host_handle(handle);
        assert_eq!(manager.pushes.load(Ordering::SeqCst), 1);

        // A distinct handle value is pushed exactly once more.
        registries.set_host_handle(Arc::new("other-dock"));
        assert_eq!(manager.pushes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_toolbar_sorting_orders_then_unordered() {
        let (registries, _sink) = registries();

        let items = vec![
            Registered::new("a", ToolbarItemConfig::function("no-order", "main", "f")),
            Registered::new(
                "a",
                ToolbarItemConfig::function("late", "main", "f").with_order(20),
            ),
            Registered::new(
                "a",
                ToolbarItemConfig::function("early", "main", "f").with_order(5),
            ),
        ];
        registries.commit_toolbar_batch(items);

        let ids: Vec<String> = registries
            .toolbar_items_for_target("main")
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec!["early", "late", "no-order"]);
    }

    #[test]
    fn test_toolbar_ties_preserve_registration_order() {
        let (registries, _sink) = registries();

        registries.commit_toolbar_batch(vec![
            Registered::new("a", ToolbarItemConfig::function("first", "main", "f").with_order(10)),
            Registered::new("a", ToolbarItemConfig::function("second", "main", "f").with_order(10)),
        ]);
        registries.commit_toolbar_batch(vec![Registered::new(
            "b",
            ToolbarItemConfig::function("third", "main", "f").with_order(10),
        )]);

        let ids: Vec<String> = registries
            .toolbar_items_for_target("main")
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_toolbar_removal_by_owner() {
        let (registries, _sink) = registries();

        registries.commit_toolbar_batch(vec![
            Registered::new("a", ToolbarItemConfig::function("from-a", "main", "f")),
            Registered::new("b", ToolbarItemConfig::function("from-b", "main", "f")),
        ]);
        registries.remove_plugin("a");

        let ids: Vec<String> = registries
            .toolbar_items_for_target("main")
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec!["from-b"]);
    }

    #[test]
    fn test_unknown_surface_is_empty() {
        let (registries, _sink) = registries();
        assert!(registries.toolbar_items_for_target("nowhere").is_empty());
    }

    #[test]
    fn test_panel_toolbar_item_kind_survives_snapshot() {
        let (registries, _sink) = registries();
        registries.commit_toolbar_batch(vec![Registered::new(
            "a",
            ToolbarItemConfig::panel("open", "main", "scene-view", PanelActivation::Create),
        )]);

        let items = registries.toolbar_items_for_target("main");
        assert!(matches!(
            &items[0].kind,
            crate::descriptor::ToolbarItemKind::Panel { activation: PanelActivation::Create, .. }
        ));
    }
}
