//! Plugin descriptor and lifecycle hooks.

use crate::core::Result;
use crate::descriptor::contribution::{
    ComponentConfig, FunctionConfig, ManagerConfig, PanelConfig, ToolbarItemConfig,
    ToolbarWidgetConfig,
};

/// Optional lifecycle hooks a plugin may provide.
///
/// Hook errors are caught by the registry and reported on the status
/// stream; they never unwind the registration or teardown loop.
pub trait PluginHooks: Send + Sync {
    /// Called after all of the plugin's contributions are live.
    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Called before the plugin's contributions are torn down.
    fn dispose(&self) -> Result<()> {
        Ok(())
    }
}

/// Everything one plugin contributes to the host.
///
/// Created once by a loader, registered once, and fully removed on
/// unregister; re-registering the same id afterwards is a fresh
/// registration.
pub struct PluginDescriptor {
    /// Globally unique plugin id
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Version string
    pub version: Option<String>,
    /// Plugin ids that must be present in the loaded set
    pub dependencies: Vec<String>,
    /// Contributed content panels
    pub panels: Vec<PanelConfig>,
    /// Contributed invocable functions
    pub functions: Vec<FunctionConfig>,
    /// Contributed visual components
    pub components: Vec<ComponentConfig>,
    /// Contributed manager singletons
    pub managers: Vec<ManagerConfig>,
    /// Contributed toolbar items
    pub toolbar_items: Vec<ToolbarItemConfig>,
    /// Contributed toolbar-embedded widgets
    pub toolbar_widgets: Vec<ToolbarWidgetConfig>,
    /// Optional lifecycle hooks
    pub hooks: Option<Box<dyn PluginHooks>>,
}

impl PluginDescriptor {
    /// Create a new descriptor.
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            version: None,
            dependencies: Vec::new(),
            panels: Vec::new(),
            functions: Vec::new(),
            components: Vec::new(),
            managers: Vec::new(),
            toolbar_items: Vec::new(),
            toolbar_widgets: Vec::new(),
            hooks: None,
        }
    }

    /// Set version.
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    /// Require another plugin to be present.
    pub fn with_dependency(mut self, plugin_id: &str) -> Self {
        self.dependencies.push(plugin_id.to_string());
        self
    }

    /// Contribute a content panel.
    pub fn with_panel(mut self, panel: PanelConfig) -> Self {
        self.panels.push(panel);
        self
    }

    /// Contribute an invocable function.
    pub fn with_function(mut self, function: FunctionConfig) -> Self {
        self.functions.push(function);
        self
    }

    /// Contribute a visual component.
    pub fn with_component(mut self, component: ComponentConfig) -> Self {
        self.components.push(component);
        self
    }

    /// Contribute a manager singleton.
    pub fn with_manager(mut self, manager: ManagerConfig) -> Self {
        self.managers.push(manager);
        self
    }

    /// Contribute a toolbar item.
    pub fn with_toolbar_item(mut self, item: ToolbarItemConfig) -> Self {
        self.toolbar_items.push(item);
        self
    }

    /// Contribute a toolbar-embedded widget.
    pub fn with_toolbar_widget(mut self, widget: ToolbarWidgetConfig) -> Self {
        self.toolbar_widgets.push(widget);
        self
    }

    /// Attach lifecycle hooks.
    pub fn with_hooks(mut self, hooks: Box<dyn PluginHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }
}

impl std::fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("version", &self.version)
            .field("dependencies", &self.dependencies)
            .field("panels", &self.panels.len())
            .field("functions", &self.functions.len())
            .field("components", &self.components.len())
            .field("managers", &self.managers.len())
            .field("toolbar_items", &self.toolbar_items.len())
            .field("toolbar_widgets", &self.toolbar_widgets.len())
            .finish_non_exhaustive()
    }
}
