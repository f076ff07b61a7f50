//! Contribution configs carried by a plugin descriptor.
//!
//! Each config type maps to one contribution registry. Plain-data configs
//! derive serde so hosts can snapshot or log them; function and manager
//! configs carry closures and stay opaque.

use crate::context::{ExecutionContext, HostHandle};
use crate::core::{now, Result, Timestamp};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;

/// A contribution value tagged with its owning plugin.
///
/// The `plugin_id` tag is the sole mechanism for bulk teardown: removing
/// a plugin deletes exactly the entries carrying its id.
#[derive(Clone, Debug)]
pub struct Registered<T> {
    /// Owning plugin id
    pub plugin_id: String,
    /// The contribution value
    pub value: T,
    /// Registration time
    pub registered_at: Timestamp,
}

impl<T> Registered<T> {
    /// Tag a contribution with its owning plugin.
    pub fn new(plugin_id: &str, value: T) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            value,
            registered_at: now(),
        }
    }
}

/// A content panel contribution, keyed by `component_name`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Component implementing the panel body (registry key)
    pub component_name: String,
    /// Human-readable panel title
    pub title: String,
    /// Preferred dock location, interpreted by the host
    pub default_location: Option<String>,
}

impl PanelConfig {
    /// Create a new panel config.
    pub fn new(component_name: &str, title: &str) -> Self {
        Self {
            component_name: component_name.to_string(),
            title: title.to_string(),
            default_location: None,
        }
    }

    /// Set the preferred dock location.
    pub fn with_location(mut self, location: &str) -> Self {
        self.default_location = Some(location.to_string());
        self
    }
}

/// A visual component contribution, keyed by `tag`.
///
/// The tag is handed to the injected `WidgetDefiner` exactly once;
/// re-defining a tag is a hard error in the underlying UI runtime.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComponentConfig {
    /// Widget tag (registry key)
    pub tag: String,
    /// Implementation identifier, interpreted by the widget definer
    pub class_name: String,
}

impl ComponentConfig {
    /// Create a new component config.
    pub fn new(tag: &str, class_name: &str) -> Self {
        Self {
            tag: tag.to_string(),
            class_name: class_name.to_string(),
        }
    }
}

/// Body of an invocable function contribution.
pub type FunctionBody = Arc<
    dyn Fn(&ExecutionContext, &[serde_json::Value]) -> Result<serde_json::Value> + Send + Sync,
>;

/// An invocable function contribution, keyed by `id`.
#[derive(Clone)]
pub struct FunctionConfig {
    /// Function id (registry key)
    pub id: String,
    /// Whether invocation requires the host api handle to be installed
    pub requires_host: bool,
    /// The function body
    pub execute: FunctionBody,
}

impl FunctionConfig {
    /// Create a new function config.
    pub fn new<F>(id: &str, execute: F) -> Self
    where
        F: Fn(&ExecutionContext, &[serde_json::Value]) -> Result<serde_json::Value>
            + Send
            + Sync
            + 'static,
    {
        Self {
            id: id.to_string(),
            requires_host: false,
            execute: Arc::new(execute),
        }
    }

    /// Require the host api handle before this function may run.
    pub fn with_host_required(mut self) -> Self {
        self.requires_host = true;
        self
    }
}

impl std::fmt::Debug for FunctionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionConfig")
            .field("id", &self.id)
            .field("requires_host", &self.requires_host)
            .finish_non_exhaustive()
    }
}

/// A long-lived service singleton contributed by a plugin.
///
/// One instance exists per manager id, constructed lazily on first lookup
/// and shared by reference thereafter.
pub trait Manager: Send + Sync {
    /// Receive the host api handle once it is known.
    ///
    /// Called at most once per distinct handle value per instance; the
    /// push is repeated only when the handle itself changes.
    fn set_dependencies(&self, _host: &HostHandle) {}

    /// Downcast support for host-side consumers.
    fn as_any(&self) -> &dyn Any;
}

/// Constructor producing a manager instance.
pub type ManagerCtor = Arc<dyn Fn() -> Arc<dyn Manager> + Send + Sync>;

/// A manager singleton contribution, keyed by `id`.
#[derive(Clone)]
pub struct ManagerConfig {
    /// Manager id (registry key)
    pub id: String,
    /// Constructor invoked on first lookup
    pub constructor: ManagerCtor,
}

impl ManagerConfig {
    /// Create a new manager config.
    pub fn new<F>(id: &str, constructor: F) -> Self
    where
        F: Fn() -> Arc<dyn Manager> + Send + Sync + 'static,
    {
        Self {
            id: id.to_string(),
            constructor: Arc::new(constructor),
        }
    }
}

impl std::fmt::Debug for ManagerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerConfig")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Activation behavior of a panel-type toolbar item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelActivation {
    /// Toggle an existing panel open/closed
    Toggle,
    /// Create a new panel instance per activation
    Create,
}

/// What a toolbar item does when activated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolbarItemKind {
    /// Opens or toggles a content panel
    Panel {
        /// Component implementing the panel
        component_name: String,
        /// Activation behavior
        activation: PanelActivation,
    },
    /// Invokes a registered function
    Function {
        /// Function id to execute
        function_id: String,
    },
    /// Embeds a component directly in the toolbar
    Widget {
        /// Component implementing the widget
        component_name: String,
    },
}

/// A toolbar item contribution targeting a named surface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolbarItemConfig {
    /// Item id
    pub id: String,
    /// Toolbar surface hosting the item
    pub target: String,
    /// Sort position; `None` sorts after all explicit orders
    pub order: Option<i64>,
    /// Activation behavior
    pub kind: ToolbarItemKind,
    /// Function ids that must exist before the item is exposed
    pub initializers: Vec<String>,
}

impl ToolbarItemConfig {
    /// Create a panel-type toolbar item.
    pub fn panel(
        id: &str,
        target: &str,
        component_name: &str,
        activation: PanelActivation,
    ) -> Self {
        Self {
            id: id.to_string(),
            target: target.to_string(),
            order: None,
            kind: ToolbarItemKind::Panel {
                component_name: component_name.to_string(),
                activation,
            },
            initializers: Vec::new(),
        }
    }

    /// Create a function-type toolbar item.
    pub fn function(id: &str, target: &str, function_id: &str) -> Self {
        Self {
            id: id.to_string(),
            target: target.to_string(),
            order: None,
            kind: ToolbarItemKind::Function {
                function_id: function_id.to_string(),
            },
            initializers: Vec::new(),
        }
    }

    /// Set the sort position.
    pub fn with_order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    /// Gate exposure on a function id being registered.
    pub fn with_initializer(mut self, function_id: &str) -> Self {
        self.initializers.push(function_id.to_string());
        self
    }
}

/// A toolbar-embedded widget contribution.
///
/// Widgets carry no activation dependencies; they are converted to
/// `ToolbarItemKind::Widget` entries and committed on the next drain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolbarWidgetConfig {
    /// Widget id
    pub id: String,
    /// Toolbar surface hosting the widget
    pub target: String,
    /// Sort position; `None` sorts after all explicit orders
    pub order: Option<i64>,
    /// Component implementing the widget
    pub component_name: String,
}

impl ToolbarWidgetConfig {
    /// Create a new toolbar widget config.
    pub fn new(id: &str, target: &str, component_name: &str) -> Self {
        Self {
            id: id.to_string(),
            target: target.to_string(),
            order: None,
            component_name: component_name.to_string(),
        }
    }

    /// Set the sort position.
    pub fn with_order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    /// Convert to the toolbar item representation used by surface lists.
    pub fn into_item(self) -> ToolbarItemConfig {
        ToolbarItemConfig {
            id: self.id,
            target: self.target,
            order: self.order,
            kind: ToolbarItemKind::Widget {
                component_name: self.component_name,
            },
            initializers: Vec::new(),
        }
    }
}
