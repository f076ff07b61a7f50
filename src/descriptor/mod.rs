//! Plugin Descriptor Module
//!
//! Defines what a plugin contributes to the host:
//! - Plugin descriptor and lifecycle hooks
//! - Contribution configs (panels, functions, components, managers, toolbar)
//! - Ownership tagging for teardown

pub mod contribution;
pub mod plugin;

pub use contribution::{
    ComponentConfig, FunctionBody, FunctionConfig, Manager, ManagerConfig, ManagerCtor,
    PanelActivation, PanelConfig, Registered, ToolbarItemConfig, ToolbarItemKind,
    ToolbarWidgetConfig,
};
pub use plugin::{PluginDescriptor, PluginHooks};
