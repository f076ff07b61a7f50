//! Registry Module
//!
//! The registration core:
//! - Contribution registries (typed, ownership-tagged maps)
//! - Toolbar activation resolver (pending queue + drain)
//! - Plugin registry (id gate-keeping, register/unregister)

pub mod contributions;
pub mod plugins;
pub mod toolbar;

pub use contributions::{NullWidgetDefiner, RecordingWidgetDefiner, Registries, WidgetDefiner};
pub use plugins::{PluginRegistry, PluginSummary, RegistrationOutcome};
pub use toolbar::ToolbarResolver;
