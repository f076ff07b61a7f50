//! # Atrium - UI Plugin Runtime Engine
//!
//! A registration, dependency-resolution, and lifecycle engine for plugins
//! embedded in a larger host application:
//! - **Descriptors**: what a plugin contributes (panels, functions,
//!   components, managers, toolbar items and widgets)
//! - **Registries**: ownership-tagged contribution maps with
//!   first-registration-wins semantics and scoped teardown
//! - **Toolbar resolver**: deferred activation for items whose
//!   initializer functions arrive with later-loaded plugins
//! - **Lifecycle**: batch loading with per-plugin failure isolation and
//!   a deterministic status event stream
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use atrium::descriptor::{FunctionConfig, PluginDescriptor};
//! use atrium::lifecycle::{LifecycleController, StaticLoader};
//! use atrium::registry::{NullWidgetDefiner, PluginRegistry};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = Arc::new(PluginRegistry::new(Arc::new(NullWidgetDefiner)));
//!     let controller = LifecycleController::new(registry.clone());
//!
//!     let loader = StaticLoader::new();
//!     loader.insert(PluginDescriptor::new("hello", "Hello").with_function(
//!         FunctionConfig::new("hello:greet", |_, _| Ok(serde_json::json!("hi"))),
//!     ));
//!
//!     let summary = controller
//!         .load_plugins(&["hello".to_string()], &loader)
//!         .await;
//!     println!("registered: {:?}", summary.succeeded);
//! }
//! ```

pub mod context;
pub mod core;
pub mod descriptor;
pub mod lifecycle;
pub mod registry;

pub use crate::core::error::{Error, Result};
