//! Lifecycle Module
//!
//! Batch orchestration and observability:
//! - Status event stream (closed tagged union + subscription bus)
//! - Lifecycle controller (loader → register, failure isolation)

pub mod controller;
pub mod events;

pub use controller::{LifecycleController, LoadSummary, PluginLoader, StaticLoader};
pub use events::{ContributionKind, RecordingSink, StatusBus, StatusEvent, StatusSink};
