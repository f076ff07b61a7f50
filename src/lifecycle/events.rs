//! Status event stream for plugin lifecycle observability.
//!
//! Every lifecycle transition is modeled as a variant of a closed tagged
//! union rather than ad hoc logging, so production diagnostics and tests
//! subscribe to the same deterministic stream.

use serde::Serialize;
use std::sync::{Arc, Mutex, RwLock};

/// Which contribution registry an event refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionKind {
    Component,
    Panel,
    Function,
    Manager,
    ToolbarItem,
}

/// One lifecycle status event.
///
/// Order per load batch:
/// `LoadingStarted → [LoadingPlugin, LoadedPlugin|LoadError]* →
/// RegistrationStarted → [RegisteringPlugin, RegisteredPlugin|
/// RegisterError|DependencyError|InitError]* → [ToolbarItemsPending]* →
/// LoadingComplete`. Unregister emits
/// `Disposing → Disposed|DisposeError → Unloaded`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StatusEvent {
    /// A load batch began for the requested ids.
    LoadingStarted { requested: Vec<String> },
    /// The loader was asked for a descriptor.
    LoadingPlugin { id: String },
    /// The loader produced a descriptor.
    LoadedPlugin { id: String },
    /// The loader failed or found nothing for the id.
    LoadError { id: String, reason: String },
    /// All loads finished; registration begins.
    RegistrationStarted,
    /// A descriptor is being registered.
    RegisteringPlugin { id: String },
    /// A descriptor finished registering.
    RegisteredPlugin { id: String },
    /// Registration was refused (duplicate id).
    RegisterError { id: String, reason: String },
    /// Required plugins were absent from the loaded set.
    DependencyError { id: String, missing: Vec<String> },
    /// The initialize hook failed; contributions stay live.
    InitError { id: String, reason: String },
    /// A contribution key was already taken; first registration wins.
    ContributionSkipped {
        plugin_id: String,
        registry: ContributionKind,
        key: String,
    },
    /// A toolbar batch is still waiting on unregistered initializers.
    ToolbarItemsPending {
        plugin_id: String,
        missing: Vec<String>,
    },
    /// Per-batch summary.
    LoadingComplete {
        succeeded: Vec<String>,
        failed: Vec<String>,
        not_found: Vec<String>,
    },
    /// A plugin's dispose hook is about to run.
    Disposing { id: String },
    /// The dispose hook completed.
    Disposed { id: String },
    /// The dispose hook failed; teardown continues.
    DisposeError { id: String, reason: String },
    /// The plugin and all its contributions are gone.
    Unloaded { id: String },
}

/// A subscriber to the status stream.
pub trait StatusSink: Send + Sync {
    /// Receive one event. Called synchronously in emission order.
    fn on_event(&self, event: &StatusEvent);
}

/// Fan-out bus delivering status events to subscribed sinks.
#[derive(Default)]
pub struct StatusBus {
    sinks: RwLock<Vec<Arc<dyn StatusSink>>>,
}

impl StatusBus {
    /// Create a bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a sink to all future events.
    pub fn subscribe(&self, sink: Arc<dyn StatusSink>) {
        if let Ok(mut sinks) = self.sinks.write() {
            sinks.push(sink);
        }
    }

    /// Deliver an event to every subscriber in subscription order.
    pub fn emit(&self, event: StatusEvent) {
        if let Ok(sinks) = self.sinks.read() {
            for sink in sinks.iter() {
                sink.on_event(&event);
            }
        }
    }
}

/// A sink that records every event, for tests and diagnostics dumps.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<StatusEvent>>,
}

impl RecordingSink {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot all events recorded so far.
    pub fn snapshot(&self) -> Vec<StatusEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Drain and return all recorded events.
    pub fn take(&self) -> Vec<StatusEvent> {
        self.events
            .lock()
            .map(|mut e| std::mem::take(&mut *e))
            .unwrap_or_default()
    }
}

impl StatusSink for RecordingSink {
    fn on_event(&self, event: &StatusEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
