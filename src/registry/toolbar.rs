//! Toolbar activation resolver.
//!
//! Plugins load in host-supplied order, not dependency order, so a
//! toolbar item may reference initializer functions owned by a plugin
//! that has not registered yet. Each plugin's toolbar registrations sit
//! in a pending queue until every initializer referenced by the batch is
//! present in the function registry; only then is the batch committed to
//! the live surface lists, atomically and as a whole.

use crate::descriptor::{Registered, ToolbarItemConfig};
use crate::registry::contributions::Registries;
use std::sync::Mutex;

struct PendingBatch {
    plugin_id: String,
    items: Vec<ToolbarItemConfig>,
}

impl PendingBatch {
    /// Initializer ids referenced by any item and absent from the
    /// function registry. Empty means the batch is ready to commit.
    fn missing_initializers(&self, registries: &Registries) -> Vec<String> {
        let mut missing = Vec::new();
        for item in &self.items {
            for function_id in &item.initializers {
                if !registries.has_function(function_id) && !missing.contains(function_id) {
                    missing.push(function_id.clone());
                }
            }
        }
        missing
    }
}

/// Pending queue of toolbar registration batches.
#[derive(Default)]
pub struct ToolbarResolver {
    pending: Mutex<Vec<PendingBatch>>,
}

impl ToolbarResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a plugin's toolbar registrations verbatim. The items are
    /// not exposed to consumers until a drain commits them.
    pub fn enqueue(&self, plugin_id: &str, items: Vec<ToolbarItemConfig>) {
        if items.is_empty() {
            return;
        }
        if let Ok(mut pending) = self.pending.lock() {
            pending.push(PendingBatch {
                plugin_id: plugin_id.to_string(),
                items,
            });
        }
    }

    /// Re-examine every pending batch against the function registry and
    /// commit the satisfied ones. Runs at the tail of every registration
    /// because a later-loaded plugin may supply a missing function.
    ///
    /// Safe to call at any time, including with an empty queue.
    pub fn drain(&self, registries: &Registries) {
        let ready: Vec<PendingBatch> = {
            let Ok(mut pending) = self.pending.lock() else {
                return;
            };
            let mut still_pending = Vec::new();
            let mut ready = Vec::new();
            for batch in pending.drain(..) {
                if batch.missing_initializers(registries).is_empty() {
                    ready.push(batch);
                } else {
                    // No partial commit: the whole batch stays pending.
                    still_pending.push(batch);
                }
            }
            *pending = still_pending;
            ready
        };

        for PendingBatch { plugin_id, items } in ready {
            tracing::debug!(
                plugin = %plugin_id,
                items = items.len(),
                "committing toolbar batch"
            );
            let entries = items
                .into_iter()
                .map(|item| Registered::new(&plugin_id, item))
                .collect();
            registries.commit_toolbar_batch(entries);
        }
    }

    /// Drop every pending batch owned by the plugin.
    pub fn remove_plugin(&self, plugin_id: &str) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.retain(|batch| batch.plugin_id != plugin_id);
        }
    }

    /// Per-batch starvation report: owning plugin id plus the initializer
    /// ids still missing. Items in these batches are never exposed.
    pub fn pending_diagnostics(&self, registries: &Registries) -> Vec<(String, Vec<String>)> {
        self.pending
            .lock()
            .map(|pending| {
                pending
                    .iter()
                    .map(|batch| {
                        (
                            batch.plugin_id.clone(),
                            batch.missing_initializers(registries),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of batches still pending.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }
}
