//! Execution Context Module
//!
//! Builds the per-call context handed to a contributed function's
//! `execute`: the host api handle plus registry indirection so functions
//! can transitively invoke managers and other functions.

use crate::core::{Error, Result};
use crate::descriptor::Manager;
use crate::registry::contributions::Registries;
use std::any::Any;
use std::sync::Arc;

/// Opaque host capability injected at startup (e.g. a dock controller).
///
/// The engine never interprets the handle; consumers downcast it.
pub type HostHandle = Arc<dyn Any + Send + Sync>;

/// The context passed into a function's `execute`.
pub struct ExecutionContext {
    host: Option<HostHandle>,
    registries: Arc<Registries>,
}

impl ExecutionContext {
    pub(crate) fn new(host: Option<HostHandle>, registries: Arc<Registries>) -> Self {
        Self { host, registries }
    }

    /// The host api handle, if installed.
    pub fn host(&self) -> Result<&HostHandle> {
        self.host.as_ref().ok_or(Error::HostHandleUnset)
    }

    /// The host api handle downcast to a concrete type.
    pub fn host_as<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        self.host()?
            .clone()
            .downcast::<T>()
            .map_err(|_| Error::HostHandleType)
    }

    /// Look up a manager singleton, constructing it on first use.
    pub fn get_manager(&self, id: &str) -> Result<Arc<dyn Manager>> {
        self.registries
            .get_manager_instance(id)
            .ok_or_else(|| Error::ManagerNotFound(id.to_string()))
    }

    /// Invoke another registered function with a fresh context.
    pub fn execute_function(
        &self,
        id: &str,
        args: &[serde_json::Value],
    ) -> Result<serde_json::Value> {
        invoke(&self.registries, id, args)
    }
}

/// Builds execution contexts and dispatches function invocations.
pub struct ContextProvider {
    registries: Arc<Registries>,
}

impl ContextProvider {
    /// Create a provider over a set of registries.
    pub fn new(registries: Arc<Registries>) -> Self {
        Self { registries }
    }

    /// Invoke a registered function by id.
    ///
    /// Fails fast with [`Error::HostHandleUnset`] when the function
    /// requires the host handle and it has not been installed yet.
    pub fn execute_function(
        &self,
        id: &str,
        args: &[serde_json::Value],
    ) -> Result<serde_json::Value> {
        invoke(&self.registries, id, args)
    }
}

fn invoke(
    registries: &Arc<Registries>,
    id: &str,
    args: &[serde_json::Value],
) -> Result<serde_json::Value> {
    let function = registries
        .get_function_config(id)
        .ok_or_else(|| Error::FunctionNotFound(id.to_string()))?;

    let host = registries.host_handle();
    if function.requires_host && host.is_none() {
        return Err(Error::HostHandleUnset);
    }

    let ctx = ExecutionContext::new(host, registries.clone());
    (function.execute)(&ctx, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FunctionConfig, Manager, ManagerConfig, PluginDescriptor};
    use crate::lifecycle::events::StatusBus;
    use crate::registry::contributions::{NullWidgetDefiner, Registries};
    use serde_json::json;

    struct DockController {
        name: &'static str,
    }

    struct NullManager;

    impl Manager for NullManager {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn registries_with(descriptor: &PluginDescriptor) -> Arc<Registries> {
        let registries = Arc::new(Registries::new(
            Arc::new(NullWidgetDefiner),
            Arc::new(StatusBus::new()),
        ));
        registries.register_contributions(descriptor);
        registries
    }

    #[test]
    fn test_execute_unknown_function() {
        let registries = Arc::new(Registries::new(
            Arc::new(NullWidgetDefiner),
            Arc::new(StatusBus::new()),
        ));
        let provider = ContextProvider::new(registries);

        let err = provider.execute_function("missing", &[]).unwrap_err();
        assert!(matches!(err, Error::FunctionNotFound(_)));
    }

    #[test]
    fn test_host_required_fails_fast_before_setup() {
        let descriptor = PluginDescriptor::new("p", "P").with_function(
            FunctionConfig::new("dock:open", |ctx, _| {
                ctx.host()?;
                Ok(json!("opened"))
            })
            .with_host_required(),
        );
        let registries = registries_with(&descriptor);
        let provider = ContextProvider::new(registries.clone());

        let err = provider.execute_function("dock:open", &[]).unwrap_err();
        assert!(matches!(err, Error::HostHandleUnset));

        registries.set_host_handle(Arc::new(DockController { name: "dock" }));
        let out = provider.execute_function("dock:open", &[]).unwrap();
        assert_eq!(out, json!("opened"));
    }

    #[test]
    fn test_context_carries_typed_handle() {
        let descriptor = PluginDescriptor::new("p", "P").with_function(
            FunctionConfig::new("dock:name", |ctx, _| {
                let dock = ctx.host_as::<DockController>()?;
                Ok(json!(dock.name))
            })
            .with_host_required(),
        );
        let registries = registries_with(&descriptor);
        registries.set_host_handle(Arc::new(DockController { name: "dock" }));
        let provider = ContextProvider::new(registries);

        assert_eq!(provider.execute_function("dock:name", &[]).unwrap(), json!("dock"));
    }

    #[test]
    fn test_wrong_handle_type_is_distinguishable() {
        let descriptor = PluginDescriptor::new("p", "P").with_function(
            FunctionConfig::new("dock:name", |ctx, _| {
                let dock = ctx.host_as::<DockController>()?;
                Ok(json!(dock.name))
            })
            .with_host_required(),
        );
        let registries = registries_with(&descriptor);
        registries.set_host_handle(Arc::new(42u32));
        let provider = ContextProvider::new(registries);

        let err = provider.execute_function("dock:name", &[]).unwrap_err();
        assert!(matches!(err, Error::HostHandleType));
    }

    #[test]
    fn test_transitive_invocation_and_manager_lookup() {
        let descriptor = PluginDescriptor::new("p", "P")
            .with_manager(ManagerConfig::new("modal-manager", || Arc::new(NullManager)))
            .with_function(FunctionConfig::new("inner", |_, args| {
                Ok(json!(args.len()))
            }))
            .with_function(FunctionConfig::new("outer", |ctx, _| {
                ctx.get_manager("modal-manager")?;
                ctx.execute_function("inner", &[json!(1), json!(2)])
            }));
        let registries = registries_with(&descriptor);
        let provider = ContextProvider::new(registries);

        assert_eq!(provider.execute_function("outer", &[]).unwrap(), json!(2));
    }

    #[test]
    fn test_optional_host_function_runs_without_handle() {
        let descriptor = PluginDescriptor::new("p", "P").with_function(FunctionConfig::new(
            "pure",
            |ctx, _| {
                assert!(matches!(ctx.host(), Err(Error::HostHandleUnset)));
                Ok(json!(null))
            },
        ));
        let registries = registries_with(&descriptor);
        let provider = ContextProvider::new(registries);

        assert!(provider.execute_function("pure", &[]).is_ok());
    }
}
