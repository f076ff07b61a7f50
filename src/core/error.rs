//! Error types for Atrium.

use thiserror::Error;

/// Result type alias for Atrium operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Atrium operations.
#[derive(Error, Debug)]
pub enum Error {
    // Loader errors
    #[error("no descriptor available for plugin id: {0}")]
    DescriptorNotFound(String),

    #[error("loader failed for plugin {id}: {reason}")]
    LoadFailed { id: String, reason: String },

    // Registration errors
    #[error("plugin already registered: {0}")]
    DuplicatePlugin(String),

    // Contribution errors
    #[error("widget definition rejected for tag {tag}: {reason}")]
    WidgetDefinition { tag: String, reason: String },

    // Invocation errors
    #[error("function not found: {0}")]
    FunctionNotFound(String),

    #[error("manager not found: {0}")]
    ManagerNotFound(String),

    #[error("host api handle has not been provided")]
    HostHandleUnset,

    #[error("host api handle has unexpected type")]
    HostHandleType,

    // Generic errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Internal(err.to_string())
    }
}
