//! Error types for the orchestrator.
//!
//! Every fatal failure ends up in [`Error`] and is returned from the entry
//! point. Cleanup failures are reported as [`CleanupError`] and only logged.

use thiserror::Error;

pub use crate::config::directives::ConfigError;

/// Boxed error produced by module code (factories, init, shutdown hooks).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by the module registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A factory for this module kind is already registered.
    #[error("module kind {0} is already registered")]
    DuplicateFactory(String),

    /// The name is already bound to an instance or alias.
    #[error("config block named {0} already exists")]
    DuplicateName(String),

    /// The alias target is not a registered instance.
    #[error("no module instance named {0}")]
    UnknownInstance(String),
}

/// Fatal errors returned by the entry point.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed directive, unknown module kind, duplicate name.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A module factory failed.
    #[error("failed to create module {kind} ({instance}): {source}")]
    Construction {
        kind: String,
        instance: String,
        #[source]
        source: BoxError,
    },

    /// A module's init call failed.
    #[error("failed to initialize module {kind} ({instance}): {source}")]
    Initialization {
        kind: String,
        instance: String,
        #[source]
        source: BoxError,
    },

    /// A lazy initialization request formed a cycle.
    #[error("dependency cycle while initializing {0}")]
    DependencyCycle(String),

    /// A lazy lookup named an instance that does not exist.
    #[error("no module instance named {0}")]
    UnknownInstance(String),

    /// A dependency has a different concrete type than requested.
    #[error("module instance {0} has an unexpected type")]
    TypeMismatch(String),

    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] std::io::Error),
}

/// Failure of a module's shutdown hook. Never fatal.
#[derive(Debug, Error)]
#[error("module {kind} ({instance}) close failed: {source}")]
pub struct CleanupError {
    pub kind: String,
    pub instance: String,
    #[source]
    pub source: BoxError,
}
