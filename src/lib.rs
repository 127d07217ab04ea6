//! Module lifecycle orchestrator library.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod module;
pub mod modules;
pub mod observability;

pub use config::{ConfigNode, GlobalOptions};
pub use error::{BoxError, Error};
pub use lifecycle::{start, start_with_signals, InitContext, LifecycleContext};
pub use module::{Instance, Module, ModuleConfig, Registry, ShutdownHook};
