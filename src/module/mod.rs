//! Module contract.
//!
//! # Data Flow
//! ```text
//! kind name ──▶ registry.rs (Factory lookup)
//!     → Factory(kind, instance name, aliases) → Instance
//!     → registry.rs instance table (primary name + aliases)
//!     → Module::init(ModuleConfig, &InitContext)
//!     → ShutdownHook::close() on shutdown, when the capability was declared
//! ```
//!
//! # Design Decisions
//! - The shutdown capability is fixed when the instance is built
//! - Instances are shared (`Arc`); `init` and `close` take `&self`
//! - Dependents can recover the concrete type through the `Any` handle

pub mod registry;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::config::{ConfigNode, DirectiveMap, GlobalOptions};
use crate::error::BoxError;
use crate::lifecycle::InitContext;

pub use registry::Registry;

/// A configurable, initializable component.
pub trait Module: Send + Sync {
    /// Module kind, the name its factory is registered under.
    fn kind(&self) -> &str;

    /// Unique instance name.
    fn instance_name(&self) -> &str;

    /// Configure and start the instance.
    ///
    /// `ctx` may be used to look up and eagerly initialize other instances,
    /// also from threads the init spawns.
    fn init(&self, cfg: ModuleConfig<'_>, ctx: &InitContext<'_>) -> Result<(), BoxError>;
}

/// Optional cleanup capability.
pub trait ShutdownHook: Send + Sync {
    fn close(&self) -> Result<(), BoxError>;
}

/// Constructs an instance from (kind, instance name, aliases).
pub type Factory = Arc<dyn Fn(&str, &str, &[String]) -> Result<Instance, BoxError> + Send + Sync>;

/// Capabilities declared by an instance at construction.
#[derive(Clone)]
pub enum Capability {
    None,
    Shutdown(Arc<dyn ShutdownHook>),
}

/// A constructed module together with its declared capabilities.
#[derive(Clone)]
pub struct Instance {
    module: Arc<dyn Module>,
    any: Arc<dyn Any + Send + Sync>,
    capability: Capability,
}

impl Instance {
    /// An instance without a shutdown hook.
    pub fn new<M: Module + 'static>(module: M) -> Self {
        let module = Arc::new(module);
        Self {
            module: module.clone(),
            any: module,
            capability: Capability::None,
        }
    }

    /// An instance whose `close` is called on shutdown.
    pub fn with_shutdown_hook<M: Module + ShutdownHook + 'static>(module: M) -> Self {
        let module = Arc::new(module);
        Self {
            module: module.clone(),
            any: module.clone(),
            capability: Capability::Shutdown(module),
        }
    }

    pub fn module(&self) -> &Arc<dyn Module> {
        &self.module
    }

    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    pub fn kind(&self) -> &str {
        self.module.kind()
    }

    pub fn name(&self) -> &str {
        self.module.instance_name()
    }

    /// The concrete module, if it is a `T`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.any.clone().downcast::<T>().ok()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .field("shutdown_hook", &matches!(self.capability, Capability::Shutdown(_)))
            .finish()
    }
}

/// Configuration scope handed to `Module::init`: global options plus the
/// instance's own block.
#[derive(Debug, Clone, Copy)]
pub struct ModuleConfig<'a> {
    pub globals: &'a GlobalOptions,
    pub block: &'a ConfigNode,
}

impl<'a> ModuleConfig<'a> {
    pub fn new(globals: &'a GlobalOptions, block: &'a ConfigNode) -> Self {
        Self { globals, block }
    }

    /// A directive map for the block's children that inherits global values.
    pub fn directives(&self) -> DirectiveMap<'a> {
        DirectiveMap::new(self.block.describe()).with_globals(self.globals.values())
    }

    pub fn children(&self) -> &'a [ConfigNode] {
        &self.block.children
    }
}
