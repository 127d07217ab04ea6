//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn module blocks into registered instances (instantiation pass)
//! - Initialize every instance exactly once (initialization pass)
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal, nothing is rolled back
//! - Instances initialize in registration order, not concurrently
//! - Names are checked before the factory runs so a collision never
//!   constructs a throwaway instance

use crate::config::{ConfigError, ConfigNode};
use crate::error::Error;
use crate::lifecycle::context::{InitOutcome, LifecycleContext};
use crate::module::Registry;

/// Create and register an instance for every module block.
///
/// The instance name is the block's first argument, or the block name when
/// there are no arguments; remaining arguments are aliases.
pub fn instantiate(blocks: Vec<ConfigNode>, registry: &mut Registry) -> Result<(), Error> {
    for block in blocks {
        let kind = block.name.clone();
        let (instance_name, aliases) = match block.args.split_first() {
            Some((first, rest)) => (first.clone(), rest.to_vec()),
            None => (kind.clone(), Vec::new()),
        };

        let factory = registry
            .lookup_factory(&kind)
            .ok_or_else(|| ConfigError::at(&block, format!("unknown module: {kind}")))?;

        if let Some(taken) = std::iter::once(&instance_name)
            .chain(&aliases)
            .find(|name| registry.exists(name))
        {
            return Err(ConfigError::at(&block, format!("config block named {taken} already exists")).into());
        }

        tracing::debug!(module = %kind, instance = %instance_name, "module create");
        let instance = factory(kind.as_str(), instance_name.as_str(), aliases.as_slice()).map_err(|source| {
            Error::Construction {
                kind: kind.clone(),
                instance: instance_name.clone(),
                source,
            }
        })?;

        if instance.name() != instance_name {
            return Err(Error::Construction {
                kind,
                source: format!("factory returned an instance named {}", instance.name()).into(),
                instance: instance_name,
            });
        }

        let block_for_errors = block.clone();
        registry
            .register_instance(&instance_name, instance, block)
            .map_err(|e| ConfigError::at(&block_for_errors, e.to_string()))?;
        for alias in &aliases {
            registry
                .register_alias(alias, &instance_name)
                .map_err(|e| ConfigError::at(&block_for_errors, e.to_string()))?;
            tracing::debug!(alias = %alias, instance = %instance_name, "module alias");
        }
    }

    Ok(())
}

/// Initialize every registered instance not already initialized.
pub fn initialize(ctx: &LifecycleContext) -> Result<(), Error> {
    for (index, entry) in ctx.registry().entries().iter().enumerate() {
        let instance = entry.instance();
        if ctx.is_initialized(instance.name()) {
            tracing::debug!(
                module = instance.kind(),
                instance = instance.name(),
                "module init skipped because it was lazily initialized before"
            );
            continue;
        }

        if ctx.initialize_at(index)? == InitOutcome::AlreadyInitialized {
            tracing::debug!(
                module = instance.kind(),
                instance = instance.name(),
                "module init skipped because it was initialized concurrently"
            );
        }
    }

    tracing::info!(instances = ctx.registry().len(), "All modules initialized");
    Ok(())
}
