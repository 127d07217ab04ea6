//! Built-in module kinds shipped with the binary.

pub mod dummy;

use crate::error::RegistryError;
use crate::module::Registry;

/// Register every built-in factory.
pub fn register_builtins(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.register_factory(dummy::KIND, dummy::Dummy::factory)?;
    Ok(())
}
