//! No-op module. Accepts and ignores any directives.

use crate::error::BoxError;
use crate::lifecycle::InitContext;
use crate::module::{Instance, Module, ModuleConfig};

pub const KIND: &str = "dummy";

#[derive(Debug)]
pub struct Dummy {
    instance_name: String,
}

impl Dummy {
    pub fn factory(_kind: &str, instance_name: &str, _aliases: &[String]) -> Result<Instance, BoxError> {
        Ok(Instance::new(Dummy {
            instance_name: instance_name.to_string(),
        }))
    }
}

impl Module for Dummy {
    fn kind(&self) -> &str {
        KIND
    }

    fn instance_name(&self) -> &str {
        &self.instance_name
    }

    fn init(&self, cfg: ModuleConfig<'_>, _ctx: &InitContext<'_>) -> Result<(), BoxError> {
        let mut directives = cfg.directives();
        directives.allow_unknown();
        directives.process(cfg.children())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigNode, GlobalOptions};
    use crate::lifecycle::LifecycleContext;
    use crate::module::Registry;

    #[test]
    fn test_accepts_anything() {
        let mut registry = Registry::new();
        registry.register_factory(KIND, Dummy::factory).unwrap();

        let block = ConfigNode::new(KIND)
            .with_args(["d1"])
            .with_children(vec![ConfigNode::new("whatever").with_args(["x", "y"])]);
        crate::lifecycle::startup::instantiate(vec![block], &mut registry).unwrap();

        let ctx = LifecycleContext::new(GlobalOptions::default(), registry);
        crate::lifecycle::startup::initialize(&ctx).unwrap();
        assert!(ctx.is_initialized("d1"));
        assert_eq!(ctx.get("d1").unwrap().kind(), KIND);
    }
}
