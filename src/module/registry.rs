//! Module registry.
//!
//! # Responsibilities
//! - Map module kinds to factories
//! - Map instance names and aliases to live instances
//! - Keep instances in registration order
//!
//! # Design Decisions
//! - A name is bound once; registering an instance or alias under a taken
//!   name is an error, never an overwrite
//! - Aliases always point at a backing instance, never at another alias

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::ConfigNode;
use crate::error::{BoxError, RegistryError};
use crate::module::{Factory, Instance};

/// A registered instance with its originating block.
#[derive(Debug)]
pub struct Entry {
    instance: Instance,
    block: ConfigNode,
    aliases: Vec<String>,
}

impl Entry {
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// The block the instance was declared in; its init-time scope.
    pub fn block(&self) -> &ConfigNode {
        &self.block
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }
}

/// Factories by kind and instances by name.
#[derive(Default)]
pub struct Registry {
    factories: HashMap<String, Factory>,
    entries: Vec<Entry>,
    names: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the factory for a module kind.
    pub fn register_factory<F>(&mut self, kind: &str, factory: F) -> Result<(), RegistryError>
    where
        F: Fn(&str, &str, &[String]) -> Result<Instance, BoxError> + Send + Sync + 'static,
    {
        if self.factories.contains_key(kind) {
            return Err(RegistryError::DuplicateFactory(kind.to_string()));
        }
        self.factories.insert(kind.to_string(), Arc::new(factory));
        Ok(())
    }

    pub fn lookup_factory(&self, kind: &str) -> Option<Factory> {
        self.factories.get(kind).cloned()
    }

    /// True if `name` is a primary instance name or an alias.
    pub fn exists(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Bind `name` to the instance. Returns its registration index.
    ///
    /// Fails if the name is already bound to an instance or alias.
    pub fn register_instance(
        &mut self,
        name: &str,
        instance: Instance,
        block: ConfigNode,
    ) -> Result<usize, RegistryError> {
        if self.exists(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        let index = self.entries.len();
        self.names.insert(name.to_string(), index);
        self.entries.push(Entry {
            instance,
            block,
            aliases: Vec::new(),
        });
        Ok(index)
    }

    /// Bind `alias` to the instance known as `instance_name`.
    pub fn register_alias(&mut self, alias: &str, instance_name: &str) -> Result<(), RegistryError> {
        if self.exists(alias) {
            return Err(RegistryError::DuplicateName(alias.to_string()));
        }
        let index = self
            .index_of(instance_name)
            .ok_or_else(|| RegistryError::UnknownInstance(instance_name.to_string()))?;

        self.names.insert(alias.to_string(), index);
        self.entries[index].aliases.push(alias.to_string());
        Ok(())
    }

    /// Registration index of the instance behind `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&Instance> {
        self.entry(name).map(Entry::instance)
    }

    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.index_of(name).map(|i| &self.entries[i])
    }

    pub fn entry_at(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    /// Instances in registration order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.factories.keys().collect();
        kinds.sort();
        f.debug_struct("Registry")
            .field("factories", &kinds)
            .field("instances", &self.entries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::InitContext;
    use crate::module::{Module, ModuleConfig};

    struct Plain {
        name: String,
    }

    impl Module for Plain {
        fn kind(&self) -> &str {
            "plain"
        }

        fn instance_name(&self) -> &str {
            &self.name
        }

        fn init(&self, _cfg: ModuleConfig<'_>, _ctx: &InitContext<'_>) -> Result<(), BoxError> {
            Ok(())
        }
    }

    fn plain(name: &str) -> Instance {
        Instance::new(Plain { name: name.to_string() })
    }

    #[test]
    fn test_factory_lookup() {
        let mut registry = Registry::new();
        registry
            .register_factory("plain", |_, name, _| Ok(plain(name)))
            .unwrap();

        assert!(registry.lookup_factory("plain").is_some());
        assert!(registry.lookup_factory("other").is_none());
        assert!(matches!(
            registry.register_factory("plain", |_, name, _| Ok(plain(name))),
            Err(RegistryError::DuplicateFactory(_))
        ));
    }

    #[test]
    fn test_alias_resolves_to_instance() {
        let mut registry = Registry::new();
        registry.register_instance("myserver", plain("myserver"), ConfigNode::new("plain")).unwrap();
        registry.register_alias("alt1", "myserver").unwrap();

        assert!(registry.exists("alt1"));
        assert_eq!(registry.index_of("alt1"), registry.index_of("myserver"));
        assert_eq!(registry.get("alt1").unwrap().name(), "myserver");
        assert_eq!(registry.entry("myserver").unwrap().aliases(), ["alt1"]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_alias_never_overwrites() {
        let mut registry = Registry::new();
        registry.register_instance("a", plain("a"), ConfigNode::new("plain")).unwrap();
        registry.register_instance("b", plain("b"), ConfigNode::new("plain")).unwrap();

        let err = registry.register_alias("a", "b").unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName(name) if name == "a"));
        assert_eq!(registry.get("a").unwrap().name(), "a");

        registry.register_alias("x", "b").unwrap();
        assert!(registry.register_alias("x", "a").is_err());
        assert_eq!(registry.get("x").unwrap().name(), "b");
    }

    #[test]
    fn test_instance_name_never_overwrites() {
        let mut registry = Registry::new();
        registry.register_instance("a", plain("a"), ConfigNode::new("plain")).unwrap();
        registry.register_alias("alt", "a").unwrap();

        for taken in ["a", "alt"] {
            let err = registry
                .register_instance(taken, plain("other"), ConfigNode::new("plain"))
                .unwrap_err();
            assert!(matches!(err, RegistryError::DuplicateName(name) if name == taken));
        }
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("a").unwrap().name(), "a");
    }

    #[test]
    fn test_alias_of_alias_points_at_backing_instance() {
        let mut registry = Registry::new();
        registry.register_instance("a", plain("a"), ConfigNode::new("plain")).unwrap();
        registry.register_alias("b", "a").unwrap();
        registry.register_alias("c", "b").unwrap();

        assert_eq!(registry.index_of("c"), Some(0));
        assert!(matches!(
            registry.register_alias("d", "missing"),
            Err(RegistryError::UnknownInstance(_))
        ));
    }
}
