//! Declarative directive processing.
//!
//! # Responsibilities
//! - Declare directives by shape (string, bool, string list, custom parser)
//! - Match nodes against declarations and bind parsed values
//! - Fall back to inherited global values and defaults
//! - Hand unrecognized nodes back to the caller when unknown is allowed
//!
//! # Design Decisions
//! - First error wins and names the offending node
//! - Nodes are matched by name only; arguments are validated per shape
//! - Unmatched nodes keep their original order

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::config::node::ConfigNode;

/// A configuration error attributed to a node or scope.
#[derive(Debug, Clone, Error)]
#[error("{node}: {message}")]
pub struct ConfigError {
    /// Description of the offending node (location and name).
    pub node: String,
    pub message: String,
}

impl ConfigError {
    pub fn at(node: &ConfigNode, message: impl Into<String>) -> Self {
        Self {
            node: node.describe(),
            message: message.into(),
        }
    }
}

/// Parser for a custom directive. Returns a message on rejection.
pub type CustomParser = Arc<dyn Fn(&ConfigNode) -> Result<Value, String> + Send + Sync>;

/// A resolved directive value.
#[derive(Clone)]
pub enum Value {
    Str(String),
    Bool(bool),
    List(Vec<String>),
    Custom(Arc<dyn Any + Send + Sync>),
}

impl Value {
    pub fn custom<T: Any + Send + Sync>(value: T) -> Self {
        Value::Custom(Arc::new(value))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::List(l) => f.debug_tuple("List").field(l).finish(),
            Value::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Resolved values keyed by directive name.
#[derive(Debug, Clone, Default)]
pub struct Values {
    inner: HashMap<String, Value>,
}

impl Values {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.inner.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.inner.insert(name.into(), value);
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.inner.get(name) {
            Some(Value::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.inner.get(name) {
            Some(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn get_list(&self, name: &str) -> Option<&[String]> {
        match self.inner.get(name) {
            Some(Value::List(l)) => Some(l),
            _ => None,
        }
    }

    pub fn get_custom<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        match self.inner.get(name) {
            Some(Value::Custom(v)) => v.clone().downcast::<T>().ok(),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Outcome of processing a list of nodes.
#[derive(Debug, Default)]
pub struct Processed {
    pub values: Values,
    /// Nodes that matched no declaration, in original order.
    pub unmatched: Vec<ConfigNode>,
}

#[derive(Clone)]
enum Shape {
    String,
    Bool,
    StringList,
    Custom(CustomParser),
}

#[derive(Clone)]
struct Directive {
    name: String,
    shape: Shape,
    required: bool,
    inherit_global: bool,
    default: Option<Value>,
}

impl Directive {
    fn parse(&self, node: &ConfigNode) -> Result<Value, ConfigError> {
        if !matches!(self.shape, Shape::Custom(_)) && !node.children.is_empty() {
            return Err(ConfigError::at(node, format!("{} does not accept a block", self.name)));
        }

        match &self.shape {
            Shape::String => match node.args.as_slice() {
                [value] => Ok(Value::Str(value.clone())),
                _ => Err(ConfigError::at(node, "expected exactly 1 argument")),
            },
            Shape::Bool => match node.args.as_slice() {
                [] => Ok(Value::Bool(true)),
                [value] => parse_bool(value)
                    .map(Value::Bool)
                    .ok_or_else(|| ConfigError::at(node, format!("invalid boolean: {value}"))),
                _ => Err(ConfigError::at(node, "expected at most 1 argument")),
            },
            Shape::StringList => {
                if node.args.is_empty() {
                    return Err(ConfigError::at(node, "expected at least 1 argument"));
                }
                Ok(Value::List(node.args.clone()))
            }
            Shape::Custom(parser) => parser(node).map_err(|message| ConfigError::at(node, message)),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "yes" | "true" | "on" | "1" => Some(true),
        "no" | "false" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// A set of directive declarations for one scope.
pub struct DirectiveMap<'a> {
    scope: String,
    directives: Vec<Directive>,
    globals: Option<&'a Values>,
    allow_unknown: bool,
}

impl<'a> DirectiveMap<'a> {
    /// Create an empty map. `scope` names the enclosing block in errors.
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            directives: Vec::new(),
            globals: None,
            allow_unknown: false,
        }
    }

    /// Values that `inherit_global` directives fall back to.
    pub fn with_globals(mut self, globals: &'a Values) -> Self {
        self.globals = Some(globals);
        self
    }

    pub fn string(&mut self, name: &str, inherit_global: bool, required: bool, default: Option<&str>) -> &mut Self {
        self.declare(name, Shape::String, inherit_global, required, default.map(|d| Value::Str(d.to_string())))
    }

    pub fn bool(&mut self, name: &str, inherit_global: bool, default: bool) -> &mut Self {
        self.declare(name, Shape::Bool, inherit_global, false, Some(Value::Bool(default)))
    }

    pub fn string_list(
        &mut self,
        name: &str,
        inherit_global: bool,
        required: bool,
        default: Option<Vec<String>>,
    ) -> &mut Self {
        self.declare(name, Shape::StringList, inherit_global, required, default.map(Value::List))
    }

    pub fn custom<F>(
        &mut self,
        name: &str,
        inherit_global: bool,
        required: bool,
        default: Option<Value>,
        parser: F,
    ) -> &mut Self
    where
        F: Fn(&ConfigNode) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.declare(name, Shape::Custom(Arc::new(parser)), inherit_global, required, default)
    }

    /// Return unrecognized nodes instead of failing on them.
    pub fn allow_unknown(&mut self) -> &mut Self {
        self.allow_unknown = true;
        self
    }

    fn declare(
        &mut self,
        name: &str,
        shape: Shape,
        inherit_global: bool,
        required: bool,
        default: Option<Value>,
    ) -> &mut Self {
        self.directives.retain(|d| d.name != name);
        self.directives.push(Directive {
            name: name.to_string(),
            shape,
            required,
            inherit_global,
            default,
        });
        self
    }

    /// Resolve `nodes` against the declared directives.
    pub fn process(&self, nodes: &[ConfigNode]) -> Result<Processed, ConfigError> {
        let mut processed = Processed::default();
        let mut seen = HashSet::new();

        for node in nodes {
            let Some(directive) = self.directives.iter().find(|d| d.name == node.name) else {
                if self.allow_unknown {
                    processed.unmatched.push(node.clone());
                    continue;
                }
                return Err(ConfigError::at(node, format!("unknown directive: {}", node.name)));
            };

            if !seen.insert(directive.name.as_str()) {
                return Err(ConfigError::at(node, format!("duplicate directive: {}", directive.name)));
            }

            let value = directive.parse(node)?;
            processed.values.insert(directive.name.clone(), value);
        }

        for directive in &self.directives {
            if processed.values.contains(&directive.name) {
                continue;
            }

            if directive.inherit_global {
                if let Some(value) = self.globals.and_then(|g| g.get(&directive.name)) {
                    processed.values.insert(directive.name.clone(), value.clone());
                    continue;
                }
            }

            if directive.required {
                return Err(ConfigError {
                    node: self.scope.clone(),
                    message: format!("missing required directive: {}", directive.name),
                });
            }

            if let Some(default) = &directive.default {
                processed.values.insert(directive.name.clone(), default.clone());
            }
        }

        Ok(processed)
    }
}
