//! Configuration tree nodes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a node was read from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Location {
    pub file: String,
    pub line: Option<u32>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.file, line),
            None => write!(f, "{}", self.file),
        }
    }
}

/// A named configuration node with ordered arguments and child directives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConfigNode {
    pub name: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub children: Vec<ConfigNode>,

    /// Filled by the loader, never read from the file itself.
    #[serde(skip)]
    pub location: Option<Location>,
}

impl ConfigNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            children: Vec::new(),
            location: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_children(mut self, children: Vec<ConfigNode>) -> Self {
        self.children = children;
        self
    }

    /// Stamp this node and all of its descendants with a location.
    pub fn set_location(&mut self, location: &Location) {
        self.location = Some(location.clone());
        for child in &mut self.children {
            child.set_location(location);
        }
    }

    /// Human-readable reference used when attributing errors.
    pub fn describe(&self) -> String {
        let mut out = self.name.clone();
        for arg in &self.args {
            out.push(' ');
            out.push_str(arg);
        }
        match &self.location {
            Some(location) => format!("{location}: {out}"),
            None => out,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_includes_location() {
        let mut node = ConfigNode::new("smtp").with_args(["relay"]);
        assert_eq!(node.describe(), "smtp relay");

        node.set_location(&Location { file: "modhost.toml".into(), line: Some(4) });
        assert_eq!(node.describe(), "modhost.toml:4: smtp relay");
    }

    #[test]
    fn test_set_location_reaches_children() {
        let mut node = ConfigNode::new("block")
            .with_children(vec![ConfigNode::new("inner").with_children(vec![ConfigNode::new("leaf")])]);
        node.set_location(&Location { file: "a.toml".into(), line: None });

        let leaf = &node.children[0].children[0];
        assert_eq!(leaf.location.as_ref().map(|l| l.file.as_str()), Some("a.toml"));
    }
}
