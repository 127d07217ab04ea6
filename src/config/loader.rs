//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::config::node::{ConfigNode, Location};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    node: Vec<ConfigNode>,
}

/// Parse a configuration tree from TOML text.
///
/// The document is an array of `[[node]]` tables; nested directives go in
/// `[[node.children]]`.
pub fn parse_config(content: &str, origin: &str) -> Result<Vec<ConfigNode>, LoadError> {
    let file: ConfigFile = toml::from_str(content)?;
    let location = Location {
        file: origin.to_string(),
        line: None,
    };

    let mut nodes = file.node;
    for node in &mut nodes {
        node.set_location(&location);
    }
    Ok(nodes)
}

/// Load the top-level configuration nodes from a TOML file.
pub fn load_config(path: &Path) -> Result<Vec<ConfigNode>, LoadError> {
    let content = fs::read_to_string(path)?;
    let nodes = parse_config(&content, &path.display().to_string())?;

    tracing::debug!(path = %path.display(), nodes = nodes.len(), "Configuration tree loaded");
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[[node]]
name = "hostname"
args = ["mx.example.org"]

[[node]]
name = "dummy"
args = ["first", "alias1"]

[[node.children]]
name = "option"
args = ["value"]

[[node]]
name = "debug"
"#;

    #[test]
    fn test_parse_tree() {
        let nodes = parse_config(SAMPLE, "sample.toml").unwrap();

        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[1].name, "dummy");
        assert_eq!(nodes[1].args, ["first", "alias1"]);
        assert_eq!(nodes[1].children[0].name, "option");
        assert!(nodes[2].args.is_empty());
        assert_eq!(nodes[1].children[0].location.as_ref().unwrap().file, "sample.toml");
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modhost.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let nodes = load_config(&path).unwrap();
        assert_eq!(nodes.len(), 3);
    }

    #[test]
    fn test_errors_are_distinct() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(load_config(&dir.path().join("missing.toml")), Err(LoadError::Io(_))));

        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[[node]]\nargs = 3\n").unwrap();
        assert!(matches!(load_config(&path), Err(LoadError::Parse(_))));
    }
}
