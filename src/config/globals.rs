//! Process-wide options resolved from the top of the configuration tree.

use std::path::PathBuf;

use crate::config::directives::{ConfigError, DirectiveMap, Value, Values};
use crate::config::node::ConfigNode;
use crate::observability::logging::{LogOutput, LogSettings};

/// TLS settings shared by every module.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TlsConfig {
    #[default]
    Off,
    SelfSigned,
    Files { cert_path: PathBuf, key_path: PathBuf },
}

/// Global options, immutable once resolved.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub hostname: Option<String>,
    pub state_dir: Option<PathBuf>,
    pub libexec_dir: Option<PathBuf>,
    pub tls: TlsConfig,
    pub auth_per_domain: bool,
    pub auth_domains: Vec<String>,
    /// Empty when logging is off.
    pub log_outputs: Vec<LogOutput>,
    pub debug: bool,
    values: Values,
}

impl GlobalOptions {
    /// Resolve the global directives in `nodes`.
    ///
    /// Returns the options and every node that is not a global directive,
    /// in original order. The `log` and `debug` results are applied to `log`.
    pub fn resolve(nodes: &[ConfigNode], log: &LogSettings) -> Result<(Self, Vec<ConfigNode>), ConfigError> {
        let mut map = DirectiveMap::new("global configuration");
        map.string("hostname", false, false, None)
            .string("statedir", false, false, None)
            .string("libexecdir", false, false, None)
            .custom("tls", false, false, Some(Value::custom(TlsConfig::Off)), parse_tls)
            .bool("auth_perdomain", false, false)
            .string_list("auth_domains", false, false, None)
            .custom("log", false, false, Some(Value::custom(vec![LogOutput::Stderr])), parse_log)
            .bool("debug", false, false)
            .allow_unknown();

        let processed = map.process(nodes)?;
        let values = processed.values;

        let log_outputs = values
            .get_custom::<Vec<LogOutput>>("log")
            .map(|outputs| Vec::clone(&outputs))
            .unwrap_or_default();
        let debug = values.get_bool("debug").unwrap_or(false);

        log.set_outputs(log_outputs.clone());
        log.set_debug(debug);

        let globals = Self {
            hostname: values.get_str("hostname").map(str::to_string),
            state_dir: values.get_str("statedir").map(PathBuf::from),
            libexec_dir: values.get_str("libexecdir").map(PathBuf::from),
            tls: values
                .get_custom::<TlsConfig>("tls")
                .map(|tls| TlsConfig::clone(&tls))
                .unwrap_or_default(),
            auth_per_domain: values.get_bool("auth_perdomain").unwrap_or(false),
            auth_domains: values.get_list("auth_domains").map(<[String]>::to_vec).unwrap_or_default(),
            log_outputs,
            debug,
            values,
        };

        tracing::debug!(
            hostname = ?globals.hostname,
            tls = ?globals.tls,
            debug = globals.debug,
            "Global options resolved"
        );

        Ok((globals, processed.unmatched))
    }

    /// Raw resolved values, used for directive inheritance in module blocks.
    pub fn values(&self) -> &Values {
        &self.values
    }
}

fn parse_tls(node: &ConfigNode) -> Result<Value, String> {
    if !node.children.is_empty() {
        return Err("tls does not accept a block".to_string());
    }

    let tls = match node.args.as_slice() {
        [mode] if mode == "off" => TlsConfig::Off,
        [mode] if mode == "self_signed" => TlsConfig::SelfSigned,
        [cert, key] => TlsConfig::Files {
            cert_path: PathBuf::from(cert),
            key_path: PathBuf::from(key),
        },
        _ => return Err("expected 'off', 'self_signed' or '<cert_path> <key_path>'".to_string()),
    };
    Ok(Value::custom(tls))
}

fn parse_log(node: &ConfigNode) -> Result<Value, String> {
    if node.args.is_empty() {
        return Err("expected at least 1 argument".to_string());
    }
    if node.args.iter().any(|a| a == "off") {
        if node.args.len() > 1 {
            return Err("'off' can't be combined with other log targets".to_string());
        }
        return Ok(Value::custom(Vec::<LogOutput>::new()));
    }

    let mut outputs = Vec::with_capacity(node.args.len());
    for arg in &node.args {
        let output = match arg.as_str() {
            "stderr" => LogOutput::Stderr,
            "stdout" => LogOutput::Stdout,
            path => LogOutput::file(path).map_err(|e| format!("failed to open log file {path}: {e}"))?,
        };
        outputs.push(output);
    }
    Ok(Value::custom(outputs))
}
