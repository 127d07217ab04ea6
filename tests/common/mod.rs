//! Probe modules shared by the integration tests.
//!
//! Kinds registered by [`registry`]:
//! - `plain`: records its init; `init_delay_ms N` slows init down
//! - `closable`: like `plain` with a shutdown hook; `fail_close` makes the
//!   hook fail, `close_delay_ms N` makes it slow
//! - `dependent`: eagerly initializes the instance named by `depends_on`;
//!   with `lookup_on_thread` the lookup runs on a spawned thread
//! - `failing`: init always fails

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use modhost::config::{ConfigNode, Values};
use modhost::{BoxError, InitContext, Instance, Module, ModuleConfig, Registry, ShutdownHook};

/// Ordered record of module events.
#[derive(Debug, Default)]
pub struct Journal {
    events: Mutex<Vec<String>>,
}

impl Journal {
    pub fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events.lock().unwrap().iter().filter(|e| *e == event).count()
    }
}

pub struct Probe {
    kind: String,
    name: String,
    journal: Arc<Journal>,
    fail_close: AtomicBool,
    close_delay_ms: AtomicU64,
}

impl Probe {
    pub fn new(kind: &str, name: &str, journal: &Arc<Journal>) -> Self {
        Self {
            kind: kind.to_string(),
            name: name.to_string(),
            journal: journal.clone(),
            fail_close: AtomicBool::new(false),
            close_delay_ms: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

fn delay(values: &Values, name: &str) -> Result<u64, BoxError> {
    match values.get_str(name) {
        Some(v) => Ok(v.parse()?),
        None => Ok(0),
    }
}

impl Module for Probe {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn instance_name(&self) -> &str {
        &self.name
    }

    fn init(&self, cfg: ModuleConfig<'_>, ctx: &InitContext<'_>) -> Result<(), BoxError> {
        let mut directives = cfg.directives();
        directives
            .string("init_delay_ms", false, false, None)
            .string("close_delay_ms", false, false, None)
            .bool("fail_close", false, false)
            .bool("lookup_on_thread", false, false)
            .string("depends_on", false, self.kind == "dependent", None);
        let values = directives.process(cfg.children())?.values;

        if self.kind == "failing" {
            return Err(format!("{} refuses to start", self.name).into());
        }

        if let Some(dependency) = values.get_str("depends_on") {
            let resolved = if values.get_bool("lookup_on_thread").unwrap_or(false) {
                thread::scope(|scope| {
                    scope
                        .spawn(|| ctx.ensure_initialized(dependency).map(|i| i.name().to_string()))
                        .join()
                })
                .map_err(|_| "dependency lookup thread panicked")??
            } else {
                ctx.ensure_initialized(dependency)?.name().to_string()
            };
            self.journal.record(format!("dep:{}->{}", self.name, resolved));
        }

        let init_delay = delay(&values, "init_delay_ms")?;
        if init_delay > 0 {
            thread::sleep(Duration::from_millis(init_delay));
        }

        self.fail_close
            .store(values.get_bool("fail_close").unwrap_or(false), Ordering::SeqCst);
        self.close_delay_ms
            .store(delay(&values, "close_delay_ms")?, Ordering::SeqCst);

        self.journal.record(format!("init:{}", self.name));
        Ok(())
    }
}

impl ShutdownHook for Probe {
    fn close(&self) -> Result<(), BoxError> {
        self.journal.record(format!("close-start:{}", self.name));

        let close_delay = self.close_delay_ms.load(Ordering::SeqCst);
        if close_delay > 0 {
            thread::sleep(Duration::from_millis(close_delay));
        }

        if self.fail_close.load(Ordering::SeqCst) {
            return Err(format!("{} failed to close", self.name).into());
        }
        self.journal.record(format!("close:{}", self.name));
        Ok(())
    }
}

/// A registry with every probe kind.
pub fn registry(journal: &Arc<Journal>) -> Registry {
    let mut registry = Registry::new();
    for kind in ["plain", "dependent", "failing"] {
        let journal = journal.clone();
        registry
            .register_factory(kind, move |kind, name, _aliases| {
                Ok(Instance::new(Probe::new(kind, name, &journal)))
            })
            .unwrap();
    }

    let journal = journal.clone();
    registry
        .register_factory("closable", move |kind, name, _aliases| {
            Ok(Instance::with_shutdown_hook(Probe::new(kind, name, &journal)))
        })
        .unwrap();

    registry
}

pub fn block(kind: &str, args: &[&str]) -> ConfigNode {
    ConfigNode::new(kind).with_args(args.iter().copied())
}

pub fn block_with(kind: &str, args: &[&str], children: &[(&str, &[&str])]) -> ConfigNode {
    block(kind, args).with_children(children.iter().map(|(name, args)| block(name, args)).collect())
}
