//! Structured logging.
//!
//! # Responsibilities
//! - Hold the process-wide log destinations and debug flag
//! - Install the tracing subscriber that follows them
//! - Let directive resolution retarget logging after startup began
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Settings live behind `ArcSwap`; the writer and level filter read the
//!   current snapshot on every event, so updates apply without reinstalling
//! - `RUST_LOG` can still narrow output through `EnvFilter`

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use tracing::Level;
use tracing_subscriber::filter::{filter_fn, EnvFilter};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// One log destination.
#[derive(Debug, Clone)]
pub enum LogOutput {
    Stderr,
    Stdout,
    File { path: PathBuf, file: Arc<Mutex<File>> },
}

impl LogOutput {
    /// Open `path` for appending.
    pub fn file(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(LogOutput::File {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        match self {
            LogOutput::Stderr => io::stderr().write_all(buf),
            LogOutput::Stdout => io::stdout().write_all(buf),
            LogOutput::File { file, .. } => match file.lock() {
                Ok(mut f) => f.write_all(buf),
                Err(_) => Err(io::Error::other("log file lock poisoned")),
            },
        }
    }
}

/// Snapshot of the logging configuration.
#[derive(Debug, Clone)]
pub struct LogState {
    /// Empty means logging is off.
    pub outputs: Vec<LogOutput>,
    /// Value of the `debug` directive.
    pub debug: bool,
    /// Debug forced on from the command line; survives directive updates.
    pub force_debug: bool,
}

impl Default for LogState {
    fn default() -> Self {
        Self {
            outputs: vec![LogOutput::Stderr],
            debug: false,
            force_debug: false,
        }
    }
}

/// Shared handle to the process-wide logging state.
#[derive(Debug, Clone, Default)]
pub struct LogSettings {
    inner: Arc<ArcSwap<LogState>>,
}

impl LogSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_outputs(&self, outputs: Vec<LogOutput>) {
        self.inner.rcu(|state| LogState {
            outputs: outputs.clone(),
            ..LogState::clone(state)
        });
    }

    pub fn set_debug(&self, debug: bool) {
        self.inner.rcu(|state| LogState {
            debug,
            ..LogState::clone(state)
        });
    }

    /// Keep debug output on whatever the `debug` directive says.
    pub fn force_debug(&self) {
        self.inner.rcu(|state| LogState {
            force_debug: true,
            ..LogState::clone(state)
        });
    }

    pub fn debug(&self) -> bool {
        let state = self.inner.load();
        state.debug || state.force_debug
    }

    pub fn snapshot(&self) -> Arc<LogState> {
        self.inner.load_full()
    }
}

impl<'a> MakeWriter<'a> for LogSettings {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            state: self.inner.load_full(),
        }
    }
}

/// Writer fanning one formatted event out to every configured output.
pub struct LogWriter {
    state: Arc<LogState>,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for output in &self.state.outputs {
            let _ = output.write_all(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        for output in &self.state.outputs {
            match output {
                LogOutput::Stderr => io::stderr().flush()?,
                LogOutput::Stdout => io::stdout().flush()?,
                LogOutput::File { file, .. } => {
                    if let Ok(mut f) = file.lock() {
                        f.flush()?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(settings: &LogSettings) {
    let level_settings = settings.clone();
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(settings.clone())
        .with_filter(filter_fn(move |meta| {
            level_settings.debug() || *meta.level() <= Level::INFO
        }));

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "trace".into()))
        .with(fmt_layer)
        .try_init();
}
