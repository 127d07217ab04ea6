//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     config nodes → GlobalOptions::resolve (globals + unmatched blocks)
//!     → instantiate (factories, names, aliases)
//!     → initialize (each instance once, lazily triggered ones skipped)
//!
//! Signals (signals.rs):
//!     SIGINT/SIGTERM/SIGHUP → bounded queue
//!
//! Shutdown (shutdown.rs):
//!     first signal → notify modules → run shutdown hooks → Terminated
//!     second signal during cleanup → ForceKilled → exit(1)
//! ```
//!
//! # Design Decisions
//! - One sequential flow until the process blocks on signals
//! - The context is shared as `Arc` so background work can reach it
//! - Any startup error is returned to the caller; no rollback

pub mod context;
pub mod shutdown;
pub mod signals;
pub mod startup;

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::{ConfigNode, GlobalOptions};
use crate::error::Error;
use crate::module::Registry;
use crate::observability::logging::LogSettings;

pub use context::{InitContext, InitOutcome, LifecycleContext};
pub use shutdown::{Shutdown, ShutdownCoordinator, ShutdownOutcome, ShutdownReport, ShutdownState};
pub use signals::Signal;

/// Resolve globals, create and initialize every module.
pub fn boot(nodes: &[ConfigNode], mut registry: Registry, log: &LogSettings) -> Result<Arc<LifecycleContext>, Error> {
    let (globals, blocks) = GlobalOptions::resolve(nodes, log)?;

    startup::instantiate(blocks, &mut registry)?;
    let ctx = Arc::new(LifecycleContext::new(globals, registry));
    startup::initialize(&ctx)?;

    Ok(ctx)
}

/// Run the whole lifecycle against a supplied signal queue.
pub async fn start_with_signals(
    nodes: &[ConfigNode],
    registry: Registry,
    log: &LogSettings,
    mut signals: mpsc::Receiver<Signal>,
) -> Result<ShutdownOutcome, Error> {
    let ctx = boot(nodes, registry, log)?;
    Ok(ShutdownCoordinator::new(ctx).run(&mut signals).await)
}

/// Run the whole lifecycle, blocking until a termination signal is handled.
///
/// Returns once every shutdown hook has run. A second signal during cleanup
/// exits the process immediately with status 1.
pub async fn start(nodes: &[ConfigNode], registry: Registry, log: &LogSettings) -> Result<(), Error> {
    let ctx = boot(nodes, registry, log)?;
    let mut signals = signals::listen().map_err(Error::Signals)?;
    tracing::info!(instances = ctx.registry().len(), "Waiting for termination signal");

    match ShutdownCoordinator::new(ctx).run(&mut signals).await {
        ShutdownOutcome::Terminated(report) => {
            tracing::info!(
                closed = report.closed.len(),
                failed = report.failures.len(),
                "Shutdown complete"
            );
            Ok(())
        }
        ShutdownOutcome::ForceKilled { .. } => std::process::exit(1),
    }
}
