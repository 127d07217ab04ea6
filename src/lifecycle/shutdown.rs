//! Shutdown coordination.
//!
//! # Responsibilities
//! - Wait for the first termination signal
//! - Notify module background work that shutdown began
//! - Run every shutdown hook, best effort
//! - Escalate to a forced shutdown on a second signal
//!
//! # Design Decisions
//! - Cleanup runs on a blocking task so a slow hook never stalls the
//!   watcher for the second signal
//! - Hooks run in registration order; a failing hook is logged and the
//!   pass continues
//! - After escalation no further hook is started

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};

use crate::error::CleanupError;
use crate::lifecycle::context::LifecycleContext;
use crate::lifecycle::signals::Signal;
use crate::module::Capability;

/// Broadcast notifier for the start of shutdown.
///
/// Long-running module tasks subscribe and stop when it fires.
#[derive(Debug)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of tasks still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    ShuttingDown,
    Terminated,
    ForceKilled,
}

/// What the cleanup pass did.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    /// Instances whose hook returned successfully.
    pub closed: Vec<String>,
    pub failures: Vec<CleanupError>,
    /// Instances whose hook was never started because of escalation.
    pub skipped: Vec<String>,
}

/// How the run phase ended.
#[derive(Debug)]
pub enum ShutdownOutcome {
    Terminated(ShutdownReport),
    /// A second signal arrived before cleanup finished.
    ForceKilled { signal: Signal },
}

/// Drives `Running → ShuttingDown → Terminated | ForceKilled`.
pub struct ShutdownCoordinator {
    ctx: Arc<LifecycleContext>,
    state: watch::Sender<ShutdownState>,
}

impl ShutdownCoordinator {
    pub fn new(ctx: Arc<LifecycleContext>) -> Self {
        let (state, _) = watch::channel(ShutdownState::Running);
        Self { ctx, state }
    }

    pub fn state(&self) -> ShutdownState {
        *self.state.borrow()
    }

    /// Observe state transitions.
    pub fn watch_state(&self) -> watch::Receiver<ShutdownState> {
        self.state.subscribe()
    }

    /// Block until a signal arrives, then clean up.
    pub async fn run(&self, signals: &mut mpsc::Receiver<Signal>) -> ShutdownOutcome {
        match signals.recv().await {
            Some(sig) => tracing::info!(
                signal = %sig,
                "signal received, next signal will force immediate shutdown"
            ),
            None => tracing::warn!("Signal queue closed, shutting down"),
        }

        self.state.send_replace(ShutdownState::ShuttingDown);
        self.ctx.shutdown().trigger();

        let abort = Arc::new(AtomicBool::new(false));
        let cleanup_task = {
            let ctx = self.ctx.clone();
            let abort = abort.clone();
            tokio::task::spawn_blocking(move || cleanup(&ctx, &abort))
        };

        tokio::select! {
            joined = cleanup_task => {
                let report = joined.unwrap_or_else(|e| {
                    tracing::error!(error = %e, "Cleanup task failed");
                    ShutdownReport::default()
                });
                tracing::info!(
                    closed = report.closed.len(),
                    failed = report.failures.len(),
                    "Cleanup complete"
                );
                self.state.send_replace(ShutdownState::Terminated);
                ShutdownOutcome::Terminated(report)
            }
            Some(sig) = signals.recv() => {
                abort.store(true, Ordering::SeqCst);
                tracing::error!(signal = %sig, "forced shutdown due to signal!");
                self.state.send_replace(ShutdownState::ForceKilled);
                ShutdownOutcome::ForceKilled { signal: sig }
            }
        }
    }
}

/// Call every shutdown hook in registration order until `abort` is set.
pub fn cleanup(ctx: &LifecycleContext, abort: &AtomicBool) -> ShutdownReport {
    let mut report = ShutdownReport::default();

    for entry in ctx.registry().entries() {
        let instance = entry.instance();
        let Capability::Shutdown(hook) = instance.capability() else {
            continue;
        };

        if abort.load(Ordering::SeqCst) {
            report.skipped.push(instance.name().to_string());
            continue;
        }

        tracing::debug!(module = instance.kind(), instance = instance.name(), "clean-up for module");
        match hook.close() {
            Ok(()) => report.closed.push(instance.name().to_string()),
            Err(source) => {
                let err = CleanupError {
                    kind: instance.kind().to_string(),
                    instance: instance.name().to_string(),
                    source,
                };
                tracing::warn!(error = %err, "Module clean-up failed");
                report.failures.push(err);
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_broadcast() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();
        assert_eq!(shutdown.receiver_count(), 1);

        shutdown.trigger();
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_trigger_without_listeners() {
        let shutdown = Shutdown::default();
        shutdown.trigger();
        assert_eq!(shutdown.receiver_count(), 0);
    }
}
