//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGINT, SIGTERM, SIGHUP)
//! - Translate signals into a bounded queue of [`Signal`] events
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - All three signals start the same graceful shutdown
//! - The queue holds a few pending signals so a quick second signal is
//!   not lost before the coordinator reacts

use std::fmt;
use std::io;

use tokio::sync::mpsc::{self, error::TrySendError};

/// Pending signals held before the coordinator drains them.
pub const SIGNAL_QUEUE_CAPACITY: usize = 5;

/// A termination signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Interrupt,
    Terminate,
    Hangup,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Signal::Interrupt => "SIGINT",
            Signal::Terminate => "SIGTERM",
            Signal::Hangup => "SIGHUP",
        };
        f.write_str(name)
    }
}

/// Install handlers and return the receiving end of the signal queue.
///
/// Must be called from within a Tokio runtime.
pub fn listen() -> io::Result<mpsc::Receiver<Signal>> {
    let (tx, rx) = mpsc::channel(SIGNAL_QUEUE_CAPACITY);

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        for (kind, sig) in [
            (SignalKind::interrupt(), Signal::Interrupt),
            (SignalKind::terminate(), Signal::Terminate),
            (SignalKind::hangup(), Signal::Hangup),
        ] {
            let mut stream = signal(kind)?;
            let tx = tx.clone();
            tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    if !forward(&tx, sig) {
                        break;
                    }
                }
            });
        }
    }

    #[cfg(not(unix))]
    {
        let tx = tx.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if !forward(&tx, Signal::Interrupt) {
                    break;
                }
            }
        });
    }

    tracing::debug!(capacity = SIGNAL_QUEUE_CAPACITY, "Signal handlers installed");
    Ok(rx)
}

/// Queue a signal. Returns false once nobody is listening anymore.
fn forward(tx: &mpsc::Sender<Signal>, sig: Signal) -> bool {
    match tx.try_send(sig) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::warn!(signal = %sig, "Signal queue full, dropping signal");
            true
        }
        Err(TrySendError::Closed(_)) => false,
    }
}
