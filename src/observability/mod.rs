//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! `log` / `debug` directives
//!     → logging.rs (LogSettings swapped atomically)
//!     → fmt layer writer + level filter read the current snapshot
//!
//! All subsystems produce:
//!     → structured tracing events (module kind, instance name, signal)
//! ```
//!
//! # Design Decisions
//! - One subscriber installed at process start, retargeted in place
//! - Debug-level lifecycle events only surface when `debug` is on

pub mod logging;
