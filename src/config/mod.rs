//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML array of [[node]])
//!     → loader.rs (parse into ConfigNode tree)
//!     → globals.rs (global directives → GlobalOptions, rest unmatched)
//!     → unmatched top-level blocks become module declarations
//!
//! Per module block:
//!     directives.rs (DirectiveMap) resolves the block's children,
//!     inheriting global values where declared
//! ```
//!
//! # Design Decisions
//! - Global options are immutable once resolved
//! - Unknown top-level blocks are never an error at the global stage
//! - Every error names the offending node

pub mod directives;
pub mod globals;
pub mod loader;
pub mod node;

pub use directives::{ConfigError, DirectiveMap, Value, Values};
pub use globals::{GlobalOptions, TlsConfig};
pub use node::{ConfigNode, Location};
