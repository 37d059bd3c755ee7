//! Montage Common Utilities
//!
//! Shared infrastructure for all Montage crates:
//! - Error types, error kinds, and result aliases
//! - Time ranges and floating-point tolerance helpers
//! - The non-fatal diagnostic channel (clamp warnings)
//! - Tracing/logging initialization
//! - Configuration loading

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod time;

pub use config::*;
pub use diagnostics::*;
pub use error::*;
pub use time::*;
