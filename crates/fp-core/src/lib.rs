//! Shared vocabulary of the FerroPhase resolution stack: spans, errors, env
//! configuration, the cone-type model, declarations and the resolved
//! expression tree.

#[macro_use]
pub mod macros;

pub mod collections;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod span;
pub mod symbol;
pub mod tree;
pub mod ty;

// Re-export commonly used items for convenience
pub use tracing;

// Alias for error types
pub type Error = crate::error::Error;
pub type Result<T> = crate::error::Result<T>;
