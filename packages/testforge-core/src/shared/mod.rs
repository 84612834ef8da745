//! Shared module - Common types and utilities
//!
//! Types shared across all features: the AST arena handed in by the front
//! end, the C expression parser, C type names, scalar values and source
//! locations.

#[macro_use]
pub mod macros;
pub mod expr;
pub mod models;

// Re-exports for convenience
pub use models::*;
