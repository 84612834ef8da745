//! Common test utilities for testforge-core
//!
//! Shared fixtures (small C translation units) and builders used by the
//! unit and integration test targets.

#![allow(dead_code)]

mod builders;
mod fixtures;

pub use builders::*;
pub use fixtures::*;
