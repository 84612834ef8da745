//! Shared macros for the codebase
//!
//! Features log through these re-exports so the logging facade can be swapped
//! in one place.

pub use tracing::{debug, error, info, trace, warn};
