//! Registry implementation, defaults and header scanning

pub mod defaults;
pub mod header_scanner;
mod registry;

pub use header_scanner::{scan_header, ScannedTypedef};
pub use registry::TypedefRegistry;
