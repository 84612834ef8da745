//! Type resolution feature
//!
//! Maps user type names to builtin or aggregate base types through an
//! explicit, session-scoped [`TypedefRegistry`].

pub mod domain;
pub mod infrastructure;

pub use domain::{ResolvedType, TypedefError, TypedefMapping, TypedefSource};
pub use infrastructure::TypedefRegistry;
