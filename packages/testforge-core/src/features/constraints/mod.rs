//! Variable constraint extractor
//!
//! Derives one aggregated [`VariableConstraint`] per variable from declared
//! types, enums, annotations and usage.

pub mod domain;
pub mod infrastructure;

pub use domain::{ConstraintKind, ConstraintSet, ConstraintSource, VariableConstraint};
pub use infrastructure::ConstraintExtractor;
