//! Entity model feature
//!
//! Typed records for every declaration of a translation unit plus the
//! invariant-preserving store that owns them. Adding is idempotent by
//! identity `(name, file, line)`; derived fields (layouts, enum values,
//! macro dependencies, usage sets) are filled in by
//! [`EntityModel::finalize`].

pub mod domain;
pub mod infrastructure;

pub use domain::*;
pub use infrastructure::{
    AddOutcome, ConditionalEvaluator, EntityModel, EntityRef, LayoutCalculator, LayoutError,
    ModelValidator, TypeExtent,
};
