mod constraint;

pub use constraint::{ConstraintKind, ConstraintSet, ConstraintSource, VariableConstraint};
