//! Entity store, layout computation, directive evaluation and validation

mod directive_eval;
mod layout;
mod model;
mod validator;

pub use directive_eval::ConditionalEvaluator;
pub use layout::{LayoutCalculator, LayoutError, TypeExtent};
pub use model::{AddOutcome, EntityModel, EntityRef};
pub use validator::ModelValidator;
