//! SMT domain models

mod outcome;
mod problem;
mod sort;
mod term;

pub use outcome::{LoweringError, SolveOutcome, SolvedAssignment, SolverError, UnknownReason};
pub use problem::{Definition, SmtProblem};
pub use sort::Sort;
pub use term::{ArithOp, ComparisonOp, Term};
