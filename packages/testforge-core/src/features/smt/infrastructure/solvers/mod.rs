//! SMT Solver Implementations
//!
//! 1. **BoundedSearch**: pure-Rust candidate search (always available)
//! 2. **Z3Backend**: full SMT solver (optional, feature-gated)
//!
//! Each `solve` call owns all of its solver state, so one backend value can
//! be shared across threads and requests without anything leaking between
//! them.

use crate::config::{SolverBackendKind, SolverConfig};
use crate::features::smt::domain::{SmtProblem, SolveOutcome, SolverError};

pub mod bounded;

#[cfg(feature = "z3")]
pub mod z3_backend;

pub use bounded::BoundedSearchSolver;

/// Solver capability trait
pub trait SmtBackend: Send + Sync {
    /// Name of this backend
    fn name(&self) -> &'static str;

    /// Decide `problem`. The `Sat` assignment covers every declared symbol.
    fn solve(&self, problem: &SmtProblem) -> Result<SolveOutcome, SolverError>;
}

/// Backend selected by `config`
pub fn create_backend(config: &SolverConfig) -> Result<Box<dyn SmtBackend>, SolverError> {
    match config.backend {
        SolverBackendKind::Bounded => Ok(Box::new(BoundedSearchSolver::new(
            config.timeout_ms,
            config.node_budget,
        ))),
        #[cfg(feature = "z3")]
        SolverBackendKind::Z3 => Ok(Box::new(z3_backend::Z3Backend::new(config.timeout_ms))),
        #[cfg(not(feature = "z3"))]
        SolverBackendKind::Z3 => Err(SolverError::Unavailable("z3".to_string())),
    }
}
