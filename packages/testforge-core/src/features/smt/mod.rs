//! SMT Encoding & Solving Engine
//!
//! Lowers variable constraints and C path conditions into integer, real and
//! boolean terms, decides them, and extracts one concrete value per input.
//!
//! ## Architecture
//!
//! ```text
//! smt
//! ├── domain/              # Sorts, terms, problems, outcomes
//! ├── infrastructure/
//! │   ├── lowering         # Expr → Term, constraint → assertions
//! │   ├── path_encoder     # SSA encoding of path facts
//! │   ├── interval         # Per-variable domains from linear atoms
//! │   └── solvers/         # SmtBackend: bounded search, Z3 (feature "z3")
//! └── application/         # SolverService
//! ```
//!
//! ## Verdicts
//!
//! - `Sat`: a model exists; the assignment is projected onto the inputs
//! - `Unsat`: proven infeasible under the current constraints
//! - `Unknown`: timeout, node budget, unlowerable condition, or a search
//!   that could not be exhaustive
//!
//! # Examples
//!
//! ```rust
//! use testforge_core::config::SolverConfig;
//! use testforge_core::features::constraints::ConstraintSet;
//! use testforge_core::features::smt::{SolveOutcome, SolverService};
//! use testforge_core::features::type_resolution::TypedefRegistry;
//! use testforge_core::shared::models::TargetAbi;
//!
//! let registry = TypedefRegistry::with_defaults(TargetAbi::default());
//! let service = SolverService::new(&SolverConfig::default(), &registry).unwrap();
//!
//! let mut constraints = ConstraintSet::new();
//! constraints.declare_input("x", "int");
//!
//! let outcome = service.solve_conditions(&constraints, &["x > 100"]).unwrap();
//! assert!(outcome.is_sat());
//! assert!(!matches!(outcome, SolveOutcome::Unsat));
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{BranchFeasibility, PathSolution, SolverService};
pub use domain::{
    LoweringError, SmtProblem, SolveOutcome, SolvedAssignment, SolverError, Sort, Term, UnknownReason,
};
pub use infrastructure::{create_backend, BoundedSearchSolver, SmtBackend};
