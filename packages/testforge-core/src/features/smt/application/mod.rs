mod solver_service;

pub use solver_service::{BranchFeasibility, PathSolution, SolverService};
