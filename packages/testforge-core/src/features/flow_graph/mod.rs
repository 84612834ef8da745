//! Control-flow & branch analyzer
//!
//! Per function: control-flow graph, ordered branch list, bounded path set,
//! complexity metrics and parameter directions.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{BranchAnalyzer, FunctionAnalysis};
pub use domain::*;
pub use infrastructure::{find_paths_covering_branches, ComplexityCalculator, PathLimits};
