//! Control-flow lowering, path enumeration and metrics

pub mod cfg_builder;
mod metrics;
pub mod path_enumerator;

pub use cfg_builder::{CfgBuilder, LoweredBody};
pub use metrics::ComplexityCalculator;
pub use path_enumerator::{find_paths_covering_branches, PathEnumerator, PathLimits};
