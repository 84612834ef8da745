//! Feature modules, leaves first
//!
//! Each feature contains:
//! - domain/         - Data and invariants
//! - infrastructure/ - Algorithms and backends
//! - application/    - Entry points combining the two

pub mod entity_model;
pub mod type_resolution;

// Semantic graph: call graph, type containment, includes
pub mod graph_builder;

// Per-function analysis
pub mod constraints;
pub mod flow_graph;

// Solving and synthesis
pub mod smt;
pub mod synthesis;
