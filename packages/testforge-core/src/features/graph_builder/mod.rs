//! Dependency & call graph builder
//!
//! Consumes a finalized [`EntityModel`](crate::features::entity_model::EntityModel)
//! and produces the call graph, the type dependency graph and the include
//! graph.

pub mod domain;
pub mod infrastructure;

pub use domain::*;
pub use infrastructure::{build_include_graph, build_type_graph, containment_issues, CallGraphBuilder};
