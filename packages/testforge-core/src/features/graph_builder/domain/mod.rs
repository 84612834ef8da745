//! Graph types

mod call_graph;
mod include_graph;
mod type_graph;

pub use call_graph::{CallCycle, CallEdge, CallGraph, CallGraphSummary, CallPath, UnresolvedCall};
pub use include_graph::IncludeGraph;
pub use type_graph::{TypeDependency, TypeDependencyGraph, TypeEdgeKind};
