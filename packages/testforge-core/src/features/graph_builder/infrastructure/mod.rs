mod call_graph_builder;
mod dependency_builder;

pub use call_graph_builder::CallGraphBuilder;
pub use dependency_builder::{build_include_graph, build_type_graph, containment_issues};
