//! Control-flow domain types

mod branch;
mod cfg;
mod complexity;
mod parameter;

pub use branch::{negate, Branch, BranchId, BranchKind, ControlFlowPath, PathFact};
pub use cfg::{CfgEdge, CfgNode, CfgNodeKind, ControlFlowGraph};
pub use complexity::FunctionComplexity;
pub use parameter::{
    ClassifiedParameter, ParameterDirection, ParameterDirectionClassifier, PointerConstHeuristic,
};
