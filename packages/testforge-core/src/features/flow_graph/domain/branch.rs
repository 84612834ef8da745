//! Branches and control-flow paths

use crate::shared::expr::Expr;
use crate::shared::models::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a branch within its function, in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchId(pub u32);

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchKind {
    IfTrue,
    IfFalse,
    LoopTrue,
    LoopFalse,
    TernaryTrue,
    TernaryFalse,
    Case,
    /// Explicit `default:` or the implicit fall-out of a switch without one
    Default,
}

impl BranchKind {
    pub fn is_multiway(self) -> bool {
        matches!(self, BranchKind::Case | BranchKind::Default)
    }
}

/// One edge out of a decision point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: BranchId,
    pub kind: BranchKind,
    /// Source guard text; false edges wrap it as `!(cond)`
    pub condition: String,
    /// Decision statement in the function body
    pub decision: NodeId,
    pub line: u32,
    /// Paired edge of a two-way decision
    #[serde(default)]
    pub pair: Option<BranchId>,
    /// Whether the decision is reachable from the function entry
    pub is_feasible: bool,
    #[serde(default)]
    pub is_covered: bool,
}

/// Textual negation: `!(cond)`, never simplified
pub fn negate(condition: &str) -> String {
    format!("!({})", condition.trim())
}

/// Something that holds along a path, in execution order
#[derive(Debug, Clone, PartialEq)]
pub enum PathFact {
    /// A branch taken at its decision's first evaluation on this path
    Guard { branch: BranchId, condition: String },
    /// Local assignment, declaration initializer or increment
    Assign { target: String, value: Expr },
    /// The target changes in a way that cannot be expressed
    Havoc { target: String },
}

/// One entry-to-exit path
#[derive(Debug, Clone, PartialEq)]
pub struct ControlFlowPath {
    pub id: usize,
    /// Body statements visited, in order
    pub statements: Vec<NodeId>,
    /// Branches taken, in order (repeats allowed inside loops)
    pub branches: Vec<BranchId>,
    pub facts: Vec<PathFact>,
    /// Expression of the `return` that ends the path
    pub return_value: Option<String>,
    pub is_feasible: bool,
    pub is_covered: bool,
}

impl ControlFlowPath {
    pub fn covers(&self, branch: BranchId) -> bool {
        self.branches.contains(&branch)
    }

    /// Guard conditions in order
    pub fn conditions(&self) -> Vec<&str> {
        self.facts
            .iter()
            .filter_map(|f| match f {
                PathFact::Guard { condition, .. } => Some(condition.as_str()),
                _ => None,
            })
            .collect()
    }
}
