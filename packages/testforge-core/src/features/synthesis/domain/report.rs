//! Synthesis results handed to test-case consumers

use crate::features::flow_graph::BranchId;
use crate::features::synthesis::domain::StopReason;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Abstract test data for one covered branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedTestCase {
    pub function: String,
    pub branch_id: BranchId,
    pub path_id: usize,
    /// Input name → C literal
    pub inputs: BTreeMap<String, String>,
    /// Branches covered once this case is recorded
    pub covered_branch_count: usize,
    pub total_branch_count: usize,
    /// Every branch the solved path takes
    pub branches_taken: Vec<BranchId>,
    /// Value of the path's `return` expression, when evaluable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_return: Option<String>,
}

/// Result of one `(function, target coverage)` request.
///
/// Always produced, whether or not the target was met.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisReport {
    pub function: String,
    pub target_coverage: f64,
    pub achieved_coverage: f64,
    pub covered_branches: usize,
    /// Branches whose decision is reachable
    pub total_branches: usize,
    pub test_cases: Vec<SynthesizedTestCase>,
    /// Every candidate path was unsatisfiable
    pub infeasible_branches: Vec<BranchId>,
    /// No verdict: timeout, budget, or unlowerable condition
    pub unknown_branches: Vec<BranchId>,
    /// Decisions unreachable from the entry; not counted in the total
    pub unreachable_branches: Vec<BranchId>,
    /// Branches in the order they were selected
    pub selection_order: Vec<BranchId>,
    pub solver_attempts: usize,
    pub stop_reason: StopReason,
}

impl SynthesisReport {
    pub fn empty(function: impl Into<String>, target_coverage: f64) -> Self {
        Self {
            function: function.into(),
            target_coverage,
            achieved_coverage: 0.0,
            covered_branches: 0,
            total_branches: 0,
            test_cases: Vec::new(),
            infeasible_branches: Vec::new(),
            unknown_branches: Vec::new(),
            unreachable_branches: Vec::new(),
            selection_order: Vec::new(),
            solver_attempts: 0,
            stop_reason: StopReason::BranchesExhausted,
        }
    }

    pub fn target_reached(&self) -> bool {
        self.achieved_coverage >= self.target_coverage
    }

    pub fn branches_attempted(&self) -> usize {
        self.selection_order.len()
    }
}

/// Inputs that make one expression true in a function's context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionSynthesis {
    pub function: String,
    pub expression: String,
    /// `sat`, `unsat` or `unknown`
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
