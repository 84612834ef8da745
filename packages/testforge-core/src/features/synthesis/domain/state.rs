//! Synthesis run states

use crate::features::flow_graph::BranchId;
use crate::features::smt::SolvedAssignment;
use crate::shared::models::ScalarValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    TargetReached,
    /// Every feasible branch was covered or given up on
    BranchesExhausted,
    AttemptBudgetExhausted,
    Cancelled,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::TargetReached => "target_reached",
            StopReason::BranchesExhausted => "branches_exhausted",
            StopReason::AttemptBudgetExhausted => "attempt_budget_exhausted",
            StopReason::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `Initialized → SelectingBranch → Solving → Recording → {SelectingBranch | Done}`
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisState {
    Initialized,
    SelectingBranch,
    Solving {
        branch: BranchId,
    },
    Recording {
        branch: BranchId,
        path: usize,
        assignment: SolvedAssignment,
        expected_return: Option<ScalarValue>,
    },
    Done(StopReason),
}

impl SynthesisState {
    pub fn state_name(&self) -> &'static str {
        match self {
            SynthesisState::Initialized => "initialized",
            SynthesisState::SelectingBranch => "selecting_branch",
            SynthesisState::Solving { .. } => "solving",
            SynthesisState::Recording { .. } => "recording",
            SynthesisState::Done(_) => "done",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SynthesisState::Done(_))
    }
}
