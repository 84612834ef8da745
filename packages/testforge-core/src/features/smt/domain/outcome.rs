//! Solve results and errors
//!
//! Infeasibility and inconclusive searches are ordinary results; only a
//! backend that breaks down produces a [`SolverError`].

use crate::shared::expr::ExprError;
use crate::shared::models::ScalarValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Concrete value per variable; immutable once returned
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SolvedAssignment {
    values: BTreeMap<String, ScalarValue>,
}

impl SolvedAssignment {
    pub fn new(values: BTreeMap<String, ScalarValue>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<ScalarValue> {
        self.values.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ScalarValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &BTreeMap<String, ScalarValue> {
        &self.values
    }

    /// `variable → literal` as C source text
    pub fn literals(&self) -> BTreeMap<String, String> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }

    /// Keep only `names`, in their order of appearance in the map
    pub fn project<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> SolvedAssignment {
        let values = names
            .into_iter()
            .filter_map(|n| self.values.get(n).map(|v| (n.to_string(), *v)))
            .collect();
        SolvedAssignment { values }
    }
}

impl fmt::Display for SolvedAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k} = {v}")?;
        }
        Ok(())
    }
}

/// Why a solve produced no verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum UnknownReason {
    /// Wall-clock limit reached
    Timeout,
    /// Search node budget exhausted
    NodeBudget,
    /// Search space exhausted without a proof of unsatisfiability
    Incomplete,
    /// Condition text could not be lowered
    Lowering(String),
    /// Construct the backend cannot express
    Unsupported(String),
    /// Backend gave up (reason as reported)
    Backend(String),
}

impl fmt::Display for UnknownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnknownReason::Timeout => write!(f, "timeout"),
            UnknownReason::NodeBudget => write!(f, "node budget exhausted"),
            UnknownReason::Incomplete => write!(f, "search incomplete"),
            UnknownReason::Lowering(msg) => write!(f, "lowering failed: {msg}"),
            UnknownReason::Unsupported(msg) => write!(f, "unsupported: {msg}"),
            UnknownReason::Backend(msg) => write!(f, "backend: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    Sat(SolvedAssignment),
    /// Infeasible under the given constraints
    Unsat,
    Unknown(UnknownReason),
}

impl SolveOutcome {
    pub fn is_sat(&self) -> bool {
        matches!(self, SolveOutcome::Sat(_))
    }

    pub fn is_unsat(&self) -> bool {
        matches!(self, SolveOutcome::Unsat)
    }

    pub fn assignment(&self) -> Option<&SolvedAssignment> {
        match self {
            SolveOutcome::Sat(a) => Some(a),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SolveOutcome::Sat(_) => "sat",
            SolveOutcome::Unsat => "unsat",
            SolveOutcome::Unknown(_) => "unknown",
        }
    }
}

/// Expression text that cannot become a solver term.
///
/// The whole condition is rejected; no conjunct is ever dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoweringError {
    #[error("cannot parse '{text}': {source}")]
    Parse { text: String, source: ExprError },

    #[error("unsupported construct: {0}")]
    Unsupported(String),

    #[error("{op} needs integer operands")]
    IntegerOnly { op: &'static str },
}

/// Internal solver failure, distinct from an infeasible result
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverError {
    #[error("{backend} backend failed: {message}")]
    Backend { backend: &'static str, message: String },

    #[error("solver backend '{0}' is not available in this build")]
    Unavailable(String),

    #[error("model is missing a value for '{0}'")]
    IncompleteModel(String),
}
