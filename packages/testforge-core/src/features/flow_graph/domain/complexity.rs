//! Function complexity metrics

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionComplexity {
    pub function: String,
    /// `1 + decisions`, never below 1
    pub cyclomatic_complexity: u32,
    /// `if`, loops, `case` labels and ternaries
    pub decision_count: u32,
    pub statement_count: u32,
    pub max_nesting_depth: u32,
    /// Source lines spanned by the body
    pub line_count: u32,
    pub parameter_count: u32,
    /// 0 (hard to maintain) to 100
    pub maintainability_index: f64,
}

impl FunctionComplexity {
    /// Classic maintainability index normalised to 0..=100, with the
    /// statement count standing in for Halstead volume.
    pub fn maintainability(cyclomatic: u32, statements: u32, lines: u32) -> f64 {
        let volume = f64::from(statements.max(1));
        let loc = f64::from(lines.max(1));
        let raw = 171.0 - 5.2 * volume.ln() - 0.23 * f64::from(cyclomatic) - 16.2 * loc.ln();
        (raw * 100.0 / 171.0).clamp(0.0, 100.0)
    }
}
