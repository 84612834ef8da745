//! Coverage-guided synthesis loop
//!
//! Branches are selected first-uncovered-first in declaration order. Each
//! selected branch is solved along up to `max_paths_per_branch` enumerated
//! paths through it; the first satisfiable path is recorded and every
//! branch that path takes counts as covered.

use crate::config::SynthesisConfig;
use crate::features::constraints::ConstraintSet;
use crate::features::flow_graph::{BranchId, FunctionAnalysis};
use crate::features::smt::{SolveOutcome, SolverError, SolverService};
use crate::features::synthesis::domain::{
    ExpressionSynthesis, StopReason, SynthesisReport, SynthesisState, SynthesizedTestCase,
};
use crate::shared::macros::{debug, info, trace};
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct CoverageSynthesizer<'s, 'a> {
    solver: &'s SolverService<'a>,
    config: SynthesisConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'s, 'a> CoverageSynthesizer<'s, 'a> {
    pub fn new(solver: &'s SolverService<'a>, config: &SynthesisConfig) -> Self {
        Self {
            solver,
            config: config.clone(),
            cancel: None,
        }
    }

    /// Stop at the next branch selection once `flag` is set
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Solver attempts allowed for a function with `branches` feasible branches
    pub fn attempt_budget(&self, branches: usize) -> usize {
        branches.max(1) * self.config.attempts_per_branch
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|f| f.load(Ordering::Relaxed))
    }

    /// Run until `target` coverage, branch exhaustion, budget exhaustion or
    /// cancellation. Only an internal solver failure is an error.
    pub fn synthesize(
        &self,
        analysis: &FunctionAnalysis,
        constraints: &ConstraintSet,
        target: f64,
    ) -> Result<SynthesisReport, SolverError> {
        let function = analysis.function.as_str();
        let feasible: Vec<BranchId> = analysis.feasible_branches().map(|b| b.id).collect();
        let total = feasible.len();
        let budget = self.attempt_budget(total);

        let mut report = SynthesisReport::empty(function, target);
        report.total_branches = total;
        report.unreachable_branches = analysis
            .branches
            .iter()
            .filter(|b| !b.is_feasible)
            .map(|b| b.id)
            .collect();

        let mut covered: BTreeSet<BranchId> = BTreeSet::new();
        let mut given_up: HashSet<BranchId> = HashSet::new();
        let mut state = SynthesisState::Initialized;

        let stop = loop {
            trace!(function, state = state.state_name(), "synthesis step");
            state = match state {
                SynthesisState::Initialized => SynthesisState::SelectingBranch,

                SynthesisState::SelectingBranch => {
                    if self.cancelled() {
                        SynthesisState::Done(StopReason::Cancelled)
                    } else if coverage(covered.len(), total) >= target {
                        SynthesisState::Done(StopReason::TargetReached)
                    } else if report.solver_attempts >= budget {
                        SynthesisState::Done(StopReason::AttemptBudgetExhausted)
                    } else {
                        match feasible
                            .iter()
                            .find(|b| !covered.contains(*b) && !given_up.contains(*b))
                        {
                            Some(&branch) => {
                                report.selection_order.push(branch);
                                SynthesisState::Solving { branch }
                            }
                            None => SynthesisState::Done(StopReason::BranchesExhausted),
                        }
                    }
                }

                SynthesisState::Solving { branch } => {
                    let mut tried = 0usize;
                    let mut undecided = false;
                    let mut next = None;
                    for path in analysis.paths_through(branch).take(self.config.max_paths_per_branch) {
                        if report.solver_attempts >= budget {
                            undecided = true;
                            break;
                        }
                        report.solver_attempts += 1;
                        tried += 1;
                        let solution = self.solver.solve_path(path, constraints)?;
                        debug!(
                            function,
                            branch = %branch,
                            path = path.id,
                            outcome = solution.outcome.label(),
                            "path solved"
                        );
                        match solution.outcome {
                            SolveOutcome::Sat(assignment) => {
                                next = Some(SynthesisState::Recording {
                                    branch,
                                    path: path.id,
                                    assignment,
                                    expected_return: solution.expected_return,
                                });
                                break;
                            }
                            SolveOutcome::Unsat => {}
                            SolveOutcome::Unknown(reason) => {
                                debug!(function, branch = %branch, %reason, "no verdict");
                                undecided = true;
                            }
                        }
                    }
                    match next {
                        Some(recording) => recording,
                        None => {
                            given_up.insert(branch);
                            if undecided || tried == 0 {
                                report.unknown_branches.push(branch);
                            } else {
                                report.infeasible_branches.push(branch);
                            }
                            SynthesisState::SelectingBranch
                        }
                    }
                }

                SynthesisState::Recording {
                    branch,
                    path,
                    assignment,
                    expected_return,
                } => {
                    let mut taken: Vec<BranchId> = Vec::new();
                    if let Some(p) = analysis.paths.iter().find(|p| p.id == path) {
                        for b in &p.branches {
                            if !taken.contains(b) {
                                taken.push(*b);
                            }
                        }
                    }
                    covered.insert(branch);
                    covered.extend(taken.iter().filter(|b| feasible.contains(b)));

                    report.test_cases.push(SynthesizedTestCase {
                        function: function.to_string(),
                        branch_id: branch,
                        path_id: path,
                        inputs: assignment.literals(),
                        covered_branch_count: covered.len(),
                        total_branch_count: total,
                        branches_taken: taken,
                        expected_return: expected_return
                            .filter(|_| self.config.compute_expected_returns)
                            .map(|v| v.to_string()),
                    });
                    SynthesisState::SelectingBranch
                }

                SynthesisState::Done(reason) => break reason,
            };
        };

        report.covered_branches = covered.len();
        report.achieved_coverage = coverage(covered.len(), total);
        report.stop_reason = stop;

        info!(
            function,
            covered = report.covered_branches,
            total,
            infeasible = report.infeasible_branches.len(),
            unknown = report.unknown_branches.len(),
            attempts = report.solver_attempts,
            stop = %stop,
            "synthesis finished"
        );
        Ok(report)
    }

    /// Inputs under which `expression` holds, with the function's constraints
    pub fn synthesize_for_expression(
        &self,
        function: &str,
        expression: &str,
        constraints: &ConstraintSet,
    ) -> Result<ExpressionSynthesis, SolverError> {
        let outcome = self.solver.solve_conditions(constraints, &[expression])?;
        debug!(function, expression, outcome = outcome.label(), "expression solved");
        Ok(ExpressionSynthesis {
            function: function.to_string(),
            expression: expression.to_string(),
            status: outcome.label().to_string(),
            inputs: outcome.assignment().map(|a| a.literals()),
            reason: match &outcome {
                SolveOutcome::Unknown(r) => Some(r.to_string()),
                _ => None,
            },
        })
    }
}

/// Covered fraction; a function without branches is fully covered
pub fn coverage(covered: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        covered as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SolverConfig;
    use crate::features::constraints::{ConstraintSource, VariableConstraint};
    use crate::features::entity_model::Function;
    use crate::features::flow_graph::BranchAnalyzer;
    use crate::features::type_resolution::TypedefRegistry;
    use crate::shared::models::{BodyBuilder, SourceLocation, TargetAbi, ValueRange};
    use pretty_assertions::assert_eq;

    fn clamp() -> Function {
        let mut b = BodyBuilder::new();
        let r0 = b.ret(Some("0"), 2);
        let if1 = b.if_stmt("x < 0", r0, None, 2);
        let r100 = b.ret(Some("100"), 3);
        let if2 = b.if_stmt("x > 100", r100, None, 3);
        let rx = b.ret(Some("x"), 4);
        let root = b.compound(vec![if1, if2, rx], 1);
        Function::new("clamp", "int", SourceLocation::new("clamp.c", 1))
            .with_param("x", "int")
            .with_body(b.finish(root))
    }

    fn single_guard(name: &str, param: &str, type_name: &str, guard: &str) -> Function {
        let mut b = BodyBuilder::new();
        let r1 = b.ret(Some("1"), 2);
        let if1 = b.if_stmt(guard, r1, None, 2);
        let r0 = b.ret(Some("0"), 3);
        let root = b.compound(vec![if1, r0], 1);
        Function::new(name, "int", SourceLocation::new("f.c", 1))
            .with_param(param, type_name)
            .with_body(b.finish(root))
    }

    fn int_input(name: &str, lo: i128, hi: i128, type_name: &str) -> ConstraintSet {
        let mut set = ConstraintSet::new();
        set.declare_input(name, type_name);
        set.add(VariableConstraint::range(name, ValueRange::ints(lo, hi), ConstraintSource::Type));
        set
    }

    fn run(function: &Function, constraints: &ConstraintSet, target: f64) -> SynthesisReport {
        let registry = TypedefRegistry::with_defaults(TargetAbi::default());
        let solver = SolverService::new(&SolverConfig::default(), &registry).unwrap();
        let analysis = BranchAnalyzer::default().analyze(function);
        CoverageSynthesizer::new(&solver, &SynthesisConfig::default())
            .synthesize(&analysis, constraints, target)
            .unwrap()
    }

    #[test]
    fn test_clamp_full_coverage() {
        let report = run(&clamp(), &int_input("x", -2147483648, 2147483647, "int"), 1.0);

        assert_eq!(report.stop_reason, StopReason::TargetReached);
        assert_eq!(report.test_cases.len(), 3);
        assert_eq!(report.covered_branches, 4);
        assert_eq!(report.selection_order, vec![BranchId(0), BranchId(1), BranchId(3)]);

        let xs: Vec<&str> = report.test_cases.iter().map(|c| c.inputs["x"].as_str()).collect();
        assert_eq!(xs, vec!["-1", "101", "0"]);
        let returns: Vec<Option<&str>> = report
            .test_cases
            .iter()
            .map(|c| c.expected_return.as_deref())
            .collect();
        assert_eq!(returns, vec![Some("0"), Some("100"), Some("0")]);
    }

    #[test]
    fn test_partial_target_stops_early() {
        let constraints = int_input("x", -2147483648, 2147483647, "int");
        let half = run(&clamp(), &constraints, 0.5);
        let full = run(&clamp(), &constraints, 1.0);

        assert_eq!(half.test_cases.len(), 2);
        assert!(half.target_reached());
        assert!(half.branches_attempted() <= full.branches_attempted());
    }

    #[test]
    fn test_infeasible_branch_is_recorded() {
        let f = single_guard("over", "count", "unsigned char", "count > 255");
        let report = run(&f, &int_input("count", 0, 255, "unsigned char"), 1.0);

        assert_eq!(report.infeasible_branches, vec![BranchId(0)]);
        assert_eq!(report.test_cases.len(), 1);
        assert_eq!(report.achieved_coverage, 0.5);
        assert_eq!(report.stop_reason, StopReason::BranchesExhausted);
    }

    #[test]
    fn test_unlowerable_guard_is_unknown() {
        let f = single_guard("check", "x", "int", "is_valid(x)");
        let report = run(&f, &int_input("x", 0, 10, "int"), 1.0);

        assert_eq!(report.unknown_branches, vec![BranchId(0), BranchId(1)]);
        assert!(report.test_cases.is_empty());
        assert!(!report.target_reached());
    }

    #[test]
    fn test_cancellation_is_checked_before_selection() {
        let registry = TypedefRegistry::with_defaults(TargetAbi::default());
        let solver = SolverService::new(&SolverConfig::default(), &registry).unwrap();
        let analysis = BranchAnalyzer::default().analyze(&clamp());
        let flag = Arc::new(AtomicBool::new(true));
        let report = CoverageSynthesizer::new(&solver, &SynthesisConfig::default())
            .with_cancellation(flag)
            .synthesize(&analysis, &int_input("x", -100, 100, "int"), 1.0)
            .unwrap();
        assert_eq!(report.stop_reason, StopReason::Cancelled);
        assert_eq!(report.solver_attempts, 0);
    }

    #[test]
    fn test_expression_synthesis() {
        let registry = TypedefRegistry::with_defaults(TargetAbi::default());
        let solver = SolverService::new(&SolverConfig::default(), &registry).unwrap();
        let synth = CoverageSynthesizer::new(&solver, &SynthesisConfig::default());
        let constraints = int_input("count", 0, 255, "unsigned char");

        let hit = synth
            .synthesize_for_expression("f", "count * 2 == 10", &constraints)
            .unwrap();
        assert_eq!(hit.status, "sat");
        assert_eq!(hit.inputs.unwrap()["count"], "5");

        let miss = synth.synthesize_for_expression("f", "count > 255", &constraints).unwrap();
        assert_eq!(miss.status, "unsat");
        assert!(miss.inputs.is_none());
    }
}
