//! Solver service and bounded backend behaviour

#[path = "../common/mod.rs"]
mod common;

use common::*;
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use testforge_core::config::{ConstraintConfig, SolverBackendKind, SolverConfig};
use testforge_core::features::constraints::{ConstraintExtractor, ConstraintSet, ConstraintSource, VariableConstraint};
use testforge_core::features::flow_graph::{BranchAnalyzer, BranchId};
use testforge_core::features::smt::domain::{ArithOp, ComparisonOp};
use testforge_core::features::smt::{
    create_backend, BoundedSearchSolver, BranchFeasibility, SmtBackend, SmtProblem, SolveOutcome, SolverService,
    Sort, Term, UnknownReason,
};
use testforge_core::shared::models::{ScalarValue, ValueRange};

fn count_set() -> ConstraintSet {
    let mut set = ConstraintSet::new();
    set.declare_input("count", "unsigned char");
    set.add(VariableConstraint::range("count", ValueRange::ints(0, 255), ConstraintSource::Type));
    set
}

#[test]
fn test_guard_outside_unsigned_char_is_unsat() {
    let registry = default_registry();
    let service = SolverService::new(&SolverConfig::default(), &registry).unwrap();

    assert_eq!(service.solve_conditions(&count_set(), &["count > 255"]).unwrap(), SolveOutcome::Unsat);
    let near_top = service.solve_conditions(&count_set(), &["count > 250"]).unwrap();
    let v = near_top.assignment().unwrap().get("count").and_then(|v| v.as_int()).unwrap();
    assert!((251..=255).contains(&v));
}

#[test]
fn test_path_through_local_definition() {
    let mut model = model_with("scale.c", vec![scale_function()]);
    let registry = default_registry();
    model.finalize(&registry);
    let f = model.function("scale").unwrap();
    let constraints = ConstraintExtractor::new(&model, &registry, &ConstraintConfig::default()).extract_for_function(f);
    let analysis = BranchAnalyzer::default().analyze(f);
    let service = SolverService::new(&SolverConfig::default(), &registry).unwrap();

    let top = service.solve_path(&analysis.paths[0], &constraints).unwrap();
    let model = top.outcome.assignment().unwrap();
    assert_eq!(model.len(), 1);
    let raw = model.get("raw").and_then(|v| v.as_int()).unwrap();
    assert!(raw * 4 > 1000 && raw <= 255);
    assert_eq!(top.expected_return, Some(ScalarValue::Int(2)));

    let middle = service.solve_path(&analysis.paths[1], &constraints).unwrap();
    let raw = middle.outcome.assignment().unwrap().get("raw").and_then(|v| v.as_int()).unwrap();
    assert!(raw * 4 > 500 && raw * 4 <= 1000);
    assert_eq!(middle.expected_return, Some(ScalarValue::Int(1)));
}

#[test]
fn test_contradictory_guard_makes_branch_infeasible() {
    let f = guard_function("odd", "x", "int", "x > 5 && x < 3");
    let mut model = model_with("odd.c", vec![f]);
    let registry = default_registry();
    model.finalize(&registry);
    let f = model.function("odd").unwrap();
    let constraints = ConstraintExtractor::new(&model, &registry, &ConstraintConfig::default()).extract_for_function(f);
    let analysis = BranchAnalyzer::default().analyze(f);
    let service = SolverService::new(&SolverConfig::default(), &registry).unwrap();

    assert_eq!(
        service.is_branch_feasible(&analysis, BranchId(0), &constraints, 8).unwrap(),
        BranchFeasibility::Infeasible
    );
    assert_eq!(
        service.is_branch_feasible(&analysis, BranchId(1), &constraints, 8).unwrap(),
        BranchFeasibility::Feasible
    );
}

#[test]
fn test_named_constants_are_substituted() {
    let registry = default_registry();
    let constants: HashMap<String, ScalarValue> = [("LIMIT".to_string(), ScalarValue::Int(42))].into();
    let service = SolverService::new(&SolverConfig::default(), &registry)
        .unwrap()
        .with_constants(constants);

    let mut set = ConstraintSet::new();
    set.declare_input("level", "int");
    let outcome = service.solve_conditions(&set, &["level == LIMIT + 1"]).unwrap();
    assert_eq!(outcome.assignment().unwrap().get("level"), Some(ScalarValue::Int(43)));
}

#[test]
fn test_unlowerable_call_is_unknown_not_unsat() {
    let registry = default_registry();
    let service = SolverService::new(&SolverConfig::default(), &registry).unwrap();
    let outcome = service.solve_conditions(&count_set(), &["is_valid(count)"]).unwrap();
    assert!(matches!(outcome, SolveOutcome::Unknown(UnknownReason::Lowering(_))));
}

#[test]
fn test_truncating_division_in_evaluation() {
    let registry = default_registry();
    let service = SolverService::new(&SolverConfig::default(), &registry).unwrap();
    let values: HashMap<String, ScalarValue> = [("x".to_string(), ScalarValue::Int(-7))].into();
    assert_eq!(service.evaluate_expression("x / 2", &values).unwrap(), Some(ScalarValue::Int(-3)));
    assert_eq!(service.evaluate_expression("x % 2", &values).unwrap(), Some(ScalarValue::Int(-1)));
}

#[test]
fn test_real_and_bool_inputs() {
    let registry = default_registry();
    let service = SolverService::new(&SolverConfig::default(), &registry).unwrap();
    let mut set = ConstraintSet::new();
    set.declare_input("gain", "float");
    set.declare_input("enabled", "_Bool");
    let outcome = service
        .solve_conditions(&set, &["enabled && gain > 0.25 && gain < 0.5"])
        .unwrap();
    let model = outcome.assignment().unwrap();
    assert_eq!(model.get("enabled"), Some(ScalarValue::Bool(true)));
    let gain = model.get("gain").unwrap().as_f64();
    assert!(gain > 0.25 && gain < 0.5);
}

#[test]
fn test_find_values_for_expected_output() {
    let registry = default_registry();
    let service = SolverService::new(&SolverConfig::default(), &registry).unwrap();
    let outcome = service
        .find_values_for_outputs(&count_set(), &[("count * 3 + 1", ScalarValue::Int(100))], &[])
        .unwrap();
    assert_eq!(outcome.assignment().unwrap().get("count"), Some(ScalarValue::Int(33)));

    let none = service
        .find_values_for_outputs(&count_set(), &[("count * 2", ScalarValue::Int(7))], &[])
        .unwrap();
    assert!(!none.is_sat());
}

#[test]
fn test_backend_solves_raw_problem() {
    let backend: Box<dyn SmtBackend> = create_backend(&SolverConfig::default()).unwrap();
    assert_eq!(backend.name(), "bounded");

    let mut problem = SmtProblem::new();
    problem.declare("a", Sort::Int);
    problem.declare("b", Sort::Int);
    problem.add_input("a");
    problem.add_input("b");
    for v in ["a", "b"] {
        problem.assert(Term::cmp(ComparisonOp::Ge, Term::var(v), Term::int(0)));
        problem.assert(Term::cmp(ComparisonOp::Le, Term::var(v), Term::int(20)));
    }
    problem.assert(Term::cmp(
        ComparisonOp::Eq,
        Term::arith(ArithOp::Add, Term::var("a"), Term::var("b")),
        Term::int(30),
    ));
    problem.assert(Term::cmp(ComparisonOp::Gt, Term::var("a"), Term::var("b")));

    let outcome = backend.solve(&problem).unwrap();
    let m = outcome.assignment().unwrap();
    let (a, b) = (m.get("a").unwrap().as_int().unwrap(), m.get("b").unwrap().as_int().unwrap());
    assert_eq!(a + b, 30);
    assert!(a > b);
}

#[test]
fn test_node_budget_reports_unknown() {
    let mut problem = SmtProblem::new();
    let mut sum: Option<Term> = None;
    for i in 0..6 {
        let name = format!("v{i}");
        problem.declare(name.as_str(), Sort::Int);
        problem.assert(Term::cmp(ComparisonOp::Ge, Term::var(name.as_str()), Term::int(0)));
        problem.assert(Term::cmp(ComparisonOp::Le, Term::var(name.as_str()), Term::int(1000)));
        sum = Some(match sum {
            Some(acc) => Term::arith(ArithOp::Add, acc, Term::var(name.as_str())),
            None => Term::var(name.as_str()),
        });
    }
    problem.assert(Term::cmp(ComparisonOp::Lt, sum.unwrap(), Term::int(0)));

    let outcome = BoundedSearchSolver::new(10_000, 500).solve(&problem).unwrap();
    assert_eq!(outcome, SolveOutcome::Unknown(UnknownReason::NodeBudget));
}

#[cfg(not(feature = "z3"))]
#[test]
fn test_z3_backend_requires_feature() {
    let registry = default_registry();
    let config = SolverConfig::default().backend(SolverBackendKind::Z3);
    assert!(SolverService::new(&config, &registry).is_err());
}

#[cfg(feature = "z3")]
#[test]
fn test_z3_backend_agrees_on_unsat() {
    let registry = default_registry();
    let config = SolverConfig::default().backend(SolverBackendKind::Z3);
    let service = SolverService::new(&config, &registry).unwrap();
    assert_eq!(service.backend_name(), "z3");
    assert_eq!(service.solve_conditions(&count_set(), &["count > 255"]).unwrap(), SolveOutcome::Unsat);
}
