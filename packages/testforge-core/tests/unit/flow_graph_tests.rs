//! Branch extraction, path enumeration and complexity

#[path = "../common/mod.rs"]
mod common;

use common::*;
use pretty_assertions::assert_eq;
use testforge_core::config::AnalysisConfig;
use testforge_core::features::flow_graph::{
    find_paths_covering_branches, BranchAnalyzer, BranchId, BranchKind, ParameterDirection,
};

#[test]
fn test_clamp_branches_and_negation() {
    let analysis = BranchAnalyzer::default().analyze(&clamp_function());

    let conditions: Vec<&str> = analysis.branches.iter().map(|b| b.condition.as_str()).collect();
    assert_eq!(conditions, vec!["x < 0", "!(x < 0)", "x > 100", "!(x > 100)"]);
    assert_eq!(analysis.branches[1].kind, BranchKind::IfFalse);
    assert_eq!(analysis.branches[1].pair, Some(BranchId(0)));
    assert!(analysis.branches.iter().all(|b| b.is_feasible));
}

#[test]
fn test_clamp_paths_in_order() {
    let analysis = BranchAnalyzer::default().analyze(&clamp_function());

    let branches: Vec<Vec<BranchId>> = analysis.paths.iter().map(|p| p.branches.clone()).collect();
    assert_eq!(
        branches,
        vec![
            vec![BranchId(0)],
            vec![BranchId(1), BranchId(2)],
            vec![BranchId(1), BranchId(3)],
        ]
    );
    let returns: Vec<Option<&str>> = analysis.paths.iter().map(|p| p.return_value.as_deref()).collect();
    assert_eq!(returns, vec![Some("0"), Some("100"), Some("x")]);
}

#[test]
fn test_cyclomatic_complexity_counts_decisions() {
    let analysis = BranchAnalyzer::default().analyze(&clamp_function());
    assert_eq!(analysis.complexity.cyclomatic_complexity, 3);
    assert_eq!(analysis.complexity.decision_count, 2);
    assert_eq!(analysis.complexity.parameter_count, 1);

    let ternary = FunctionBuilder::new("sign").param("v", "int").body(|b| {
        let r = b.ret(Some("v < 0 ? -1 : 1"), 2);
        let r = b.with_ternary(r, "v < 0");
        b.compound(vec![r], 1)
    });
    let analysis = BranchAnalyzer::default().analyze(&ternary);
    assert_eq!(analysis.complexity.cyclomatic_complexity, 2);
    assert_eq!(analysis.branches[0].kind, BranchKind::TernaryTrue);
    assert_eq!(analysis.branches[1].condition, "!(v < 0)");
}

#[test]
fn test_switch_yields_case_and_default_branches() {
    let f = FunctionBuilder::new("dispatch").param("mode", "unsigned char").body(|b| {
        let r1 = b.ret(Some("1"), 3);
        let c1 = b.case("1", vec![r1], 3);
        let r2 = b.ret(Some("2"), 4);
        let c2 = b.case("2", vec![r2], 4);
        let r0 = b.ret(Some("0"), 5);
        let d = b.default_label(vec![r0], 5);
        let sw = b.switch("mode", vec![c1, c2, d], 2);
        b.compound(vec![sw], 1)
    });
    let analysis = BranchAnalyzer::default().analyze(&f);

    assert_eq!(analysis.branches.len(), 3);
    assert!(analysis.branches.iter().all(|b| b.kind.is_multiway()));
    assert_eq!(analysis.branches[0].condition, "mode == 1");
    assert_eq!(analysis.paths.len(), 3);
    assert_eq!(analysis.complexity.cyclomatic_complexity, 3);
}

#[test]
fn test_loop_unrolling_is_bounded() {
    let f = FunctionBuilder::new("sum").param("n", "int").body(|b| {
        let acc = b.decl("int", "s", Some("0"), 2);
        let add = b.expr("s += i", 4);
        let body = b.compound(vec![add], 3);
        let l = b.for_stmt(Some("int i = 0"), Some("i < n"), Some("i++"), body, 3);
        let r = b.ret(Some("s"), 5);
        b.compound(vec![acc, l, r], 1)
    });
    let config = AnalysisConfig::default().loop_unroll_bound(2);
    let analysis = BranchAnalyzer::new(&config).analyze(&f);

    assert_eq!(analysis.branches[0].kind, BranchKind::LoopTrue);
    assert_eq!(analysis.branches[1].kind, BranchKind::LoopFalse);
    assert_eq!(analysis.paths.len(), 3);
    assert!(analysis.paths.iter().all(|p| p.conditions().len() == 1));
}

#[test]
fn test_paths_covering_any_of_branches() {
    let analysis = BranchAnalyzer::default().analyze(&clamp_function());

    let through_b1 = analysis.paths_covering(&[BranchId(1)]);
    assert_eq!(through_b1.len(), 2);

    let either = find_paths_covering_branches(&analysis.paths, &[BranchId(0), BranchId(3)]);
    let ids: Vec<usize> = either.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![0, 2]);

    assert!(analysis.paths_covering(&[BranchId(42)]).is_empty());
}

#[test]
fn test_code_after_return_is_infeasible() {
    let f = FunctionBuilder::new("early").param("y", "int").body(|b| {
        let r = b.ret(Some("1"), 2);
        let dead = b.ret(Some("2"), 3);
        let guard = b.if_stmt("y", dead, None, 3);
        b.compound(vec![r, guard], 1)
    });
    let analysis = BranchAnalyzer::default().analyze(&f);

    assert_eq!(analysis.branches.len(), 2);
    assert_eq!(analysis.feasible_branches().count(), 0);
    assert_eq!(analysis.complexity.cyclomatic_complexity, 2);
}

#[test]
fn test_pointer_parameters_are_classified() {
    let f = FunctionBuilder::new("read_sensor")
        .param("id", "int")
        .param("config", "const struct cfg *")
        .param("out", "int *")
        .param("buffer", "void *")
        .declaration();
    let params = BranchAnalyzer::default().classify_parameters(&f);
    let directions: Vec<ParameterDirection> = params.iter().map(|p| p.direction).collect();
    assert_eq!(
        directions,
        vec![
            ParameterDirection::Input,
            ParameterDirection::Input,
            ParameterDirection::InOut,
            ParameterDirection::Output,
        ]
    );
}
