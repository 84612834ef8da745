//! End-to-end synthesis scenarios over small translation units

#[path = "../common/mod.rs"]
mod common;

use common::*;
use pretty_assertions::assert_eq;
use testforge_core::adapters::TranslationUnit;
use testforge_core::features::flow_graph::BranchId;
use testforge_core::features::synthesis::StopReason;
use testforge_core::shared::models::DataModel;
use testforge_core::usecases::SynthesisRequest;
use testforge_core::{AnalysisSession, EngineConfig, EngineError};

fn session(unit: TranslationUnit) -> AnalysisSession {
    AnalysisSession::open(unit, EngineConfig::default()).expect("session opens")
}

#[test]
fn scenario_clamp_full_coverage() {
    let session = session(clamp_unit());
    let report = session.synthesize_for_coverage("clamp", Some(1.0)).unwrap();

    assert_eq!(report.test_cases.len(), 3);
    assert_eq!(report.achieved_coverage, 1.0);
    assert_eq!(report.stop_reason, StopReason::TargetReached);

    let xs: Vec<i64> = report
        .test_cases
        .iter()
        .map(|c| c.inputs["x"].parse().unwrap())
        .collect();
    assert!(xs[0] < 0);
    assert!(xs[1] > 100);
    assert!((0..=100).contains(&xs[2]));

    for case in &report.test_cases {
        assert_eq!(case.function, "clamp");
        assert_eq!(case.total_branch_count, 4);
        assert!(case.expected_return.is_some());
    }
}

#[test]
fn scenario_unsigned_char_guard_is_infeasible() {
    let unit = unit_with(
        "count.c",
        vec![guard_function("over", "count", "unsigned char", "count > 255")],
    );
    let session = session(unit);

    let constraints = session.constraints_for("over").unwrap();
    let count = constraints.get("count").unwrap();
    assert_eq!(count.min.and_then(|v| v.as_int()), Some(0));
    assert_eq!(count.max.and_then(|v| v.as_int()), Some(255));

    let report = session.synthesize_for_coverage("over", Some(1.0)).unwrap();
    assert_eq!(report.infeasible_branches, vec![BranchId(0)]);
    assert_eq!(report.test_cases.len(), 1);
    assert_eq!(report.achieved_coverage, 0.5);
    assert_eq!(report.stop_reason, StopReason::BranchesExhausted);
    assert!(!report.target_reached());
}

#[test]
fn scenario_struct_layout_on_four_byte_abi() {
    let config = EngineConfig::default().abi(|a| a.data_model(DataModel::Ilp32).max_alignment(4));
    let session = AnalysisSession::open(TranslationUnit::new(layout_model()), config).unwrap();

    let pair = session.model().aggregate("pair").unwrap().layout.clone().unwrap();
    assert_eq!(pair.member_offsets, vec![0, 4]);
    assert_eq!(pair.padding_bytes, 3);
    assert_eq!((pair.size, pair.alignment), (8, 4));
}

#[test]
fn scenario_mutual_recursion_is_detected_and_synthesized() {
    let session = session(TranslationUnit::new(mutual_recursion_model()));

    assert!(session.call_graph().has_cycles());
    assert!(session.model().function("f").unwrap().is_recursive);
    assert!(session.model().function("g").unwrap().is_recursive);

    let rooted = session.build_call_graph("main", None).unwrap();
    assert!(rooted.contains("g"));

    let report = session.synthesize_for_coverage("f", Some(1.0)).unwrap();
    assert_eq!(report.test_cases.len(), 2);
    assert_eq!(report.achieved_coverage, 1.0);
}

#[test]
fn test_partial_target_never_attempts_more() {
    let session = session(clamp_unit());
    let half = session.synthesize_for_coverage("clamp", Some(0.5)).unwrap();
    let full = session.synthesize_for_coverage("clamp", Some(1.0)).unwrap();

    assert!(half.target_reached());
    assert!(half.test_cases.len() <= full.test_cases.len());
    assert!(half.branches_attempted() <= full.branches_attempted());
    assert!(half.solver_attempts <= full.solver_attempts);
}

#[test]
fn test_infeasible_branches_never_get_cases() {
    let unit = unit_with(
        "mixed.c",
        vec![
            guard_function("never", "x", "int", "x > 5 && x < 3"),
            guard_function("opaque", "x", "int", "is_ready(x)"),
        ],
    );
    let session = session(unit);

    let never = session.synthesize_for_coverage("never", None).unwrap();
    for case in &never.test_cases {
        assert!(!never.infeasible_branches.contains(&case.branch_id));
    }
    assert_eq!(never.infeasible_branches, vec![BranchId(0)]);

    let opaque = session.synthesize_for_coverage("opaque", None).unwrap();
    assert!(opaque.infeasible_branches.is_empty());
    assert_eq!(opaque.unknown_branches, vec![BranchId(0), BranchId(1)]);
}

#[test]
fn test_cases_follow_their_recorded_path() {
    let session = session(unit_with("scale.c", vec![scale_function()]));
    let report = session.synthesize_for_coverage("scale", Some(1.0)).unwrap();

    assert_eq!(report.achieved_coverage, 1.0);
    let expected: Vec<&str> = report
        .test_cases
        .iter()
        .filter_map(|c| c.expected_return.as_deref())
        .collect();
    assert_eq!(expected, vec!["2", "1", "0"]);
    for case in &report.test_cases {
        let raw: i64 = case.inputs["raw"].parse().unwrap();
        assert!((0..=255).contains(&raw));
        assert!(case.branches_taken.contains(&case.branch_id));
    }
}

#[test]
fn test_expression_synthesis_through_session() {
    let session = session(unit_with("scale.c", vec![scale_function()]));

    let hit = session.synthesize_for_expression("raw * 4 == 1020", "scale").unwrap();
    assert_eq!(hit.status, "sat");
    assert_eq!(hit.inputs.unwrap()["raw"], "255");

    let miss = session.synthesize_for_expression("raw * 4 > 1020", "scale").unwrap();
    assert_eq!(miss.status, "unsat");
}

#[test]
fn test_batch_reports_each_request() {
    let unit = unit_with(
        "batch.c",
        vec![clamp_function(), guard_function("over", "count", "unsigned char", "count > 255")],
    );
    let session = session(unit);
    let results = session.synthesize_batch(&[
        SynthesisRequest::new("clamp", None),
        SynthesisRequest::new("missing", None),
        SynthesisRequest::new("over", Some(0.5)),
    ]);

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().test_cases.len(), 3);
    assert!(matches!(results[1], Err(EngineError::FunctionNotFound(_))));
    assert!(results[2].as_ref().unwrap().target_reached());

    let all = session.synthesize_all(None);
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(Result::is_ok));
}
