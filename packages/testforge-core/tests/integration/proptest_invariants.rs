//! Property-based tests for layout, typedef resolution and synthesis invariants

#[path = "../common/mod.rs"]
mod common;

use common::*;
use proptest::prelude::*;
use testforge_core::adapters::TranslationUnit;
use testforge_core::features::entity_model::AggregateDefinition;
use testforge_core::features::type_resolution::{TypedefRegistry, TypedefSource};
use testforge_core::shared::models::{DataModel, TargetAbi};
use testforge_core::{AnalysisSession, EngineConfig, EntityModel};

fn member_type() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("char"),
        Just("unsigned char"),
        Just("short"),
        Just("int"),
        Just("long"),
        Just("float"),
        Just("double"),
        Just("unsigned char[3]"),
        Just("short[5]"),
        Just("int *"),
    ]
}

fn abi() -> impl Strategy<Value = TargetAbi> {
    (prop_oneof![Just(DataModel::Ilp32), Just(DataModel::Lp64)], prop_oneof![Just(1u64), Just(2), Just(4), Just(8)])
        .prop_map(|(model, align)| TargetAbi::new(model, align))
}

fn aggregate_model(types: &[&str], union: bool) -> EntityModel {
    let mut def = if union {
        AggregateDefinition::union("agg", loc("gen.h", 1))
    } else {
        AggregateDefinition::structure("agg", loc("gen.h", 1))
    };
    for (i, t) in types.iter().enumerate() {
        def = def.with_member(&format!("m{i}"), t);
    }
    let mut model = EntityModel::new("gen.h");
    if union {
        model.add_union(def);
    } else {
        model.add_struct(def);
    }
    model
}

/// `int step(int x) { if (x > k1) return 1; if (x < k2) return 2; return 0; }`
fn two_guard_unit(k1: i32, k2: i32) -> TranslationUnit {
    let f = FunctionBuilder::new("step").param("x", "int").body(|b| {
        let r1 = b.ret(Some("1"), 2);
        let g1 = b.if_stmt(&format!("x > {k1}"), r1, None, 2);
        let r2 = b.ret(Some("2"), 3);
        let g2 = b.if_stmt(&format!("x < {k2}"), r2, None, 3);
        let r0 = b.ret(Some("0"), 4);
        b.compound(vec![g1, g2, r0], 1)
    });
    unit_with("step.c", vec![f])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn struct_layout_is_consistent(types in prop::collection::vec(member_type(), 1..8), abi in abi()) {
        let mut model = aggregate_model(&types, false);
        model.finalize(&TypedefRegistry::new(abi));
        let layout = model.aggregate("agg").unwrap().layout.clone().unwrap();

        prop_assert_eq!(layout.member_offsets.len(), types.len());
        prop_assert_eq!(layout.member_offsets[0], 0);
        for i in 1..types.len() {
            prop_assert!(layout.member_offsets[i - 1] + layout.member_sizes[i - 1] <= layout.member_offsets[i]);
        }
        let last = types.len() - 1;
        prop_assert!(layout.member_offsets[last] + layout.member_sizes[last] <= layout.size);
        prop_assert_eq!(layout.size % layout.alignment, 0);
        prop_assert!(layout.alignment <= abi.max_alignment.max(1));
        let payload: u64 = layout.member_sizes.iter().sum();
        prop_assert_eq!(layout.padding_bytes, layout.size - payload);
    }

    #[test]
    fn union_members_overlap(types in prop::collection::vec(member_type(), 1..6), abi in abi()) {
        let mut model = aggregate_model(&types, true);
        model.finalize(&TypedefRegistry::new(abi));
        let layout = model.aggregate("agg").unwrap().layout.clone().unwrap();

        prop_assert!(layout.member_offsets.iter().all(|&o| o == 0));
        let largest = layout.member_sizes.iter().copied().max().unwrap_or(0);
        prop_assert!(layout.size >= largest);
        prop_assert_eq!(layout.size % layout.alignment, 0);
    }

    #[test]
    fn typedef_resolution_terminates(edges in prop::collection::vec((0usize..6, 0usize..7), 1..12)) {
        // alias t_i → t_j, or → int when j == 6
        let registry = TypedefRegistry::new(TargetAbi::default());
        for (from, to) in &edges {
            let base = if *to == 6 { "int".to_string() } else { format!("t{to}") };
            registry.register(&format!("t{from}"), &base, TypedefSource::Model);
        }
        for i in 0..6 {
            // must return, whether resolved, cyclic or dangling
            let _ = registry.resolve_chain(&format!("t{i}"));
        }
    }

    #[test]
    fn acyclic_chain_reaches_base(depth in 1usize..20) {
        let registry = TypedefRegistry::new(TargetAbi::default());
        registry.register("a0", "unsigned char", TypedefSource::Model);
        for i in 1..depth {
            registry.register(&format!("a{i}"), &format!("a{}", i - 1), TypedefSource::Model);
        }
        let top = format!("a{}", depth - 1);
        let resolved = registry.resolve_chain(&top);
        prop_assert!(resolved.is_ok());
        prop_assert_eq!(registry.bounds_of(&top), registry.bounds_of("unsigned char"));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn synthesis_is_deterministic(k1 in -1000i32..1000, k2 in -1000i32..1000) {
        let run = || {
            let session = AnalysisSession::open(two_guard_unit(k1, k2), EngineConfig::default()).unwrap();
            session.synthesize_for_coverage("step", Some(1.0)).unwrap()
        };
        prop_assert_eq!(run(), run());
    }

    #[test]
    fn assignments_satisfy_their_path(k1 in -1000i32..1000, k2 in -1000i32..1000) {
        let session = AnalysisSession::open(two_guard_unit(k1, k2), EngineConfig::default()).unwrap();
        let report = session.synthesize_for_coverage("step", Some(1.0)).unwrap();

        prop_assert!(report.achieved_coverage >= 0.0 && report.achieved_coverage <= 1.0);
        prop_assert!(report.covered_branches + report.infeasible_branches.len() <= report.total_branches);
        for case in &report.test_cases {
            let x: i64 = case.inputs["x"].parse().unwrap();
            let expected = if x > k1 as i64 {
                "1"
            } else if x < k2 as i64 {
                "2"
            } else {
                "0"
            };
            prop_assert_eq!(case.expected_return.as_deref(), Some(expected));
        }
    }

    #[test]
    fn higher_target_never_attempts_less(k1 in -50i32..50, k2 in -50i32..50, lo in 0.1f64..1.0, hi in 0.1f64..1.0) {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        let session = AnalysisSession::open(two_guard_unit(k1, k2), EngineConfig::default()).unwrap();
        let small = session.synthesize_for_coverage("step", Some(lo)).unwrap();
        let large = session.synthesize_for_coverage("step", Some(hi)).unwrap();

        prop_assert!(small.branches_attempted() <= large.branches_attempted());
        prop_assert!(small.test_cases.len() <= large.test_cases.len());
    }
}
