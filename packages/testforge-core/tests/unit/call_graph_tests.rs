//! Call graph construction, cycles and rooted queries

#[path = "../common/mod.rs"]
mod common;

use common::*;
use pretty_assertions::assert_eq;
use testforge_core::features::graph_builder::{build_type_graph, CallGraphBuilder, TypeEdgeKind};
use testforge_core::features::entity_model::AggregateDefinition;

#[test]
fn test_mutual_recursion_marks_both_functions() {
    let mut model = mutual_recursion_model();
    let graph = CallGraphBuilder::build_and_annotate(&mut model);

    assert!(graph.has_cycles());
    assert_eq!(graph.cycles().len(), 1);
    assert_eq!(graph.cycles()[0].functions, vec!["f", "g"]);
    assert!(graph.is_recursive("f"));
    assert!(graph.is_recursive("g"));
    assert!(!graph.is_recursive("main"));

    assert!(model.function("f").unwrap().is_recursive);
    assert!(model.function("g").unwrap().is_recursive);
    assert!(!model.function("main").unwrap().is_recursive);
}

#[test]
fn test_callers_and_fan_counts() {
    let model = mutual_recursion_model();
    let graph = CallGraphBuilder::new(&model).build();

    assert_eq!(graph.callees("main"), vec!["f"]);
    let mut callers = graph.callers("f");
    callers.sort();
    assert_eq!(callers, vec!["g", "main"]);
    assert_eq!(graph.fan_in("f"), 2);
    assert_eq!(graph.fan_out("g"), 1);
    assert_eq!(graph.call_sites("main", "f")[0].line, 11);
}

#[test]
fn test_unresolved_calls_are_external() {
    let mut model = mutual_recursion_model();
    model.add_function(FunctionBuilder::new("boot").at("rec.c", 20).body(|b| {
        let init = b.call("hal_init", &[], 21);
        let run = b.call("main", &[], 22);
        let ret = b.ret(Some("0"), 23);
        b.compound(vec![init, run, ret], 20)
    }));
    let graph = CallGraphBuilder::new(&model).build();

    assert_eq!(graph.unresolved_calls().len(), 1);
    assert_eq!(graph.unresolved_calls()[0].caller, "boot");
    assert!(graph.external_functions().contains("hal_init"));
    assert!(!graph.contains("hal_init"));
    assert_eq!(graph.fan_out("boot"), 2);
}

#[test]
fn test_reachable_from_respects_depth() {
    let model = mutual_recursion_model();
    let graph = CallGraphBuilder::new(&model).build();

    let shallow = graph.reachable_from("main", 1).unwrap();
    let mut names = shallow.functions();
    names.sort();
    assert_eq!(names, vec!["f", "main"]);
    assert_eq!(shallow.root(), Some("main"));
    assert!(!shallow.has_cycles());

    let deep = graph.reachable_from("main", 5).unwrap();
    assert_eq!(deep.function_count(), 3);
    assert_eq!(deep.depth_of("g"), Some(2));
    assert!(deep.has_cycles());

    assert!(graph.reachable_from("missing", 3).is_none());
}

#[test]
fn test_call_paths_stop_at_cycle() {
    let model = mutual_recursion_model();
    let graph = CallGraphBuilder::new(&model).build();

    let paths = graph.call_paths("main", 10, 10);
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].functions, vec!["main", "f", "g"]);
    assert_eq!(paths[0].call_lines, vec![11, 2]);
    assert!(paths[0].ends_in_cycle);
}

#[test]
fn test_long_recursive_chain_builds() {
    let n = 3_000u32;
    let functions = (0..n)
        .map(|i| {
            let next = format!("f{}", (i + 1) % n);
            FunctionBuilder::new(&format!("f{i}")).at("chain.c", i * 10 + 1).body(|b| {
                let call = b.call(&next, &[], i * 10 + 2);
                b.compound(vec![call], i * 10 + 1)
            })
        })
        .collect();
    let mut model = model_with("chain.c", functions);
    let graph = CallGraphBuilder::build_and_annotate(&mut model);

    assert_eq!(graph.cycles().len(), 1);
    assert_eq!(graph.cycles()[0].functions.len(), n as usize);
    assert!(model.functions().iter().all(|f| f.is_recursive));
}

#[test]
fn test_type_graph_separates_pointer_cycles() {
    let mut model = layout_model();
    model.add_struct(
        AggregateDefinition::structure("node", loc("layout.h", 9))
            .with_member("value", "struct pair")
            .with_member("next", "struct node *"),
    );
    let graph = build_type_graph(&model);

    let deps = graph.dependencies("node");
    assert_eq!(deps.len(), 2);
    assert_eq!(deps[0].to, "pair");
    assert_eq!(deps[0].kind, TypeEdgeKind::Contains);
    assert_eq!(deps[1].kind, TypeEdgeKind::PointsTo);
    assert!(graph.by_value_cycles().is_empty());
    assert!(graph.recursive_types().contains("node"));
}
