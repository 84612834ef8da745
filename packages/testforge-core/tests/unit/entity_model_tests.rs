//! Entity model: insertion, derived layouts and validation

#[path = "../common/mod.rs"]
mod common;

use common::*;
use pretty_assertions::assert_eq;
use testforge_core::features::entity_model::{
    AddOutcome, AggregateDefinition, ConditionalDirective, DirectiveKind, EnumDefinition, IssueKind,
    MacroDefinition, TypedefDefinition, Variable, VariableScope,
};
use testforge_core::EntityModel;

#[test]
fn test_char_int_struct_on_ilp32() {
    let mut model = layout_model();
    model.finalize(&ilp32_registry());

    let layout = model.aggregate("pair").unwrap().layout.clone().unwrap();
    assert_eq!(layout.member_offsets, vec![0, 4]);
    assert_eq!(layout.member_sizes, vec![1, 4]);
    assert_eq!(layout.size, 8);
    assert_eq!(layout.alignment, 4);
    assert_eq!(layout.padding_bytes, 3);
    assert!((layout.padding_ratio() - 0.375).abs() < f64::EPSILON);
}

#[test]
fn test_union_members_share_offset_zero() {
    let mut model = layout_model();
    model.finalize(&ilp32_registry());

    let layout = model.aggregate("word").unwrap().layout.clone().unwrap();
    assert!(layout.member_offsets.iter().all(|&o| o == 0));
    let largest = layout.member_sizes.iter().copied().max().unwrap();
    assert!(layout.size >= largest);
    assert_eq!(layout.size % layout.alignment, 0);
    assert_eq!(layout.size, 8);
}

#[test]
fn test_duplicate_insertion_is_idempotent() {
    let mut model = EntityModel::new("unit.c");
    assert_eq!(model.add_function(clamp_function()), AddOutcome::Added);
    assert_eq!(model.add_function(clamp_function()), AddOutcome::Unchanged);
    assert_eq!(model.functions().len(), 1);

    let pair = AggregateDefinition::structure("pair", loc("unit.c", 3)).with_member("a", "char");
    assert_eq!(model.add_struct(pair.clone()), AddOutcome::Added);
    assert_eq!(model.add_struct(pair), AddOutcome::Unchanged);
    assert_eq!(model.aggregates().len(), 1);
}

#[test]
fn test_prototype_then_definition_merges() {
    let mut model = EntityModel::new("unit.c");
    model.add_function(FunctionBuilder::new("clamp").param("x", "int").at("unit.h", 4).declaration());
    assert!(!model.function("clamp").unwrap().is_definition());
    assert_eq!(model.add_function(clamp_function()), AddOutcome::Merged);
    let clamp = model.function("clamp").unwrap();
    assert!(clamp.is_definition());
    assert_eq!(clamp.return_sites.len(), 3);
}

#[test]
fn test_enum_numbering_follows_c_rules() {
    let mut model = EntityModel::new("modes.h");
    model.add_enum(
        EnumDefinition::new("mode", loc("modes.h", 1))
            .with_enumerator("IDLE", None)
            .with_enumerator("RUN", None)
            .with_enumerator("FAULT", Some("10"))
            .with_enumerator("RESET", None),
    );
    model.finalize(&default_registry());
    assert_eq!(model.enum_def("mode").unwrap().values(), vec![0, 1, 10, 11]);
}

#[test]
fn test_typedef_cycle_is_reported_not_looped() {
    let mut model = EntityModel::new("types.h");
    model.add_typedef(TypedefDefinition::new("A", "B", loc("types.h", 1)));
    model.add_typedef(TypedefDefinition::new("B", "A", loc("types.h", 2)));
    let registry = default_registry();
    model.finalize(&registry);

    let issues = model.validate(&registry);
    let cycles: Vec<_> = issues.iter().filter(|i| i.kind == IssueKind::TypedefCycle).collect();
    assert_eq!(cycles.len(), 1);
    assert!(cycles[0].is_error());
}

#[test]
fn test_self_containing_struct_is_an_error() {
    let mut model = EntityModel::new("list.h");
    model.add_struct(AggregateDefinition::structure("bad", loc("list.h", 1)).with_member("me", "struct bad"));
    model.add_struct(AggregateDefinition::structure("list", loc("list.h", 4)).with_member("next", "struct list *"));
    let registry = default_registry();
    model.finalize(&registry);

    assert!(model.aggregate("bad").unwrap().layout.is_none());
    assert!(model.aggregate("list").unwrap().layout.is_some());
    let issues = model.validate(&registry);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind, IssueKind::SelfContainment);
    assert_eq!(issues[0].entity, "bad");
}

#[test]
fn test_unknown_callee_is_a_warning() {
    let mut model = mutual_recursion_model();
    model.add_function(FunctionBuilder::new("boot").at("rec.c", 20).body(|b| {
        let call = b.call("hal_init", &[], 21);
        let ret = b.ret(Some("0"), 22);
        b.compound(vec![call, ret], 20)
    }));
    let registry = default_registry();
    model.finalize(&registry);

    let issues = model.validate(&registry);
    let unknown: Vec<_> = issues.iter().filter(|i| i.kind == IssueKind::UnknownCallee).collect();
    assert!(!unknown.is_empty());
    assert!(unknown.iter().all(|i| !i.is_error()));
}

#[test]
fn test_macros_feed_named_constants_and_directives() {
    let mut model = EntityModel::new("cfg.h");
    model.add_macro(MacroDefinition::object("LEVEL", "3", loc("cfg.h", 1)));
    model.add_macro(MacroDefinition::object("LIMIT", "(LEVEL * 10)", loc("cfg.h", 2)));
    model.add_conditional(ConditionalDirective::new(1, DirectiveKind::If, "LEVEL > 2", loc("cfg.h", 4)));
    model.add_conditional(ConditionalDirective::new(2, DirectiveKind::Ifdef, "DEBUG", loc("cfg.h", 5)).nested_in(1));
    model.finalize(&default_registry());

    let constants = model.named_constants();
    assert_eq!(constants.get("LIMIT").and_then(|v| v.as_int()), Some(30));
    assert_eq!(model.is_directive_active(1), Some(true));
    assert_eq!(model.is_directive_active(2), Some(false));
}

#[test]
fn test_locals_are_scoped_to_their_function() {
    let mut model = EntityModel::new("unit.c");
    model.add_variable(Variable::new("i", "int", loc("unit.c", 2)).with_scope(VariableScope::Local).in_function("f"));
    model.add_variable(Variable::new("i", "int", loc("unit.c", 8)).with_scope(VariableScope::Local).in_function("g"));
    model.add_variable(Variable::new("mode", "unsigned char", loc("unit.c", 1)));

    assert_eq!(model.variables_of("f").len(), 1);
    assert!(model.visible_variable("g", "i").is_some());
    assert!(model.visible_variable("g", "mode").is_some());
    assert!(model.global("i").is_none());
    assert!(model.validate(&default_registry()).is_empty());
}
