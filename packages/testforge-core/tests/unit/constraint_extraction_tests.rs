//! Constraint extraction from types, enums, annotations and bodies

#[path = "../common/mod.rs"]
mod common;

use common::*;
use pretty_assertions::assert_eq;
use testforge_core::config::ConstraintConfig;
use testforge_core::features::constraints::{ConstraintExtractor, ConstraintKind, ConstraintSource, VariableConstraint};
use testforge_core::features::entity_model::{EnumDefinition, MacroDefinition, TypedefDefinition, Variable};
use testforge_core::features::type_resolution::TypedefRegistry;
use testforge_core::shared::models::{ScalarValue, ValueRange};
use testforge_core::EntityModel;

fn finalized(mut model: EntityModel) -> (EntityModel, TypedefRegistry) {
    let registry = default_registry();
    model.finalize(&registry);
    (model, registry)
}

#[test]
fn test_unsigned_char_is_full_byte_range() {
    let model = model_with("count.c", vec![guard_function("check", "count", "unsigned char", "count > 255")]);
    let (model, registry) = finalized(model);
    let extractor = ConstraintExtractor::new(&model, &registry, &ConstraintConfig::default());

    let set = extractor.extract_for_function(model.function("check").unwrap());
    let count = set.get("count").unwrap();
    assert_eq!(count.kind(), ConstraintKind::Range);
    assert_eq!(count.as_range(), Some(ValueRange::ints(0, 255)));
    assert!(count.sources.contains(&ConstraintSource::Type));
    assert!(!count.admits(&ScalarValue::Int(256)));
    assert_eq!(set.inputs(), ["count".to_string()]);
}

#[test]
fn test_typedef_chain_bounds() {
    let mut model = EntityModel::new("types.h");
    model.add_typedef(TypedefDefinition::new("sensor_raw_t", "UINT16", loc("types.h", 3)));
    let (model, registry) = finalized(model);
    let extractor = ConstraintExtractor::new(&model, &registry, &ConstraintConfig::default());

    let c = extractor.type_constraint("raw", "sensor_raw_t").unwrap();
    assert_eq!(c.as_range(), Some(ValueRange::ints(0, 65535)));
    assert!(extractor.type_constraint("p", "sensor_raw_t *").is_none());
}

#[test]
fn test_enum_typed_input_is_enumeration() {
    let mut model = EntityModel::new("mode.c");
    model.add_enum(
        EnumDefinition::new("mode", loc("mode.c", 1))
            .with_enumerator("MODE_OFF", None)
            .with_enumerator("MODE_ON", None)
            .with_enumerator("MODE_SERVICE", Some("8")),
    );
    model.add_typedef(TypedefDefinition::new("mode_t", "enum mode", loc("mode.c", 2)));
    let (model, registry) = finalized(model);
    let extractor = ConstraintExtractor::new(&model, &registry, &ConstraintConfig::default());

    let c = extractor.type_constraint("m", "mode_t").unwrap();
    assert_eq!(c.kind(), ConstraintKind::Enumeration);
    assert_eq!(
        c.allowed,
        Some(vec![ScalarValue::Int(0), ScalarValue::Int(1), ScalarValue::Int(8)])
    );
    assert!(c.sources.contains(&ConstraintSource::Enum));
}

#[test]
fn test_annotation_narrows_type_range() {
    let mut model = EntityModel::new("speed.c");
    model.add_macro(MacroDefinition::object("MAX_SPEED", "120", loc("speed.c", 1)));
    let (model, registry) = finalized(model);
    let extractor = ConstraintExtractor::new(&model, &registry, &ConstraintConfig::default());

    let v = Variable::new("speed", "unsigned char", loc("speed.c", 3)).with_annotation("/* Range: 10 to MAX_SPEED */");
    let c = extractor.extract_variable(&v).unwrap();
    assert_eq!(c.as_range(), Some(ValueRange::ints(10, 120)));
    assert!(c.sources.contains(&ConstraintSource::Type));
    assert!(c.sources.contains(&ConstraintSource::Annotation));

    let ignored = ConstraintExtractor::new(&model, &registry, &ConstraintConfig::default().use_annotations(false));
    assert_eq!(
        ignored.extract_variable(&v).and_then(|c| c.as_range()),
        Some(ValueRange::ints(0, 255))
    );
}

#[test]
fn test_globals_read_by_function_become_inputs() {
    let mut model = model_with(
        "ctl.c",
        vec![guard_function("over_limit", "level", "int", "level > threshold")],
    );
    model.add_variable(Variable::new("threshold", "unsigned char", loc("ctl.c", 1)));
    model.add_variable(Variable::new("unused", "int", loc("ctl.c", 2)));
    let (model, registry) = finalized(model);
    let extractor = ConstraintExtractor::new(&model, &registry, &ConstraintConfig::default());

    let set = extractor.extract_for_function(model.function("over_limit").unwrap());
    assert_eq!(set.inputs(), ["level".to_string(), "threshold".to_string()]);
    assert_eq!(set.get("threshold").and_then(|c| c.max), Some(ScalarValue::Int(255)));
    assert!(set.get("unused").is_none());
}

#[test]
fn test_array_index_and_loop_counter_bounds() {
    let f = FunctionBuilder::new("average").param("samples", "const int[8]").param("k", "int").body(|b| {
        let acc = b.decl("int", "acc", Some("0"), 2);
        let add = b.expr("acc += samples[i]", 4);
        let body = b.compound(vec![add], 3);
        let l = b.for_stmt(Some("int i = 0"), Some("i < 8"), Some("i++"), body, 3);
        let r = b.ret(Some("acc + samples[k]"), 5);
        b.compound(vec![acc, l, r], 1)
    });
    let (model, registry) = finalized(model_with("avg.c", vec![f]));
    let extractor = ConstraintExtractor::new(&model, &registry, &ConstraintConfig::default());

    let set = extractor.extract_for_function(model.function("average").unwrap());
    assert_eq!(set.get("k").and_then(|c| c.as_range()), Some(ValueRange::ints(0, 7)));
    assert!(set.get("k").unwrap().sources.contains(&ConstraintSource::ArrayIndex));
    assert_eq!(set.get("i").and_then(|c| c.max), Some(ScalarValue::Int(7)));
    assert_eq!(set.type_of("acc"), Some("int"));
    assert!(!set.inputs().contains(&"i".to_string()));
}

#[test]
fn test_intersection_can_become_contradictory() {
    let byte = VariableConstraint::range("v", ValueRange::ints(0, 255), ConstraintSource::Type);
    let high = VariableConstraint::min_value("v", ScalarValue::Int(300), ConstraintSource::User);
    let both = byte.intersect(&high);
    assert!(both.is_contradictory());

    let pick = VariableConstraint::enumeration(
        "v",
        vec![ScalarValue::Int(3), ScalarValue::Int(400)],
        ConstraintSource::User,
    );
    let narrowed = byte.intersect(&pick);
    assert!(!narrowed.is_contradictory());
    assert!(narrowed.admits(&ScalarValue::Int(3)));
    assert!(!narrowed.admits(&ScalarValue::Int(400)));
}
