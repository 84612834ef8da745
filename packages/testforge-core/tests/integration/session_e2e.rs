//! Loading translation units from disk and driving a session end to end

#[path = "../common/mod.rs"]
mod common;

use common::*;
use pretty_assertions::assert_eq;
use std::path::Path;
use tempfile::TempDir;
use testforge_core::adapters::{AstProvider, HeaderSource, JsonAstProvider, TranslationUnit};
use testforge_core::config::ConfigError;
use testforge_core::features::entity_model::{AggregateDefinition, IssueKind};
use testforge_core::features::flow_graph::BranchId;
use testforge_core::features::smt::BranchFeasibility;
use testforge_core::features::type_resolution::TypedefRegistry;
use testforge_core::shared::models::TargetAbi;
use testforge_core::{AnalysisSession, EngineConfig, EngineError, Preset};

fn write_unit(dir: &Path, name: &str, unit: &TranslationUnit) {
    let json = serde_json::to_string_pretty(unit).unwrap();
    std::fs::write(dir.join(name), json).unwrap();
}

#[tokio::test]
async fn test_load_open_and_synthesize() {
    let dir = TempDir::new().unwrap();
    write_unit(dir.path(), "clamp.json", &clamp_unit());

    let unit = JsonAstProvider::new(dir.path()).load("clamp.json").await.unwrap();
    let session = AnalysisSession::open(unit, EngineConfig::default()).unwrap();
    let report = session.synthesize_for_coverage("clamp", None).unwrap();
    assert_eq!(report.test_cases.len(), 3);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["function"], "clamp");
    assert_eq!(json["test_cases"].as_array().map(Vec::len), Some(3));
    assert_eq!(json["stop_reason"], "target_reached");
}

#[tokio::test]
async fn test_missing_unit_is_source_not_found() {
    let dir = TempDir::new().unwrap();
    let err = JsonAstProvider::new(dir.path()).load("absent.json").await.unwrap_err();
    assert!(matches!(err, EngineError::SourceNotFound(_)));
}

#[tokio::test]
async fn test_header_typedefs_reach_constraints() {
    let dir = TempDir::new().unwrap();
    let mut unit = unit_with(
        "sensor.c",
        vec![guard_function("saturated", "s", "sensor_t", "s > 65535")],
    );
    unit.headers.push(HeaderSource {
        file: "sensor.h".into(),
        text: "/* raw ADC reading */\ntypedef unsigned short sensor_t;\n".into(),
    });
    write_unit(dir.path(), "sensor.json", &unit);

    let unit = JsonAstProvider::new(dir.path()).load("sensor.json").await.unwrap();
    let session = AnalysisSession::open(unit, EngineConfig::default()).unwrap();

    assert!(session.registry().contains("sensor_t"));
    let s = session.constraints_for("saturated").unwrap();
    assert_eq!(s.get("s").and_then(|c| c.max).and_then(|v| v.as_int()), Some(65535));
    assert_eq!(
        session.is_branch_feasible("saturated", BranchId(0)).unwrap(),
        BranchFeasibility::Infeasible
    );
}

#[test]
fn test_open_validated_rejects_malformed_model() {
    let mut model = layout_model();
    model.add_struct(AggregateDefinition::structure("loop", loc("layout.h", 20)).with_member("inner", "struct loop"));
    let unit = TranslationUnit::new(model);

    let lenient = AnalysisSession::open(unit.clone(), EngineConfig::default()).unwrap();
    assert!(lenient.validate().iter().any(|i| i.kind == IssueKind::SelfContainment));

    match AnalysisSession::open_validated(unit, EngineConfig::default()) {
        Err(EngineError::MalformedModel { issues }) => {
            assert_eq!(issues.len(), 1);
            assert_eq!(issues[0].entity, "loop");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("malformed model accepted"),
    }
}

#[test]
fn test_session_queries() {
    let session = AnalysisSession::open(TranslationUnit::new(mutual_recursion_model()), EngineConfig::default()).unwrap();

    let complexity = session.analyze_function_complexity("f").unwrap();
    assert_eq!(complexity.cyclomatic_complexity, 2);
    assert_eq!(session.model().function("f").unwrap().cyclomatic_complexity, 2);

    let paths = session.find_paths_covering_branches("f", &[BranchId(0)]).unwrap();
    assert_eq!(paths.len(), 1);

    let shallow = session.build_call_graph("main", Some(1)).unwrap();
    assert!(!shallow.contains("g"));
    assert!(matches!(
        session.analyze_function("nope"),
        Err(EngineError::FunctionNotFound(_))
    ));
}

#[test]
fn test_config_yaml_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.yaml");
    let config = EngineConfig::preset(Preset::Thorough)
        .constraints(|c| c.use_guard_bounds(true))
        .synthesis(|s| s.target_coverage(0.75));
    config.save_yaml(&path).unwrap();

    let loaded = EngineConfig::from_yaml(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_config_rejects_unknown_version_and_bad_range() {
    let err = EngineConfig::from_yaml_str("version: 7\npreset: fast\n").unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedVersion { found: 7, .. }));

    let yaml = "version: 1\npreset: balanced\noverrides:\n  synthesis:\n    target_coverage: 1.5\n";
    assert!(EngineConfig::from_yaml_str(yaml).is_err());

    let fast = EngineConfig::from_yaml_str("version: 1\npreset: fast\n").unwrap();
    assert_eq!(fast, EngineConfig::preset(Preset::Fast));
}

#[test]
fn test_typedef_registry_persists_user_mappings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("typedefs.json");

    let registry = TypedefRegistry::with_defaults(TargetAbi::default());
    registry.import_header("typedef unsigned char byte_t;\ntypedef byte_t frame_id_t;\n", "frame.h");
    registry.save_json(&path).unwrap();

    let restored = TypedefRegistry::with_defaults(TargetAbi::default());
    assert_eq!(restored.load_json(&path).unwrap(), 2);
    assert_eq!(
        restored.bounds_of("frame_id_t"),
        registry.bounds_of("frame_id_t")
    );
}
