//! Small C translation units used across tests

use super::builders::{model_with, FunctionBuilder};
use testforge_core::adapters::TranslationUnit;
use testforge_core::features::entity_model::{AggregateDefinition, EntityModel, Function};
use testforge_core::features::type_resolution::TypedefRegistry;
use testforge_core::shared::models::{DataModel, SourceLocation, TargetAbi};

pub fn loc(file: &str, line: u32) -> SourceLocation {
    SourceLocation::new(file, line)
}

pub fn default_registry() -> TypedefRegistry {
    TypedefRegistry::with_defaults(TargetAbi::default())
}

/// Registry for a 32-bit target with 4-byte maximum alignment
pub fn ilp32_registry() -> TypedefRegistry {
    TypedefRegistry::with_defaults(TargetAbi::new(DataModel::Ilp32, 4))
}

/// `int clamp(int x){ if (x < 0) return 0; if (x > 100) return 100; return x; }`
pub fn clamp_function() -> Function {
    FunctionBuilder::new("clamp").param("x", "int").body(|b| {
        let r0 = b.ret(Some("0"), 2);
        let if1 = b.if_stmt("x < 0", r0, None, 2);
        let r100 = b.ret(Some("100"), 3);
        let if2 = b.if_stmt("x > 100", r100, None, 3);
        let rx = b.ret(Some("x"), 4);
        b.compound(vec![if1, if2, rx], 1)
    })
}

pub fn clamp_unit() -> TranslationUnit {
    TranslationUnit::new(model_with("clamp.c", vec![clamp_function()]))
}

/// `f` calls `g`, `g` calls `f`, and `main` calls `f`
pub fn mutual_recursion_model() -> EntityModel {
    let f = FunctionBuilder::new("f").param("n", "int").at("rec.c", 1).body(|b| {
        let call = b.call("g", &["n - 1"], 2);
        let body = b.compound(vec![call], 2);
        let guard = b.if_stmt("n > 0", body, None, 2);
        let ret = b.ret(Some("n"), 3);
        b.compound(vec![guard, ret], 1)
    });
    let g = FunctionBuilder::new("g").param("n", "int").at("rec.c", 5).body(|b| {
        let call = b.call("f", &["n"], 6);
        let ret = b.ret(Some("0"), 7);
        b.compound(vec![call, ret], 5)
    });
    let main = FunctionBuilder::new("main").at("rec.c", 10).body(|b| {
        let call = b.call("f", &["3"], 11);
        let ret = b.ret(Some("0"), 12);
        b.compound(vec![call, ret], 10)
    });
    model_with("rec.c", vec![f, g, main])
}

/// `struct pair { char a; int b; };` and `union word { unsigned char bytes[5]; unsigned int value; };`
pub fn layout_model() -> EntityModel {
    let mut model = EntityModel::new("layout.h");
    model.add_struct(
        AggregateDefinition::structure("pair", loc("layout.h", 1))
            .with_member("a", "char")
            .with_member("b", "int"),
    );
    model.add_union(
        AggregateDefinition::union("word", loc("layout.h", 5))
            .with_member("bytes", "unsigned char[5]")
            .with_member("value", "unsigned int"),
    );
    model
}

/// Sensor routine with a local derived from the input
///
/// ```c
/// int scale(unsigned char raw) {
///     int v = raw * 4;
///     if (v > 1000) return 2;
///     if (v > 500) return 1;
///     return 0;
/// }
/// ```
pub fn scale_function() -> Function {
    FunctionBuilder::new("scale").param("raw", "unsigned char").body(|b| {
        let decl = b.decl("int", "v", Some("raw * 4"), 2);
        let r2 = b.ret(Some("2"), 3);
        let if1 = b.if_stmt("v > 1000", r2, None, 3);
        let r1 = b.ret(Some("1"), 4);
        let if2 = b.if_stmt("v > 500", r1, None, 4);
        let r0 = b.ret(Some("0"), 5);
        b.compound(vec![decl, if1, if2, r0], 1)
    })
}
