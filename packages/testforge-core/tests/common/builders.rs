//! Test data builders

use testforge_core::adapters::TranslationUnit;
use testforge_core::features::entity_model::{EntityModel, Function};
use testforge_core::shared::models::{BodyBuilder, NodeId, SourceLocation};

/// Builder for a function with a body
#[derive(Debug)]
pub struct FunctionBuilder {
    name: String,
    return_type: String,
    file: String,
    line: u32,
    params: Vec<(String, String)>,
}

impl FunctionBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            return_type: "int".to_string(),
            file: "unit.c".to_string(),
            line: 1,
            params: Vec::new(),
        }
    }

    pub fn returns(mut self, type_name: &str) -> Self {
        self.return_type = type_name.to_string();
        self
    }

    pub fn at(mut self, file: &str, line: u32) -> Self {
        self.file = file.to_string();
        self.line = line;
        self
    }

    pub fn param(mut self, name: &str, type_name: &str) -> Self {
        self.params.push((name.to_string(), type_name.to_string()));
        self
    }

    /// Finish with a body; `build` returns the root statement
    pub fn body(self, build: impl FnOnce(&mut BodyBuilder) -> NodeId) -> Function {
        let mut b = BodyBuilder::new();
        let root = build(&mut b);
        self.declaration().with_body(b.finish(root))
    }

    /// Finish as a prototype without a body
    pub fn declaration(self) -> Function {
        let mut f = Function::new(self.name, self.return_type, SourceLocation::new(&self.file, self.line));
        for (name, type_name) in &self.params {
            f = f.with_param(name, type_name);
        }
        f
    }
}

/// `int name(type param) { if (guard) return 1; return 0; }`
pub fn guard_function(name: &str, param: &str, type_name: &str, guard: &str) -> Function {
    FunctionBuilder::new(name).param(param, type_name).body(|b| {
        let r1 = b.ret(Some("1"), 2);
        let if1 = b.if_stmt(guard, r1, None, 2);
        let r0 = b.ret(Some("0"), 3);
        b.compound(vec![if1, r0], 1)
    })
}

pub fn model_with(file: &str, functions: Vec<Function>) -> EntityModel {
    let mut model = EntityModel::new(file);
    for f in functions {
        model.add_function(f);
    }
    model
}

pub fn unit_with(file: &str, functions: Vec<Function>) -> TranslationUnit {
    TranslationUnit::new(model_with(file, functions))
}
