//! Function entity

use crate::shared::models::{FunctionBody, NodeKind, QualType, SourceLocation};
use serde::{Deserialize, Serialize};

/// Declared parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_name: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }

    pub fn qual_type(&self) -> QualType {
        QualType::parse(&self.type_name)
    }
}

/// Storage and linkage flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FunctionFlags {
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_inline: bool,
    #[serde(default)]
    pub is_extern: bool,
    #[serde(default)]
    pub is_variadic: bool,
}

/// A function declaration or definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub return_type: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    pub location: SourceLocation,
    #[serde(default)]
    pub flags: FunctionFlags,
    /// Present for definitions, absent for prototypes
    #[serde(default)]
    pub body: Option<FunctionBody>,

    // Derived from the body
    #[serde(default)]
    pub called_functions: Vec<String>,
    #[serde(default)]
    pub local_variables: Vec<String>,
    #[serde(default)]
    pub return_sites: Vec<u32>,

    // Derived by later analysis
    #[serde(default = "one")]
    pub cyclomatic_complexity: u32,
    #[serde(default)]
    pub is_recursive: bool,
}

fn one() -> u32 {
    1
}

impl Function {
    pub fn new(name: impl Into<String>, return_type: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            name: name.into(),
            return_type: return_type.into(),
            parameters: Vec::new(),
            location,
            flags: FunctionFlags::default(),
            body: None,
            called_functions: Vec::new(),
            local_variables: Vec::new(),
            return_sites: Vec::new(),
            cyclomatic_complexity: 1,
            is_recursive: false,
        }
    }

    pub fn with_param(mut self, name: &str, type_name: &str) -> Self {
        self.parameters.push(Parameter::new(name, type_name));
        self
    }

    pub fn with_body(mut self, body: FunctionBody) -> Self {
        self.body = Some(body);
        self.derive_body_facts();
        self
    }

    pub fn is_definition(&self) -> bool {
        self.body.is_some()
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Recompute called functions, locals and return sites from the body.
    /// Without a body the facts supplied by the front end are kept.
    ///
    /// Callee names keep first-occurrence order without duplicates.
    pub fn derive_body_facts(&mut self) {
        let Some(body) = &self.body else {
            return;
        };
        self.called_functions.clear();
        self.local_variables.clear();
        self.return_sites.clear();

        for id in body.preorder() {
            let Some(node) = body.node(id) else {
                continue;
            };
            for call in &node.calls {
                if !self.called_functions.contains(&call.callee) {
                    self.called_functions.push(call.callee.clone());
                }
            }
            match &node.kind {
                NodeKind::Declaration { name, .. } => {
                    if !self.local_variables.contains(name) {
                        self.local_variables.push(name.clone());
                    }
                }
                NodeKind::Return { .. } => self.return_sites.push(node.line),
                _ => {}
            }
        }
    }

    /// Set the derived complexity, clamped so the `>= 1` invariant holds
    pub fn set_cyclomatic_complexity(&mut self, value: u32) {
        self.cyclomatic_complexity = value.max(1);
    }
}
