//! Variable entity

use crate::shared::models::{CType, QualType, SourceLocation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VariableScope {
    #[default]
    Global,
    /// File-local (`static` at file scope)
    Static,
    Local,
    Parameter,
    Extern,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub type_name: String,
    #[serde(default)]
    pub scope: VariableScope,
    pub location: SourceLocation,
    /// Owning function for locals and parameters
    #[serde(default)]
    pub function: Option<String>,
    #[serde(default)]
    pub default_value: Option<String>,
    /// Comment attached to the declaration, e.g. `Range: 0 to 10`
    #[serde(default)]
    pub annotation: Option<String>,
    /// Functions that read or write this variable
    #[serde(default)]
    pub used_by: BTreeSet<String>,
}

impl Variable {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            scope: VariableScope::Global,
            location,
            function: None,
            default_value: None,
            annotation: None,
            used_by: BTreeSet::new(),
        }
    }

    pub fn with_scope(mut self, scope: VariableScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn in_function(mut self, function: &str) -> Self {
        self.function = Some(function.to_string());
        self
    }

    pub fn with_annotation(mut self, text: &str) -> Self {
        self.annotation = Some(text.to_string());
        self
    }

    pub fn qual_type(&self) -> QualType {
        QualType::parse(&self.type_name)
    }

    pub fn is_const(&self) -> bool {
        self.qual_type().is_const
    }

    pub fn is_volatile(&self) -> bool {
        self.qual_type().is_volatile
    }

    /// Number of `*` levels
    pub fn pointer_depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.qual_type();
        while let CType::Pointer(inner) = current.ty {
            depth += 1;
            current = *inner;
        }
        depth
    }

    /// Declared array dimensions, outermost first
    pub fn array_dimensions(&self) -> Vec<Option<u64>> {
        let mut dims = Vec::new();
        let mut current = self.qual_type();
        while let CType::Array(inner, n) = current.ty {
            dims.push(n);
            current = *inner;
        }
        dims
    }

    /// Key under which two declarations of the same name conflict
    pub fn scope_key(&self) -> String {
        match self.scope {
            VariableScope::Global | VariableScope::Extern => "<global>".to_string(),
            VariableScope::Static => format!("<file:{}>", self.location.file),
            VariableScope::Local | VariableScope::Parameter => {
                format!("<fn:{}>", self.function.as_deref().unwrap_or("?"))
            }
        }
    }
}
