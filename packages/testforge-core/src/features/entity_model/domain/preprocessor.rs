//! Preprocessor entities: macros, conditional directives, includes

use crate::shared::models::SourceLocation;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroDefinition {
    pub name: String,
    /// `Some` for function-like macros, even with zero parameters
    #[serde(default)]
    pub parameters: Option<Vec<String>>,
    #[serde(default)]
    pub value: String,
    pub location: SourceLocation,
    /// Cleared by `#undef` or an inactive conditional region
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    /// Other macros referenced by `value` (derived)
    #[serde(default)]
    pub dependencies: Vec<String>,
}

fn enabled_default() -> bool {
    true
}

impl MacroDefinition {
    pub fn object(name: impl Into<String>, value: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            name: name.into(),
            parameters: None,
            value: value.into(),
            location,
            enabled: true,
            dependencies: Vec::new(),
        }
    }

    pub fn function_like(
        name: impl Into<String>,
        parameters: &[&str],
        value: impl Into<String>,
        location: SourceLocation,
    ) -> Self {
        Self {
            parameters: Some(parameters.iter().map(|p| p.to_string()).collect()),
            ..Self::object(name, value, location)
        }
    }

    pub fn is_function_like(&self) -> bool {
        self.parameters.is_some()
    }

    /// Identifiers in the replacement text, minus the macro's own parameters
    pub fn referenced_identifiers(&self) -> Vec<String> {
        let params = self.parameters.as_deref().unwrap_or(&[]);
        let mut out: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut chars = self.value.chars().peekable();
        let mut prev_is_digit = false;

        while let Some(c) = chars.next() {
            if c.is_ascii_alphanumeric() || c == '_' {
                if current.is_empty() && c.is_ascii_digit() {
                    prev_is_digit = true;
                }
                if !prev_is_digit {
                    current.push(c);
                }
            } else {
                prev_is_digit = false;
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
                if c == '"' {
                    // skip string literal
                    for s in chars.by_ref() {
                        if s == '"' {
                            break;
                        }
                    }
                }
            }
        }
        if !current.is_empty() {
            out.push(current);
        }

        let mut unique: Vec<String> = Vec::new();
        for ident in out {
            if !params.contains(&ident) && ident != self.name && !unique.contains(&ident) {
                unique.push(ident);
            }
        }
        unique
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveKind {
    If,
    Ifdef,
    Ifndef,
    Elif,
    Else,
}

/// `#if`-family directive. `parent` is the id of the enclosing directive
/// (a plain lookup key, never an owning link).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalDirective {
    pub id: u32,
    pub kind: DirectiveKind,
    /// Expression for `#if/#elif`, macro name for `#ifdef/#ifndef`, empty for `#else`
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub parent: Option<u32>,
    /// For `#elif/#else`: id of the directive that opened the chain
    #[serde(default)]
    pub chain_head: Option<u32>,
    pub location: SourceLocation,
    #[serde(default)]
    pub end_line: Option<u32>,
}

impl ConditionalDirective {
    pub fn new(id: u32, kind: DirectiveKind, condition: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            id,
            kind,
            condition: condition.into(),
            parent: None,
            chain_head: None,
            location,
            end_line: None,
        }
    }

    pub fn nested_in(mut self, parent: u32) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn continuing(mut self, head: u32) -> Self {
        self.chain_head = Some(head);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeDirective {
    pub path: String,
    /// `<...>` rather than `"..."`
    #[serde(default)]
    pub is_system: bool,
    pub location: SourceLocation,
}

impl IncludeDirective {
    pub fn new(path: impl Into<String>, is_system: bool, location: SourceLocation) -> Self {
        Self {
            path: path.into(),
            is_system,
            location,
        }
    }
}
