//! Struct, union, enum and typedef entities

use crate::shared::models::SourceLocation;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKind {
    Struct,
    Union,
}

/// One member as handed in by the front end. Size and alignment may come
/// pre-resolved; otherwise they are computed from `type_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<u64>,
}

impl Member {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            size: None,
            alignment: None,
        }
    }
}

/// Computed memory layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateLayout {
    pub size: u64,
    pub alignment: u64,
    pub member_offsets: Vec<u64>,
    pub member_sizes: Vec<u64>,
    /// Interior plus trailing padding
    pub padding_bytes: u64,
}

impl AggregateLayout {
    pub fn padding_ratio(&self) -> f64 {
        if self.size == 0 {
            0.0
        } else {
            self.padding_bytes as f64 / self.size as f64
        }
    }

    pub fn offset_of(&self, index: usize) -> Option<u64> {
        self.member_offsets.get(index).copied()
    }
}

/// Struct or union definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateDefinition {
    pub name: String,
    pub kind: AggregateKind,
    pub members: Vec<Member>,
    pub location: SourceLocation,
    /// Filled in once by layout computation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<AggregateLayout>,
}

impl AggregateDefinition {
    pub fn new(name: impl Into<String>, kind: AggregateKind, location: SourceLocation) -> Self {
        Self {
            name: name.into(),
            kind,
            members: Vec::new(),
            location,
            layout: None,
        }
    }

    pub fn structure(name: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(name, AggregateKind::Struct, location)
    }

    pub fn union(name: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(name, AggregateKind::Union, location)
    }

    pub fn with_member(mut self, name: &str, type_name: &str) -> Self {
        self.members.push(Member::new(name, type_name));
        self
    }

    pub fn member_index(&self, name: &str) -> Option<usize> {
        self.members.iter().position(|m| m.name == name)
    }

    pub fn is_union(&self) -> bool {
        self.kind == AggregateKind::Union
    }
}

/// One enumerator; `value` is assigned by [`EnumDefinition::number_values`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enumerator {
    pub name: String,
    /// Explicit initializer text, if any
    #[serde(default)]
    pub explicit: Option<String>,
    #[serde(default)]
    pub value: i128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDefinition {
    pub name: String,
    pub enumerators: Vec<Enumerator>,
    pub location: SourceLocation,
}

impl EnumDefinition {
    pub fn new(name: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            name: name.into(),
            enumerators: Vec::new(),
            location,
        }
    }

    pub fn with_enumerator(mut self, name: &str, explicit: Option<&str>) -> Self {
        self.enumerators.push(Enumerator {
            name: name.to_string(),
            explicit: explicit.map(str::to_string),
            value: 0,
        });
        self
    }

    /// Assign values with C rules: the first enumerator is 0, each next one
    /// is the previous plus one, and an explicit value restarts the count.
    /// `resolve` evaluates explicit initializers (literals, earlier
    /// enumerators, macros); unresolvable initializers continue the count.
    pub fn number_values(&mut self, resolve: impl Fn(&str, &[Enumerator]) -> Option<i128>) {
        let mut next = 0i128;
        for i in 0..self.enumerators.len() {
            let explicit = self.enumerators[i].explicit.clone();
            let value = explicit
                .as_deref()
                .and_then(|text| resolve(text, &self.enumerators[..i]))
                .unwrap_or(next);
            self.enumerators[i].value = value;
            next = value + 1;
        }
    }

    pub fn values(&self) -> Vec<i128> {
        self.enumerators.iter().map(|e| e.value).collect()
    }

    pub fn value_of(&self, enumerator: &str) -> Option<i128> {
        self.enumerators
            .iter()
            .find(|e| e.name == enumerator)
            .map(|e| e.value)
    }
}

/// `typedef <original_type> <alias>;`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedefDefinition {
    pub alias: String,
    pub original_type: String,
    pub location: SourceLocation,
}

impl TypedefDefinition {
    pub fn new(alias: impl Into<String>, original_type: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            alias: alias.into(),
            original_type: original_type.into(),
            location,
        }
    }
}
