//! Typedef mapping and chain resolution

use crate::shared::models::{CType, QualType, ValueRange};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Where a mapping came from. Earlier variants take priority when two
/// registrations disagree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "origin", rename_all = "snake_case")]
pub enum TypedefSource {
    /// Built-in defaults shipped with the engine
    Builtin,
    /// Persisted configuration loaded from disk
    Persisted,
    /// `typedef` declaration in the analysed translation unit
    Model,
    /// Discovered by scanning a header file
    Header(String),
    /// Guessed from the type name (`UINT16` → `unsigned short`)
    Inferred,
}

impl TypedefSource {
    pub(crate) fn priority(&self) -> u8 {
        match self {
            TypedefSource::Builtin => 0,
            TypedefSource::Persisted => 1,
            TypedefSource::Model | TypedefSource::Header(_) => 2,
            TypedefSource::Inferred => 3,
        }
    }
}

/// One user type → base type entry with its derived facts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedefMapping {
    pub user_type: String,
    pub base_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<ValueRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    pub source: TypedefSource,
}

impl TypedefMapping {
    pub fn new(user_type: impl Into<String>, base_type: impl Into<String>, source: TypedefSource) -> Self {
        Self {
            user_type: user_type.into(),
            base_type: base_type.into(),
            bounds: None,
            size: None,
            source,
        }
    }

    pub fn with_bounds(mut self, bounds: ValueRange) -> Self {
        self.bounds = Some(bounds);
        self
    }
}

/// Typedef resolution failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypedefError {
    #[error("typedef cycle: {}", .chain.join(" -> "))]
    Cycle { chain: Vec<String> },

    #[error("unknown type name '{name}'")]
    Unknown { name: String },
}

/// Result of following a typedef chain to its end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedType {
    /// Alias names visited, starting with the queried name
    pub chain: Vec<String>,
    /// Builtin, aggregate, pointer or array the chain ends in
    pub terminal: QualType,
}

impl ResolvedType {
    pub fn hops(&self) -> usize {
        self.chain.len()
    }
}

/// Follow `name` through `lookup` until it reaches a non-alias type.
///
/// Follows at most `limit` registered aliases; with `limit` set to the
/// number of registered aliases an acyclic chain always fits, so exceeding
/// it (or revisiting a name) is reported as a cycle. A name with no entry
/// ends the chain as [`TypedefError::Unknown`], whatever the chain length.
pub fn resolve_chain<F>(name: &str, lookup: F, limit: usize) -> Result<ResolvedType, TypedefError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut chain: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut current = QualType::parse(name);
    let mut carried_const = current.is_const;

    loop {
        let alias = match &current.ty {
            CType::Named(n) => n.clone(),
            _ => {
                current.is_const |= carried_const;
                return Ok(ResolvedType {
                    chain,
                    terminal: current,
                });
            }
        };

        if !seen.insert(alias.clone()) {
            chain.push(alias);
            return Err(TypedefError::Cycle { chain });
        }

        let Some(base) = lookup(&alias) else {
            return Err(TypedefError::Unknown { name: alias });
        };
        chain.push(alias);
        // Only registered aliases count against the limit
        if chain.len() > limit {
            return Err(TypedefError::Cycle { chain });
        }
        current = QualType::parse(&base);
        carried_const |= current.is_const;
    }
}
