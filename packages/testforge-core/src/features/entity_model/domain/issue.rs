//! Validation issues

use crate::shared::models::SourceLocation;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    DuplicateName,
    UnresolvedType,
    TypedefCycle,
    SelfContainment,
    UnknownCallee,
    UndefinedMacroDependency,
    OrphanDirective,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub kind: IssueKind,
    /// Name of the entity the issue is about
    pub entity: String,
    pub message: String,
    #[serde(default)]
    pub location: Option<SourceLocation>,
}

impl Issue {
    pub fn error(kind: IssueKind, entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, kind, entity, message)
    }

    pub fn warning(kind: IssueKind, entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, kind, entity, message)
    }

    pub fn info(kind: IssueKind, entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, kind, entity, message)
    }

    fn new(severity: Severity, kind: IssueKind, entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            kind,
            entity: entity.into(),
            message: message.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: &SourceLocation) -> Self {
        self.location = Some(location.clone());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}: {}", self.severity, self.entity, self.message)?;
        if let Some(loc) = &self.location {
            write!(f, " ({loc})")?;
        }
        Ok(())
    }
}
