//! Error types for testforge-core
//!
//! Structural failures escalate through [`EngineError`]. Per-branch analysis
//! failures (unlowerable guards, infeasible paths) are recorded as data in the
//! synthesis report and never surface here.

use crate::config::ConfigError;
use crate::features::entity_model::Issue;
use crate::features::smt::SolverError;
use thiserror::Error;

/// Main error type for engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// Requested function is not part of the translation unit
    #[error("Function not found: {0}")]
    FunctionNotFound(String),

    /// Source (or serialized translation unit) does not exist
    #[error("Source file not found: {0}")]
    SourceNotFound(String),

    /// Entity graph failed validation with error-level issues
    #[error("Malformed entity model: {} error(s), first: {}", .issues.len(), .issues.first().map(|i| i.message.as_str()).unwrap_or("-"))]
    MalformedModel { issues: Vec<Issue> },

    /// Solver internal failure (distinct from an infeasible result)
    #[error("Solver failure: {0}")]
    Solver(#[from] SolverError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Create a function-not-found error
    pub fn function_not_found(name: impl Into<String>) -> Self {
        EngineError::FunctionNotFound(name.into())
    }

    /// Create a source-not-found error
    pub fn source_not_found(path: impl Into<String>) -> Self {
        EngineError::SourceNotFound(path.into())
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
