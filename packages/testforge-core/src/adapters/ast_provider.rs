//! AST provider boundary
//!
//! Reading a translation unit is the only asynchronous operation in the
//! engine. Everything downstream of [`AstProvider::load`] is synchronous.

use crate::errors::{EngineError, Result};
use crate::features::entity_model::EntityModel;
use crate::shared::macros::debug;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Header text shipped with a translation unit for typedef discovery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderSource {
    pub file: String,
    pub text: String,
}

/// Front-end output for one source file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationUnit {
    pub model: EntityModel,
    pub headers: Vec<HeaderSource>,
}

impl TranslationUnit {
    pub fn new(model: EntityModel) -> Self {
        Self {
            model,
            headers: Vec::new(),
        }
    }
}

#[async_trait]
pub trait AstProvider: Send + Sync {
    /// Load the translation unit for `source`; a missing source is
    /// [`EngineError::SourceNotFound`]
    async fn load(&self, source: &str) -> Result<TranslationUnit>;
}

/// Reads translation units serialised as JSON, relative to a root directory
#[derive(Debug, Clone)]
pub struct JsonAstProvider {
    root: PathBuf,
}

impl JsonAstProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_of(&self, source: &str) -> PathBuf {
        let p = Path::new(source);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        }
    }
}

#[async_trait]
impl AstProvider for JsonAstProvider {
    async fn load(&self, source: &str) -> Result<TranslationUnit> {
        let path = self.path_of(source);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(EngineError::source_not_found(path.display().to_string()));
        }
        let content = tokio::fs::read_to_string(&path).await?;
        let unit: TranslationUnit = serde_json::from_str(&content)?;
        debug!(
            path = %path.display(),
            functions = unit.model.functions().len(),
            headers = unit.headers.len(),
            "translation unit loaded"
        );
        Ok(unit)
    }
}
