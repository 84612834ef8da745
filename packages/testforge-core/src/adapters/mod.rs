//! External adapters

pub mod ast_provider;

pub use ast_provider::{AstProvider, HeaderSource, JsonAstProvider, TranslationUnit};
