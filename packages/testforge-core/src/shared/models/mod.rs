//! Shared models

pub mod ast;
pub mod c_type;
mod span;
pub mod value;

pub use ast::{AstNode, BodyBuilder, CallSite, FunctionBody, NodeCategory, NodeId, NodeKind};
pub use c_type::{BuiltinType, CType, DataModel, NumericClass, QualType, TargetAbi};
pub use span::SourceLocation;
pub use value::{ScalarValue, ValueRange};
