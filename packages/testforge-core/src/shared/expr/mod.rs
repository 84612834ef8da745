//! C expression front end
//!
//! Guard text, assignment statements and preprocessor conditions all go
//! through this one parser. Evaluation here is concrete; symbolic lowering
//! lives in the SMT feature.

mod ast;
pub mod eval;
mod lexer;
mod parser;

pub use ast::{BinaryOp, Effect, Expr, UnaryOp};
pub use eval::{eval, ValueEnv};
pub use parser::{parse_effects, parse_expr};

use thiserror::Error;

/// Parse or evaluation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("empty expression")]
    Empty,

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),

    #[error("malformed literal '{0}'")]
    BadLiteral(String),

    #[error("expected {expected}, found '{found}'")]
    Expected { expected: &'static str, found: String },

    #[error("unexpected trailing input at '{0}'")]
    TrailingInput(String),

    #[error("not assignable: {0}")]
    NotAnLvalue(String),

    #[error("unsupported construct: {0}")]
    Unsupported(String),

    #[error("no value for '{0}'")]
    UnboundVariable(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow in '{0}'")]
    Overflow(&'static str),
}
