//! SMT infrastructure: lowering, path encoding and solver backends

pub mod interval;
pub mod lowering;
pub mod path_encoder;
pub mod solvers;

pub use lowering::{lower_condition_text, lower_constraint, lower_expr, Symbol, SymbolScope};
pub use path_encoder::{encode_path, PathEncoder};
pub use solvers::{create_backend, BoundedSearchSolver, SmtBackend};
