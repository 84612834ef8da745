//! Typedef domain types

mod typedef_mapping;

pub use typedef_mapping::{
    resolve_chain, ResolvedType, TypedefError, TypedefMapping, TypedefSource,
};
