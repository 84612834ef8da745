//! Solver sorts and the C type → sort mapping

use crate::features::type_resolution::TypedefRegistry;
use crate::shared::macros::trace;
use crate::shared::models::{CType, NumericClass, QualType, ScalarValue};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sort {
    Int,
    Real,
    Bool,
}

/// Every numeric class has exactly one sort
const SORT_TABLE: [(NumericClass, Sort); 4] = [
    (NumericClass::Integer, Sort::Int),
    (NumericClass::Floating, Sort::Real),
    (NumericClass::Boolean, Sort::Bool),
    (NumericClass::Void, Sort::Int),
];

impl Sort {
    pub fn of_class(class: NumericClass) -> Sort {
        SORT_TABLE
            .iter()
            .find(|(c, _)| *c == class)
            .map(|(_, s)| *s)
            .unwrap_or(Sort::Int)
    }

    /// Sort of a declared C type.
    ///
    /// Builtins map through their numeric class. Enums, pointers, arrays and
    /// aggregates are integers, and so is any name the registry cannot
    /// resolve.
    pub fn of_type(type_name: &str, registry: &TypedefRegistry) -> Sort {
        let terminal = match registry.resolve_or_infer(type_name) {
            Ok(resolved) => resolved.terminal,
            Err(err) => {
                trace!(type_name, %err, "unresolved type defaults to Int sort");
                return Sort::Int;
            }
        };
        Self::of_qual_type(&terminal)
    }

    pub fn of_qual_type(ty: &QualType) -> Sort {
        match &ty.ty {
            CType::Builtin(b) => Self::of_class(b.numeric_class()),
            _ => Sort::Int,
        }
    }

    pub fn zero(self) -> ScalarValue {
        match self {
            Sort::Int => ScalarValue::Int(0),
            Sort::Real => ScalarValue::Real(0.0),
            Sort::Bool => ScalarValue::Bool(false),
        }
    }

    /// Convert `value` the way a C assignment to this sort would
    pub fn coerce(self, value: ScalarValue) -> ScalarValue {
        match (self, value) {
            (Sort::Bool, v) => ScalarValue::Bool(v.truthy()),
            (Sort::Real, v) => ScalarValue::Real(v.as_f64()),
            (Sort::Int, ScalarValue::Real(r)) => ScalarValue::Int(r.trunc() as i128),
            (Sort::Int, v) => ScalarValue::Int(v.as_int().unwrap_or(0)),
        }
    }

    /// Sort of an arithmetic result over `self` and `other`
    pub fn join(self, other: Sort) -> Sort {
        if self == Sort::Real || other == Sort::Real {
            Sort::Real
        } else {
            Sort::Int
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sort::Int => "Int",
            Sort::Real => "Real",
            Sort::Bool => "Bool",
        })
    }
}
