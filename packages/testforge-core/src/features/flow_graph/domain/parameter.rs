//! Parameter direction classification
//!
//! Direction is a heuristic read off the declared type, not a proof: a
//! non-const pointer might only ever be read. Callers that need certainty
//! plug in a more precise [`ParameterDirectionClassifier`].

use crate::features::entity_model::Parameter;
use crate::shared::models::{BuiltinType, CType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterDirection {
    Input,
    Output,
    InOut,
}

/// Strategy for deciding parameter direction
pub trait ParameterDirectionClassifier: Send + Sync {
    fn classify(&self, parameter: &Parameter) -> ParameterDirection;

    fn name(&self) -> &'static str;
}

/// Non-const pointers (and arrays) are in-out, everything else is input.
///
/// Pointers to non-const `void` and double pointers are reported as output,
/// since they are typically filled by the callee.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerConstHeuristic;

impl ParameterDirectionClassifier for PointerConstHeuristic {
    fn classify(&self, parameter: &Parameter) -> ParameterDirection {
        let ty = parameter.qual_type();
        if !ty.is_pointer_like() || ty.pointee_is_const() {
            return ParameterDirection::Input;
        }
        match &ty.ty {
            CType::FunctionPointer => ParameterDirection::Input,
            CType::Pointer(inner) => match &inner.ty {
                CType::Pointer(_) => ParameterDirection::Output,
                CType::Builtin(BuiltinType::Void) => ParameterDirection::Output,
                _ => ParameterDirection::InOut,
            },
            _ => ParameterDirection::InOut,
        }
    }

    fn name(&self) -> &'static str {
        "pointer-const heuristic"
    }
}

/// Classified parameter, as handed to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedParameter {
    pub name: String,
    pub type_name: String,
    pub direction: ParameterDirection,
    /// Classifier that produced the direction
    pub classifier: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(ty: &str) -> ParameterDirection {
        PointerConstHeuristic.classify(&Parameter::new("p", ty))
    }

    #[test]
    fn test_pointer_const_heuristic() {
        assert_eq!(classify("int"), ParameterDirection::Input);
        assert_eq!(classify("const char *"), ParameterDirection::Input);
        assert_eq!(classify("int *"), ParameterDirection::InOut);
        assert_eq!(classify("uint8_t[16]"), ParameterDirection::InOut);
        assert_eq!(classify("char **"), ParameterDirection::Output);
        assert_eq!(classify("void *"), ParameterDirection::Output);
        assert_eq!(classify("int (*cb)(int)"), ParameterDirection::Input);
    }
}
