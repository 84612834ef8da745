//! Variable constraints
//!
//! A [`VariableConstraint`] is the conjunction of everything known about one
//! variable's admissible values. Combining two constraints never widens
//! either: lower bounds take the max, upper bounds the min, allowed-value
//! lists intersect.

use crate::shared::models::{ScalarValue, ValueRange};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    MinValue,
    MaxValue,
    Range,
    Enumeration,
    ExactValue,
    Custom,
}

/// Where a bound came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintSource {
    /// Representable range of the declared type
    Type,
    /// Declared enumerators of an enum type
    Enum,
    /// Comparison in a guard or loop condition
    Guard,
    /// `// Range:` / `// Valid values:` comment
    Annotation,
    /// Used as index into a fixed-size array
    ArrayIndex,
    /// Supplied by the caller
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableConstraint {
    pub variable: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<ScalarValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<ScalarValue>,
    /// Allowed values; `None` means unrestricted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<ScalarValue>>,
    /// Extra boolean expressions over the variable, as source text
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom: Vec<String>,
    pub sources: BTreeSet<ConstraintSource>,
}

impl VariableConstraint {
    fn empty(variable: &str, source: ConstraintSource) -> Self {
        Self {
            variable: variable.to_string(),
            min: None,
            max: None,
            allowed: None,
            custom: Vec::new(),
            sources: BTreeSet::from([source]),
        }
    }

    pub fn min_value(variable: &str, min: ScalarValue, source: ConstraintSource) -> Self {
        Self {
            min: Some(min),
            ..Self::empty(variable, source)
        }
    }

    pub fn max_value(variable: &str, max: ScalarValue, source: ConstraintSource) -> Self {
        Self {
            max: Some(max),
            ..Self::empty(variable, source)
        }
    }

    pub fn range(variable: &str, range: ValueRange, source: ConstraintSource) -> Self {
        Self {
            min: Some(range.min),
            max: Some(range.max),
            ..Self::empty(variable, source)
        }
    }

    pub fn enumeration(variable: &str, values: Vec<ScalarValue>, source: ConstraintSource) -> Self {
        let mut values = values;
        dedup_values(&mut values);
        Self {
            allowed: Some(values),
            ..Self::empty(variable, source)
        }
    }

    pub fn exact(variable: &str, value: ScalarValue, source: ConstraintSource) -> Self {
        Self {
            min: Some(value),
            max: Some(value),
            ..Self::empty(variable, source)
        }
    }

    pub fn custom(variable: &str, expression: &str, source: ConstraintSource) -> Self {
        Self {
            custom: vec![expression.trim().to_string()],
            ..Self::empty(variable, source)
        }
    }

    /// Dominant kind of the aggregated constraint
    pub fn kind(&self) -> ConstraintKind {
        if self.exact_value().is_some() {
            return ConstraintKind::ExactValue;
        }
        if self.allowed.is_some() {
            return ConstraintKind::Enumeration;
        }
        match (self.min, self.max) {
            (Some(_), Some(_)) => ConstraintKind::Range,
            (Some(_), None) => ConstraintKind::MinValue,
            (None, Some(_)) => ConstraintKind::MaxValue,
            (None, None) => ConstraintKind::Custom,
        }
    }

    /// The single admissible value, if the bounds pin one down
    pub fn exact_value(&self) -> Option<ScalarValue> {
        if let Some(allowed) = &self.allowed {
            let admitted: Vec<&ScalarValue> = allowed.iter().filter(|v| self.within_bounds(v)).collect();
            return match admitted.as_slice() {
                [only] => Some(**only),
                _ => None,
            };
        }
        match (self.min, self.max) {
            (Some(lo), Some(hi)) if lo.compare(&hi) == Some(Ordering::Equal) => Some(lo),
            _ => None,
        }
    }

    pub fn as_range(&self) -> Option<ValueRange> {
        Some(ValueRange::new(self.min?, self.max?))
    }

    /// Conjunction of `self` and `other`
    pub fn intersect(&self, other: &VariableConstraint) -> VariableConstraint {
        let min = match (self.min, other.min) {
            (Some(a), Some(b)) => Some(if a.compare(&b) == Some(Ordering::Less) { b } else { a }),
            (a, b) => a.or(b),
        };
        let max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(if a.compare(&b) == Some(Ordering::Greater) { b } else { a }),
            (a, b) => a.or(b),
        };
        let allowed = match (&self.allowed, &other.allowed) {
            (Some(a), Some(b)) => Some(
                a.iter()
                    .filter(|v| b.iter().any(|w| v.compare(w) == Some(Ordering::Equal)))
                    .copied()
                    .collect(),
            ),
            (a, b) => a.clone().or_else(|| b.clone()),
        };
        let mut custom = self.custom.clone();
        for c in &other.custom {
            if !custom.contains(c) {
                custom.push(c.clone());
            }
        }
        VariableConstraint {
            variable: self.variable.clone(),
            min,
            max,
            allowed,
            custom,
            sources: self.sources.union(&other.sources).copied().collect(),
        }
    }

    fn within_bounds(&self, v: &ScalarValue) -> bool {
        let above = self
            .min
            .map_or(true, |lo| matches!(lo.compare(v), Some(Ordering::Less | Ordering::Equal)));
        let below = self
            .max
            .map_or(true, |hi| matches!(hi.compare(v), Some(Ordering::Greater | Ordering::Equal)));
        above && below
    }

    /// Whether `value` satisfies the numeric part (custom expressions are
    /// left to the solver)
    pub fn admits(&self, value: &ScalarValue) -> bool {
        self.within_bounds(value)
            && self
                .allowed
                .as_ref()
                .map_or(true, |a| a.iter().any(|w| w.compare(value) == Some(Ordering::Equal)))
    }

    /// No value can satisfy the numeric part
    pub fn is_contradictory(&self) -> bool {
        if let (Some(lo), Some(hi)) = (self.min, self.max) {
            if lo.compare(&hi) == Some(Ordering::Greater) {
                return true;
            }
        }
        self.allowed
            .as_ref()
            .is_some_and(|a| !a.iter().any(|v| self.within_bounds(v)))
    }
}

fn dedup_values(values: &mut Vec<ScalarValue>) {
    let mut out: Vec<ScalarValue> = Vec::with_capacity(values.len());
    for v in values.drain(..) {
        if !out.iter().any(|w| w.compare(&v) == Some(Ordering::Equal)) {
            out.push(v);
        }
    }
    *values = out;
}

impl fmt::Display for VariableConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        match self.kind() {
            ConstraintKind::ExactValue => {
                if let Some(v) = self.exact_value() {
                    parts.push(format!("{} == {v}", self.variable));
                }
            }
            _ => {
                if let Some(lo) = self.min {
                    parts.push(format!("{} >= {lo}", self.variable));
                }
                if let Some(hi) = self.max {
                    parts.push(format!("{} <= {hi}", self.variable));
                }
                if let Some(allowed) = &self.allowed {
                    let list: Vec<String> = allowed.iter().map(ToString::to_string).collect();
                    parts.push(format!("{} in {{{}}}", self.variable, list.join(", ")));
                }
            }
        }
        parts.extend(self.custom.iter().cloned());
        if parts.is_empty() {
            write!(f, "{}: unconstrained", self.variable)
        } else {
            f.write_str(&parts.join(" && "))
        }
    }
}

/// Aggregated constraints and declared types for one analysis request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSet {
    constraints: BTreeMap<String, VariableConstraint>,
    types: BTreeMap<String, String>,
    /// Input variables in declaration order (parameters, then globals)
    inputs: Vec<String>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a variable's declared type; the first declaration wins
    pub fn declare(&mut self, variable: &str, type_name: &str) {
        if !self.types.contains_key(variable) {
            self.types.insert(variable.to_string(), type_name.to_string());
        }
    }

    pub fn declare_input(&mut self, variable: &str, type_name: &str) {
        self.declare(variable, type_name);
        if !self.inputs.iter().any(|i| i == variable) {
            self.inputs.push(variable.to_string());
        }
    }

    /// Conjoin `constraint` into whatever is already known
    pub fn add(&mut self, constraint: VariableConstraint) {
        let merged = match self.constraints.get(&constraint.variable) {
            Some(existing) => existing.intersect(&constraint),
            None => constraint,
        };
        self.constraints.insert(merged.variable.clone(), merged);
    }

    pub fn get(&self, variable: &str) -> Option<&VariableConstraint> {
        self.constraints.get(variable)
    }

    pub fn type_of(&self, variable: &str) -> Option<&str> {
        self.types.get(variable).map(String::as_str)
    }

    pub fn types(&self) -> &BTreeMap<String, String> {
        &self.types
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn iter(&self) -> impl Iterator<Item = &VariableConstraint> {
        self.constraints.values()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Copy of this set with `extra` conjoined
    pub fn with(&self, extra: impl IntoIterator<Item = VariableConstraint>) -> ConstraintSet {
        let mut out = self.clone();
        for c in extra {
            out.add(c);
        }
        out
    }
}
