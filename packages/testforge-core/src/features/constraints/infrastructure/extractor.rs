//! Constraint extraction
//!
//! Per variable: the declared type's representable range (through the
//! typedef registry), enum membership, comment annotations, array-index
//! usage and loop bounds. Guard comparisons of the analysed function are
//! only intersected when [`ConstraintConfig::use_guard_bounds`] is set.

use crate::config::ConstraintConfig;
use crate::features::constraints::domain::{ConstraintSet, ConstraintSource, VariableConstraint};
use crate::features::entity_model::{EntityModel, Function, Variable, VariableScope};
use crate::features::type_resolution::TypedefRegistry;
use crate::shared::expr::{parse_expr, BinaryOp, Expr, UnaryOp};
use crate::shared::models::{CType, NodeKind, QualType, ScalarValue, ValueRange};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static RANGE_NOTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:valid range|value range|range)\s*:\s*(-?\d+(?:\.\d+)?|[A-Za-z_]\w*)\s*(?:to|\.\.|-)\s*(-?\d+(?:\.\d+)?|[A-Za-z_]\w*)",
    )
    .expect("static regex")
});

static VALUES_NOTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:valid values|allowed|values)\s*:\s*([\w\s,.\-']+)").expect("static regex")
});

static MIN_NOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bmin(?:imum)?\s*:\s*(-?[\w.]+)").expect("static regex"));

static MAX_NOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bmax(?:imum)?\s*:\s*(-?[\w.]+)").expect("static regex"));

pub struct ConstraintExtractor<'a> {
    model: &'a EntityModel,
    registry: &'a TypedefRegistry,
    config: ConstraintConfig,
    constants: HashMap<String, ScalarValue>,
}

impl<'a> ConstraintExtractor<'a> {
    pub fn new(model: &'a EntityModel, registry: &'a TypedefRegistry, config: &ConstraintConfig) -> Self {
        Self {
            model,
            registry,
            config: config.clone(),
            constants: model.named_constants(),
        }
    }

    /// Macro and enumerator values used when bounds are written symbolically
    pub fn constants(&self) -> &HashMap<String, ScalarValue> {
        &self.constants
    }

    fn value_of(&self, text: &str) -> Option<ScalarValue> {
        let t = text.trim();
        ScalarValue::parse_c_literal(t).or_else(|| self.constants.get(t).copied())
    }

    /// Range or enumeration implied by `type_name`
    pub fn type_constraint(&self, variable: &str, type_name: &str) -> Option<VariableConstraint> {
        if let Some(values) = self.enum_values(type_name) {
            return Some(VariableConstraint::enumeration(
                variable,
                values.into_iter().map(ScalarValue::Int).collect(),
                ConstraintSource::Enum,
            ));
        }
        self.registry
            .bounds_of(type_name)
            .map(|range| VariableConstraint::range(variable, range, ConstraintSource::Type))
    }

    fn enum_values(&self, type_name: &str) -> Option<Vec<i128>> {
        let qt = QualType::parse(type_name);
        let tag = match &qt.ty {
            CType::Enum(tag) => tag.clone(),
            CType::Named(name) => {
                if let Some(e) = self.model.enum_def(name) {
                    return Some(e.values()).filter(|v| !v.is_empty());
                }
                let resolved = self.registry.resolve_chain(name).ok()?;
                match resolved.terminal.ty {
                    CType::Enum(tag) => tag,
                    _ => return None,
                }
            }
            _ => return None,
        };
        self.model
            .enum_def(&tag)
            .map(|e| e.values())
            .filter(|v| !v.is_empty())
    }

    /// Constraints written in a declaration comment
    pub fn annotation_constraints(&self, variable: &str, note: &str) -> Vec<VariableConstraint> {
        let mut out = Vec::new();
        if let Some(caps) = RANGE_NOTE.captures(note) {
            let lo = caps.get(1).and_then(|m| self.value_of(m.as_str()));
            let hi = caps.get(2).and_then(|m| self.value_of(m.as_str()));
            if let (Some(lo), Some(hi)) = (lo, hi) {
                out.push(VariableConstraint::range(
                    variable,
                    ValueRange::new(lo, hi),
                    ConstraintSource::Annotation,
                ));
            }
        }
        if let Some(caps) = VALUES_NOTE.captures(note) {
            let values: Vec<ScalarValue> = caps
                .get(1)
                .map(|m| m.as_str())
                .unwrap_or_default()
                .split([',', ' ', '\t'])
                .filter(|s| !s.trim().is_empty())
                .filter_map(|s| self.value_of(s))
                .collect();
            if !values.is_empty() {
                out.push(VariableConstraint::enumeration(variable, values, ConstraintSource::Annotation));
            }
        }
        if out.is_empty() {
            if let Some(lo) = MIN_NOTE.captures(note).and_then(|c| c.get(1)).and_then(|m| self.value_of(m.as_str())) {
                out.push(VariableConstraint::min_value(variable, lo, ConstraintSource::Annotation));
            }
            if let Some(hi) = MAX_NOTE.captures(note).and_then(|c| c.get(1)).and_then(|m| self.value_of(m.as_str())) {
                out.push(VariableConstraint::max_value(variable, hi, ConstraintSource::Annotation));
            }
        }
        out
    }

    /// Declared-type and annotation constraints of one variable, merged
    pub fn extract_variable(&self, variable: &Variable) -> Option<VariableConstraint> {
        let mut parts = Vec::new();
        parts.extend(self.type_constraint(&variable.name, &variable.type_name));
        if self.config.use_annotations {
            if let Some(note) = &variable.annotation {
                parts.extend(self.annotation_constraints(&variable.name, note));
            }
        }
        parts.into_iter().reduce(|acc, c| acc.intersect(&c))
    }

    /// Inputs, declared types and aggregated constraints for `function`.
    ///
    /// Inputs are the parameters followed by the globals the function
    /// reads; locals are declared (for sort mapping) but not inputs.
    pub fn extract_for_function(&self, function: &Function) -> ConstraintSet {
        let mut set = ConstraintSet::new();
        let recorded = self.model.variables_of(&function.name);

        for p in &function.parameters {
            if p.name.is_empty() {
                continue;
            }
            set.declare_input(&p.name, &p.type_name);
            let var = recorded
                .iter()
                .find(|v| v.name == p.name && v.scope == VariableScope::Parameter)
                .copied();
            let constraint = match var {
                Some(v) => self.extract_variable(v),
                None => self.type_constraint(&p.name, &p.type_name),
            };
            add_some(&mut set, constraint);
        }

        for g in self.globals_used_by(function) {
            set.declare_input(&g.name, &g.type_name);
            add_some(&mut set, self.extract_variable(g));
        }

        for v in recorded.iter().filter(|v| v.scope != VariableScope::Parameter) {
            set.declare(&v.name, &v.type_name);
        }
        if let Some(body) = &function.body {
            for node in &body.nodes {
                if let NodeKind::Declaration { name, type_name, .. } = &node.kind {
                    set.declare(name, type_name);
                }
            }
        }

        if self.config.derive_array_index_bounds {
            for c in self.array_index_constraints(function) {
                set.add(c);
            }
        }
        if self.config.derive_loop_bounds {
            for c in self.loop_bound_constraints(function) {
                set.add(c);
            }
        }
        if self.config.use_guard_bounds {
            let inputs: Vec<String> = set.inputs().to_vec();
            for c in self.guard_constraints(function, &inputs) {
                set.add(c);
            }
        }
        set
    }

    fn globals_used_by(&self, function: &Function) -> Vec<&'a Variable> {
        let model = self.model;
        model
            .variables()
            .iter()
            // const globals with an initializer are constants, not inputs
            .filter(|v| v.function.is_none() && !(v.is_const() && v.default_value.is_some()))
            .filter(|v| v.used_by.contains(&function.name))
            .filter(|v| function.parameter(&v.name).is_none())
            .collect()
    }

    /// `[0, N-1]` for identifiers used to index a `T[N]` visible in `function`
    fn array_index_constraints(&self, function: &Function) -> Vec<VariableConstraint> {
        let Some(body) = &function.body else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for node in &body.nodes {
            let Some(text) = node.source_text() else {
                continue;
            };
            let Ok(expr) = parse_expr(text) else {
                continue;
            };
            expr.visit(&mut |e| {
                if let Expr::Index(array, index) = e {
                    if let (Expr::Var(array), Expr::Var(index)) = (array.as_ref(), index.as_ref()) {
                        if let Some(len) = self.array_length(function, array) {
                            if len > 0 {
                                out.push(VariableConstraint::range(
                                    index,
                                    ValueRange::ints(0, i128::from(len) - 1),
                                    ConstraintSource::ArrayIndex,
                                ));
                            }
                        }
                    }
                }
            });
        }
        out
    }

    fn array_length(&self, function: &Function, array: &str) -> Option<u64> {
        let type_name = function
            .parameter(array)
            .map(|p| p.type_name.clone())
            .or_else(|| {
                self.model
                    .visible_variable(&function.name, array)
                    .map(|v| v.type_name.clone())
            })?;
        match QualType::parse(&type_name).ty {
            CType::Array(_, len) => len,
            _ => None,
        }
    }

    /// Upper bounds of `for` counters (`for (i = 0; i < 8; i++)` → `i <= 7`).
    /// Only counters initialised by the loop are bounded, so inputs are
    /// never narrowed by a loop condition.
    fn loop_bound_constraints(&self, function: &Function) -> Vec<VariableConstraint> {
        let Some(body) = &function.body else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for node in &body.nodes {
            let NodeKind::For {
                init: Some(init),
                condition: Some(condition),
                ..
            } = &node.kind
            else {
                continue;
            };
            let Ok(cond) = parse_expr(condition) else {
                continue;
            };
            for (var, op, bound) in self.comparisons(&cond) {
                if !assigns(init, &var) {
                    continue;
                }
                let max = match (op, bound) {
                    (BinaryOp::Lt, ScalarValue::Int(b)) => ScalarValue::Int(b.saturating_sub(1)),
                    (BinaryOp::Le, b) | (BinaryOp::Lt, b) => b,
                    _ => continue,
                };
                out.push(VariableConstraint::max_value(&var, max, ConstraintSource::Guard));
            }
        }
        out
    }

    /// Comparisons against constants in the function's own guards
    fn guard_constraints(&self, function: &Function, inputs: &[String]) -> Vec<VariableConstraint> {
        let Some(body) = &function.body else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for node in &body.nodes {
            if matches!(node.kind, NodeKind::Switch { .. }) {
                continue;
            }
            let Some(text) = node.condition_text() else {
                continue;
            };
            let Ok(cond) = parse_expr(text) else {
                continue;
            };
            for (var, op, bound) in self.comparisons(&cond) {
                if !inputs.contains(&var) {
                    continue;
                }
                let strict_step = |v: ScalarValue, up: bool| match v {
                    ScalarValue::Int(i) if up => ScalarValue::Int(i.saturating_add(1)),
                    ScalarValue::Int(i) => ScalarValue::Int(i.saturating_sub(1)),
                    other => other,
                };
                let c = match op {
                    BinaryOp::Lt => VariableConstraint::max_value(&var, strict_step(bound, false), ConstraintSource::Guard),
                    BinaryOp::Le => VariableConstraint::max_value(&var, bound, ConstraintSource::Guard),
                    BinaryOp::Gt => VariableConstraint::min_value(&var, strict_step(bound, true), ConstraintSource::Guard),
                    BinaryOp::Ge => VariableConstraint::min_value(&var, bound, ConstraintSource::Guard),
                    BinaryOp::Eq => VariableConstraint::exact(&var, bound, ConstraintSource::Guard),
                    _ => continue,
                };
                out.push(c);
            }
        }
        out
    }

    /// `var op constant` atoms of the top-level conjunction, normalised so
    /// the variable is on the left
    fn comparisons(&self, expr: &Expr) -> Vec<(String, BinaryOp, ScalarValue)> {
        let mut atoms = Vec::new();
        conjuncts(expr, &mut atoms);
        atoms
            .into_iter()
            .filter_map(|atom| match atom {
                Expr::Binary(op, lhs, rhs) if op.is_comparison() => {
                    match (lhs.as_ref(), rhs.as_ref()) {
                        (Expr::Var(v), other) => self.constant(other).map(|c| (v.clone(), *op, c)),
                        (other, Expr::Var(v)) => self.constant(other).map(|c| (v.clone(), op.mirrored(), c)),
                        _ => None,
                    }
                }
                _ => None,
            })
            .filter(|(v, _, _)| !self.constants.contains_key(v))
            .collect()
    }

    fn constant(&self, expr: &Expr) -> Option<ScalarValue> {
        match expr {
            Expr::Int(v) => Some(ScalarValue::Int(*v)),
            Expr::Real(v) => Some(ScalarValue::Real(*v)),
            Expr::Var(name) => self.constants.get(name).copied(),
            Expr::Unary(UnaryOp::Neg, inner) => match self.constant(inner)? {
                ScalarValue::Int(v) => v.checked_neg().map(ScalarValue::Int),
                ScalarValue::Real(v) => Some(ScalarValue::Real(-v)),
                ScalarValue::Bool(_) => None,
            },
            _ => None,
        }
    }
}

fn conjuncts<'e>(expr: &'e Expr, out: &mut Vec<&'e Expr>) {
    match expr {
        Expr::Binary(BinaryOp::And, a, b) => {
            conjuncts(a, out);
            conjuncts(b, out);
        }
        other => out.push(other),
    }
}

/// Whether a `for` initializer assigns `var`
fn assigns(init: &str, var: &str) -> bool {
    init.split(',').any(|part| {
        part.split_once('=')
            .map(|(lhs, _)| lhs.split_whitespace().last() == Some(var))
            .unwrap_or(false)
    })
}

fn add_some(set: &mut ConstraintSet, constraint: Option<VariableConstraint>) {
    if let Some(c) = constraint {
        set.add(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::entity_model::EnumDefinition;
    use crate::shared::models::{BodyBuilder, SourceLocation, TargetAbi};
    use pretty_assertions::assert_eq;

    fn loc() -> SourceLocation {
        SourceLocation::new("c.c", 1)
    }

    fn finalized(mut model: EntityModel) -> (EntityModel, TypedefRegistry) {
        let registry = TypedefRegistry::with_defaults(TargetAbi::default());
        model.finalize(&registry);
        (model, registry)
    }

    #[test]
    fn test_unsigned_char_range() {
        let (model, registry) = finalized(EntityModel::new("c.c"));
        let ex = ConstraintExtractor::new(&model, &registry, &ConstraintConfig::default());
        let c = ex.type_constraint("count", "unsigned char").unwrap();
        assert_eq!(c.as_range(), Some(ValueRange::ints(0, 255)));
        assert!(c.sources.contains(&ConstraintSource::Type));
        let c = ex.type_constraint("v", "uint16_t").unwrap();
        assert_eq!(c.as_range(), Some(ValueRange::ints(0, 65535)));
        assert!(ex.type_constraint("p", "int *").is_none());
    }

    #[test]
    fn test_enum_typed_variable() {
        let mut model = EntityModel::new("c.c");
        model.add_enum(
            EnumDefinition::new("mode", loc())
                .with_enumerator("OFF", None)
                .with_enumerator("ON", None)
                .with_enumerator("AUTO", Some("7")),
        );
        let (model, registry) = finalized(model);
        let ex = ConstraintExtractor::new(&model, &registry, &ConstraintConfig::default());
        let c = ex.type_constraint("m", "enum mode").unwrap();
        assert_eq!(
            c.allowed,
            Some(vec![ScalarValue::Int(0), ScalarValue::Int(1), ScalarValue::Int(7)])
        );
    }

    #[test]
    fn test_annotations() {
        let (model, registry) = finalized(EntityModel::new("c.c"));
        let ex = ConstraintExtractor::new(&model, &registry, &ConstraintConfig::default());
        let v = Variable::new("speed", "int", loc()).with_annotation("// Range: 1 to 10");
        let c = ex.extract_variable(&v).unwrap();
        assert_eq!(c.as_range(), Some(ValueRange::ints(1, 10)));

        let notes = ex.annotation_constraints("baud", "/* Valid values: 1, 2, 4 */");
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].allowed.as_ref().map(Vec::len), Some(3));
    }

    #[test]
    fn test_function_inputs_and_array_index() {
        let mut b = BodyBuilder::new();
        let r = b.ret(Some("table[idx] + count"), 2);
        let root = b.compound(vec![r], 1);
        let f = Function::new("lookup", "int", loc())
            .with_param("table", "const int[16]")
            .with_param("idx", "int")
            .with_param("count", "unsigned char")
            .with_body(b.finish(root));
        let mut model = EntityModel::new("c.c");
        model.add_function(f);
        let (model, registry) = finalized(model);
        let ex = ConstraintExtractor::new(&model, &registry, &ConstraintConfig::default());
        let f = model.function("lookup").unwrap();
        let set = ex.extract_for_function(f);
        assert_eq!(set.inputs(), ["table", "idx", "count"].map(String::from));
        assert_eq!(set.get("idx").and_then(|c| c.as_range()), Some(ValueRange::ints(0, 15)));
        assert_eq!(set.get("count").and_then(|c| c.as_range()), Some(ValueRange::ints(0, 255)));
    }

    #[test]
    fn test_guard_bounds_are_opt_in() {
        let mut b = BodyBuilder::new();
        let r0 = b.ret(Some("0"), 2);
        let guard = b.if_stmt("x >= 10 && x < 20", r0, None, 2);
        let root = b.compound(vec![guard], 1);
        let f = Function::new("g", "int", loc()).with_param("x", "int").with_body(b.finish(root));
        let (model, registry) = finalized(EntityModel::new("c.c"));

        let off = ConstraintExtractor::new(&model, &registry, &ConstraintConfig::default());
        let range = off.extract_for_function(&f).get("x").and_then(|c| c.as_range());
        assert_eq!(range, Some(ValueRange::ints(i32::MIN as i128, i32::MAX as i128)));

        let on = ConstraintExtractor::new(&model, &registry, &ConstraintConfig::default().use_guard_bounds(true));
        let range = on.extract_for_function(&f).get("x").and_then(|c| c.as_range());
        assert_eq!(range, Some(ValueRange::ints(10, 19)));
    }

    #[test]
    fn test_loop_counter_bound() {
        let mut b = BodyBuilder::new();
        let s = b.expr("acc += i", 2);
        let body = b.compound(vec![s], 2);
        let l = b.for_stmt(Some("int i = 0"), Some("i < 8"), Some("i++"), body, 1);
        let root = b.compound(vec![l], 1);
        let f = Function::new("sum", "void", loc()).with_body(b.finish(root));
        let (model, registry) = finalized(EntityModel::new("c.c"));
        let ex = ConstraintExtractor::new(&model, &registry, &ConstraintConfig::default());
        let set = ex.extract_for_function(&f);
        assert_eq!(set.get("i").and_then(|c| c.max), Some(ScalarValue::Int(7)));
        assert!(set.inputs().is_empty());
    }

    #[test]
    fn test_guard_against_extreme_literal() {
        let mut b = BodyBuilder::new();
        let r1 = b.ret(Some("1"), 2);
        let guard = b.if_stmt("x > 170141183460469231731687303715884105727", r1, None, 2);
        let r0 = b.ret(Some("0"), 3);
        let root = b.compound(vec![guard, r0], 1);
        let mut model = EntityModel::new("c.c");
        model.add_function(
            Function::new("edge", "int", loc())
                .with_param("x", "long long")
                .with_body(b.finish(root)),
        );
        let (model, registry) = finalized(model);
        let config = ConstraintConfig::default().use_guard_bounds(true);
        let ex = ConstraintExtractor::new(&model, &registry, &config);
        let set = ex.extract_for_function(model.function("edge").unwrap());
        assert!(set.get("x").unwrap().is_contradictory());
    }
}
