//! SSA encoding of path facts
//!
//! Every assignment along a path creates a new version of its target
//! (`x`, `x!1`, `x!2`, ...), defined by an equality over earlier versions.
//! Guards read the versions current at their position, so a guard on a
//! derived local constrains the inputs it was computed from. Version 0 of a
//! variable is its value on entry; extracted constraints apply there.

use crate::features::constraints::ConstraintSet;
use crate::features::flow_graph::{ControlFlowPath, PathFact};
use crate::features::smt::domain::{ComparisonOp, LoweringError, SmtProblem, Sort, Term};
use crate::features::smt::infrastructure::lowering::{
    convert, lower_condition_text, lower_constraint, lower_expr, to_bool, to_num, Symbol,
    SymbolScope,
};
use crate::features::type_resolution::TypedefRegistry;
use crate::shared::expr::{parse_expr, Expr};
use crate::shared::macros::debug;
use crate::shared::models::ScalarValue;
use std::collections::HashMap;

pub struct PathEncoder<'a> {
    constraints: &'a ConstraintSet,
    constants: &'a HashMap<String, ScalarValue>,
    registry: &'a TypedefRegistry,
    problem: SmtProblem,
    versions: HashMap<String, u32>,
    sorts: HashMap<String, Sort>,
    /// Variables read at version 0 whose constraints are not asserted yet
    pending: Vec<String>,
}

impl<'a> PathEncoder<'a> {
    /// Start a problem with every input declared and constrained
    pub fn new(
        constraints: &'a ConstraintSet,
        constants: &'a HashMap<String, ScalarValue>,
        registry: &'a TypedefRegistry,
    ) -> Result<Self, LoweringError> {
        let mut encoder = Self {
            constraints,
            constants,
            registry,
            problem: SmtProblem::new(),
            versions: HashMap::new(),
            sorts: HashMap::new(),
            pending: Vec::new(),
        };
        for input in constraints.inputs() {
            encoder.problem.add_input(input.clone());
            encoder.resolve(input);
        }
        encoder.flush()?;
        Ok(encoder)
    }

    /// Assert a guard at the current position
    pub fn guard(&mut self, condition: &str) -> Result<(), LoweringError> {
        let term = lower_condition_text(condition, self)?;
        self.flush()?;
        self.problem.assert(term);
        Ok(())
    }

    /// `target = value`; an unlowerable value leaves the target unconstrained
    pub fn assign(&mut self, target: &str, value: &Expr) -> Result<(), LoweringError> {
        let lowered = lower_expr(value, self);
        self.flush()?;
        let sort = self.sort_of(target);
        let next = self.bump(target);
        match lowered {
            Ok((term, from)) => self.problem.define(next, sort, convert(term, from, sort)),
            Err(err) => {
                debug!(target, %err, "assignment not lowerable; target unconstrained");
                self.problem.declare(next, sort);
            }
        }
        Ok(())
    }

    pub fn havoc(&mut self, target: &str) {
        let sort = self.sort_of(target);
        let next = self.bump(target);
        self.problem.declare(next, sort);
    }

    /// Record the value of `text` at the current position as the result.
    /// A result that cannot be lowered is simply left out.
    pub fn result(&mut self, text: &str) -> Result<(), LoweringError> {
        let lowered = parse_expr(text)
            .map_err(|source| LoweringError::Parse {
                text: text.to_string(),
                source,
            })
            .and_then(|expr| lower_expr(&expr, self));
        self.flush()?;
        match lowered {
            Ok((term, _)) => self.problem.result = Some(term),
            Err(err) => debug!(result = text, %err, "result expression not lowerable"),
        }
        Ok(())
    }

    /// Require `text` to evaluate to `value`
    pub fn require_value(&mut self, text: &str, value: ScalarValue) -> Result<(), LoweringError> {
        let expr = parse_expr(text).map_err(|source| LoweringError::Parse {
            text: text.to_string(),
            source,
        })?;
        let (term, sort) = lower_expr(&expr, self)?;
        self.flush()?;
        let term = match value {
            ScalarValue::Bool(b) => {
                let truth = to_bool(term, sort);
                if b {
                    truth
                } else {
                    truth.negate()
                }
            }
            v => Term::cmp(ComparisonOp::Eq, to_num(term, sort), Term::Const(v)),
        };
        self.problem.assert(term);
        Ok(())
    }

    /// Rule out `value` for the entry value of `variable`
    pub fn exclude(&mut self, variable: &str, value: ScalarValue) -> Result<(), LoweringError> {
        let (term, sort) = match self.resolve_entry(variable) {
            Some(s) => s,
            None => return Ok(()),
        };
        self.flush()?;
        let term = Term::cmp(ComparisonOp::Ne, to_num(term, sort), Term::Const(value));
        self.problem.assert(term);
        Ok(())
    }

    pub fn finish(self) -> SmtProblem {
        self.problem
    }

    fn resolve_entry(&mut self, variable: &str) -> Option<(Term, Sort)> {
        match self.resolve(variable) {
            Symbol::Var { sort, .. } => Some((Term::var(variable), sort)),
            Symbol::Const(_) => None,
        }
    }

    fn is_declared(&self, name: &str) -> bool {
        self.constraints.type_of(name).is_some() || self.constraints.get(name).is_some()
    }

    fn sort_of(&mut self, name: &str) -> Sort {
        if let Some(sort) = self.sorts.get(name) {
            return *sort;
        }
        let sort = self
            .constraints
            .type_of(name)
            .map(|t| Sort::of_type(t, self.registry))
            .unwrap_or(Sort::Int);
        self.sorts.insert(name.to_string(), sort);
        sort
    }

    fn bump(&mut self, name: &str) -> String {
        let version = self.versions.get(name).map_or(1, |v| v + 1);
        self.versions.insert(name.to_string(), version);
        ssa_name(name, version)
    }

    /// Assert constraints of variables first read since the last flush
    fn flush(&mut self) -> Result<(), LoweringError> {
        let constraints = self.constraints;
        while let Some(name) = self.pending.pop() {
            let Some(constraint) = constraints.get(&name) else {
                continue;
            };
            // Constraints speak about the entry value even after reassignment
            let saved = self.versions.insert(name.clone(), 0);
            let lowered = lower_constraint(constraint, self);
            if let Some(v) = saved {
                self.versions.insert(name.clone(), v);
            }
            for term in lowered? {
                self.problem.assert(term);
            }
        }
        Ok(())
    }
}

impl SymbolScope for PathEncoder<'_> {
    fn resolve(&mut self, name: &str) -> Symbol {
        if let Some(version) = self.versions.get(name).copied() {
            let sort = self.sort_of(name);
            return Symbol::Var {
                name: ssa_name(name, version),
                sort,
            };
        }
        if !self.is_declared(name) {
            if let Some(value) = self.constants.get(name) {
                return Symbol::Const(*value);
            }
            // Access paths and undeclared globals are opaque inputs
            self.problem.add_input(name.to_string());
        }
        let sort = self.sort_of(name);
        self.versions.insert(name.to_string(), 0);
        self.problem.declare(name.to_string(), sort);
        self.pending.push(name.to_string());
        Symbol::Var {
            name: name.to_string(),
            sort,
        }
    }
}

fn ssa_name(name: &str, version: u32) -> String {
    if version == 0 {
        name.to_string()
    } else {
        format!("{name}!{version}")
    }
}

/// Encode a whole path: inputs and their constraints, then each fact in
/// order, then the return expression.
pub fn encode_path(
    path: &ControlFlowPath,
    constraints: &ConstraintSet,
    constants: &HashMap<String, ScalarValue>,
    registry: &TypedefRegistry,
) -> Result<SmtProblem, LoweringError> {
    let mut encoder = PathEncoder::new(constraints, constants, registry)?;
    for fact in &path.facts {
        match fact {
            PathFact::Guard { condition, .. } => encoder.guard(condition)?,
            PathFact::Assign { target, value } => encoder.assign(target, value)?,
            PathFact::Havoc { target } => encoder.havoc(target),
        }
    }
    if let Some(ret) = &path.return_value {
        encoder.result(ret)?;
    }
    Ok(encoder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::constraints::{ConstraintSource, VariableConstraint};
    use crate::features::flow_graph::BranchId;
    use crate::shared::models::{TargetAbi, ValueRange};

    fn set() -> ConstraintSet {
        let mut s = ConstraintSet::new();
        s.declare_input("x", "int");
        s.declare("y", "int");
        s.add(VariableConstraint::range("x", ValueRange::ints(-50, 50), ConstraintSource::Type));
        s
    }

    fn path(facts: Vec<PathFact>, ret: Option<&str>) -> ControlFlowPath {
        ControlFlowPath {
            id: 0,
            statements: vec![],
            branches: vec![],
            facts,
            return_value: ret.map(str::to_string),
            is_feasible: true,
            is_covered: false,
        }
    }

    fn guard(c: &str) -> PathFact {
        PathFact::Guard {
            branch: BranchId(0),
            condition: c.to_string(),
        }
    }

    fn assign(t: &str, v: &str) -> PathFact {
        PathFact::Assign {
            target: t.to_string(),
            value: parse_expr(v).unwrap(),
        }
    }

    #[test]
    fn test_assignments_are_versioned() {
        let registry = TypedefRegistry::with_defaults(TargetAbi::default());
        let constants = HashMap::new();
        let p = path(
            vec![assign("y", "x * 2"), assign("y", "y + 1"), guard("y > 10")],
            Some("y"),
        );
        let problem = encode_path(&p, &set(), &constants, &registry).unwrap();

        assert_eq!(problem.inputs, vec!["x"]);
        let defs: Vec<String> = problem
            .definitions
            .iter()
            .map(|d| format!("{} := {}", d.name, d.term))
            .collect();
        assert_eq!(defs, vec!["y!1 := (x * 2)", "y!2 := (y!1 + 1)"]);
        let asserted: Vec<String> = problem.assertions.iter().map(ToString::to_string).collect();
        assert_eq!(asserted, vec!["(x >= -50)", "(x <= 50)", "(y!2 > 10)"]);
        assert_eq!(problem.result, Some(Term::var("y!2")));
    }

    #[test]
    fn test_opaque_names_become_inputs() {
        let registry = TypedefRegistry::with_defaults(TargetAbi::default());
        let constants: HashMap<String, ScalarValue> = [("MAX".to_string(), ScalarValue::Int(8))].into();
        let p = path(vec![guard("p->len < MAX")], None);
        let problem = encode_path(&p, &set(), &constants, &registry).unwrap();
        assert_eq!(problem.inputs, vec!["x", "p->len"]);
        assert_eq!(problem.assertions.last().unwrap().to_string(), "(p->len < 8)");
    }

    #[test]
    fn test_unlowerable_assignment_havocs() {
        let registry = TypedefRegistry::with_defaults(TargetAbi::default());
        let constants = HashMap::new();
        let p = path(vec![assign("y", "read_sensor()"), guard("y > 0")], None);
        let problem = encode_path(&p, &set(), &constants, &registry).unwrap();
        assert!(problem.definitions.is_empty());
        assert_eq!(problem.sort_of("y!1"), Some(Sort::Int));
    }

    #[test]
    fn test_unlowerable_guard_fails_closed() {
        let registry = TypedefRegistry::with_defaults(TargetAbi::default());
        let constants = HashMap::new();
        let p = path(vec![guard("valid(x)")], None);
        assert!(encode_path(&p, &set(), &constants, &registry).is_err());
    }
}
