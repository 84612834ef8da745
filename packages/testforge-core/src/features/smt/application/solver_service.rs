//! Solver service
//!
//! Requests in, outcomes out. Every request builds its own [`SmtProblem`]
//! and the backend owns no state between solves, so a service can be shared
//! by concurrent synthesis runs.
//!
//! Lowering failures are absorbed here: the request answers
//! `Unknown(Lowering)` and the reason is logged. Only internal backend
//! failures surface as [`SolverError`].

use crate::config::SolverConfig;
use crate::features::constraints::{ConstraintSet, VariableConstraint};
use crate::features::flow_graph::{BranchId, ControlFlowPath, FunctionAnalysis};
use crate::features::smt::domain::{
    LoweringError, SmtProblem, SolveOutcome, SolverError, Sort, UnknownReason,
};
use crate::features::smt::infrastructure::{
    create_backend, encode_path, lower_expr, PathEncoder, SmtBackend, Symbol,
    SymbolScope,
};
use crate::features::type_resolution::TypedefRegistry;
use crate::shared::expr::parse_expr;
use crate::shared::macros::{debug, warn};
use crate::shared::models::ScalarValue;
use serde::Serialize;
use std::collections::HashMap;

/// Outcome of solving one path, plus the value its `return` produces
#[derive(Debug, Clone, PartialEq)]
pub struct PathSolution {
    /// `Sat` assignments are projected onto the path's inputs
    pub outcome: SolveOutcome,
    pub expected_return: Option<ScalarValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchFeasibility {
    Feasible,
    /// Every enumerated path through the branch is unsatisfiable
    Infeasible,
    Unknown,
}

pub struct SolverService<'a> {
    backend: Box<dyn SmtBackend>,
    registry: &'a TypedefRegistry,
    constants: HashMap<String, ScalarValue>,
}

impl<'a> SolverService<'a> {
    pub fn new(config: &SolverConfig, registry: &'a TypedefRegistry) -> Result<Self, SolverError> {
        Ok(Self::with_backend(create_backend(config)?, registry))
    }

    pub fn with_backend(backend: Box<dyn SmtBackend>, registry: &'a TypedefRegistry) -> Self {
        Self {
            backend,
            registry,
            constants: HashMap::new(),
        }
    }

    /// Named constants (macros, enumerators) substituted during lowering
    pub fn with_constants(mut self, constants: HashMap<String, ScalarValue>) -> Self {
        self.constants = constants;
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Solve `conditions` under `constraints`.
    ///
    /// A `Sat` assignment holds one value per input, including opaque
    /// names (access paths, undeclared globals) the conditions mention.
    pub fn solve_conditions(
        &self,
        constraints: &ConstraintSet,
        conditions: &[&str],
    ) -> Result<SolveOutcome, SolverError> {
        let built = (|| -> Result<SmtProblem, LoweringError> {
            let mut encoder = self.encoder(constraints)?;
            for c in conditions {
                encoder.guard(c)?;
            }
            Ok(encoder.finish())
        })();
        self.solve_projected(built)
    }

    pub fn solve_path(
        &self,
        path: &ControlFlowPath,
        constraints: &ConstraintSet,
    ) -> Result<PathSolution, SolverError> {
        let problem = match encode_path(path, constraints, &self.constants, self.registry) {
            Ok(p) => p,
            Err(err) => {
                warn!(path = path.id, %err, "path not lowerable");
                return Ok(PathSolution {
                    outcome: SolveOutcome::Unknown(UnknownReason::Lowering(err.to_string())),
                    expected_return: None,
                });
            }
        };
        let outcome = self.backend.solve(&problem)?;
        let expected_return = match (&outcome, &problem.result) {
            (SolveOutcome::Sat(model), Some(result)) => {
                let env: HashMap<String, ScalarValue> =
                    model.iter().map(|(k, v)| (k.to_string(), v)).collect();
                result.eval(&env)
            }
            _ => None,
        };
        Ok(PathSolution {
            outcome: project(outcome, &problem),
            expected_return,
        })
    }

    /// Feasible as soon as one of the first `max_paths` paths through
    /// `branch` is satisfiable
    pub fn is_branch_feasible(
        &self,
        analysis: &FunctionAnalysis,
        branch: BranchId,
        constraints: &ConstraintSet,
        max_paths: usize,
    ) -> Result<BranchFeasibility, SolverError> {
        match analysis.branch(branch) {
            Some(b) if b.is_feasible => {}
            _ => return Ok(BranchFeasibility::Infeasible),
        }
        let mut any_unknown = false;
        let mut tried = 0usize;
        for path in analysis.paths_through(branch).take(max_paths) {
            tried += 1;
            match self.solve_path(path, constraints)?.outcome {
                SolveOutcome::Sat(_) => return Ok(BranchFeasibility::Feasible),
                SolveOutcome::Unsat => {}
                SolveOutcome::Unknown(_) => any_unknown = true,
            }
        }
        Ok(if any_unknown || tried == 0 {
            BranchFeasibility::Unknown
        } else {
            BranchFeasibility::Infeasible
        })
    }

    /// Evaluate `expression` under concrete values. `None` when a name has
    /// no value or the evaluation is undefined (division by zero, overflow).
    pub fn evaluate_expression(
        &self,
        expression: &str,
        values: &HashMap<String, ScalarValue>,
    ) -> Result<Option<ScalarValue>, LoweringError> {
        let expr = parse_expr(expression).map_err(|source| LoweringError::Parse {
            text: expression.to_string(),
            source,
        })?;
        let mut scope = ValueScope {
            values,
            constants: &self.constants,
        };
        let (term, _) = lower_expr(&expr, &mut scope)?;
        Ok(term.eval(values))
    }

    /// Whether `constraint` admits any value of `type_name` on its own.
    /// An undecided solve counts as not admitted.
    pub fn validate_constraint(
        &self,
        constraint: &VariableConstraint,
        type_name: &str,
    ) -> Result<bool, SolverError> {
        let mut set = ConstraintSet::new();
        set.declare_input(&constraint.variable, type_name);
        set.add(constraint.clone());
        Ok(self.solve_conditions(&set, &[])?.is_sat())
    }

    /// Up to `count` distinct values of `variable` satisfying `conditions`,
    /// each found by excluding the ones before it
    pub fn sample_values(
        &self,
        variable: &str,
        constraints: &ConstraintSet,
        conditions: &[&str],
        count: usize,
    ) -> Result<Vec<ScalarValue>, SolverError> {
        let mut found: Vec<ScalarValue> = Vec::new();
        while found.len() < count {
            let built = (|| -> Result<SmtProblem, LoweringError> {
                let mut encoder = self.encoder(constraints)?;
                for c in conditions {
                    encoder.guard(c)?;
                }
                for v in &found {
                    encoder.exclude(variable, *v)?;
                }
                Ok(encoder.finish())
            })();
            let next = match self.solve_projected(built)? {
                SolveOutcome::Sat(model) => model.get(variable),
                other => {
                    debug!(variable, outcome = other.label(), found = found.len(), "sampling stopped");
                    None
                }
            };
            match next {
                Some(v) if !found.contains(&v) => found.push(v),
                _ => break,
            }
        }
        Ok(found)
    }

    /// Inputs for which each `(expression, value)` holds, under `conditions`
    pub fn find_values_for_outputs(
        &self,
        constraints: &ConstraintSet,
        outputs: &[(&str, ScalarValue)],
        conditions: &[&str],
    ) -> Result<SolveOutcome, SolverError> {
        let built = (|| -> Result<SmtProblem, LoweringError> {
            let mut encoder = self.encoder(constraints)?;
            for c in conditions {
                encoder.guard(c)?;
            }
            for (expression, value) in outputs {
                encoder.require_value(expression, *value)?;
            }
            Ok(encoder.finish())
        })();
        self.solve_projected(built)
    }

    fn encoder<'s>(&'s self, constraints: &'s ConstraintSet) -> Result<PathEncoder<'s>, LoweringError> {
        PathEncoder::new(constraints, &self.constants, self.registry)
    }

    fn solve_projected(&self, built: Result<SmtProblem, LoweringError>) -> Result<SolveOutcome, SolverError> {
        match built {
            Ok(problem) => Ok(project(self.backend.solve(&problem)?, &problem)),
            Err(err) => {
                warn!(%err, "condition not lowerable");
                Ok(SolveOutcome::Unknown(UnknownReason::Lowering(err.to_string())))
            }
        }
    }
}

fn project(outcome: SolveOutcome, problem: &SmtProblem) -> SolveOutcome {
    match outcome {
        SolveOutcome::Sat(model) => {
            SolveOutcome::Sat(model.project(problem.inputs.iter().map(String::as_str)))
        }
        other => other,
    }
}

/// Names bound to concrete values; anything else is a constant or unbound
struct ValueScope<'v> {
    values: &'v HashMap<String, ScalarValue>,
    constants: &'v HashMap<String, ScalarValue>,
}

impl SymbolScope for ValueScope<'_> {
    fn resolve(&mut self, name: &str) -> Symbol {
        if let Some(v) = self.values.get(name) {
            let sort = match v {
                ScalarValue::Int(_) => Sort::Int,
                ScalarValue::Real(_) => Sort::Real,
                ScalarValue::Bool(_) => Sort::Bool,
            };
            return Symbol::Var {
                name: name.to_string(),
                sort,
            };
        }
        match self.constants.get(name) {
            Some(v) => Symbol::Const(*v),
            None => Symbol::Var {
                name: name.to_string(),
                sort: Sort::Int,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SolverConfig;
    use crate::features::constraints::ConstraintSource;
    use crate::shared::models::{TargetAbi, ValueRange};

    fn registry() -> TypedefRegistry {
        TypedefRegistry::with_defaults(TargetAbi::default())
    }

    fn count_set() -> ConstraintSet {
        let mut set = ConstraintSet::new();
        set.declare_input("count", "unsigned char");
        set.add(VariableConstraint::range(
            "count",
            ValueRange::ints(0, 255),
            ConstraintSource::Type,
        ));
        set
    }

    #[test]
    fn test_guard_beyond_type_range_is_unsat() {
        let registry = registry();
        let service = SolverService::new(&SolverConfig::default(), &registry).unwrap();
        let outcome = service.solve_conditions(&count_set(), &["count > 255"]).unwrap();
        assert_eq!(outcome, SolveOutcome::Unsat);
    }

    #[test]
    fn test_assignment_is_projected_onto_inputs() {
        let registry = registry();
        let service = SolverService::new(&SolverConfig::default(), &registry).unwrap();
        let outcome = service.solve_conditions(&count_set(), &["count >= 200"]).unwrap();
        let model = outcome.assignment().unwrap();
        assert_eq!(model.len(), 1);
        assert_eq!(model.get("count"), Some(ScalarValue::Int(200)));
    }

    #[test]
    fn test_unparsable_condition_is_unknown() {
        let registry = registry();
        let service = SolverService::new(&SolverConfig::default(), &registry).unwrap();
        let outcome = service.solve_conditions(&count_set(), &["count >"]).unwrap();
        assert!(matches!(outcome, SolveOutcome::Unknown(UnknownReason::Lowering(_))));
    }

    #[test]
    fn test_evaluate_expression() {
        let registry = registry();
        let constants: HashMap<String, ScalarValue> = [("LIMIT".to_string(), ScalarValue::Int(10))].into();
        let service = SolverService::new(&SolverConfig::default(), &registry)
            .unwrap()
            .with_constants(constants);
        let values: HashMap<String, ScalarValue> = [("x".to_string(), ScalarValue::Int(4))].into();
        assert_eq!(
            service.evaluate_expression("x * 2 + LIMIT", &values).unwrap(),
            Some(ScalarValue::Int(18))
        );
        assert_eq!(service.evaluate_expression("x / 0", &values).unwrap(), None);
        assert_eq!(service.evaluate_expression("y + 1", &values).unwrap(), None);
    }

    #[test]
    fn test_validate_constraint() {
        let registry = registry();
        let service = SolverService::new(&SolverConfig::default(), &registry).unwrap();
        let ok = VariableConstraint::range("level", ValueRange::ints(1, 10), ConstraintSource::User);
        let empty = VariableConstraint::range("level", ValueRange::ints(10, 1), ConstraintSource::User);
        assert!(service.validate_constraint(&ok, "int").unwrap());
        assert!(!service.validate_constraint(&empty, "int").unwrap());
    }

    #[test]
    fn test_sample_values_are_distinct() {
        let registry = registry();
        let service = SolverService::new(&SolverConfig::default(), &registry).unwrap();
        let values = service
            .sample_values("count", &count_set(), &["count < 3"], 5)
            .unwrap();
        assert_eq!(
            values,
            vec![ScalarValue::Int(0), ScalarValue::Int(1), ScalarValue::Int(2)]
        );
    }

    #[test]
    fn test_find_values_for_outputs() {
        let registry = registry();
        let service = SolverService::new(&SolverConfig::default(), &registry).unwrap();
        let outcome = service
            .find_values_for_outputs(&count_set(), &[("count * 2", ScalarValue::Int(84))], &[])
            .unwrap();
        assert_eq!(outcome.assignment().unwrap().get("count"), Some(ScalarValue::Int(42)));
    }
}
