//! Z3 SMT Solver Backend
//!
//! Translates an [`SmtProblem`] into Z3 integer/real/boolean terms. A fresh
//! `Context` is created for every solve, so nothing survives between calls
//! and no Z3 object outlives the context that created it.
//!
//! C division truncates toward zero while Z3 `div` rounds toward negative
//! infinity for positive divisors; the translation rebuilds the C semantics
//! from `div`. Bitwise operators have no arithmetic counterpart and make the
//! result `Unknown`.

#![cfg(feature = "z3")]

use crate::features::smt::domain::{
    ArithOp, ComparisonOp, SmtProblem, SolveOutcome, SolvedAssignment, SolverError, Sort, Term,
    UnknownReason,
};
use crate::features::smt::infrastructure::solvers::SmtBackend;
use crate::shared::macros::trace;
use crate::shared::models::ScalarValue;
use std::collections::{BTreeMap, HashMap};
use z3::ast::{Ast, Bool, Dynamic, Int, Real};
use z3::{Config, Context, SatResult, Solver};

/// Real constants are passed to Z3 as fractions over this denominator
const REAL_SCALE: f64 = 1_000_000.0;

#[derive(Debug, Clone)]
pub struct Z3Backend {
    timeout_ms: u64,
}

impl Z3Backend {
    pub fn new(timeout_ms: u64) -> Self {
        Self { timeout_ms }
    }
}

impl SmtBackend for Z3Backend {
    fn name(&self) -> &'static str {
        "z3"
    }

    fn solve(&self, problem: &SmtProblem) -> Result<SolveOutcome, SolverError> {
        let mut cfg = Config::new();
        cfg.set_timeout_msec(self.timeout_ms);
        cfg.set_model_generation(true);
        let ctx = Context::new(&cfg);
        let solver = Solver::new(&ctx);

        let mut tx = Translator::new(&ctx, &problem.declarations);
        let built = (|| -> Result<(), UnknownReason> {
            for d in &problem.definitions {
                let lhs = tx.symbol(&d.name);
                let rhs = tx.numeric_or_bool(&d.term)?;
                let rhs = tx.coerce(rhs, tx.sort_of(&d.name));
                solver.assert(&lhs._eq(&rhs));
            }
            for a in &problem.assertions {
                solver.assert(&tx.boolean(a)?);
            }
            Ok(())
        })();
        if let Err(reason) = built {
            return Ok(SolveOutcome::Unknown(reason));
        }

        match solver.check() {
            SatResult::Unsat => Ok(SolveOutcome::Unsat),
            SatResult::Unknown => {
                let reason = solver.get_reason_unknown().unwrap_or_else(|| "unknown".to_string());
                trace!(%reason, "z3 returned unknown");
                let reason = if reason.contains("timeout") || reason.contains("canceled") {
                    UnknownReason::Timeout
                } else {
                    UnknownReason::Backend(reason)
                };
                Ok(SolveOutcome::Unknown(reason))
            }
            SatResult::Sat => {
                let model = solver.get_model().ok_or_else(|| SolverError::Backend {
                    backend: "z3",
                    message: "sat without a model".to_string(),
                })?;
                let mut values = BTreeMap::new();
                for (name, sort) in &problem.declarations {
                    let sym = tx.symbol(name);
                    let value = model
                        .eval(&sym, true)
                        .and_then(|v| extract(&v, *sort))
                        .ok_or_else(|| SolverError::IncompleteModel(name.clone()))?;
                    values.insert(name.clone(), value);
                }
                Ok(SolveOutcome::Sat(SolvedAssignment::new(values)))
            }
        }
    }
}

fn extract(v: &Dynamic<'_>, sort: Sort) -> Option<ScalarValue> {
    match sort {
        Sort::Int => v.as_int()?.as_i64().map(|i| ScalarValue::Int(i as i128)),
        Sort::Bool => v.as_bool()?.as_bool().map(ScalarValue::Bool),
        Sort::Real => {
            let (num, den) = v.as_real()?.as_real()?;
            Some(ScalarValue::Real(num as f64 / den as f64))
        }
    }
}

struct Translator<'ctx> {
    ctx: &'ctx Context,
    sorts: &'ctx BTreeMap<String, Sort>,
    symbols: HashMap<String, Dynamic<'ctx>>,
}

impl<'ctx> Translator<'ctx> {
    fn new(ctx: &'ctx Context, sorts: &'ctx BTreeMap<String, Sort>) -> Self {
        Self {
            ctx,
            sorts,
            symbols: HashMap::new(),
        }
    }

    fn sort_of(&self, name: &str) -> Sort {
        self.sorts.get(name).copied().unwrap_or(Sort::Int)
    }

    fn symbol(&mut self, name: &str) -> Dynamic<'ctx> {
        if let Some(s) = self.symbols.get(name) {
            return s.clone();
        }
        let sym = match self.sort_of(name) {
            Sort::Int => Dynamic::from_ast(&Int::new_const(self.ctx, name)),
            Sort::Real => Dynamic::from_ast(&Real::new_const(self.ctx, name)),
            Sort::Bool => Dynamic::from_ast(&Bool::new_const(self.ctx, name)),
        };
        self.symbols.insert(name.to_string(), sym.clone());
        sym
    }

    fn constant(&self, v: ScalarValue) -> Result<Dynamic<'ctx>, UnknownReason> {
        Ok(match v {
            ScalarValue::Bool(b) => Dynamic::from_ast(&Bool::from_bool(self.ctx, b)),
            ScalarValue::Int(i) => Dynamic::from_ast(&self.int(i)?),
            ScalarValue::Real(r) => {
                let num = (r * REAL_SCALE).round() as i128;
                let real = Real::from_real_str(self.ctx, &num.to_string(), &(REAL_SCALE as i128).to_string())
                    .ok_or_else(|| UnknownReason::Unsupported(format!("real constant {r}")))?;
                Dynamic::from_ast(&real)
            }
        })
    }

    fn int(&self, i: i128) -> Result<Int<'ctx>, UnknownReason> {
        Int::from_str(self.ctx, &i.to_string())
            .ok_or_else(|| UnknownReason::Unsupported(format!("integer constant {i}")))
    }

    fn boolean(&mut self, t: &Term) -> Result<Bool<'ctx>, UnknownReason> {
        let d = self.numeric_or_bool(t)?;
        match d.as_bool() {
            Some(b) => Ok(b),
            None => {
                // C truthiness
                let zero = self.zero_like(&d)?;
                Ok(d._eq(&zero).not())
            }
        }
    }

    fn zero_like(&self, d: &Dynamic<'ctx>) -> Result<Dynamic<'ctx>, UnknownReason> {
        if d.as_real().is_some() {
            self.constant(ScalarValue::Real(0.0))
        } else {
            self.constant(ScalarValue::Int(0))
        }
    }

    fn coerce(&self, d: Dynamic<'ctx>, sort: Sort) -> Dynamic<'ctx> {
        match sort {
            Sort::Real => match d.as_int() {
                Some(i) => Dynamic::from_ast(&Real::from_int(&i)),
                None => d,
            },
            Sort::Int => match d.as_real() {
                Some(r) => Dynamic::from_ast(&trunc_real(self.ctx, &r)),
                None => match d.as_bool() {
                    Some(b) => Dynamic::from_ast(&b.ite(&Int::from_i64(self.ctx, 1), &Int::from_i64(self.ctx, 0))),
                    None => d,
                },
            },
            Sort::Bool => match d.as_bool() {
                Some(_) => d,
                None => {
                    let zero = if d.as_real().is_some() {
                        Dynamic::from_ast(&Real::from_real(self.ctx, 0, 1))
                    } else {
                        Dynamic::from_ast(&Int::from_i64(self.ctx, 0))
                    };
                    Dynamic::from_ast(&d._eq(&zero).not())
                }
            },
        }
    }

    /// Bring two numeric operands to a common sort
    fn promote(&self, a: Dynamic<'ctx>, b: Dynamic<'ctx>) -> (Dynamic<'ctx>, Dynamic<'ctx>) {
        if a.as_real().is_some() || b.as_real().is_some() {
            (self.coerce(a, Sort::Real), self.coerce(b, Sort::Real))
        } else {
            (self.coerce(a, Sort::Int), self.coerce(b, Sort::Int))
        }
    }

    fn numeric_or_bool(&mut self, t: &Term) -> Result<Dynamic<'ctx>, UnknownReason> {
        Ok(match t {
            Term::Const(v) => self.constant(*v)?,
            Term::Var(name) => self.symbol(name),
            Term::Not(a) => Dynamic::from_ast(&self.boolean(a)?.not()),
            Term::And(ts) => {
                let parts = ts.iter().map(|t| self.boolean(t)).collect::<Result<Vec<_>, _>>()?;
                let refs: Vec<&Bool<'ctx>> = parts.iter().collect();
                Dynamic::from_ast(&Bool::and(self.ctx, &refs))
            }
            Term::Or(ts) => {
                let parts = ts.iter().map(|t| self.boolean(t)).collect::<Result<Vec<_>, _>>()?;
                let refs: Vec<&Bool<'ctx>> = parts.iter().collect();
                Dynamic::from_ast(&Bool::or(self.ctx, &refs))
            }
            Term::Ite(c, a, b) => {
                let c = self.boolean(c)?;
                let a = self.numeric_or_bool(a)?;
                let b = self.numeric_or_bool(b)?;
                let (a, b) = if a.as_bool().is_some() && b.as_bool().is_some() {
                    (a, b)
                } else {
                    self.promote(a, b)
                };
                c.ite(&a, &b)
            }
            Term::Cast(sort, a) => {
                let a = self.numeric_or_bool(a)?;
                self.coerce(a, *sort)
            }
            Term::Neg(a) => {
                let a = self.numeric_or_bool(a)?;
                let sort = if a.as_real().is_some() { Sort::Real } else { Sort::Int };
                let a = self.coerce(a, sort);
                match (a.as_int(), a.as_real()) {
                    (Some(i), _) => Dynamic::from_ast(&i.unary_minus()),
                    (_, Some(r)) => Dynamic::from_ast(&r.unary_minus()),
                    _ => return Err(UnknownReason::Unsupported("negation".into())),
                }
            }
            Term::Cmp(op, a, b) => {
                let a = self.numeric_or_bool(a)?;
                let b = self.numeric_or_bool(b)?;
                let (a, b) = self.promote(a, b);
                Dynamic::from_ast(&compare(*op, &a, &b)?)
            }
            Term::Arith(op, a, b) => {
                if op.is_bitwise() {
                    return Err(UnknownReason::Unsupported(format!(
                        "bitwise '{}'",
                        op.as_binary().symbol()
                    )));
                }
                let a = self.numeric_or_bool(a)?;
                let b = self.numeric_or_bool(b)?;
                let (a, b) = self.promote(a, b);
                self.arith(*op, a, b)?
            }
        })
    }

    fn arith(&self, op: ArithOp, a: Dynamic<'ctx>, b: Dynamic<'ctx>) -> Result<Dynamic<'ctx>, UnknownReason> {
        if let (Some(x), Some(y)) = (a.as_int(), b.as_int()) {
            let r = match op {
                ArithOp::Add => Int::add(self.ctx, &[&x, &y]),
                ArithOp::Sub => Int::sub(self.ctx, &[&x, &y]),
                ArithOp::Mul => Int::mul(self.ctx, &[&x, &y]),
                ArithOp::Div => c_div(self.ctx, &x, &y),
                ArithOp::Rem => {
                    let q = c_div(self.ctx, &x, &y);
                    Int::sub(self.ctx, &[&x, &Int::mul(self.ctx, &[&y, &q])])
                }
                _ => return Err(UnknownReason::Unsupported(op.as_binary().symbol().to_string())),
            };
            return Ok(Dynamic::from_ast(&r));
        }
        if let (Some(x), Some(y)) = (a.as_real(), b.as_real()) {
            let r = match op {
                ArithOp::Add => Real::add(self.ctx, &[&x, &y]),
                ArithOp::Sub => Real::sub(self.ctx, &[&x, &y]),
                ArithOp::Mul => Real::mul(self.ctx, &[&x, &y]),
                ArithOp::Div => x.div(&y),
                _ => return Err(UnknownReason::Unsupported(op.as_binary().symbol().to_string())),
            };
            return Ok(Dynamic::from_ast(&r));
        }
        Err(UnknownReason::Unsupported("mixed-sort arithmetic".into()))
    }
}

/// C division: truncate toward zero
fn c_div<'ctx>(ctx: &'ctx Context, x: &Int<'ctx>, y: &Int<'ctx>) -> Int<'ctx> {
    let zero = Int::from_i64(ctx, 0);
    let neg_x = x.unary_minus();
    let toward_zero = neg_x.div(y).unary_minus();
    x.ge(&zero).ite(&x.div(y), &toward_zero)
}

/// Real to integer, truncating toward zero
fn trunc_real<'ctx>(ctx: &'ctx Context, r: &Real<'ctx>) -> Int<'ctx> {
    let zero = Real::from_real(ctx, 0, 1);
    let floor = r.to_int();
    let ceil = r.unary_minus().to_int().unary_minus();
    r.ge(&zero).ite(&floor, &ceil)
}

fn compare<'ctx>(op: ComparisonOp, a: &Dynamic<'ctx>, b: &Dynamic<'ctx>) -> Result<Bool<'ctx>, UnknownReason> {
    if let (Some(x), Some(y)) = (a.as_int(), b.as_int()) {
        return Ok(match op {
            ComparisonOp::Eq => x._eq(&y),
            ComparisonOp::Ne => x._eq(&y).not(),
            ComparisonOp::Lt => x.lt(&y),
            ComparisonOp::Le => x.le(&y),
            ComparisonOp::Gt => x.gt(&y),
            ComparisonOp::Ge => x.ge(&y),
        });
    }
    if let (Some(x), Some(y)) = (a.as_real(), b.as_real()) {
        return Ok(match op {
            ComparisonOp::Eq => x._eq(&y),
            ComparisonOp::Ne => x._eq(&y).not(),
            ComparisonOp::Lt => x.lt(&y),
            ComparisonOp::Le => x.le(&y),
            ComparisonOp::Gt => x.gt(&y),
            ComparisonOp::Ge => x.ge(&y),
        });
    }
    Err(UnknownReason::Unsupported("comparison of non-numeric terms".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_name() {
        assert_eq!(Z3Backend::new(1_000).name(), "z3");
    }

    #[test]
    fn test_c_division_semantics() {
        let mut p = SmtProblem::new();
        p.declare("x", Sort::Int);
        p.add_input("x");
        p.define(
            "q",
            Sort::Int,
            Term::arith(ArithOp::Div, Term::var("x"), Term::int(2)),
        );
        p.assert(Term::cmp(ComparisonOp::Eq, Term::var("x"), Term::int(-7)));
        let out = Z3Backend::new(5_000).solve(&p).unwrap();
        assert_eq!(out.assignment().unwrap().get("q"), Some(ScalarValue::Int(-3)));
    }

    #[test]
    fn test_unsat() {
        let mut p = SmtProblem::new();
        p.declare("count", Sort::Int);
        p.assert(Term::cmp(ComparisonOp::Le, Term::var("count"), Term::int(255)));
        p.assert(Term::cmp(ComparisonOp::Gt, Term::var("count"), Term::int(255)));
        assert_eq!(Z3Backend::new(5_000).solve(&p).unwrap(), SolveOutcome::Unsat);
    }

    #[test]
    fn test_bitwise_is_unknown() {
        let mut p = SmtProblem::new();
        p.declare("flags", Sort::Int);
        p.assert(Term::cmp(
            ComparisonOp::Ne,
            Term::arith(ArithOp::BitAnd, Term::var("flags"), Term::int(4)),
            Term::int(0),
        ));
        assert!(matches!(
            Z3Backend::new(5_000).solve(&p).unwrap(),
            SolveOutcome::Unknown(UnknownReason::Unsupported(_))
        ));
    }
}
