//! Expression lowering
//!
//! Turns parsed C expressions into [`Term`]s. Names are bound through a
//! [`SymbolScope`], so the same lowering serves plain condition solving and
//! SSA path encoding. Operator precedence is the full C grammar of the
//! shared expression parser.
//!
//! Lowering fails closed: anything without a solver meaning (calls, address
//! arithmetic, `defined`) rejects the whole expression.

use crate::features::constraints::VariableConstraint;
use crate::features::smt::domain::{ArithOp, ComparisonOp, LoweringError, Sort, Term};
use crate::shared::expr::{parse_expr, BinaryOp, Expr, UnaryOp};
use crate::shared::models::{QualType, ScalarValue};

/// What a name denotes where it is read
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    Var { name: String, sort: Sort },
    Const(ScalarValue),
}

/// Binds source names to solver symbols
pub trait SymbolScope {
    fn resolve(&mut self, name: &str) -> Symbol;
}

/// Parse and lower a condition to a boolean term
pub fn lower_condition_text(text: &str, scope: &mut dyn SymbolScope) -> Result<Term, LoweringError> {
    let expr = parse_expr(text).map_err(|source| LoweringError::Parse {
        text: text.to_string(),
        source,
    })?;
    lower_condition(&expr, scope)
}

/// Lower with C truthiness applied to the result
pub fn lower_condition(expr: &Expr, scope: &mut dyn SymbolScope) -> Result<Term, LoweringError> {
    let (term, sort) = lower_expr(expr, scope)?;
    Ok(to_bool(term, sort))
}

/// Lower to a term and its sort
pub fn lower_expr(expr: &Expr, scope: &mut dyn SymbolScope) -> Result<(Term, Sort), LoweringError> {
    match expr {
        Expr::Int(v) => Ok((Term::int(*v), Sort::Int)),
        Expr::Real(v) => Ok((Term::Const(ScalarValue::Real(*v)), Sort::Real)),
        Expr::Bool(b) => Ok((Term::bool(*b), Sort::Bool)),
        Expr::Var(name) => Ok(symbol(scope.resolve(name))),
        Expr::Unary(op, inner) => lower_unary(*op, inner, scope),
        Expr::Binary(op, lhs, rhs) => lower_binary(*op, lhs, rhs, scope),
        Expr::Ternary(cond, then, other) => {
            let cond = lower_condition(cond, scope)?;
            let (a, sa) = lower_expr(then, scope)?;
            let (b, sb) = lower_expr(other, scope)?;
            if sa == Sort::Bool && sb == Sort::Bool {
                return Ok((Term::ite(cond, a, b), Sort::Bool));
            }
            let sort = numeric(sa).join(numeric(sb));
            Ok((
                Term::ite(cond, convert(a, sa, sort), convert(b, sb, sort)),
                sort,
            ))
        }
        Expr::Cast(type_name, inner) => {
            let (term, from) = lower_expr(inner, scope)?;
            let to = Sort::of_qual_type(&QualType::parse(type_name));
            Ok((convert(term, from, to), to))
        }
        Expr::Call(name, _) => Err(LoweringError::Unsupported(format!("call to {name}()"))),
        Expr::Index(..) => Err(LoweringError::Unsupported(format!("symbolic index in '{expr}'"))),
        Expr::Defined(name) => Err(LoweringError::Unsupported(format!("defined({name})"))),
    }
}

fn symbol(sym: Symbol) -> (Term, Sort) {
    match sym {
        Symbol::Var { name, sort } => (Term::Var(name), sort),
        Symbol::Const(v) => {
            let sort = match v {
                ScalarValue::Int(_) => Sort::Int,
                ScalarValue::Real(_) => Sort::Real,
                ScalarValue::Bool(_) => Sort::Bool,
            };
            (Term::Const(v), sort)
        }
    }
}

fn lower_unary(op: UnaryOp, inner: &Expr, scope: &mut dyn SymbolScope) -> Result<(Term, Sort), LoweringError> {
    match op {
        UnaryOp::Not => Ok((lower_condition(inner, scope)?.negate(), Sort::Bool)),
        UnaryOp::Plus => {
            let (t, s) = lower_expr(inner, scope)?;
            Ok((to_num(t, s), numeric(s)))
        }
        UnaryOp::Neg => {
            let (t, s) = lower_expr(inner, scope)?;
            let t = match to_num(t, s) {
                Term::Const(ScalarValue::Int(v)) => Term::int(-v),
                Term::Const(ScalarValue::Real(v)) => Term::Const(ScalarValue::Real(-v)),
                other => Term::Neg(Box::new(other)),
            };
            Ok((t, numeric(s)))
        }
        UnaryOp::BitNot => {
            let (t, s) = lower_expr(inner, scope)?;
            if numeric(s) == Sort::Real {
                return Err(LoweringError::IntegerOnly { op: "~" });
            }
            // two's complement: ~v == -v - 1
            let neg = Term::Neg(Box::new(to_num(t, s)));
            Ok((Term::arith(ArithOp::Sub, neg, Term::int(1)), Sort::Int))
        }
        UnaryOp::Deref => match inner {
            // the pointee is an opaque input of its own
            Expr::Var(name) => Ok(symbol(scope.resolve(&format!("*{name}")))),
            other => Err(LoweringError::Unsupported(format!("dereference of '{other}'"))),
        },
        UnaryOp::AddrOf => Err(LoweringError::Unsupported(format!("address of '{inner}'"))),
    }
}

fn lower_binary(
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    scope: &mut dyn SymbolScope,
) -> Result<(Term, Sort), LoweringError> {
    if op.is_logical() {
        let a = lower_condition(lhs, scope)?;
        let b = lower_condition(rhs, scope)?;
        let t = match op {
            BinaryOp::And => Term::and(vec![a, b]),
            _ => Term::or(vec![a, b]),
        };
        return Ok((t, Sort::Bool));
    }

    let (a, sa) = lower_expr(lhs, scope)?;
    let (b, sb) = lower_expr(rhs, scope)?;

    if let Some(cmp) = ComparisonOp::from_binary(op) {
        let sort = numeric(sa).join(numeric(sb));
        let a = convert(to_num(a, sa), numeric(sa), sort);
        let b = convert(to_num(b, sb), numeric(sb), sort);
        return Ok((Term::cmp(cmp, a, b), Sort::Bool));
    }

    let Some(arith) = ArithOp::from_binary(op) else {
        return Err(LoweringError::Unsupported(op.symbol().to_string()));
    };
    let sort = numeric(sa).join(numeric(sb));
    if sort == Sort::Real && (arith == ArithOp::Rem || arith.is_bitwise()) {
        return Err(LoweringError::IntegerOnly { op: op.symbol() });
    }
    let a = convert(to_num(a, sa), numeric(sa), sort);
    let b = convert(to_num(b, sb), numeric(sb), sort);
    Ok((Term::arith(arith, a, b), sort))
}

/// Numeric sort a value of `sort` takes part in arithmetic as
fn numeric(sort: Sort) -> Sort {
    match sort {
        Sort::Bool => Sort::Int,
        other => other,
    }
}

/// Truthiness: non-zero is true
pub fn to_bool(term: Term, sort: Sort) -> Term {
    match sort {
        Sort::Bool => term,
        Sort::Int => match term {
            Term::Const(v) => Term::bool(v.truthy()),
            t => Term::cmp(ComparisonOp::Ne, t, Term::int(0)),
        },
        Sort::Real => Term::cmp(ComparisonOp::Ne, term, Term::Const(ScalarValue::Real(0.0))),
    }
}

/// Booleans as 0/1 integers
pub fn to_num(term: Term, sort: Sort) -> Term {
    match (sort, term) {
        (Sort::Bool, Term::Const(v)) => Term::int(v.truthy() as i128),
        (Sort::Bool, t) => Term::ite(t, Term::int(1), Term::int(0)),
        (_, t) => t,
    }
}

/// Convert between sorts the way a C assignment does
pub fn convert(term: Term, from: Sort, to: Sort) -> Term {
    match (from, to) {
        _ if from == to => term,
        (_, Sort::Bool) => to_bool(term, from),
        (Sort::Bool, Sort::Int) => to_num(term, from),
        (Sort::Bool, Sort::Real) => Term::Cast(Sort::Real, Box::new(to_num(term, from))),
        (_, sort) => match term {
            Term::Const(v) => Term::Const(sort.coerce(v)),
            t => Term::Cast(sort, Box::new(t)),
        },
    }
}

/// Assertions equivalent to `constraint` on its variable
pub fn lower_constraint(
    constraint: &VariableConstraint,
    scope: &mut dyn SymbolScope,
) -> Result<Vec<Term>, LoweringError> {
    let (var, sort) = match scope.resolve(&constraint.variable) {
        Symbol::Var { name, sort } => (Term::Var(name), sort),
        // A name bound to a constant has nothing left to constrain
        Symbol::Const(_) => return Ok(Vec::new()),
    };
    let subject = to_num(var, sort);
    let value = |v: ScalarValue| match (numeric(sort), v) {
        (Sort::Real, v) => Term::Const(ScalarValue::Real(v.as_f64())),
        (_, v) => Term::Const(v),
    };

    let mut out = Vec::new();
    if let Some(v) = constraint.exact_value() {
        out.push(Term::cmp(ComparisonOp::Eq, subject.clone(), value(v)));
    } else {
        if let Some(lo) = constraint.min {
            out.push(Term::cmp(ComparisonOp::Ge, subject.clone(), value(lo)));
        }
        if let Some(hi) = constraint.max {
            out.push(Term::cmp(ComparisonOp::Le, subject.clone(), value(hi)));
        }
        if let Some(allowed) = &constraint.allowed {
            out.push(Term::or(
                allowed
                    .iter()
                    .map(|v| Term::cmp(ComparisonOp::Eq, subject.clone(), value(*v)))
                    .collect(),
            ));
        }
    }
    for text in &constraint.custom {
        out.push(lower_condition_text(text, scope)?);
    }
    Ok(out)
}
