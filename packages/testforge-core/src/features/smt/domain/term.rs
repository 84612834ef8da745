//! Lowered formulas
//!
//! A [`Term`] is what a C expression becomes once names are bound to solver
//! symbols: no calls, no pointers, no implicit truthiness. Comparisons and
//! connectives are boolean; everything else is numeric.

use crate::shared::expr::eval::{apply_binary, apply_unary};
use crate::shared::expr::{BinaryOp, UnaryOp};
use crate::shared::models::ScalarValue;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use super::Sort;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    /// Truncating, as in C
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl ArithOp {
    pub fn from_binary(op: BinaryOp) -> Option<ArithOp> {
        Some(match op {
            BinaryOp::Add => ArithOp::Add,
            BinaryOp::Sub => ArithOp::Sub,
            BinaryOp::Mul => ArithOp::Mul,
            BinaryOp::Div => ArithOp::Div,
            BinaryOp::Rem => ArithOp::Rem,
            BinaryOp::BitAnd => ArithOp::BitAnd,
            BinaryOp::BitOr => ArithOp::BitOr,
            BinaryOp::BitXor => ArithOp::BitXor,
            BinaryOp::Shl => ArithOp::Shl,
            BinaryOp::Shr => ArithOp::Shr,
            _ => return None,
        })
    }

    pub fn as_binary(self) -> BinaryOp {
        match self {
            ArithOp::Add => BinaryOp::Add,
            ArithOp::Sub => BinaryOp::Sub,
            ArithOp::Mul => BinaryOp::Mul,
            ArithOp::Div => BinaryOp::Div,
            ArithOp::Rem => BinaryOp::Rem,
            ArithOp::BitAnd => BinaryOp::BitAnd,
            ArithOp::BitOr => BinaryOp::BitOr,
            ArithOp::BitXor => BinaryOp::BitXor,
            ArithOp::Shl => BinaryOp::Shl,
            ArithOp::Shr => BinaryOp::Shr,
        }
    }

    /// Bit-level operators have no arithmetic-theory counterpart
    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            ArithOp::BitAnd | ArithOp::BitOr | ArithOp::BitXor | ArithOp::Shl | ArithOp::Shr
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl ComparisonOp {
    pub fn from_binary(op: BinaryOp) -> Option<ComparisonOp> {
        Some(match op {
            BinaryOp::Eq => ComparisonOp::Eq,
            BinaryOp::Ne => ComparisonOp::Ne,
            BinaryOp::Lt => ComparisonOp::Lt,
            BinaryOp::Le => ComparisonOp::Le,
            BinaryOp::Gt => ComparisonOp::Gt,
            BinaryOp::Ge => ComparisonOp::Ge,
            _ => return None,
        })
    }

    pub fn as_binary(self) -> BinaryOp {
        match self {
            ComparisonOp::Eq => BinaryOp::Eq,
            ComparisonOp::Ne => BinaryOp::Ne,
            ComparisonOp::Lt => BinaryOp::Lt,
            ComparisonOp::Le => BinaryOp::Le,
            ComparisonOp::Gt => BinaryOp::Gt,
            ComparisonOp::Ge => BinaryOp::Ge,
        }
    }

    pub fn negated(self) -> ComparisonOp {
        match self {
            ComparisonOp::Eq => ComparisonOp::Ne,
            ComparisonOp::Ne => ComparisonOp::Eq,
            ComparisonOp::Lt => ComparisonOp::Ge,
            ComparisonOp::Le => ComparisonOp::Gt,
            ComparisonOp::Gt => ComparisonOp::Le,
            ComparisonOp::Ge => ComparisonOp::Lt,
        }
    }

    /// `a op b` ⇔ `b op.mirrored() a`
    pub fn mirrored(self) -> ComparisonOp {
        match self {
            ComparisonOp::Lt => ComparisonOp::Gt,
            ComparisonOp::Le => ComparisonOp::Ge,
            ComparisonOp::Gt => ComparisonOp::Lt,
            ComparisonOp::Ge => ComparisonOp::Le,
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Const(ScalarValue),
    /// Solver symbol (SSA name)
    Var(String),
    Not(Box<Term>),
    Neg(Box<Term>),
    Arith(ArithOp, Box<Term>, Box<Term>),
    Cmp(ComparisonOp, Box<Term>, Box<Term>),
    And(Vec<Term>),
    Or(Vec<Term>),
    Ite(Box<Term>, Box<Term>, Box<Term>),
    /// Explicit conversion; `Int` truncates toward zero
    Cast(Sort, Box<Term>),
}

impl Term {
    pub fn int(v: i128) -> Term {
        Term::Const(ScalarValue::Int(v))
    }

    pub fn bool(b: bool) -> Term {
        Term::Const(ScalarValue::Bool(b))
    }

    pub fn var(name: impl Into<String>) -> Term {
        Term::Var(name.into())
    }

    pub fn cmp(op: ComparisonOp, lhs: Term, rhs: Term) -> Term {
        Term::Cmp(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn arith(op: ArithOp, lhs: Term, rhs: Term) -> Term {
        Term::Arith(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn ite(cond: Term, then: Term, other: Term) -> Term {
        Term::Ite(Box::new(cond), Box::new(then), Box::new(other))
    }

    /// Conjunction with nested `And`s flattened and `true` dropped
    pub fn and(terms: Vec<Term>) -> Term {
        let mut flat = Vec::with_capacity(terms.len());
        for t in terms {
            match t {
                Term::And(inner) => flat.extend(inner),
                Term::Const(ScalarValue::Bool(true)) => {}
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Term::bool(true),
            1 => flat.remove(0),
            _ => Term::And(flat),
        }
    }

    /// Disjunction with nested `Or`s flattened and `false` dropped
    pub fn or(terms: Vec<Term>) -> Term {
        let mut flat = Vec::with_capacity(terms.len());
        for t in terms {
            match t {
                Term::Or(inner) => flat.extend(inner),
                Term::Const(ScalarValue::Bool(false)) => {}
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Term::bool(false),
            1 => flat.remove(0),
            _ => Term::Or(flat),
        }
    }

    /// Logical negation pushed through comparisons and connectives
    pub fn negate(self) -> Term {
        match self {
            Term::Const(ScalarValue::Bool(b)) => Term::bool(!b),
            Term::Not(inner) => *inner,
            Term::Cmp(op, a, b) => Term::Cmp(op.negated(), a, b),
            Term::And(ts) => Term::or(ts.into_iter().map(Term::negate).collect()),
            Term::Or(ts) => Term::and(ts.into_iter().map(Term::negate).collect()),
            other => Term::Not(Box::new(other)),
        }
    }

    /// Top-level conjuncts
    pub fn conjuncts(&self) -> Vec<&Term> {
        match self {
            Term::And(ts) => ts.iter().flat_map(|t| t.conjuncts()).collect(),
            other => vec![other],
        }
    }

    pub fn children(&self) -> Vec<&Term> {
        match self {
            Term::Const(_) | Term::Var(_) => Vec::new(),
            Term::Not(a) | Term::Neg(a) | Term::Cast(_, a) => vec![a],
            Term::Arith(_, a, b) | Term::Cmp(_, a, b) => vec![a, b],
            Term::And(ts) | Term::Or(ts) => ts.iter().collect(),
            Term::Ite(c, a, b) => vec![c, a, b],
        }
    }

    /// Symbols referenced anywhere in the term
    pub fn variables(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        let mut stack = vec![self];
        while let Some(t) = stack.pop() {
            if let Term::Var(name) = t {
                out.insert(name.clone());
            }
            stack.extend(t.children());
        }
        out
    }

    /// Numeric constants, in first-seen order
    pub fn constants(&self) -> Vec<ScalarValue> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(t) = stack.pop() {
            match t {
                Term::Const(v @ (ScalarValue::Int(_) | ScalarValue::Real(_))) => out.push(*v),
                _ => stack.extend(t.children().into_iter().rev()),
            }
        }
        out
    }

    /// Node count
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(|c| c.size()).sum::<usize>()
    }

    /// Replace symbols by terms
    pub fn substitute(&self, subst: &dyn Fn(&str) -> Option<Term>) -> Term {
        let re = |t: &Term| Box::new(t.substitute(subst));
        match self {
            Term::Var(name) => subst(name).unwrap_or_else(|| self.clone()),
            Term::Const(_) => self.clone(),
            Term::Not(a) => Term::Not(re(a)),
            Term::Neg(a) => Term::Neg(re(a)),
            Term::Cast(s, a) => Term::Cast(*s, re(a)),
            Term::Arith(op, a, b) => Term::Arith(*op, re(a), re(b)),
            Term::Cmp(op, a, b) => Term::Cmp(*op, re(a), re(b)),
            Term::And(ts) => Term::And(ts.iter().map(|t| t.substitute(subst)).collect()),
            Term::Or(ts) => Term::Or(ts.iter().map(|t| t.substitute(subst)).collect()),
            Term::Ite(c, a, b) => Term::Ite(re(c), re(a), re(b)),
        }
    }

    /// Concrete value under `env`; `None` when a symbol is unbound or the
    /// operation is undefined (division by zero, overflow).
    pub fn eval(&self, env: &HashMap<String, ScalarValue>) -> Option<ScalarValue> {
        match self {
            Term::Const(v) => Some(*v),
            Term::Var(name) => env.get(name).copied(),
            Term::Not(a) => apply_unary(UnaryOp::Not, a.eval(env)?).ok(),
            Term::Neg(a) => apply_unary(UnaryOp::Neg, a.eval(env)?).ok(),
            Term::Cast(sort, a) => Some(sort.coerce(a.eval(env)?)),
            Term::Arith(op, a, b) => apply_binary(op.as_binary(), a.eval(env)?, b.eval(env)?).ok(),
            Term::Cmp(op, a, b) => apply_binary(op.as_binary(), a.eval(env)?, b.eval(env)?).ok(),
            Term::And(ts) => {
                for t in ts {
                    if !t.eval(env)?.truthy() {
                        return Some(ScalarValue::Bool(false));
                    }
                }
                Some(ScalarValue::Bool(true))
            }
            Term::Or(ts) => {
                for t in ts {
                    if t.eval(env)?.truthy() {
                        return Some(ScalarValue::Bool(true));
                    }
                }
                Some(ScalarValue::Bool(false))
            }
            Term::Ite(c, a, b) => {
                if c.eval(env)?.truthy() {
                    a.eval(env)
                } else {
                    b.eval(env)
                }
            }
        }
    }

    /// Whether the term denotes a truth value
    pub fn is_boolean(&self) -> bool {
        matches!(
            self,
            Term::Const(ScalarValue::Bool(_)) | Term::Not(_) | Term::Cmp(..) | Term::And(_) | Term::Or(_)
        )
    }
}

fn cmp_symbol(op: ComparisonOp) -> &'static str {
    op.as_binary().symbol()
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, ts: &[Term], sep: &str| -> fmt::Result {
            write!(f, "(")?;
            for (i, t) in ts.iter().enumerate() {
                if i > 0 {
                    write!(f, " {sep} ")?;
                }
                write!(f, "{t}")?;
            }
            write!(f, ")")
        };
        match self {
            Term::Const(v) => write!(f, "{v}"),
            Term::Var(name) => write!(f, "{name}"),
            Term::Not(a) => write!(f, "!{a}"),
            Term::Neg(a) => write!(f, "-{a}"),
            Term::Cast(s, a) => write!(f, "({s}){a}"),
            Term::Arith(op, a, b) => write!(f, "({a} {} {b})", op.as_binary().symbol()),
            Term::Cmp(op, a, b) => write!(f, "({a} {} {b})", cmp_symbol(*op)),
            Term::And(ts) => join(f, ts, "&&"),
            Term::Or(ts) => join(f, ts, "||"),
            Term::Ite(c, a, b) => write!(f, "({c} ? {a} : {b})"),
        }
    }
}
