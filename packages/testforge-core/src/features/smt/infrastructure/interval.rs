//! Interval pre-pass
//!
//! Derives a value domain per symbol from top-level conjuncts that compare a
//! single symbol against a constant (or are linear in one symbol). An empty
//! domain proves the conjunction unsatisfiable without any search; a
//! non-empty one narrows the candidates the search tries.

use crate::features::smt::domain::{ArithOp, ComparisonOp, Sort, Term};
use crate::shared::models::ScalarValue;
use std::collections::{BTreeMap, HashMap};

/// Largest magnitude `f64` represents every integer up to
const EXACT_F64: f64 = 9_007_199_254_740_992.0;

/// `Σ coeff·var + constant`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearForm {
    pub coeffs: BTreeMap<String, f64>,
    pub constant: f64,
}

impl LinearForm {
    fn constant(c: f64) -> Self {
        Self {
            coeffs: BTreeMap::new(),
            constant: c,
        }
    }

    fn scale(mut self, k: f64) -> Self {
        for v in self.coeffs.values_mut() {
            *v *= k;
        }
        self.constant *= k;
        self
    }

    fn add(mut self, other: LinearForm, sign: f64) -> Self {
        for (name, c) in other.coeffs {
            *self.coeffs.entry(name).or_insert(0.0) += sign * c;
        }
        self.constant += sign * other.constant;
        self.coeffs.retain(|_, c| *c != 0.0);
        self
    }

    fn exact(&self) -> bool {
        self.constant.abs() < EXACT_F64 && self.coeffs.values().all(|c| c.abs() < EXACT_F64)
    }

    /// `(var, coeff)` if exactly one symbol remains
    pub fn single(&self) -> Option<(&str, f64)> {
        match self.coeffs.iter().next() {
            Some((name, c)) if self.coeffs.len() == 1 => Some((name.as_str(), *c)),
            _ => None,
        }
    }
}

/// Linear form of a numeric term, if it has one that is exact in `f64`
pub fn linear_form(term: &Term) -> Option<LinearForm> {
    let form = match term {
        Term::Const(ScalarValue::Int(v)) => LinearForm::constant(*v as f64),
        Term::Const(ScalarValue::Real(v)) => LinearForm::constant(*v),
        Term::Var(name) => LinearForm {
            coeffs: [(name.clone(), 1.0)].into(),
            constant: 0.0,
        },
        Term::Neg(a) => linear_form(a)?.scale(-1.0),
        Term::Cast(Sort::Real, a) => linear_form(a)?,
        Term::Arith(ArithOp::Add, a, b) => linear_form(a)?.add(linear_form(b)?, 1.0),
        Term::Arith(ArithOp::Sub, a, b) => linear_form(a)?.add(linear_form(b)?, -1.0),
        Term::Arith(ArithOp::Mul, a, b) => {
            let (a, b) = (linear_form(a)?, linear_form(b)?);
            match (a.coeffs.is_empty(), b.coeffs.is_empty()) {
                (true, _) => b.scale(a.constant),
                (_, true) => a.scale(b.constant),
                _ => return None,
            }
        }
        _ => return None,
    };
    form.exact().then_some(form)
}

/// `lhs op rhs` as `form op 0`
pub fn comparison_form(lhs: &Term, rhs: &Term) -> Option<LinearForm> {
    Some(linear_form(lhs)?.add(linear_form(rhs)?, -1.0))
}

/// Point where a single-symbol comparison changes truth value
pub fn boundary(lhs: &Term, rhs: &Term) -> Option<(String, f64)> {
    let form = comparison_form(lhs, rhs)?;
    let (name, a) = form.single()?;
    Some((name.to_string(), -form.constant / a))
}

#[derive(Debug, Clone, PartialEq)]
pub enum Domain {
    /// Inclusive bounds
    Int { lo: Option<i128>, hi: Option<i128> },
    /// Bounds with strictness flag
    Real {
        lo: Option<(f64, bool)>,
        hi: Option<(f64, bool)>,
    },
    Bool { can_false: bool, can_true: bool },
}

/// Feasible values of one symbol
#[derive(Debug, Clone, PartialEq)]
pub struct VarDomain {
    pub domain: Domain,
    /// Explicit value set, when a conjunct lists one
    pub allowed: Option<Vec<ScalarValue>>,
}

impl VarDomain {
    pub fn full(sort: Sort) -> Self {
        let domain = match sort {
            Sort::Int => Domain::Int { lo: None, hi: None },
            Sort::Real => Domain::Real { lo: None, hi: None },
            Sort::Bool => Domain::Bool {
                can_false: true,
                can_true: true,
            },
        };
        Self { domain, allowed: None }
    }

    pub fn contains(&self, v: &ScalarValue) -> bool {
        let in_domain = match (&self.domain, v) {
            (Domain::Int { lo, hi }, ScalarValue::Int(x)) => {
                lo.map_or(true, |l| *x >= l) && hi.map_or(true, |h| *x <= h)
            }
            (Domain::Real { lo, hi }, ScalarValue::Real(x)) => {
                lo.map_or(true, |(l, strict)| if strict { *x > l } else { *x >= l })
                    && hi.map_or(true, |(h, strict)| if strict { *x < h } else { *x <= h })
            }
            (Domain::Bool { can_false, can_true }, ScalarValue::Bool(b)) => {
                if *b {
                    *can_true
                } else {
                    *can_false
                }
            }
            _ => false,
        };
        in_domain
            && self
                .allowed
                .as_ref()
                .map_or(true, |a| a.iter().any(|x| x.compare(v) == Some(std::cmp::Ordering::Equal)))
    }

    pub fn is_empty(&self) -> bool {
        let empty = match &self.domain {
            Domain::Int { lo: Some(l), hi: Some(h) } => l > h,
            Domain::Real {
                lo: Some((l, ls)),
                hi: Some((h, hs)),
            } => l > h || (l == h && (*ls || *hs)),
            Domain::Bool { can_false, can_true } => !can_false && !can_true,
            _ => false,
        };
        empty
            || self
                .allowed
                .as_ref()
                .is_some_and(|a| !a.iter().any(|v| self.bounds_admit(v)))
    }

    fn bounds_admit(&self, v: &ScalarValue) -> bool {
        let unrestricted = VarDomain {
            domain: self.domain.clone(),
            allowed: None,
        };
        unrestricted.contains(v)
    }

    /// Intersect with `var op k`
    pub fn tighten(&mut self, op: ComparisonOp, k: f64) {
        match &mut self.domain {
            Domain::Int { lo, hi } => {
                let raise = |lo: &mut Option<i128>, v: i128| *lo = Some(lo.map_or(v, |l| l.max(v)));
                let lower = |hi: &mut Option<i128>, v: i128| *hi = Some(hi.map_or(v, |h| h.min(v)));
                match op {
                    ComparisonOp::Lt => lower(hi, k.ceil() as i128 - 1),
                    ComparisonOp::Le => lower(hi, k.floor() as i128),
                    ComparisonOp::Gt => raise(lo, k.floor() as i128 + 1),
                    ComparisonOp::Ge => raise(lo, k.ceil() as i128),
                    ComparisonOp::Eq if k.fract() == 0.0 => {
                        raise(lo, k as i128);
                        lower(hi, k as i128);
                    }
                    ComparisonOp::Eq => {
                        // no integer solves it
                        *lo = Some(1);
                        *hi = Some(0);
                    }
                    ComparisonOp::Ne => {}
                }
            }
            Domain::Real { lo, hi } => {
                let raise = |lo: &mut Option<(f64, bool)>, v: f64, strict: bool| {
                    let tighter = match lo {
                        None => true,
                        Some((l, s)) => v > *l || (v == *l && strict && !*s),
                    };
                    if tighter {
                        *lo = Some((v, strict));
                    }
                };
                let lower = |hi: &mut Option<(f64, bool)>, v: f64, strict: bool| {
                    let tighter = match hi {
                        None => true,
                        Some((h, s)) => v < *h || (v == *h && strict && !*s),
                    };
                    if tighter {
                        *hi = Some((v, strict));
                    }
                };
                match op {
                    ComparisonOp::Lt => lower(hi, k, true),
                    ComparisonOp::Le => lower(hi, k, false),
                    ComparisonOp::Gt => raise(lo, k, true),
                    ComparisonOp::Ge => raise(lo, k, false),
                    ComparisonOp::Eq => {
                        raise(lo, k, false);
                        lower(hi, k, false);
                    }
                    ComparisonOp::Ne => {}
                }
            }
            Domain::Bool { can_false, can_true } => {
                // booleans compare as 0/1
                let keep = |b: bool| {
                    let v = if b { 1.0 } else { 0.0 };
                    match op {
                        ComparisonOp::Eq => v == k,
                        ComparisonOp::Ne => v != k,
                        ComparisonOp::Lt => v < k,
                        ComparisonOp::Le => v <= k,
                        ComparisonOp::Gt => v > k,
                        ComparisonOp::Ge => v >= k,
                    }
                };
                *can_false &= keep(false);
                *can_true &= keep(true);
            }
        }
    }

    /// Intersect with an explicit value list
    pub fn restrict(&mut self, values: Vec<ScalarValue>) {
        let kept = match self.allowed.take() {
            None => values,
            Some(current) => values
                .into_iter()
                .filter(|v| current.iter().any(|c| c.compare(v) == Some(std::cmp::Ordering::Equal)))
                .collect(),
        };
        self.allowed = Some(kept);
    }

    /// Inclusive integer bounds, if any
    pub fn int_bounds(&self) -> (Option<i128>, Option<i128>) {
        match self.domain {
            Domain::Int { lo, hi } => (lo, hi),
            _ => (None, None),
        }
    }

    pub fn real_bounds(&self) -> (Option<f64>, Option<f64>) {
        match self.domain {
            Domain::Real { lo, hi } => (lo.map(|b| b.0), hi.map(|b| b.0)),
            _ => (None, None),
        }
    }
}

/// Domains implied by `conjuncts`; symbols without a recognisable bound keep
/// their full domain.
pub fn derive_domains(conjuncts: &[&Term], sorts: &BTreeMap<String, Sort>) -> HashMap<String, VarDomain> {
    let mut domains: HashMap<String, VarDomain> = sorts
        .iter()
        .map(|(name, sort)| (name.clone(), VarDomain::full(*sort)))
        .collect();

    for atom in conjuncts {
        match atom {
            Term::Var(name) => {
                if let Some(d) = domains.get_mut(name) {
                    d.tighten(ComparisonOp::Eq, 1.0);
                }
            }
            Term::Not(inner) => {
                if let Term::Var(name) = inner.as_ref() {
                    if let Some(d) = domains.get_mut(name) {
                        d.tighten(ComparisonOp::Eq, 0.0);
                    }
                }
            }
            Term::Cmp(op, lhs, rhs) => {
                if let Some((name, c)) = direct_int_bound(lhs, rhs) {
                    if let Some(d) = domains.get_mut(name) {
                        tighten_exact(d, *op, c);
                    }
                    continue;
                }
                if let Some((name, c)) = direct_int_bound(rhs, lhs) {
                    if let Some(d) = domains.get_mut(name) {
                        tighten_exact(d, op.mirrored(), c);
                    }
                    continue;
                }
                let Some(form) = comparison_form(lhs, rhs) else {
                    continue;
                };
                let Some((name, a)) = form.single() else {
                    continue;
                };
                let op = if a < 0.0 { op.mirrored() } else { *op };
                if let Some(d) = domains.get_mut(name) {
                    d.tighten(op, -form.constant / a);
                }
            }
            Term::Or(options) => {
                if let Some((name, values)) = value_list(options) {
                    if let Some(d) = domains.get_mut(&name) {
                        d.restrict(values);
                    }
                }
            }
            _ => {}
        }
    }
    domains
}

/// `var op c` with an integer constant, kept exact beyond `f64` precision
fn direct_int_bound<'t>(var: &'t Term, constant: &Term) -> Option<(&'t str, i128)> {
    match (var, constant) {
        (Term::Var(name), Term::Const(ScalarValue::Int(c))) => Some((name.as_str(), *c)),
        _ => None,
    }
}

fn tighten_exact(d: &mut VarDomain, op: ComparisonOp, c: i128) {
    if let Domain::Int { lo, hi } = &mut d.domain {
        let raise = |lo: &mut Option<i128>, v: i128| *lo = Some(lo.map_or(v, |l| l.max(v)));
        let lower = |hi: &mut Option<i128>, v: i128| *hi = Some(hi.map_or(v, |h| h.min(v)));
        match op {
            ComparisonOp::Lt => lower(hi, c.saturating_sub(1)),
            ComparisonOp::Le => lower(hi, c),
            ComparisonOp::Gt => raise(lo, c.saturating_add(1)),
            ComparisonOp::Ge => raise(lo, c),
            ComparisonOp::Eq => {
                raise(lo, c);
                lower(hi, c);
            }
            ComparisonOp::Ne => {}
        }
        return;
    }
    d.tighten(op, c as f64);
}

/// `x == a || x == b || ...` over one symbol
fn value_list(options: &[Term]) -> Option<(String, Vec<ScalarValue>)> {
    let mut var: Option<&str> = None;
    let mut values = Vec::with_capacity(options.len());
    for t in options {
        let Term::Cmp(ComparisonOp::Eq, lhs, rhs) = t else {
            return None;
        };
        let (name, value) = match (lhs.as_ref(), rhs.as_ref()) {
            (Term::Var(n), Term::Const(v)) | (Term::Const(v), Term::Var(n)) => (n.as_str(), *v),
            _ => return None,
        };
        if var.is_some_and(|v| v != name) {
            return None;
        }
        var = Some(name);
        values.push(value);
    }
    var.map(|v| (v.to_string(), values))
}
