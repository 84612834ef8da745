//! Bounded search solver
//!
//! Pure-Rust backend. Each free symbol gets a finite list of candidate
//! values taken from the problem itself (constants, their neighbours, the
//! points where single-symbol comparisons flip, interval edges), and a
//! depth-first search assigns symbols in order, evaluating every assertion
//! as soon as all the symbols it depends on are known. SSA definitions are
//! computed, never searched.
//!
//! # Verdicts
//!
//! - **Sat**: a full assignment that makes every assertion true.
//! - **Unsat**: the interval pre-pass found an empty domain, or the search
//!   exhausted a candidate space that provably covers every truth-relevant
//!   region (each comparison is linear in at most one numeric symbol).
//! - **Unknown**: node budget or timeout hit, or the space was exhausted
//!   without that guarantee.

use crate::features::smt::domain::{
    Definition, SmtProblem, SolveOutcome, SolvedAssignment, SolverError, Sort, Term, UnknownReason,
};
use crate::features::smt::infrastructure::interval::{
    boundary, comparison_form, derive_domains, VarDomain,
};
use crate::features::smt::infrastructure::solvers::SmtBackend;
use crate::shared::macros::trace;
use crate::shared::models::ScalarValue;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::{Duration, Instant};

/// Inlined definitions larger than this are not analysed
const MAX_INLINED_SIZE: usize = 4_096;

/// Candidates per symbol; a longer list is truncated and the search
/// loses its completeness guarantee
const MAX_CANDIDATES: usize = 512;

#[derive(Debug, Clone)]
pub struct BoundedSearchSolver {
    timeout: Duration,
    node_budget: u64,
}

impl BoundedSearchSolver {
    pub fn new(timeout_ms: u64, node_budget: u64) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms),
            node_budget,
        }
    }
}

impl Default for BoundedSearchSolver {
    fn default() -> Self {
        Self::new(1_000, 200_000)
    }
}

impl SmtBackend for BoundedSearchSolver {
    fn name(&self) -> &'static str {
        "bounded"
    }

    fn solve(&self, problem: &SmtProblem) -> Result<SolveOutcome, SolverError> {
        let started = Instant::now();
        let mut declarations = problem.declarations.clone();
        for t in &problem.assertions {
            for name in t.variables() {
                declarations.entry(name).or_insert(Sort::Int);
            }
        }

        let analysis = Analysis::new(problem, &declarations);
        let conjuncts: Vec<&Term> = analysis
            .inlined_assertions
            .iter()
            .flatten()
            .flat_map(|t| t.conjuncts())
            .collect();
        let domains = derive_domains(&conjuncts, &declarations);
        if let Some((name, _)) = domains.iter().find(|(_, d)| d.is_empty()) {
            trace!(symbol = %name, "empty domain");
            return Ok(SolveOutcome::Unsat);
        }

        let mut free: Vec<String> = problem.free_symbols().into_iter().map(str::to_string).collect();
        for name in declarations.keys() {
            if !free.contains(name) && !problem.is_defined(name) {
                free.push(name.clone());
            }
        }

        let mut complete = analysis.complete;
        let order: Vec<(String, Vec<ScalarValue>)> = free
            .into_iter()
            .map(|name| {
                let sort = declarations.get(&name).copied().unwrap_or(Sort::Int);
                let domain = domains.get(&name).cloned().unwrap_or_else(|| VarDomain::full(sort));
                let mut values = candidates(sort, &domain, &analysis.pool, analysis.boundaries.get(&name));
                if values.len() > MAX_CANDIDATES {
                    values.truncate(MAX_CANDIDATES);
                    complete = false;
                }
                (name, values)
            })
            .collect();

        let mut search = Search::new(problem, &declarations, order, self.node_budget, started + self.timeout);
        let outcome = match search.run() {
            Step::Found => SolveOutcome::Sat(SolvedAssignment::new(search.env.into_iter().collect())),
            Step::Exhausted if complete && !search.lossy => SolveOutcome::Unsat,
            Step::Exhausted => SolveOutcome::Unknown(UnknownReason::Incomplete),
            Step::Abort(reason) => SolveOutcome::Unknown(reason),
        };
        trace!(
            nodes = search.nodes,
            elapsed_us = started.elapsed().as_micros() as u64,
            outcome = outcome.label(),
            "bounded search finished"
        );
        Ok(outcome)
    }
}

/// What the problem looks like with definitions substituted away
struct Analysis {
    /// `None` where inlining was too large
    inlined_assertions: Vec<Option<Term>>,
    /// Numeric constants anywhere in the problem
    pool: Vec<ScalarValue>,
    /// Flip points of single-symbol comparisons, per symbol
    boundaries: HashMap<String, Vec<f64>>,
    /// Whether exhausting the candidates proves unsatisfiability
    complete: bool,
}

impl Analysis {
    fn new(problem: &SmtProblem, sorts: &BTreeMap<String, Sort>) -> Self {
        let mut inlined: HashMap<&str, Option<Term>> = HashMap::new();
        for Definition { name, term } in &problem.definitions {
            let expanded = inline(term, &inlined);
            inlined.insert(name.as_str(), expanded);
        }

        let inlined_assertions: Vec<Option<Term>> =
            problem.assertions.iter().map(|t| inline(t, &inlined)).collect();

        let mut pool = Vec::new();
        let mut seen = Vec::new();
        let sources = problem
            .assertions
            .iter()
            .chain(problem.definitions.iter().map(|d| &d.term))
            .chain(inlined_assertions.iter().flatten());
        for t in sources {
            for c in t.constants() {
                if !seen.contains(&c) {
                    seen.push(c);
                    pool.push(c);
                }
            }
        }

        let mut boundaries: HashMap<String, Vec<f64>> = HashMap::new();
        let mut complete = inlined_assertions.iter().all(Option::is_some);
        for t in inlined_assertions.iter().flatten() {
            visit_atoms(t, &mut |atom| {
                if let Term::Cmp(_, lhs, rhs) = atom {
                    if let Some((name, k)) = boundary(lhs, rhs) {
                        boundaries.entry(name).or_default().push(k);
                    }
                }
                complete &= atom_is_decidable(atom, sorts);
            });
        }

        Self {
            inlined_assertions,
            pool,
            boundaries,
            complete,
        }
    }
}

fn inline(term: &Term, defs: &HashMap<&str, Option<Term>>) -> Option<Term> {
    let vars = term.variables();
    if vars.iter().any(|v| matches!(defs.get(v.as_str()), Some(None))) {
        return None;
    }
    let expanded = term.substitute(&|name| defs.get(name).cloned().flatten());
    (expanded.size() <= MAX_INLINED_SIZE).then_some(expanded)
}

/// Calls `f` on every leaf below the boolean connectives
fn visit_atoms<'t>(term: &'t Term, f: &mut dyn FnMut(&'t Term)) {
    match term {
        Term::And(ts) | Term::Or(ts) => ts.iter().for_each(|t| visit_atoms(t, f)),
        Term::Not(t) => visit_atoms(t, f),
        other => f(other),
    }
}

/// Truth of the atom is fixed on each region between its flip points
fn atom_is_decidable(atom: &Term, sorts: &BTreeMap<String, Sort>) -> bool {
    let vars = atom.variables();
    let numeric: Vec<&String> = vars
        .iter()
        .filter(|v| sorts.get(*v).copied() != Some(Sort::Bool))
        .collect();
    match numeric.len() {
        // only booleans, all of which are enumerated
        0 => true,
        1 if numeric.len() == vars.len() => match atom {
            Term::Cmp(_, lhs, rhs) => comparison_form(lhs, rhs).is_some(),
            _ => false,
        },
        _ => false,
    }
}

/// Candidate values, smallest magnitude first
fn candidates(sort: Sort, domain: &VarDomain, pool: &[ScalarValue], flips: Option<&Vec<f64>>) -> Vec<ScalarValue> {
    let flips = flips.map(Vec::as_slice).unwrap_or(&[]);
    let mut values: Vec<ScalarValue> = match sort {
        Sort::Bool => vec![ScalarValue::Bool(false), ScalarValue::Bool(true)],
        Sort::Int => int_candidates(domain, pool, flips)
            .into_iter()
            .map(ScalarValue::Int)
            .collect(),
        Sort::Real => real_candidates(domain, pool, flips)
            .into_iter()
            .map(ScalarValue::Real)
            .collect(),
    };
    values.retain(|v| domain.contains(v));
    values
}

fn int_candidates(domain: &VarDomain, pool: &[ScalarValue], flips: &[f64]) -> Vec<i128> {
    let mut set: BTreeSet<i128> = BTreeSet::new();
    if let Some(allowed) = &domain.allowed {
        set.extend(allowed.iter().filter_map(ScalarValue::as_int));
    } else {
        let mut around = |c: i128| {
            set.insert(c.saturating_sub(1));
            set.insert(c);
            set.insert(c.saturating_add(1));
        };
        around(0);
        for v in pool {
            match v {
                ScalarValue::Int(c) => around(*c),
                ScalarValue::Real(r) => {
                    around(r.floor() as i128);
                    around(r.ceil() as i128);
                }
                ScalarValue::Bool(_) => {}
            }
        }
        for k in flips {
            around(k.floor() as i128);
            around(k.ceil() as i128);
        }
        let (lo, hi) = domain.int_bounds();
        if let Some(l) = lo {
            around(l);
        }
        if let Some(h) = hi {
            around(h);
        }
        if let (Some(l), Some(h)) = (lo, hi) {
            set.insert(l / 2 + h / 2);
        }
    }
    let mut out: Vec<i128> = set.into_iter().collect();
    out.sort_by_key(|v| (v.unsigned_abs(), *v));
    out
}

fn real_candidates(domain: &VarDomain, pool: &[ScalarValue], flips: &[f64]) -> Vec<f64> {
    let mut points: Vec<f64> = vec![0.0, 1.0, -1.0];
    if let Some(allowed) = &domain.allowed {
        points = allowed.iter().map(ScalarValue::as_f64).collect();
    } else {
        for v in pool {
            if !matches!(v, ScalarValue::Bool(_)) {
                let c = v.as_f64();
                points.extend([c - 1.0, c - 0.5, c, c + 0.5, c + 1.0]);
            }
        }
        for k in flips {
            points.extend([k - 0.5, *k, k + 0.5]);
        }
        let (lo, hi) = domain.real_bounds();
        points.extend(lo.into_iter().chain(hi));

        // a point strictly inside every gap
        points.sort_by(f64::total_cmp);
        points.dedup();
        let mids: Vec<f64> = points.windows(2).map(|w| w[0] / 2.0 + w[1] / 2.0).collect();
        points.extend(mids);
    }
    points.retain(|p| p.is_finite());
    points.sort_by(|a, b| a.abs().total_cmp(&b.abs()).then(a.total_cmp(b)));
    points.dedup();
    points
}

enum Step {
    Found,
    Exhausted,
    Abort(UnknownReason),
}

struct Search<'p> {
    order: Vec<(String, Vec<ScalarValue>)>,
    /// Definitions to compute once depth `i` is assigned
    defs_at: Vec<Vec<(&'p str, Sort, &'p Term)>>,
    /// Assertions decidable once depth `i` is assigned
    checks_at: Vec<Vec<&'p Term>>,
    env: HashMap<String, ScalarValue>,
    nodes: u64,
    budget: u64,
    deadline: Instant,
    /// Some candidate was rejected because evaluation was undefined
    lossy: bool,
}

impl<'p> Search<'p> {
    fn new(
        problem: &'p SmtProblem,
        sorts: &BTreeMap<String, Sort>,
        order: Vec<(String, Vec<ScalarValue>)>,
        budget: u64,
        deadline: Instant,
    ) -> Self {
        let position: HashMap<&str, usize> = order
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.as_str(), i + 1))
            .collect();

        // level = how many symbols must be assigned before a term is known
        let mut level_of: HashMap<&str, usize> = HashMap::new();
        let level = |t: &Term, level_of: &HashMap<&str, usize>| {
            t.variables()
                .iter()
                .map(|v| {
                    position
                        .get(v.as_str())
                        .or_else(|| level_of.get(v.as_str()))
                        .copied()
                        .unwrap_or(0)
                })
                .max()
                .unwrap_or(0)
        };

        let depth = order.len() + 1;
        let mut defs_at = vec![Vec::new(); depth];
        for d in &problem.definitions {
            let l = level(&d.term, &level_of);
            level_of.insert(d.name.as_str(), l);
            let sort = sorts.get(&d.name).copied().unwrap_or(Sort::Int);
            defs_at[l].push((d.name.as_str(), sort, &d.term));
        }
        let mut checks_at = vec![Vec::new(); depth];
        for t in &problem.assertions {
            checks_at[level(t, &level_of)].push(t);
        }

        Self {
            order,
            defs_at,
            checks_at,
            env: HashMap::new(),
            nodes: 0,
            budget,
            deadline,
            lossy: false,
        }
    }

    fn run(&mut self) -> Step {
        if !self.consistent(0) {
            return Step::Exhausted;
        }
        self.descend(0)
    }

    fn descend(&mut self, depth: usize) -> Step {
        if depth == self.order.len() {
            return Step::Found;
        }
        for i in 0..self.order[depth].1.len() {
            self.nodes += 1;
            if self.nodes > self.budget {
                return Step::Abort(UnknownReason::NodeBudget);
            }
            if self.nodes % 256 == 0 && Instant::now() >= self.deadline {
                return Step::Abort(UnknownReason::Timeout);
            }
            let value = self.order[depth].1[i];
            let name = self.order[depth].0.clone();
            self.env.insert(name, value);
            if self.consistent(depth + 1) {
                match self.descend(depth + 1) {
                    Step::Exhausted => {}
                    other => return other,
                }
            }
        }
        Step::Exhausted
    }

    /// Compute the definitions and check the assertions that become known
    /// at `level`
    fn consistent(&mut self, level: usize) -> bool {
        for (name, sort, term) in &self.defs_at[level] {
            match term.eval(&self.env) {
                Some(v) => {
                    self.env.insert(name.to_string(), sort.coerce(v));
                }
                None => {
                    self.lossy = true;
                    return false;
                }
            }
        }
        for t in &self.checks_at[level] {
            match t.eval(&self.env) {
                Some(v) if v.truthy() => {}
                Some(_) => return false,
                None => {
                    self.lossy = true;
                    return false;
                }
            }
        }
        true
    }
}
