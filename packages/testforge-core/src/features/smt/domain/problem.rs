//! Solver input: declared symbols, definitions and assertions

use super::{Sort, Term};
use crate::shared::models::ScalarValue;
use std::collections::BTreeMap;

/// `name := term`, where `term` only mentions earlier symbols
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub name: String,
    pub term: Term,
}

/// One self-contained satisfiability question.
///
/// Backends treat each problem in isolation; nothing carries over between
/// two `solve` calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmtProblem {
    pub declarations: BTreeMap<String, Sort>,
    /// SSA equalities in execution order
    pub definitions: Vec<Definition>,
    pub assertions: Vec<Term>,
    /// Symbols reported back to the caller, in report order
    pub inputs: Vec<String>,
    /// Value of interest evaluated under the model (e.g. the return expression)
    pub result: Option<Term>,
}

impl SmtProblem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `name` unless it already exists; the first sort wins
    pub fn declare(&mut self, name: impl Into<String>, sort: Sort) {
        self.declarations.entry(name.into()).or_insert(sort);
    }

    pub fn define(&mut self, name: impl Into<String>, sort: Sort, term: Term) {
        let name = name.into();
        self.declare(name.clone(), sort);
        self.definitions.push(Definition { name, term });
    }

    pub fn assert(&mut self, term: Term) {
        match term {
            Term::And(ts) => self.assertions.extend(ts),
            Term::Const(ScalarValue::Bool(true)) => {}
            other => self.assertions.push(other),
        }
    }

    pub fn add_input(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.inputs.contains(&name) {
            self.inputs.push(name);
        }
    }

    pub fn sort_of(&self, name: &str) -> Option<Sort> {
        self.declarations.get(name).copied()
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.definitions.iter().any(|d| d.name == name)
    }

    /// Symbols the backend must choose values for
    pub fn free_symbols(&self) -> Vec<&str> {
        let mut free: Vec<&str> = self
            .inputs
            .iter()
            .map(String::as_str)
            .filter(|n| self.declarations.contains_key(*n) && !self.is_defined(n))
            .collect();
        for name in self.declarations.keys() {
            if !free.contains(&name.as_str()) && !self.is_defined(name) {
                free.push(name);
            }
        }
        free
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::smt::domain::ComparisonOp;

    #[test]
    fn test_free_symbols_put_inputs_first() {
        let mut p = SmtProblem::new();
        p.declare("a", Sort::Int);
        p.declare("z", Sort::Int);
        p.add_input("z");
        p.define("z!1", Sort::Int, Term::var("z"));
        p.assert(Term::cmp(ComparisonOp::Gt, Term::var("z!1"), Term::var("a")));
        assert_eq!(p.free_symbols(), vec!["z", "a"]);
        assert!(p.is_defined("z!1"));
    }

    #[test]
    fn test_assert_splits_conjunctions() {
        let mut p = SmtProblem::new();
        p.assert(Term::and(vec![Term::var("a"), Term::var("b")]));
        p.assert(Term::bool(true));
        assert_eq!(p.assertions.len(), 2);
    }
}
