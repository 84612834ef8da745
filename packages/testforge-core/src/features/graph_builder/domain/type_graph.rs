//! Type dependency graph
//!
//! Nodes are aggregate tags and typedef aliases. An aggregate depends on the
//! types of its members, either by value (the member's storage is inside
//! the aggregate) or through a pointer. A typedef depends on its original
//! type. By-value cycles make a type infinitely large and are reported;
//! cycles that pass through a pointer are ordinary recursive data types.

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeEdgeKind {
    /// Member stored by value (including arrays of the type)
    Contains,
    /// Member is a pointer to the type
    PointsTo,
    /// Typedef alias of the type
    Aliases,
}

impl TypeEdgeKind {
    fn is_by_value(self) -> bool {
        matches!(self, TypeEdgeKind::Contains | TypeEdgeKind::Aliases)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDependency {
    pub from: String,
    pub to: String,
    pub kind: TypeEdgeKind,
    /// Member name for aggregate edges
    pub via: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TypeDependencyGraph {
    graph: DiGraph<String, (TypeEdgeKind, Option<String>)>,
    index: HashMap<String, NodeIndex>,
}

impl TypeDependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_type(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.index.insert(name.to_string(), idx);
        idx
    }

    pub fn add_dependency(&mut self, from: &str, to: &str, kind: TypeEdgeKind, via: Option<&str>) {
        let a = self.add_type(from);
        let b = self.add_type(to);
        self.graph.add_edge(a, b, (kind, via.map(str::to_string)));
    }

    pub fn type_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Direct dependencies of a type
    pub fn dependencies(&self, name: &str) -> Vec<TypeDependency> {
        let Some(&idx) = self.index.get(name) else {
            return Vec::new();
        };
        let mut deps: Vec<TypeDependency> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| TypeDependency {
                from: name.to_string(),
                to: self.graph[e.target()].clone(),
                kind: e.weight().0,
                via: e.weight().1.clone(),
            })
            .collect();
        deps.reverse();
        deps
    }

    /// Types that depend directly on `name`
    pub fn dependents(&self, name: &str) -> BTreeSet<String> {
        let Some(&idx) = self.index.get(name) else {
            return BTreeSet::new();
        };
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .map(|n| self.graph[n].clone())
            .collect()
    }

    /// Groups of types that contain each other by value. Each group is
    /// sorted; groups are ordered by their first member.
    pub fn by_value_cycles(&self) -> Vec<Vec<String>> {
        // Keeps every node, so indices stay valid for `self.graph`
        let by_value: DiGraph<(), ()> = self
            .graph
            .filter_map(|_, _| Some(()), |_, e| e.0.is_by_value().then_some(()));
        let mut groups: Vec<Vec<String>> = kosaraju_scc(&by_value)
            .into_iter()
            .filter(|scc| self.is_cycle(scc, true))
            .map(|scc| self.sorted_names(&scc))
            .collect();
        groups.sort();
        groups
    }

    /// Types that take part in a cycle which passes through a pointer
    pub fn recursive_types(&self) -> BTreeSet<String> {
        let by_value: BTreeSet<String> = self.by_value_cycles().into_iter().flatten().collect();
        kosaraju_scc(&self.graph)
            .into_iter()
            .filter(|scc| self.is_cycle(scc, false))
            .flat_map(|scc| self.sorted_names(&scc))
            .filter(|n| !by_value.contains(n))
            .collect()
    }

    fn is_cycle(&self, scc: &[NodeIndex], by_value_only: bool) -> bool {
        if scc.len() > 1 {
            return true;
        }
        let Some(&n) = scc.first() else {
            return false;
        };
        self.graph
            .edges_connecting(n, n)
            .any(|e| !by_value_only || e.weight().0.is_by_value())
    }

    fn sorted_names(&self, scc: &[NodeIndex]) -> Vec<String> {
        let mut names: Vec<String> = scc.iter().map(|&n| self.graph[n].clone()).collect();
        names.sort();
        names
    }
}
