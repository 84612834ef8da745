//! Include dependency graph
//!
//! Directed graph where:
//! - Nodes are file paths
//! - Edges represent `#include` (A → B means A includes B)

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

#[derive(Debug, Clone, Default)]
pub struct IncludeGraph {
    graph: DiGraph<String, u32>,
    index: HashMap<String, NodeIndex>,
    system: BTreeSet<String>,
}

/// `./a.h` and `a.h` name the same file
fn normalize(path: &str) -> String {
    path.trim().trim_start_matches("./").replace('\\', "/")
}

impl IncludeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, path: &str) -> NodeIndex {
        let key = normalize(path);
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.graph.add_node(key.clone());
        self.index.insert(key, idx);
        idx
    }

    pub fn add_include(&mut self, from: &str, to: &str, line: u32, is_system: bool) {
        let a = self.add_file(from);
        let b = self.add_file(to);
        if is_system {
            self.system.insert(normalize(to));
        }
        if !self.graph.contains_edge(a, b) {
            self.graph.add_edge(a, b, line);
        }
    }

    pub fn file_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_system(&self, path: &str) -> bool {
        self.system.contains(&normalize(path))
    }

    /// Files directly included by `path`, sorted
    pub fn includes_of(&self, path: &str) -> Vec<String> {
        self.neighbors(path, Direction::Outgoing)
    }

    /// Files that directly include `path`, sorted
    pub fn included_by(&self, path: &str) -> Vec<String> {
        self.neighbors(path, Direction::Incoming)
    }

    fn neighbors(&self, path: &str, direction: Direction) -> Vec<String> {
        let Some(&idx) = self.index.get(&normalize(path)) else {
            return Vec::new();
        };
        let mut names: Vec<String> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n].clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Groups of files that include each other, each group sorted
    pub fn cycle_groups(&self) -> Vec<Vec<String>> {
        let mut groups: Vec<Vec<String>> = kosaraju_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || scc.first().is_some_and(|&n| self.graph.contains_edge(n, n)))
            .map(|scc| {
                let mut names: Vec<String> = scc.into_iter().map(|n| self.graph[n].clone()).collect();
                names.sort();
                names
            })
            .collect();
        groups.sort();
        groups
    }

    /// Dependencies-first order: every file comes after the files it
    /// includes. Files on include cycles cannot be ordered and are appended
    /// at the end in name order.
    pub fn topological_order(&self) -> Vec<String> {
        // Pending include count per file
        let mut pending: BTreeMap<String, usize> = BTreeMap::new();
        for idx in self.graph.node_indices() {
            let out = self
                .graph
                .neighbors_directed(idx, Direction::Outgoing)
                .filter(|&n| n != idx)
                .count();
            pending.insert(self.graph[idx].clone(), out);
        }

        let mut ready: VecDeque<String> = pending
            .iter()
            .filter(|(_, &n)| n == 0)
            .map(|(name, _)| name.clone())
            .collect();
        let mut order = Vec::new();
        let mut placed = BTreeSet::new();

        while let Some(name) = ready.pop_front() {
            if !placed.insert(name.clone()) {
                continue;
            }
            order.push(name.clone());
            let mut unlocked = Vec::new();
            for includer in self.included_by(&name) {
                if includer == name {
                    continue;
                }
                if let Some(count) = pending.get_mut(&includer) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        unlocked.push(includer);
                    }
                }
            }
            ready.extend(unlocked);
        }

        for name in pending.keys() {
            if !placed.contains(name) {
                order.push(name.clone());
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topological_order_dependencies_first() {
        let mut g = IncludeGraph::new();
        g.add_include("main.c", "app.h", 1, false);
        g.add_include("main.c", "stdio.h", 2, true);
        g.add_include("app.h", "./types.h", 3, false);
        let order = g.topological_order();
        let pos = |f: &str| order.iter().position(|x| x == f).unwrap();
        assert!(pos("types.h") < pos("app.h"));
        assert!(pos("app.h") < pos("main.c"));
        assert!(pos("stdio.h") < pos("main.c"));
        assert!(g.is_system("stdio.h"));
        assert!(g.cycle_groups().is_empty());
    }

    #[test]
    fn test_include_cycle() {
        let mut g = IncludeGraph::new();
        g.add_include("a.h", "b.h", 1, false);
        g.add_include("b.h", "a.h", 1, false);
        g.add_include("main.c", "a.h", 1, false);
        assert_eq!(g.cycle_groups(), vec![vec!["a.h".to_string(), "b.h".to_string()]]);
        assert_eq!(g.topological_order().len(), 3);
        assert_eq!(g.included_by("a.h"), vec!["b.h", "main.c"]);
    }

    #[test]
    fn test_long_include_ring() {
        let mut g = IncludeGraph::new();
        let n = 20_000;
        for i in 0..n {
            g.add_include(&format!("h{i}.h"), &format!("h{}.h", (i + 1) % n), 1, false);
        }
        let groups = g.cycle_groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), n);
        assert_eq!(g.topological_order().len(), n);
    }
}
