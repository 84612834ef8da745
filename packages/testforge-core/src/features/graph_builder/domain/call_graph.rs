//! Call graph
//!
//! Directed graph where:
//! - Nodes are function names known to the entity model
//! - Edges are call sites (caller → callee, with file and line)
//!
//! Calls to names the model does not know are kept aside as unresolved
//! calls instead of creating phantom nodes. Cycles (recursion) are valid.

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

/// One call site
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallEdge {
    pub file: String,
    pub line: u32,
}

/// Call to a function the model has no declaration for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedCall {
    pub caller: String,
    pub callee: String,
    pub site: CallEdge,
}

/// Functions forming one call cycle, in call order starting from the
/// member that was entered first
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallCycle {
    pub functions: Vec<String>,
}

/// Root-to-leaf call chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallPath {
    pub functions: Vec<String>,
    /// Line of each call along the chain (`functions.len() - 1` entries)
    pub call_lines: Vec<u32>,
    /// The chain stopped because the next callee was already on it
    pub ends_in_cycle: bool,
}

/// Flattened view for reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallGraphSummary {
    pub root: Option<String>,
    pub functions: Vec<String>,
    pub edges: Vec<(String, String, u32)>,
    pub unresolved: Vec<UnresolvedCall>,
    pub cycles: Vec<CallCycle>,
    pub recursive: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    graph: DiGraph<String, CallEdge>,
    index: HashMap<String, NodeIndex>,
    unresolved: Vec<UnresolvedCall>,
    cycles: Vec<CallCycle>,
    recursive: BTreeSet<String>,
    /// Set for graphs produced by [`CallGraph::reachable_from`]
    root: Option<String>,
    depths: BTreeMap<String, usize>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node; returns the existing index when already present
    pub fn add_function(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.index.insert(name.to_string(), idx);
        idx
    }

    /// Link `caller → callee`. Both must already be nodes.
    pub fn add_call(&mut self, caller: &str, callee: &str, site: CallEdge) -> bool {
        match (self.index.get(caller), self.index.get(callee)) {
            (Some(&from), Some(&to)) => {
                self.graph.add_edge(from, to, site);
                true
            }
            _ => false,
        }
    }

    pub fn add_unresolved(&mut self, call: UnresolvedCall) {
        self.unresolved.push(call);
    }

    /// Record cycle reports and recompute recursion membership.
    ///
    /// A function is recursive iff it lies in a strongly connected component
    /// with more than one member or calls itself directly.
    pub fn set_cycles(&mut self, cycles: Vec<CallCycle>) {
        self.cycles = cycles;
        self.recursive.clear();
        for scc in kosaraju_scc(&self.graph) {
            let is_cycle = scc.len() > 1
                || scc
                    .first()
                    .map(|&n| self.graph.contains_edge(n, n))
                    .unwrap_or(false);
            if is_cycle {
                self.recursive
                    .extend(scc.into_iter().map(|n| self.graph[n].clone()));
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn function_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn call_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Function names in insertion order
    pub fn functions(&self) -> Vec<String> {
        self.graph.node_indices().map(|n| self.graph[n].clone()).collect()
    }

    /// Distinct callees ordered by first call site
    pub fn callees(&self, name: &str) -> Vec<String> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// Distinct callers ordered by first call site
    pub fn callers(&self, name: &str) -> Vec<String> {
        self.neighbors(name, Direction::Incoming)
    }

    fn neighbors(&self, name: &str, direction: Direction) -> Vec<String> {
        let Some(&idx) = self.index.get(name) else {
            return Vec::new();
        };
        let mut edges: Vec<(u32, NodeIndex)> = self
            .graph
            .edges_directed(idx, direction)
            .map(|e| {
                let other = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                (e.weight().line, other)
            })
            .collect();
        edges.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut seen = HashSet::new();
        edges
            .into_iter()
            .filter(|(_, n)| seen.insert(*n))
            .map(|(_, n)| self.graph[n].clone())
            .collect()
    }

    /// Every call site from `caller` to `callee`
    pub fn call_sites(&self, caller: &str, callee: &str) -> Vec<CallEdge> {
        let (Some(&from), Some(&to)) = (self.index.get(caller), self.index.get(callee)) else {
            return Vec::new();
        };
        let mut sites: Vec<CallEdge> = self
            .graph
            .edges_connecting(from, to)
            .map(|e| e.weight().clone())
            .collect();
        sites.sort_by_key(|s| s.line);
        sites
    }

    /// Number of distinct callers
    pub fn fan_in(&self, name: &str) -> usize {
        self.callers(name).len()
    }

    /// Number of distinct callees, including unresolved ones
    pub fn fan_out(&self, name: &str) -> usize {
        let external: BTreeSet<&str> = self
            .unresolved
            .iter()
            .filter(|u| u.caller == name)
            .map(|u| u.callee.as_str())
            .collect();
        self.callees(name).len() + external.len()
    }

    pub fn unresolved_calls(&self) -> &[UnresolvedCall] {
        &self.unresolved
    }

    /// Distinct names called but not declared anywhere
    pub fn external_functions(&self) -> BTreeSet<String> {
        self.unresolved.iter().map(|u| u.callee.clone()).collect()
    }

    pub fn cycles(&self) -> &[CallCycle] {
        &self.cycles
    }

    pub fn has_cycles(&self) -> bool {
        !self.recursive.is_empty()
    }

    pub fn is_recursive(&self, name: &str) -> bool {
        self.recursive.contains(name)
    }

    pub fn recursive_functions(&self) -> &BTreeSet<String> {
        &self.recursive
    }

    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// BFS depth from the root, for rooted graphs
    pub fn depth_of(&self, name: &str) -> Option<usize> {
        self.depths.get(name).copied()
    }

    /// Subgraph of functions reachable from `root` within `max_depth` calls.
    ///
    /// Breadth-first, so each function gets its shortest call depth. Returns
    /// `None` when `root` is not a node.
    pub fn reachable_from(&self, root: &str, max_depth: usize) -> Option<CallGraph> {
        let &start = self.index.get(root)?;
        let mut depths: HashMap<NodeIndex, usize> = HashMap::new();
        let mut order = vec![start];
        let mut queue = VecDeque::from([(start, 0usize)]);
        depths.insert(start, 0);

        while let Some((node, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for callee in self.callees(&self.graph[node]) {
                let idx = self.index[&callee];
                if let std::collections::hash_map::Entry::Vacant(slot) = depths.entry(idx) {
                    slot.insert(depth + 1);
                    order.push(idx);
                    queue.push_back((idx, depth + 1));
                }
            }
        }

        let mut sub = CallGraph::new();
        for &n in &order {
            sub.add_function(&self.graph[n]);
        }
        for edge in self.graph.edge_references() {
            if depths.contains_key(&edge.source()) && depths.contains_key(&edge.target()) {
                sub.add_call(
                    &self.graph[edge.source()],
                    &self.graph[edge.target()],
                    edge.weight().clone(),
                );
            }
        }
        for call in &self.unresolved {
            if self
                .index
                .get(&call.caller)
                .map(|n| depths.contains_key(n))
                .unwrap_or(false)
            {
                sub.add_unresolved(call.clone());
            }
        }
        let cycles = self
            .cycles
            .iter()
            .filter(|c| c.functions.iter().all(|f| sub.contains(f)))
            .cloned()
            .collect();
        sub.set_cycles(cycles);
        sub.root = Some(root.to_string());
        sub.depths = depths
            .into_iter()
            .map(|(n, d)| (self.graph[n].clone(), d))
            .collect();
        Some(sub)
    }

    /// Call chains from `root` down to leaves.
    ///
    /// A chain ends at a function without resolved callees, at `max_depth`
    /// calls, or just before re-entering a function already on the chain.
    /// At most `max_paths` chains are returned, in depth-first order.
    pub fn call_paths(&self, root: &str, max_depth: usize, max_paths: usize) -> Vec<CallPath> {
        let mut paths = Vec::new();
        if !self.contains(root) || max_paths == 0 {
            return paths;
        }

        // (chain, lines) pairs still to extend
        let mut stack: Vec<(Vec<String>, Vec<u32>)> = vec![(vec![root.to_string()], Vec::new())];
        while let Some((chain, lines)) = stack.pop() {
            let Some(last) = chain.last() else {
                continue;
            };
            let callees = self.callees(last);
            let at_limit = chain.len() > max_depth;
            if callees.is_empty() || at_limit {
                paths.push(CallPath {
                    functions: chain,
                    call_lines: lines,
                    ends_in_cycle: false,
                });
            } else {
                let mut next = Vec::new();
                for callee in callees {
                    let line = self
                        .call_sites(last, &callee)
                        .first()
                        .map(|s| s.line)
                        .unwrap_or(0);
                    if chain.contains(&callee) {
                        paths.push(CallPath {
                            functions: chain.clone(),
                            call_lines: lines.clone(),
                            ends_in_cycle: true,
                        });
                        continue;
                    }
                    let mut c = chain.clone();
                    c.push(callee);
                    let mut l = lines.clone();
                    l.push(line);
                    next.push((c, l));
                }
                stack.extend(next.into_iter().rev());
            }
            if paths.len() >= max_paths {
                paths.truncate(max_paths);
                break;
            }
        }
        paths
    }

    pub fn summary(&self) -> CallGraphSummary {
        CallGraphSummary {
            root: self.root.clone(),
            functions: self.functions(),
            edges: self
                .graph
                .edge_references()
                .map(|e| {
                    (
                        self.graph[e.source()].clone(),
                        self.graph[e.target()].clone(),
                        e.weight().line,
                    )
                })
                .collect(),
            unresolved: self.unresolved.clone(),
            cycles: self.cycles.clone(),
            recursive: self.recursive.iter().cloned().collect(),
        }
    }

    pub(crate) fn graph(&self) -> &DiGraph<String, CallEdge> {
        &self.graph
    }
}
