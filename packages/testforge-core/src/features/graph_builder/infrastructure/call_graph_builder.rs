//! Call graph construction
//!
//! Two passes over the entity model:
//! 1. Collect the callee names of every function body. Nothing is linked
//!    yet, so declaration order does not matter.
//! 2. Create a node per known function, then link each collected call.
//!    Calls to unknown names are kept as unresolved calls.
//!
//! Cycle reports come from an iterative depth-first search with
//! white/gray/black coloring: a call to a gray function (one still on the
//! DFS stack) closes a cycle. The explicit stack keeps deep or recursive
//! call chains from exhausting the native stack.

use crate::features::entity_model::{EntityModel, Function};
use crate::features::graph_builder::domain::{CallCycle, CallEdge, CallGraph, UnresolvedCall};
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone)]
struct CollectedCall {
    callee: String,
    line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

pub struct CallGraphBuilder<'a> {
    model: &'a EntityModel,
}

impl<'a> CallGraphBuilder<'a> {
    pub fn new(model: &'a EntityModel) -> Self {
        Self { model }
    }

    pub fn build(&self) -> CallGraph {
        // Pass 1: collect
        let collected: Vec<(&Function, Vec<CollectedCall>)> = self
            .model
            .functions()
            .iter()
            .map(|f| (f, collect_calls(f)))
            .collect();

        // Pass 2: link
        let mut graph = CallGraph::new();
        for f in self.model.functions() {
            graph.add_function(&f.name);
        }
        for (caller, calls) in &collected {
            for call in calls {
                let site = CallEdge {
                    file: caller.location.file.clone(),
                    line: call.line,
                };
                if !graph.add_call(&caller.name, &call.callee, site.clone()) {
                    graph.add_unresolved(UnresolvedCall {
                        caller: caller.name.clone(),
                        callee: call.callee.clone(),
                        site,
                    });
                }
            }
        }

        let cycles = find_cycles(&graph);
        graph.set_cycles(cycles);

        debug!(
            functions = graph.function_count(),
            calls = graph.call_count(),
            unresolved = graph.unresolved_calls().len(),
            cycles = graph.cycles().len(),
            "call graph built"
        );
        graph
    }

    /// Build and write `is_recursive` back into the model's functions
    pub fn build_and_annotate(model: &mut EntityModel) -> CallGraph {
        let graph = CallGraphBuilder::new(model).build();
        for f in model.functions_mut() {
            f.is_recursive = graph.is_recursive(&f.name);
        }
        graph
    }
}

/// Call sites of a body in pre-order. Without a body, fall back to the
/// front end's callee list at the declaration line.
fn collect_calls(function: &Function) -> Vec<CollectedCall> {
    match &function.body {
        Some(body) => body
            .call_sites()
            .into_iter()
            .map(|site| CollectedCall {
                callee: site.callee.clone(),
                line: site.line,
            })
            .collect(),
        None => function
            .called_functions
            .iter()
            .map(|callee| CollectedCall {
                callee: callee.clone(),
                line: function.location.line,
            })
            .collect(),
    }
}

/// One cycle per back edge, each listed from the re-entered function
/// onwards. Rotations of an already reported cycle are dropped.
fn find_cycles(graph: &CallGraph) -> Vec<CallCycle> {
    let g = graph.graph();
    let mut color = vec![Color::White; g.node_count()];
    let mut cycles = Vec::new();
    let mut seen: HashSet<Vec<String>> = HashSet::new();

    for start in g.node_indices() {
        if color[start.index()] != Color::White {
            continue;
        }
        // Frame: node plus its remaining successors, in call-site order
        let mut stack: Vec<(NodeIndex, Vec<NodeIndex>)> = Vec::new();
        let mut path: Vec<NodeIndex> = Vec::new();
        color[start.index()] = Color::Gray;
        stack.push((start, successors(graph, start)));
        path.push(start);

        while let Some((node, pending)) = stack.last_mut() {
            let node = *node;
            let Some(next) = pending.pop() else {
                color[node.index()] = Color::Black;
                stack.pop();
                path.pop();
                continue;
            };
            match color[next.index()] {
                Color::White => {
                    color[next.index()] = Color::Gray;
                    stack.push((next, successors(graph, next)));
                    path.push(next);
                }
                Color::Gray => {
                    if let Some(pos) = path.iter().position(|&n| n == next) {
                        let members: Vec<String> = path[pos..].iter().map(|&n| g[n].clone()).collect();
                        if seen.insert(canonical_rotation(&members)) {
                            cycles.push(CallCycle { functions: members });
                        }
                    }
                }
                Color::Black => {}
            }
        }
    }
    cycles
}

/// Successors reversed so that popping yields them in call-site order
fn successors(graph: &CallGraph, node: NodeIndex) -> Vec<NodeIndex> {
    let g = graph.graph();
    let mut targets: Vec<(u32, NodeIndex)> = g.edges(node).map(|e| (e.weight().line, e.target())).collect();
    targets.sort();
    let mut out: Vec<NodeIndex> = Vec::new();
    for (_, n) in targets {
        if !out.contains(&n) {
            out.push(n);
        }
    }
    out.reverse();
    out
}

fn canonical_rotation(members: &[String]) -> Vec<String> {
    let Some(min_pos) = members
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map(|(i, _)| i)
    else {
        return Vec::new();
    };
    members[min_pos..]
        .iter()
        .chain(members[..min_pos].iter())
        .cloned()
        .collect()
}
