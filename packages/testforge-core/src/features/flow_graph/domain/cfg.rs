//! Control-flow graph
//!
//! Nodes are statements and decision points of one function body; edges
//! are transitions, labelled with the branch they realise when they leave a
//! decision.

use super::branch::BranchId;
use crate::shared::expr::Effect;
use crate::shared::models::NodeId;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, EdgeRef};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CfgNodeKind {
    Entry,
    Exit,
    Statement,
    /// `if`, loop condition or ternary
    Decision,
    Switch,
    Return,
    Jump,
    /// Join point without its own statement (loop heads)
    Merge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CfgNode {
    pub kind: CfgNodeKind,
    /// Originating body statement
    pub ast: Option<NodeId>,
    pub line: u32,
    /// Condition, statement or return text
    pub text: Option<String>,
    /// Effects on locals when this node executes
    pub effects: Vec<Effect>,
}

impl CfgNode {
    pub fn new(kind: CfgNodeKind, ast: Option<NodeId>, line: u32) -> Self {
        Self {
            kind,
            ast,
            line,
            text: None,
            effects: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CfgEdge {
    Flow,
    Branch(BranchId),
}

#[derive(Debug, Clone)]
pub struct ControlFlowGraph {
    pub graph: DiGraph<CfgNode, CfgEdge>,
    pub entry: NodeIndex,
    pub exit: NodeIndex,
}

impl ControlFlowGraph {
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, idx: NodeIndex) -> &CfgNode {
        &self.graph[idx]
    }

    /// Nodes reachable from the entry
    pub fn reachable(&self) -> HashSet<NodeIndex> {
        let mut seen = HashSet::new();
        let mut bfs = Bfs::new(&self.graph, self.entry);
        while let Some(n) = bfs.next(&self.graph) {
            seen.insert(n);
        }
        seen
    }

    /// Outgoing edges in the order they were added
    pub fn successors(&self, idx: NodeIndex) -> Vec<(CfgEdge, NodeIndex)> {
        let mut out: Vec<(CfgEdge, NodeIndex)> = self
            .graph
            .edges(idx)
            .map(|e| (*e.weight(), e.target()))
            .collect();
        // petgraph yields the newest edge first
        out.reverse();
        out
    }

    /// Decision node carrying a branch edge
    pub fn decision_of(&self, branch: BranchId) -> Option<NodeIndex> {
        self.graph
            .edge_references()
            .find(|e| *e.weight() == CfgEdge::Branch(branch))
            .map(|e| e.source())
    }

    /// Decision nodes (two-way and switch)
    pub fn decision_count(&self) -> usize {
        self.graph
            .node_weights()
            .filter(|n| matches!(n.kind, CfgNodeKind::Decision | CfgNodeKind::Switch))
            .count()
    }
}
