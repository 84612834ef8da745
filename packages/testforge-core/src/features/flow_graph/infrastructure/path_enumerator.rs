//! Bounded entry-to-exit path enumeration
//!
//! Depth-first, true edge before false edge, so the first path found is the
//! one that takes every decision's first branch. Each CFG edge may appear at
//! most `loop_unroll_bound` times on one path, which bounds loops; the total
//! number of paths and the edge count of a single path are bounded too.

use crate::config::AnalysisConfig;
use crate::features::flow_graph::domain::{
    BranchId, CfgEdge, CfgNodeKind, ControlFlowGraph, ControlFlowPath, PathFact,
};
use crate::shared::expr::Effect;
use crate::shared::macros::debug;
use crate::shared::models::NodeId;
use petgraph::graph::NodeIndex;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathLimits {
    pub max_paths: usize,
    pub max_path_length: usize,
    pub loop_unroll_bound: usize,
}

impl From<&AnalysisConfig> for PathLimits {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            max_paths: config.max_paths_per_function,
            max_path_length: config.max_path_length,
            loop_unroll_bound: config.loop_unroll_bound,
        }
    }
}

impl Default for PathLimits {
    fn default() -> Self {
        Self::from(&AnalysisConfig::default())
    }
}

#[derive(Clone)]
struct Partial {
    node: NodeIndex,
    statements: Vec<NodeId>,
    branches: Vec<BranchId>,
    facts: Vec<PathFact>,
    return_value: Option<String>,
    edge_uses: HashMap<(NodeIndex, NodeIndex, CfgEdge), usize>,
    evaluated: HashSet<NodeIndex>,
    length: usize,
}

impl Partial {
    fn enter(&mut self, cfg: &ControlFlowGraph, idx: NodeIndex) {
        self.node = idx;
        let node = cfg.node(idx);
        if let Some(ast) = node.ast {
            if self.statements.last() != Some(&ast) {
                self.statements.push(ast);
            }
        }
        for effect in &node.effects {
            match effect {
                Effect::Assign { target, value } => self.facts.push(PathFact::Assign {
                    target: target.clone(),
                    value: value.clone(),
                }),
                Effect::Havoc { target } => self.facts.push(PathFact::Havoc {
                    target: target.clone(),
                }),
                Effect::None => {}
            }
        }
        if node.kind == CfgNodeKind::Return {
            self.return_value = node.text.clone();
        }
    }
}

pub struct PathEnumerator<'a> {
    cfg: &'a ControlFlowGraph,
    conditions: HashMap<BranchId, &'a str>,
    limits: PathLimits,
}

impl<'a> PathEnumerator<'a> {
    /// `conditions` maps each branch to its guard text
    pub fn new(
        cfg: &'a ControlFlowGraph,
        conditions: impl IntoIterator<Item = (BranchId, &'a str)>,
        limits: PathLimits,
    ) -> Self {
        Self {
            cfg,
            conditions: conditions.into_iter().collect(),
            limits,
        }
    }

    pub fn enumerate(&self) -> Vec<ControlFlowPath> {
        let mut paths = Vec::new();
        if self.limits.max_paths == 0 {
            return paths;
        }

        let mut start = Partial {
            node: self.cfg.entry,
            statements: Vec::new(),
            branches: Vec::new(),
            facts: Vec::new(),
            return_value: None,
            edge_uses: HashMap::new(),
            evaluated: HashSet::new(),
            length: 0,
        };
        start.enter(self.cfg, self.cfg.entry);
        let mut stack = vec![start];
        let mut truncated = 0usize;

        while let Some(partial) = stack.pop() {
            if partial.node == self.cfg.exit {
                paths.push(ControlFlowPath {
                    id: paths.len(),
                    statements: partial.statements,
                    branches: partial.branches,
                    facts: partial.facts,
                    return_value: partial.return_value,
                    is_feasible: true,
                    is_covered: false,
                });
                if paths.len() >= self.limits.max_paths {
                    break;
                }
                continue;
            }
            if partial.length >= self.limits.max_path_length {
                truncated += 1;
                continue;
            }

            let successors = self.cfg.successors(partial.node);
            // Reverse so the first successor is popped first
            for (edge, target) in successors.into_iter().rev() {
                let key = (partial.node, target, edge);
                let uses = partial.edge_uses.get(&key).copied().unwrap_or(0);
                if uses >= self.limits.loop_unroll_bound {
                    continue;
                }
                let mut next = partial.clone();
                next.edge_uses.insert(key, uses + 1);
                next.length += 1;
                if let CfgEdge::Branch(branch) = edge {
                    next.branches.push(branch);
                    // Only the first evaluation of a decision constrains the inputs
                    if next.evaluated.insert(partial.node) {
                        let condition = self.conditions.get(&branch).copied().unwrap_or("1");
                        next.facts.push(PathFact::Guard {
                            branch,
                            condition: condition.to_string(),
                        });
                    }
                }
                next.enter(self.cfg, target);
                stack.push(next);
            }
        }

        if truncated > 0 {
            debug!(truncated, paths = paths.len(), "paths cut at max length");
        }
        paths
    }
}

/// Paths that traverse any of `branches`
pub fn find_paths_covering_branches<'p>(
    paths: &'p [ControlFlowPath],
    branches: &[BranchId],
) -> Vec<&'p ControlFlowPath> {
    paths
        .iter()
        .filter(|p| branches.iter().any(|b| p.covers(*b)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::flow_graph::infrastructure::cfg_builder::CfgBuilder;
    use crate::shared::models::BodyBuilder;

    fn enumerate(body: &crate::shared::models::FunctionBody, limits: PathLimits) -> Vec<ControlFlowPath> {
        let lowered = CfgBuilder::new(body).build();
        let conditions = lowered
            .branches
            .iter()
            .map(|b| (b.id, b.condition.as_str()));
        PathEnumerator::new(&lowered.cfg, conditions, limits).enumerate()
    }

    fn clamp() -> crate::shared::models::FunctionBody {
        let mut b = BodyBuilder::new();
        let r0 = b.ret(Some("0"), 1);
        let if1 = b.if_stmt("x < 0", r0, None, 1);
        let r100 = b.ret(Some("100"), 2);
        let if2 = b.if_stmt("x > 100", r100, None, 2);
        let rx = b.ret(Some("x"), 3);
        let root = b.compound(vec![if1, if2, rx], 1);
        b.finish(root)
    }

    #[test]
    fn test_clamp_has_three_paths() {
        let paths = enumerate(&clamp(), PathLimits::default());
        assert_eq!(paths.len(), 3);
        assert_eq!(paths[0].conditions(), vec!["x < 0"]);
        assert_eq!(paths[0].return_value.as_deref(), Some("0"));
        assert_eq!(paths[1].conditions(), vec!["!(x < 0)", "x > 100"]);
        assert_eq!(paths[2].conditions(), vec!["!(x < 0)", "!(x > 100)"]);
        assert_eq!(paths[2].return_value.as_deref(), Some("x"));

        let covering = find_paths_covering_branches(&paths, &[BranchId(2)]);
        assert_eq!(covering.len(), 1);
        assert_eq!(covering[0].id, 1);
    }

    #[test]
    fn test_loop_guard_asserted_once() {
        let mut b = BodyBuilder::new();
        let inc = b.expr("i++", 2);
        let w = b.while_stmt("i < n", inc, 1);
        let r = b.ret(Some("i"), 3);
        let root = b.compound(vec![w, r], 1);
        let limits = PathLimits {
            max_paths: 16,
            max_path_length: 64,
            loop_unroll_bound: 2,
        };
        let paths = enumerate(&b.finish(root), limits);
        // zero, one and two iterations
        assert_eq!(paths.len(), 3);
        for p in &paths {
            assert_eq!(p.conditions().len(), 1);
        }
        let two = paths.iter().find(|p| p.branches.len() == 3).unwrap();
        let assigns = two
            .facts
            .iter()
            .filter(|f| matches!(f, PathFact::Assign { .. }))
            .count();
        assert_eq!(assigns, 2);
    }

    #[test]
    fn test_limits_bound_enumeration() {
        let mut b = BodyBuilder::new();
        let mut stmts = Vec::new();
        for i in 0..10 {
            let e = b.expr("k = k + 1", i + 1);
            stmts.push(b.if_stmt(&format!("v{i} > 0"), e, None, i + 1));
        }
        let root = b.compound(stmts, 1);
        let limits = PathLimits {
            max_paths: 50,
            max_path_length: 1000,
            loop_unroll_bound: 1,
        };
        assert_eq!(enumerate(&b.finish(root), limits).len(), 50);
    }
}
