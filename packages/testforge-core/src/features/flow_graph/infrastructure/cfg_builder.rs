//! Lowering of a function body into a control-flow graph
//!
//! Each statement is lowered against the set of dangling exits of what came
//! before it; lowering returns the statement's own dangling exits. A
//! decision leaves one exit per branch, labelled with the branch id, so the
//! branch list and the graph are produced in the same walk and branch ids
//! follow declaration order.

use crate::features::flow_graph::domain::{
    negate, Branch, BranchId, BranchKind, CfgEdge, CfgNode, CfgNodeKind, ControlFlowGraph,
};
use crate::shared::expr::{parse_effects, parse_expr, Effect};
use crate::shared::models::{FunctionBody, NodeId, NodeKind};
use once_cell::sync::Lazy;
use petgraph::graph::{DiGraph, NodeIndex};
use regex::Regex;
use std::collections::HashMap;

/// `<type words> name = init` as written in a `for` initializer
static DECL_INIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*[A-Za-z_][\w\s\*]*?[\s\*]([A-Za-z_]\w*)\s*=\s*(.+?)\s*$").expect("static regex")
});

type Exit = (NodeIndex, CfgEdge);

enum Context {
    Loop {
        continue_target: NodeIndex,
        breaks: Vec<Exit>,
    },
    Switch {
        breaks: Vec<Exit>,
    },
}

/// Graph plus branches of one body
#[derive(Debug, Clone)]
pub struct LoweredBody {
    pub cfg: ControlFlowGraph,
    pub branches: Vec<Branch>,
}

pub struct CfgBuilder<'a> {
    body: &'a FunctionBody,
    graph: DiGraph<CfgNode, CfgEdge>,
    exit: NodeIndex,
    branches: Vec<Branch>,
    contexts: Vec<Context>,
    labels: HashMap<String, NodeIndex>,
    gotos: Vec<(NodeIndex, String)>,
    /// Guards against malformed arenas whose children form a cycle
    lowering: Vec<bool>,
}

impl<'a> CfgBuilder<'a> {
    pub fn new(body: &'a FunctionBody) -> Self {
        Self {
            body,
            graph: DiGraph::new(),
            exit: NodeIndex::new(0),
            branches: Vec::new(),
            contexts: Vec::new(),
            labels: HashMap::new(),
            gotos: Vec::new(),
            lowering: vec![false; body.len()],
        }
    }

    pub fn build(mut self) -> LoweredBody {
        let entry = self.graph.add_node(CfgNode::new(CfgNodeKind::Entry, None, 0));
        self.exit = self.graph.add_node(CfgNode::new(CfgNodeKind::Exit, None, 0));

        let exits = if self.body.root_node().is_some() {
            self.lower(self.body.root, vec![(entry, CfgEdge::Flow)])
        } else {
            vec![(entry, CfgEdge::Flow)]
        };
        self.connect(&exits, self.exit);

        for (from, label) in std::mem::take(&mut self.gotos) {
            let target = self.labels.get(&label).copied().unwrap_or(self.exit);
            self.graph.add_edge(from, target, CfgEdge::Flow);
        }

        let cfg = ControlFlowGraph {
            graph: self.graph,
            entry,
            exit: self.exit,
        };
        let reachable = cfg.reachable();
        let mut branches = self.branches;
        for b in &mut branches {
            b.is_feasible = cfg.decision_of(b.id).is_some_and(|d| reachable.contains(&d));
        }
        LoweredBody { cfg, branches }
    }

    fn connect(&mut self, exits: &[Exit], target: NodeIndex) {
        for &(from, edge) in exits {
            self.graph.add_edge(from, target, edge);
        }
    }

    fn add(&mut self, node: CfgNode, preds: &[Exit]) -> NodeIndex {
        let idx = self.graph.add_node(node);
        self.connect(preds, idx);
        idx
    }

    fn new_branch(&mut self, kind: BranchKind, condition: String, decision: NodeId, line: u32) -> BranchId {
        let id = BranchId(self.branches.len() as u32);
        self.branches.push(Branch {
            id,
            kind,
            condition,
            decision,
            line,
            pair: None,
            is_feasible: true,
            is_covered: false,
        });
        id
    }

    /// True/false branch pair of a two-way decision
    fn branch_pair(&mut self, kinds: (BranchKind, BranchKind), condition: &str, decision: NodeId, line: u32) -> (BranchId, BranchId) {
        let t = self.new_branch(kinds.0, condition.trim().to_string(), decision, line);
        let f = self.new_branch(kinds.1, negate(condition), decision, line);
        self.branches[t.0 as usize].pair = Some(f);
        self.branches[f.0 as usize].pair = Some(t);
        (t, f)
    }

    fn lower(&mut self, id: NodeId, preds: Vec<Exit>) -> Vec<Exit> {
        let body = self.body;
        let Some(node) = body.node(id) else {
            return preds;
        };
        if self.lowering.get(id).copied().unwrap_or(true) {
            return preds;
        }
        self.lowering[id] = true;
        let line = node.line;

        // Ternaries inside the statement are decided before it runs
        let mut preds = preds;
        for ternary in &node.ternaries {
            let d = self.add(
                CfgNode::new(CfgNodeKind::Decision, Some(id), line).with_text(ternary.clone()),
                &preds,
            );
            let (t, f) = self.branch_pair((BranchKind::TernaryTrue, BranchKind::TernaryFalse), ternary, id, line);
            preds = vec![(d, CfgEdge::Branch(t)), (d, CfgEdge::Branch(f))];
        }

        let children = node.children.clone();
        let exits = match &node.kind {
            NodeKind::Compound => {
                let mut current = preds;
                for child in children {
                    current = self.lower(child, current);
                }
                current
            }
            NodeKind::If { condition } => {
                let d = self.add(
                    CfgNode::new(CfgNodeKind::Decision, Some(id), line).with_text(condition.clone()),
                    &preds,
                );
                let (t, f) = self.branch_pair((BranchKind::IfTrue, BranchKind::IfFalse), condition, id, line);
                let mut exits = match children.first() {
                    Some(&then) => self.lower(then, vec![(d, CfgEdge::Branch(t))]),
                    None => vec![(d, CfgEdge::Branch(t))],
                };
                match children.get(1) {
                    Some(&otherwise) => exits.extend(self.lower(otherwise, vec![(d, CfgEdge::Branch(f))])),
                    None => exits.push((d, CfgEdge::Branch(f))),
                }
                exits
            }
            NodeKind::While { condition } => {
                let d = self.add(
                    CfgNode::new(CfgNodeKind::Decision, Some(id), line).with_text(condition.clone()),
                    &preds,
                );
                let (t, f) = self.branch_pair((BranchKind::LoopTrue, BranchKind::LoopFalse), condition, id, line);
                let breaks = self.loop_body(children.first().copied(), vec![(d, CfgEdge::Branch(t))], d, d);
                let mut exits = vec![(d, CfgEdge::Branch(f))];
                exits.extend(breaks);
                exits
            }
            NodeKind::DoWhile { condition } => {
                let head = self.add(CfgNode::new(CfgNodeKind::Merge, Some(id), line), &preds);
                let d = self
                    .graph
                    .add_node(CfgNode::new(CfgNodeKind::Decision, Some(id), line).with_text(condition.clone()));
                let (t, f) = self.branch_pair((BranchKind::LoopTrue, BranchKind::LoopFalse), condition, id, line);
                let breaks = self.loop_body(children.first().copied(), vec![(head, CfgEdge::Flow)], d, d);
                self.graph.add_edge(d, head, CfgEdge::Branch(t));
                let mut exits = vec![(d, CfgEdge::Branch(f))];
                exits.extend(breaks);
                exits
            }
            NodeKind::For {
                init,
                condition,
                step,
            } => {
                let mut preds = preds;
                if let Some(init) = init.as_deref().filter(|s| !s.trim().is_empty()) {
                    let mut n = CfgNode::new(CfgNodeKind::Statement, Some(id), line).with_text(init);
                    n.effects = init_effects(init);
                    let idx = self.add(n, &preds);
                    preds = vec![(idx, CfgEdge::Flow)];
                }
                let condition = condition.as_deref().filter(|s| !s.trim().is_empty());
                let head = match condition {
                    Some(c) => self.add(
                        CfgNode::new(CfgNodeKind::Decision, Some(id), line).with_text(c),
                        &preds,
                    ),
                    None => self.add(CfgNode::new(CfgNodeKind::Merge, Some(id), line), &preds),
                };
                let step_node = step.as_deref().filter(|s| !s.trim().is_empty()).map(|s| {
                    let mut n = CfgNode::new(CfgNodeKind::Statement, Some(id), line).with_text(s);
                    n.effects = statement_effects(s);
                    self.graph.add_node(n)
                });
                let continue_target = step_node.unwrap_or(head);
                if let Some(s) = step_node {
                    self.graph.add_edge(s, head, CfgEdge::Flow);
                }

                let (body_entry, mut exits) = match condition {
                    Some(c) => {
                        let (t, f) = self.branch_pair((BranchKind::LoopTrue, BranchKind::LoopFalse), c, id, line);
                        (vec![(head, CfgEdge::Branch(t))], vec![(head, CfgEdge::Branch(f))])
                    }
                    None => (vec![(head, CfgEdge::Flow)], Vec::new()),
                };
                let breaks = self.loop_body(children.first().copied(), body_entry, continue_target, continue_target);
                exits.extend(breaks);
                exits
            }
            NodeKind::Switch { discriminant } => self.lower_switch(id, discriminant, &children, preds, line),
            NodeKind::Case { .. } | NodeKind::Default => {
                // Label outside a switch: plain sequence
                let mut current = preds;
                for child in children {
                    current = self.lower(child, current);
                }
                current
            }
            NodeKind::Return { value } => {
                let mut n = CfgNode::new(CfgNodeKind::Return, Some(id), line);
                n.text = value.clone();
                let idx = self.add(n, &preds);
                self.graph.add_edge(idx, self.exit, CfgEdge::Flow);
                Vec::new()
            }
            NodeKind::Break => {
                let idx = self.add(CfgNode::new(CfgNodeKind::Jump, Some(id), line), &preds);
                match self.contexts.last_mut() {
                    Some(Context::Loop { breaks, .. }) | Some(Context::Switch { breaks }) => {
                        breaks.push((idx, CfgEdge::Flow));
                        Vec::new()
                    }
                    None => vec![(idx, CfgEdge::Flow)],
                }
            }
            NodeKind::Continue => {
                let idx = self.add(CfgNode::new(CfgNodeKind::Jump, Some(id), line), &preds);
                let target = self.contexts.iter().rev().find_map(|c| match c {
                    Context::Loop { continue_target, .. } => Some(*continue_target),
                    Context::Switch { .. } => None,
                });
                match target {
                    Some(t) => {
                        self.graph.add_edge(idx, t, CfgEdge::Flow);
                        Vec::new()
                    }
                    None => vec![(idx, CfgEdge::Flow)],
                }
            }
            NodeKind::Goto { label } => {
                let idx = self.add(CfgNode::new(CfgNodeKind::Jump, Some(id), line), &preds);
                self.gotos.push((idx, label.clone()));
                Vec::new()
            }
            NodeKind::Label { name } => {
                let idx = self.add(CfgNode::new(CfgNodeKind::Merge, Some(id), line), &preds);
                self.labels.insert(name.clone(), idx);
                let mut current = vec![(idx, CfgEdge::Flow)];
                for child in children {
                    current = self.lower(child, current);
                }
                current
            }
            NodeKind::Declaration { name, init, .. } => {
                let mut n = CfgNode::new(CfgNodeKind::Statement, Some(id), line);
                n.text = init.as_ref().map(|i| format!("{name} = {i}"));
                n.effects = vec![declaration_effect(name, init.as_deref())];
                let idx = self.add(n, &preds);
                vec![(idx, CfgEdge::Flow)]
            }
            NodeKind::Expression { text } => {
                let mut n = CfgNode::new(CfgNodeKind::Statement, Some(id), line).with_text(text.clone());
                n.effects = statement_effects(text);
                let idx = self.add(n, &preds);
                vec![(idx, CfgEdge::Flow)]
            }
            NodeKind::Empty => {
                let idx = self.add(CfgNode::new(CfgNodeKind::Statement, Some(id), line), &preds);
                vec![(idx, CfgEdge::Flow)]
            }
        };

        self.lowering[id] = false;
        exits
    }

    /// Lower a loop body; its fall-through goes back to `back_to`. Returns
    /// the `break` exits.
    fn loop_body(
        &mut self,
        body: Option<NodeId>,
        entry: Vec<Exit>,
        continue_target: NodeIndex,
        back_to: NodeIndex,
    ) -> Vec<Exit> {
        self.contexts.push(Context::Loop {
            continue_target,
            breaks: Vec::new(),
        });
        let exits = match body {
            Some(b) => self.lower(b, entry),
            None => entry,
        };
        self.connect(&exits, back_to);
        match self.contexts.pop() {
            Some(Context::Loop { breaks, .. }) => breaks,
            _ => Vec::new(),
        }
    }

    fn lower_switch(
        &mut self,
        id: NodeId,
        discriminant: &str,
        labels: &[NodeId],
        preds: Vec<Exit>,
        line: u32,
    ) -> Vec<Exit> {
        let sw = self.add(
            CfgNode::new(CfgNodeKind::Switch, Some(id), line).with_text(discriminant),
            &preds,
        );
        let d = discriminant.trim();
        let body = self.body;

        let case_values: Vec<String> = labels
            .iter()
            .filter_map(|&l| match body.node(l).map(|n| &n.kind) {
                Some(NodeKind::Case { value }) => Some(value.trim().to_string()),
                _ => None,
            })
            .collect();
        let no_match = if case_values.is_empty() {
            "1".to_string()
        } else {
            negate(
                &case_values
                    .iter()
                    .map(|v| format!("{d} == {v}"))
                    .collect::<Vec<_>>()
                    .join(" || "),
            )
        };

        self.contexts.push(Context::Switch { breaks: Vec::new() });
        let mut fallthrough: Vec<Exit> = Vec::new();
        let mut has_default = false;
        for &label in labels {
            let Some(label_node) = body.node(label) else {
                continue;
            };
            let label_line = label_node.line;
            let branch = match &label_node.kind {
                NodeKind::Case { value } => {
                    self.new_branch(BranchKind::Case, format!("{d} == {}", value.trim()), id, label_line)
                }
                NodeKind::Default => {
                    has_default = true;
                    self.new_branch(BranchKind::Default, no_match.clone(), id, label_line)
                }
                _ => {
                    // Stray statement directly under the switch
                    fallthrough = self.lower(label, fallthrough);
                    continue;
                }
            };
            let mut entry = std::mem::take(&mut fallthrough);
            entry.push((sw, CfgEdge::Branch(branch)));
            let stmts = label_node.children.clone();
            let mut current = entry;
            for s in stmts {
                current = self.lower(s, current);
            }
            fallthrough = current;
        }

        let mut exits = fallthrough;
        if !has_default {
            let implicit = self.new_branch(BranchKind::Default, no_match, id, line);
            exits.push((sw, CfgEdge::Branch(implicit)));
        }
        if let Some(Context::Switch { breaks }) = self.contexts.pop() {
            exits.extend(breaks);
        }
        exits
    }
}

fn statement_effects(text: &str) -> Vec<Effect> {
    parse_effects(text)
        .map(|effects| effects.into_iter().filter(|e| *e != Effect::None).collect())
        .unwrap_or_default()
}

fn declaration_effect(name: &str, init: Option<&str>) -> Effect {
    match init.map(parse_expr) {
        Some(Ok(value)) => Effect::Assign {
            target: name.to_string(),
            value,
        },
        // Uninitialised or brace-initialised: unconstrained
        _ => Effect::Havoc {
            target: name.to_string(),
        },
    }
}

/// `for` initializers may declare (`int i = 0`) or assign (`i = 0, j = n`)
fn init_effects(text: &str) -> Vec<Effect> {
    if let Ok(effects) = parse_effects(text) {
        return effects.into_iter().filter(|e| *e != Effect::None).collect();
    }
    match DECL_INIT.captures(text) {
        Some(caps) => {
            let name = caps.get(1).map_or("", |m| m.as_str());
            let init = caps.get(2).map(|m| m.as_str());
            vec![declaration_effect(name, init)]
        }
        None => Vec::new(),
    }
}
