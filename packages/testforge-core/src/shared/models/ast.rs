//! Function body AST (arena representation)
//!
//! The C front end lives outside this crate and hands us each function body as a
//! flat arena of statement nodes. Nodes refer to each other through [`NodeId`]
//! indices, and the `parent` link is a plain index back into the same arena,
//! never an owning reference.
//!
//! Structural conventions for `children`:
//!
//! | kind       | children                                   |
//! |------------|--------------------------------------------|
//! | Compound   | statements in order                        |
//! | If         | `[then]` or `[then, else]`                 |
//! | While      | `[body]`                                   |
//! | DoWhile    | `[body]`                                   |
//! | For        | `[body]`                                   |
//! | Switch     | `Case`/`Default` label nodes in order      |
//! | Case       | statements following the label             |
//! | Default    | statements following the label             |
//! | Label      | `[statement]` or empty                     |
//! | others     | empty                                      |
//!
//! A case whose statements do not end in `break`/`return` falls through to
//! the next label, exactly as in C.

use serde::{Deserialize, Serialize};

/// Index into [`FunctionBody::nodes`]
pub type NodeId = usize;

/// A call expression occurring inside a statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub callee: String,
    #[serde(default)]
    pub arguments: Vec<String>,
    pub line: u32,
}

impl CallSite {
    pub fn new(callee: impl Into<String>, line: u32) -> Self {
        Self {
            callee: callee.into(),
            arguments: Vec::new(),
            line,
        }
    }
}

/// Statement payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    Compound,
    If {
        condition: String,
    },
    While {
        condition: String,
    },
    DoWhile {
        condition: String,
    },
    For {
        #[serde(default)]
        init: Option<String>,
        #[serde(default)]
        condition: Option<String>,
        #[serde(default)]
        step: Option<String>,
    },
    Switch {
        discriminant: String,
    },
    Case {
        value: String,
    },
    Default,
    Return {
        #[serde(default)]
        value: Option<String>,
    },
    Break,
    Continue,
    Goto {
        label: String,
    },
    Label {
        name: String,
    },
    Declaration {
        name: String,
        type_name: String,
        #[serde(default)]
        init: Option<String>,
    },
    Expression {
        text: String,
    },
    Empty,
}

/// Coarse classification used by analysis passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    Decision,
    Label,
    Declaration,
    Return,
    Jump,
    Statement,
    Block,
}

/// One statement in the arena
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AstNode {
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub children: Vec<NodeId>,
    /// Calls appearing in this statement's own expressions (not its children)
    #[serde(default)]
    pub calls: Vec<CallSite>,
    /// Conditions of `?:` expressions appearing in this statement
    #[serde(default)]
    pub ternaries: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
}

impl AstNode {
    pub fn new(kind: NodeKind, line: u32) -> Self {
        Self {
            kind,
            line,
            children: Vec::new(),
            calls: Vec::new(),
            ternaries: Vec::new(),
            parent: None,
        }
    }

    pub fn category(&self) -> NodeCategory {
        match self.kind {
            NodeKind::If { .. }
            | NodeKind::While { .. }
            | NodeKind::DoWhile { .. }
            | NodeKind::For { .. }
            | NodeKind::Switch { .. } => NodeCategory::Decision,
            NodeKind::Case { .. } | NodeKind::Default | NodeKind::Label { .. } => {
                NodeCategory::Label
            }
            NodeKind::Declaration { .. } => NodeCategory::Declaration,
            NodeKind::Return { .. } => NodeCategory::Return,
            NodeKind::Break | NodeKind::Continue | NodeKind::Goto { .. } => NodeCategory::Jump,
            NodeKind::Compound => NodeCategory::Block,
            NodeKind::Expression { .. } | NodeKind::Empty => NodeCategory::Statement,
        }
    }

    /// Literal guard text for decision nodes
    pub fn condition_text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::If { condition }
            | NodeKind::While { condition }
            | NodeKind::DoWhile { condition } => Some(condition),
            NodeKind::For { condition, .. } => condition.as_deref(),
            NodeKind::Switch { discriminant } => Some(discriminant),
            _ => None,
        }
    }

    /// Source text of the statement's own expression, if any
    pub fn source_text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Expression { text } => Some(text),
            NodeKind::Return { value } => value.as_deref(),
            NodeKind::Declaration { init, .. } => init.as_deref(),
            _ => self.condition_text(),
        }
    }

    pub fn is_call(&self) -> bool {
        !self.calls.is_empty()
    }
}

/// Arena holding one function body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FunctionBody {
    pub nodes: Vec<AstNode>,
    pub root: NodeId,
}

impl FunctionBody {
    pub fn node(&self, id: NodeId) -> Option<&AstNode> {
        self.nodes.get(id)
    }

    pub fn root_node(&self) -> Option<&AstNode> {
        self.nodes.get(self.root)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pre-order traversal from the root, children in source order.
    ///
    /// Out-of-range child ids are skipped so a malformed arena cannot panic.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        if self.nodes.get(self.root).is_none() {
            return order;
        }
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if visited[id] {
                continue;
            }
            visited[id] = true;
            order.push(id);
            if let Some(node) = self.nodes.get(id) {
                for &child in node.children.iter().rev() {
                    if child < self.nodes.len() && !visited[child] {
                        stack.push(child);
                    }
                }
            }
        }
        order
    }

    /// All call sites in the body, in pre-order.
    pub fn call_sites(&self) -> Vec<&CallSite> {
        self.preorder()
            .into_iter()
            .filter_map(|id| self.nodes.get(id))
            .flat_map(|n| n.calls.iter())
            .collect()
    }

    /// Depth of a node (root = 0), following parent links.
    pub fn depth_of(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.nodes.get(id).and_then(|n| n.parent);
        while let Some(p) = current {
            depth += 1;
            if depth > self.nodes.len() {
                break;
            }
            current = self.nodes.get(p).and_then(|n| n.parent);
        }
        depth
    }

    /// Recompute `parent` links from `children`.
    pub fn link_parents(&mut self) {
        for node in &mut self.nodes {
            node.parent = None;
        }
        let edges: Vec<(NodeId, NodeId)> = self
            .nodes
            .iter()
            .enumerate()
            .flat_map(|(pid, n)| n.children.iter().map(move |&c| (pid, c)))
            .collect();
        for (pid, child) in edges {
            if let Some(node) = self.nodes.get_mut(child) {
                node.parent = Some(pid);
            }
        }
    }
}

/// Incremental construction of a [`FunctionBody`].
///
/// ```
/// use testforge_core::shared::models::BodyBuilder;
///
/// let mut b = BodyBuilder::new();
/// let ret = b.ret(Some("0"), 2);
/// let guard = b.if_stmt("x < 0", ret, None, 2);
/// let tail = b.ret(Some("1"), 3);
/// let root = b.compound(vec![guard, tail], 1);
/// let body = b.finish(root);
/// assert_eq!(body.len(), 4);
/// ```
#[derive(Debug, Default)]
pub struct BodyBuilder {
    nodes: Vec<AstNode>,
}

impl BodyBuilder {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn push(&mut self, node: AstNode) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn push_with(&mut self, kind: NodeKind, line: u32, children: Vec<NodeId>) -> NodeId {
        let mut node = AstNode::new(kind, line);
        node.children = children;
        self.push(node)
    }

    pub fn compound(&mut self, stmts: Vec<NodeId>, line: u32) -> NodeId {
        self.push_with(NodeKind::Compound, line, stmts)
    }

    pub fn if_stmt(
        &mut self,
        condition: &str,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
        line: u32,
    ) -> NodeId {
        let mut children = vec![then_branch];
        children.extend(else_branch);
        self.push_with(
            NodeKind::If {
                condition: condition.to_string(),
            },
            line,
            children,
        )
    }

    pub fn while_stmt(&mut self, condition: &str, body: NodeId, line: u32) -> NodeId {
        self.push_with(
            NodeKind::While {
                condition: condition.to_string(),
            },
            line,
            vec![body],
        )
    }

    pub fn do_while(&mut self, body: NodeId, condition: &str, line: u32) -> NodeId {
        self.push_with(
            NodeKind::DoWhile {
                condition: condition.to_string(),
            },
            line,
            vec![body],
        )
    }

    pub fn for_stmt(
        &mut self,
        init: Option<&str>,
        condition: Option<&str>,
        step: Option<&str>,
        body: NodeId,
        line: u32,
    ) -> NodeId {
        self.push_with(
            NodeKind::For {
                init: init.map(str::to_string),
                condition: condition.map(str::to_string),
                step: step.map(str::to_string),
            },
            line,
            vec![body],
        )
    }

    pub fn switch(&mut self, discriminant: &str, labels: Vec<NodeId>, line: u32) -> NodeId {
        self.push_with(
            NodeKind::Switch {
                discriminant: discriminant.to_string(),
            },
            line,
            labels,
        )
    }

    pub fn case(&mut self, value: &str, stmts: Vec<NodeId>, line: u32) -> NodeId {
        self.push_with(
            NodeKind::Case {
                value: value.to_string(),
            },
            line,
            stmts,
        )
    }

    pub fn default_label(&mut self, stmts: Vec<NodeId>, line: u32) -> NodeId {
        self.push_with(NodeKind::Default, line, stmts)
    }

    pub fn ret(&mut self, value: Option<&str>, line: u32) -> NodeId {
        self.push_with(
            NodeKind::Return {
                value: value.map(str::to_string),
            },
            line,
            Vec::new(),
        )
    }

    pub fn brk(&mut self, line: u32) -> NodeId {
        self.push_with(NodeKind::Break, line, Vec::new())
    }

    pub fn cont(&mut self, line: u32) -> NodeId {
        self.push_with(NodeKind::Continue, line, Vec::new())
    }

    pub fn goto(&mut self, label: &str, line: u32) -> NodeId {
        self.push_with(
            NodeKind::Goto {
                label: label.to_string(),
            },
            line,
            Vec::new(),
        )
    }

    pub fn label(&mut self, name: &str, stmt: Option<NodeId>, line: u32) -> NodeId {
        self.push_with(
            NodeKind::Label {
                name: name.to_string(),
            },
            line,
            stmt.into_iter().collect(),
        )
    }

    pub fn decl(&mut self, type_name: &str, name: &str, init: Option<&str>, line: u32) -> NodeId {
        self.push_with(
            NodeKind::Declaration {
                name: name.to_string(),
                type_name: type_name.to_string(),
                init: init.map(str::to_string),
            },
            line,
            Vec::new(),
        )
    }

    pub fn expr(&mut self, text: &str, line: u32) -> NodeId {
        self.push_with(
            NodeKind::Expression {
                text: text.to_string(),
            },
            line,
            Vec::new(),
        )
    }

    /// Expression statement consisting of a single call
    pub fn call(&mut self, callee: &str, args: &[&str], line: u32) -> NodeId {
        let text = format!("{}({})", callee, args.join(", "));
        let id = self.expr(&text, line);
        self.with_call(id, callee, args, line)
    }

    /// Attach a call site to an existing statement
    pub fn with_call(&mut self, id: NodeId, callee: &str, args: &[&str], line: u32) -> NodeId {
        if let Some(node) = self.nodes.get_mut(id) {
            node.calls.push(CallSite {
                callee: callee.to_string(),
                arguments: args.iter().map(|a| a.to_string()).collect(),
                line,
            });
        }
        id
    }

    /// Attach a `?:` condition to an existing statement
    pub fn with_ternary(&mut self, id: NodeId, condition: &str) -> NodeId {
        if let Some(node) = self.nodes.get_mut(id) {
            node.ternaries.push(condition.to_string());
        }
        id
    }

    pub fn finish(self, root: NodeId) -> FunctionBody {
        let mut body = FunctionBody {
            nodes: self.nodes,
            root,
        };
        body.link_parents();
        body
    }
}
