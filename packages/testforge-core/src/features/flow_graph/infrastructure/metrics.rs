//! Complexity calculator
//!
//! Works on the statement tree directly, so a body with unreachable code
//! still counts its decisions.

use crate::features::entity_model::Function;
use crate::features::flow_graph::domain::FunctionComplexity;
use crate::shared::models::{FunctionBody, NodeKind};

pub struct ComplexityCalculator;

impl ComplexityCalculator {
    /// Metrics for `function`; a declaration without body gets complexity 1
    pub fn calculate(function: &Function) -> FunctionComplexity {
        let parameter_count = function.parameters.len() as u32;
        let Some(body) = &function.body else {
            return FunctionComplexity {
                function: function.name.clone(),
                cyclomatic_complexity: 1,
                decision_count: 0,
                statement_count: 0,
                max_nesting_depth: 0,
                line_count: 0,
                parameter_count,
                maintainability_index: FunctionComplexity::maintainability(1, 0, 0),
            };
        };

        let decisions = Self::decision_count(body);
        let statements = Self::statement_count(body);
        let lines = Self::line_count(body, function.location.line);
        let cyclomatic = 1 + decisions;

        FunctionComplexity {
            function: function.name.clone(),
            cyclomatic_complexity: cyclomatic,
            decision_count: decisions,
            statement_count: statements,
            max_nesting_depth: Self::max_nesting(body),
            line_count: lines,
            parameter_count,
            maintainability_index: FunctionComplexity::maintainability(cyclomatic, statements, lines),
        }
    }

    /// `if`, `while`, `do`, `for`, each `case` label and each ternary
    pub fn decision_count(body: &FunctionBody) -> u32 {
        body.preorder()
            .into_iter()
            .filter_map(|id| body.node(id))
            .map(|n| {
                let own = match n.kind {
                    NodeKind::If { .. }
                    | NodeKind::While { .. }
                    | NodeKind::DoWhile { .. }
                    | NodeKind::For { .. }
                    | NodeKind::Case { .. } => 1,
                    _ => 0,
                };
                own + n.ternaries.len() as u32
            })
            .sum()
    }

    fn statement_count(body: &FunctionBody) -> u32 {
        body.preorder()
            .into_iter()
            .filter_map(|id| body.node(id))
            .filter(|n| {
                !matches!(
                    n.kind,
                    NodeKind::Compound | NodeKind::Case { .. } | NodeKind::Default | NodeKind::Label { .. } | NodeKind::Empty
                )
            })
            .count() as u32
    }

    fn line_count(body: &FunctionBody, declared_at: u32) -> u32 {
        let lines = body.nodes.iter().map(|n| n.line).filter(|&l| l > 0);
        let first = lines.clone().min().unwrap_or(declared_at).min(declared_at.max(1));
        let last = lines.max().unwrap_or(first);
        last.saturating_sub(first) + 1
    }

    /// Deepest stack of enclosing `if`/loop/`switch` statements
    fn max_nesting(body: &FunctionBody) -> u32 {
        let mut max = 0;
        let mut visited = vec![false; body.len()];
        let mut stack = vec![(body.root, 0u32)];
        while let Some((id, depth)) = stack.pop() {
            let Some(node) = body.node(id) else {
                continue;
            };
            if std::mem::replace(&mut visited[id], true) {
                continue;
            }
            let nests = matches!(
                node.kind,
                NodeKind::If { .. }
                    | NodeKind::While { .. }
                    | NodeKind::DoWhile { .. }
                    | NodeKind::For { .. }
                    | NodeKind::Switch { .. }
            );
            let inner = if nests { depth + 1 } else { depth };
            max = max.max(inner);
            for &child in &node.children {
                stack.push((child, inner));
            }
        }
        max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{BodyBuilder, SourceLocation};

    #[test]
    fn test_clamp_metrics() {
        let mut b = BodyBuilder::new();
        let r0 = b.ret(Some("0"), 2);
        let if1 = b.if_stmt("x < 0", r0, None, 2);
        let r100 = b.ret(Some("100"), 3);
        let if2 = b.if_stmt("x > 100", r100, None, 3);
        let rx = b.ret(Some("x"), 4);
        let root = b.compound(vec![if1, if2, rx], 1);
        let f = Function::new("clamp", "int", SourceLocation::new("clamp.c", 1))
            .with_param("x", "int")
            .with_body(b.finish(root));

        let c = ComplexityCalculator::calculate(&f);
        assert_eq!(c.cyclomatic_complexity, 3);
        assert_eq!(c.decision_count, 2);
        assert_eq!(c.statement_count, 5);
        assert_eq!(c.max_nesting_depth, 1);
        assert_eq!(c.line_count, 4);
        assert_eq!(c.parameter_count, 1);
        assert!(c.maintainability_index > 0.0 && c.maintainability_index <= 100.0);
    }

    #[test]
    fn test_switch_cases_and_ternaries_count() {
        let mut b = BodyBuilder::new();
        let r = b.ret(Some("a > b ? a : b"), 3);
        let r = b.with_ternary(r, "a > b");
        let c1 = b.case("1", vec![], 2);
        let c2 = b.case("2", vec![r], 3);
        let d = b.default_label(vec![], 4);
        let sw = b.switch("op", vec![c1, c2, d], 1);
        let root = b.compound(vec![sw], 1);
        let f = Function::new("pick", "int", SourceLocation::new("p.c", 1)).with_body(b.finish(root));
        assert_eq!(ComplexityCalculator::calculate(&f).cyclomatic_complexity, 4);
    }

    #[test]
    fn test_declaration_only() {
        let f = Function::new("ext", "void", SourceLocation::new("h.h", 9));
        assert_eq!(ComplexityCalculator::calculate(&f).cyclomatic_complexity, 1);
    }
}
