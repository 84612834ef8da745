//! Conditional compilation evaluation
//!
//! A directive's region is active when its enclosing directive is active,
//! no earlier branch of the same `#if/#elif/#else` chain was taken, and its
//! own condition holds. Undefined identifiers evaluate to 0, as in the C
//! preprocessor.

use super::model::EntityModel;
use crate::features::entity_model::domain::{ConditionalDirective, DirectiveKind};
use crate::shared::expr::{eval, parse_expr, ValueEnv};
use crate::shared::models::ScalarValue;
use std::collections::HashMap;

struct MacroEnv<'a> {
    model: &'a EntityModel,
    constants: HashMap<String, ScalarValue>,
}

impl ValueEnv for MacroEnv<'_> {
    fn value(&self, name: &str) -> Option<ScalarValue> {
        Some(
            self.constants
                .get(name)
                .copied()
                .unwrap_or(ScalarValue::Int(0)),
        )
    }

    fn is_defined(&self, name: &str) -> bool {
        self.model.macro_def(name).is_some()
    }
}

pub struct ConditionalEvaluator<'a> {
    model: &'a EntityModel,
    env: MacroEnv<'a>,
}

impl<'a> ConditionalEvaluator<'a> {
    pub fn new(model: &'a EntityModel) -> Self {
        Self {
            model,
            env: MacroEnv {
                model,
                constants: model.named_constants(),
            },
        }
    }

    /// `None` when the directive is unknown or its condition cannot be
    /// evaluated (function-like macros, unsupported operators).
    pub fn is_active(&self, id: u32) -> Option<bool> {
        self.is_active_bounded(id, self.model.conditionals().len() + 1)
    }

    fn is_active_bounded(&self, id: u32, budget: usize) -> Option<bool> {
        if budget == 0 {
            return None;
        }
        let directive = self.model.conditional(id)?;

        if let Some(parent) = directive.parent {
            if !self.is_active_bounded(parent, budget - 1)? {
                return Some(false);
            }
        }

        if directive.kind == DirectiveKind::Elif || directive.kind == DirectiveKind::Else {
            for earlier in self.earlier_in_chain(directive) {
                if self.own_condition(earlier)? {
                    return Some(false);
                }
            }
        }

        self.own_condition(directive)
    }

    fn earlier_in_chain(&self, directive: &ConditionalDirective) -> Vec<&'a ConditionalDirective> {
        let Some(head) = directive.chain_head else {
            return Vec::new();
        };
        self.model
            .conditionals()
            .iter()
            .filter(|d| {
                (d.id == head || d.chain_head == Some(head)) && d.location.line < directive.location.line
            })
            .collect()
    }

    fn own_condition(&self, directive: &ConditionalDirective) -> Option<bool> {
        let name = directive.condition.trim();
        match directive.kind {
            DirectiveKind::Else => Some(true),
            DirectiveKind::Ifdef => Some(self.env.is_defined(name)),
            DirectiveKind::Ifndef => Some(!self.env.is_defined(name)),
            DirectiveKind::If | DirectiveKind::Elif => {
                let expr = parse_expr(name).ok()?;
                eval(&expr, &self.env).ok().map(|v| v.truthy())
            }
        }
    }
}
