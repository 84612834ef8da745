//! Entity model store
//!
//! Owns every entity of one translation unit. Adding an entity that is
//! already present (same name, file and line) never creates a duplicate;
//! prototypes and forward declarations are merged into their definitions.

use super::directive_eval::ConditionalEvaluator;
use super::layout::LayoutCalculator;
use super::validator::ModelValidator;
use crate::features::entity_model::domain::*;
use crate::features::type_resolution::{TypedefRegistry, TypedefSource};
use crate::shared::expr::{eval, parse_expr, Expr};
use crate::shared::models::{ScalarValue, SourceLocation};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

static IDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Za-z_]\w*\b").expect("static regex"));

/// Result of an `add_*` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// Merged into an existing declaration of the same entity
    Merged,
    /// Already present; nothing changed
    Unchanged,
}

/// Borrowed view of any entity
#[derive(Debug, Clone, Copy)]
pub enum EntityRef<'a> {
    Function(&'a Function),
    Variable(&'a Variable),
    Aggregate(&'a AggregateDefinition),
    Enum(&'a EnumDefinition),
    Typedef(&'a TypedefDefinition),
    Macro(&'a MacroDefinition),
}

impl EntityRef<'_> {
    pub fn location(&self) -> &SourceLocation {
        match self {
            EntityRef::Function(e) => &e.location,
            EntityRef::Variable(e) => &e.location,
            EntityRef::Aggregate(e) => &e.location,
            EntityRef::Enum(e) => &e.location,
            EntityRef::Typedef(e) => &e.location,
            EntityRef::Macro(e) => &e.location,
        }
    }
}

/// All entities of one translation unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityModel {
    pub source_file: String,
    functions: Vec<Function>,
    variables: Vec<Variable>,
    aggregates: Vec<AggregateDefinition>,
    enums: Vec<EnumDefinition>,
    typedefs: Vec<TypedefDefinition>,
    macros: Vec<MacroDefinition>,
    conditionals: Vec<ConditionalDirective>,
    includes: Vec<IncludeDirective>,
}

impl EntityModel {
    pub fn new(source_file: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            ..Default::default()
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Mutators
    // ═══════════════════════════════════════════════════════════════════

    pub fn add_function(&mut self, function: Function) -> AddOutcome {
        let same_name: Vec<usize> = self
            .functions
            .iter()
            .enumerate()
            .filter(|(_, f)| f.name == function.name)
            .map(|(i, _)| i)
            .collect();

        if let Some(&i) = same_name
            .iter()
            .find(|&&i| self.functions[i].location == function.location)
        {
            let existing = &mut self.functions[i];
            if existing.body.is_none() && function.body.is_some() {
                *existing = function;
                existing.derive_body_facts();
                return AddOutcome::Merged;
            }
            return AddOutcome::Unchanged;
        }

        if let Some(&i) = same_name.first() {
            let existing = &mut self.functions[i];
            match (existing.is_definition(), function.is_definition()) {
                (_, false) => return AddOutcome::Unchanged,
                (false, true) => {
                    let flags = existing.flags;
                    *existing = function;
                    existing.flags.is_static |= flags.is_static;
                    existing.flags.is_inline |= flags.is_inline;
                    existing.derive_body_facts();
                    return AddOutcome::Merged;
                }
                // Two definitions: kept so validation can report it
                (true, true) => {}
            }
        }

        let mut function = function;
        function.derive_body_facts();
        self.functions.push(function);
        AddOutcome::Added
    }

    pub fn add_variable(&mut self, variable: Variable) -> AddOutcome {
        if let Some(existing) = self
            .variables
            .iter_mut()
            .find(|v| v.name == variable.name && v.location == variable.location)
        {
            let before = existing.used_by.len();
            existing.used_by.extend(variable.used_by);
            return if existing.used_by.len() == before {
                AddOutcome::Unchanged
            } else {
                AddOutcome::Merged
            };
        }

        if is_shared_global(variable.scope) {
            if let Some(existing) = self
                .variables
                .iter_mut()
                .find(|v| v.name == variable.name && is_shared_global(v.scope))
            {
                match (existing.scope, variable.scope) {
                    (_, VariableScope::Extern) => return AddOutcome::Unchanged,
                    (VariableScope::Extern, _) => {
                        let used_by = std::mem::take(&mut existing.used_by);
                        *existing = variable;
                        existing.used_by.extend(used_by);
                        return AddOutcome::Merged;
                    }
                    _ => {}
                }
            }
        }

        self.variables.push(variable);
        AddOutcome::Added
    }

    pub fn add_aggregate(&mut self, aggregate: AggregateDefinition) -> AddOutcome {
        if let Some(existing) = self
            .aggregates
            .iter_mut()
            .find(|a| a.name == aggregate.name && a.kind == aggregate.kind)
        {
            if existing.location == aggregate.location {
                return AddOutcome::Unchanged;
            }
            if existing.members.is_empty() && !aggregate.members.is_empty() {
                *existing = aggregate;
                return AddOutcome::Merged;
            }
            if aggregate.members.is_empty() {
                return AddOutcome::Unchanged;
            }
        }
        self.aggregates.push(aggregate);
        AddOutcome::Added
    }

    pub fn add_struct(&mut self, definition: AggregateDefinition) -> AddOutcome {
        self.add_aggregate(AggregateDefinition {
            kind: AggregateKind::Struct,
            ..definition
        })
    }

    pub fn add_union(&mut self, definition: AggregateDefinition) -> AddOutcome {
        self.add_aggregate(AggregateDefinition {
            kind: AggregateKind::Union,
            ..definition
        })
    }

    pub fn add_enum(&mut self, definition: EnumDefinition) -> AddOutcome {
        if self
            .enums
            .iter()
            .any(|e| e.name == definition.name && e.location == definition.location)
        {
            return AddOutcome::Unchanged;
        }
        self.enums.push(definition);
        AddOutcome::Added
    }

    pub fn add_typedef(&mut self, typedef: TypedefDefinition) -> AddOutcome {
        if let Some(existing) = self.typedefs.iter().find(|t| t.alias == typedef.alias) {
            if existing.location == typedef.location || existing.original_type == typedef.original_type {
                return AddOutcome::Unchanged;
            }
        }
        self.typedefs.push(typedef);
        AddOutcome::Added
    }

    pub fn add_macro(&mut self, definition: MacroDefinition) -> AddOutcome {
        if let Some(existing) = self
            .macros
            .iter_mut()
            .find(|m| m.name == definition.name && m.location == definition.location)
        {
            if *existing == definition {
                return AddOutcome::Unchanged;
            }
            *existing = definition;
            return AddOutcome::Merged;
        }
        self.macros.push(definition);
        AddOutcome::Added
    }

    pub fn add_conditional(&mut self, directive: ConditionalDirective) -> AddOutcome {
        if self.conditionals.iter().any(|d| d.id == directive.id) {
            return AddOutcome::Unchanged;
        }
        self.conditionals.push(directive);
        AddOutcome::Added
    }

    pub fn add_include(&mut self, include: IncludeDirective) -> AddOutcome {
        if self
            .includes
            .iter()
            .any(|i| i.path == include.path && i.location == include.location)
        {
            return AddOutcome::Unchanged;
        }
        self.includes.push(include);
        AddOutcome::Added
    }

    pub fn function_mut(&mut self, name: &str) -> Option<&mut Function> {
        let idx = self
            .functions
            .iter()
            .position(|f| f.name == name && f.is_definition())
            .or_else(|| self.functions.iter().position(|f| f.name == name))?;
        self.functions.get_mut(idx)
    }

    pub fn functions_mut(&mut self) -> impl Iterator<Item = &mut Function> {
        self.functions.iter_mut()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════

    /// Find an entity by name. Functions win over variables, which win over
    /// types and macros.
    pub fn find(&self, name: &str) -> Option<EntityRef<'_>> {
        self.function(name)
            .map(EntityRef::Function)
            .or_else(|| self.global(name).map(EntityRef::Variable))
            .or_else(|| self.aggregate(name).map(EntityRef::Aggregate))
            .or_else(|| self.enum_def(name).map(EntityRef::Enum))
            .or_else(|| self.typedef(name).map(EntityRef::Typedef))
            .or_else(|| self.macro_def(name).map(EntityRef::Macro))
    }

    /// Function by name, preferring the definition over a prototype
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions
            .iter()
            .find(|f| f.name == name && f.is_definition())
            .or_else(|| self.functions.iter().find(|f| f.name == name))
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.iter().any(|f| f.name == name)
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// File-scope variable by name
    pub fn global(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| {
            v.name == name
                && matches!(
                    v.scope,
                    VariableScope::Global | VariableScope::Static | VariableScope::Extern
                )
        })
    }

    /// Locals and parameters recorded for a function
    pub fn variables_of(&self, function: &str) -> Vec<&Variable> {
        self.variables
            .iter()
            .filter(|v| v.function.as_deref() == Some(function))
            .collect()
    }

    /// Variable visible by `name` inside `function`: its own locals and
    /// parameters shadow globals.
    pub fn visible_variable(&self, function: &str, name: &str) -> Option<&Variable> {
        self.variables
            .iter()
            .find(|v| v.name == name && v.function.as_deref() == Some(function))
            .or_else(|| self.global(name))
    }

    pub fn aggregates(&self) -> &[AggregateDefinition] {
        &self.aggregates
    }

    /// Aggregate by tag, preferring a complete definition
    pub fn aggregate(&self, name: &str) -> Option<&AggregateDefinition> {
        self.aggregates
            .iter()
            .find(|a| a.name == name && !a.members.is_empty())
            .or_else(|| self.aggregates.iter().find(|a| a.name == name))
    }

    pub fn enums(&self) -> &[EnumDefinition] {
        &self.enums
    }

    pub fn enum_def(&self, name: &str) -> Option<&EnumDefinition> {
        self.enums.iter().find(|e| e.name == name)
    }

    pub fn typedefs(&self) -> &[TypedefDefinition] {
        &self.typedefs
    }

    pub fn typedef(&self, alias: &str) -> Option<&TypedefDefinition> {
        self.typedefs.iter().find(|t| t.alias == alias)
    }

    pub fn macros(&self) -> &[MacroDefinition] {
        &self.macros
    }

    /// Last enabled definition of a macro
    pub fn macro_def(&self, name: &str) -> Option<&MacroDefinition> {
        self.macros.iter().rev().find(|m| m.name == name && m.enabled)
    }

    pub fn conditionals(&self) -> &[ConditionalDirective] {
        &self.conditionals
    }

    pub fn conditional(&self, id: u32) -> Option<&ConditionalDirective> {
        self.conditionals.iter().find(|d| d.id == id)
    }

    pub fn includes(&self) -> &[IncludeDirective] {
        &self.includes
    }

    /// Whether the region guarded by directive `id` is compiled in
    pub fn is_directive_active(&self, id: u32) -> Option<bool> {
        ConditionalEvaluator::new(self).is_active(id)
    }

    /// Integer values of object-like numeric macros and enumerators.
    ///
    /// Macros may refer to each other (`#define B (A * 2)`); evaluation is
    /// bounded by the number of macros so self-reference cannot loop.
    pub fn named_constants(&self) -> HashMap<String, ScalarValue> {
        let mut constants: HashMap<String, ScalarValue> = HashMap::new();
        for e in &self.enums {
            for en in &e.enumerators {
                constants.insert(en.name.clone(), ScalarValue::Int(en.value));
            }
        }

        let candidates: Vec<(&str, Expr)> = self
            .macros
            .iter()
            .filter(|m| m.enabled && !m.is_function_like() && !m.value.trim().is_empty())
            .filter_map(|m| parse_expr(&m.value).ok().map(|e| (m.name.as_str(), e)))
            .collect();

        for _ in 0..=candidates.len() {
            let mut progressed = false;
            for (name, expr) in &candidates {
                if constants.contains_key(*name) {
                    continue;
                }
                if let Ok(v) = eval(expr, &constants) {
                    constants.insert((*name).to_string(), v);
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }
        constants
    }

    /// Value of an enumerator constant, with the enum it belongs to
    pub fn enumerator(&self, name: &str) -> Option<(&EnumDefinition, i128)> {
        self.enums
            .iter()
            .find_map(|e| e.value_of(name).map(|v| (e, v)))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Derived facts
    // ═══════════════════════════════════════════════════════════════════

    /// Compute every derived field once all entities are known: typedefs
    /// into the registry, enum numbering, macro dependencies, aggregate
    /// layouts and variable usage.
    pub fn finalize(&mut self, registry: &TypedefRegistry) {
        for t in &self.typedefs {
            registry.register(&t.alias, &t.original_type, TypedefSource::Model);
        }

        self.number_enums();

        for m in &mut self.macros {
            m.dependencies = m.referenced_identifiers();
        }

        let layouts: Vec<Option<AggregateLayout>> = {
            let calc = LayoutCalculator::new(self, registry);
            self.aggregates
                .iter()
                .map(|a| calc.layout_of_definition(a).ok())
                .collect()
        };
        for (aggregate, layout) in self.aggregates.iter_mut().zip(layouts) {
            aggregate.layout = layout;
        }

        for f in &mut self.functions {
            f.derive_body_facts();
        }
        self.derive_variable_usage();

        debug!(
            file = %self.source_file,
            functions = self.functions.len(),
            aggregates = self.aggregates.len(),
            typedefs = self.typedefs.len(),
            "entity model finalized"
        );
    }

    fn number_enums(&mut self) {
        let macro_constants = self.named_constants_from_macros_only();
        let mut known: HashMap<String, ScalarValue> = macro_constants;
        for e in &mut self.enums {
            e.number_values(|text, previous| {
                let mut env = known.clone();
                for p in previous {
                    env.insert(p.name.clone(), ScalarValue::Int(p.value));
                }
                parse_expr(text)
                    .ok()
                    .and_then(|expr| eval(&expr, &env).ok())
                    .and_then(|v| v.as_int())
            });
            for en in &e.enumerators {
                known.insert(en.name.clone(), ScalarValue::Int(en.value));
            }
        }
    }

    fn named_constants_from_macros_only(&self) -> HashMap<String, ScalarValue> {
        let without_enums = EntityModel {
            macros: self.macros.clone(),
            ..Default::default()
        };
        without_enums.named_constants()
    }

    fn derive_variable_usage(&mut self) {
        let globals: HashSet<String> = self
            .variables
            .iter()
            .filter(|v| v.function.is_none())
            .map(|v| v.name.clone())
            .collect();

        let mut usage: BTreeMap<String, HashSet<String>> = BTreeMap::new();
        for f in &self.functions {
            let Some(body) = &f.body else {
                continue;
            };
            for node in &body.nodes {
                let Some(text) = node.source_text() else {
                    continue;
                };
                for m in IDENT.find_iter(text) {
                    if globals.contains(m.as_str()) {
                        usage
                            .entry(m.as_str().to_string())
                            .or_default()
                            .insert(f.name.clone());
                    }
                }
            }
        }

        for v in &mut self.variables {
            if v.function.is_none() {
                if let Some(users) = usage.get(&v.name) {
                    v.used_by.extend(users.iter().cloned());
                }
            }
        }
    }

    /// Run all validation checks
    pub fn validate(&self, registry: &TypedefRegistry) -> Vec<Issue> {
        ModelValidator::new(self, registry).validate()
    }
}

fn is_shared_global(scope: VariableScope) -> bool {
    matches!(scope, VariableScope::Global | VariableScope::Extern)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{BodyBuilder, TargetAbi};

    fn loc(line: u32) -> SourceLocation {
        SourceLocation::new("unit.c", line)
    }

    #[test]
    fn test_add_function_is_idempotent() {
        let mut model = EntityModel::new("unit.c");
        let f = Function::new("f", "int", loc(1));
        assert_eq!(model.add_function(f.clone()), AddOutcome::Added);
        assert_eq!(model.add_function(f), AddOutcome::Unchanged);
        assert_eq!(model.functions().len(), 1);
    }

    #[test]
    fn test_definition_supersedes_prototype() {
        let mut model = EntityModel::new("unit.c");
        model.add_function(Function::new("f", "int", loc(1)));
        let mut b = BodyBuilder::new();
        let r = b.ret(Some("0"), 6);
        let root = b.compound(vec![r], 5);
        let def = Function::new("f", "int", loc(5)).with_body(b.finish(root));
        assert_eq!(model.add_function(def), AddOutcome::Merged);
        assert_eq!(model.functions().len(), 1);
        assert!(model.function("f").unwrap().is_definition());
        // A later prototype does not displace the definition
        assert_eq!(
            model.add_function(Function::new("f", "int", loc(9))),
            AddOutcome::Unchanged
        );
    }

    #[test]
    fn test_extern_merges_with_definition() {
        let mut model = EntityModel::new("unit.c");
        model.add_variable(Variable::new("g", "int", loc(1)).with_scope(VariableScope::Extern));
        let outcome = model.add_variable(Variable::new("g", "int", loc(3)));
        assert_eq!(outcome, AddOutcome::Merged);
        assert_eq!(model.variables().len(), 1);
        assert_eq!(model.global("g").unwrap().scope, VariableScope::Global);
    }

    #[test]
    fn test_named_constants_chain() {
        let mut model = EntityModel::new("unit.c");
        model.add_macro(MacroDefinition::object("B", "(A * 2)", loc(2)));
        model.add_macro(MacroDefinition::object("A", "21", loc(1)));
        model.add_macro(MacroDefinition::object("NAME", "\"str\"", loc(3)));
        let c = model.named_constants();
        assert_eq!(c.get("A"), Some(&ScalarValue::Int(21)));
        assert_eq!(c.get("B"), Some(&ScalarValue::Int(42)));
        assert!(c.get("NAME").is_none());
    }

    #[test]
    fn test_finalize_numbers_enums_with_macros() {
        let mut model = EntityModel::new("unit.c");
        model.add_macro(MacroDefinition::object("BASE", "10", loc(1)));
        model.add_enum(
            EnumDefinition::new("mode", loc(2))
                .with_enumerator("M_A", Some("BASE"))
                .with_enumerator("M_B", None)
                .with_enumerator("M_C", Some("M_A + 5")),
        );
        let registry = TypedefRegistry::new(TargetAbi::default());
        model.finalize(&registry);
        assert_eq!(model.enum_def("mode").unwrap().values(), vec![10, 11, 15]);
        assert_eq!(model.enumerator("M_B").map(|(_, v)| v), Some(11));
    }

    #[test]
    fn test_usage_tracking() {
        let mut model = EntityModel::new("unit.c");
        model.add_variable(Variable::new("counter", "int", loc(1)));
        let mut b = BodyBuilder::new();
        let e = b.expr("counter = counter + 1", 4);
        let root = b.compound(vec![e], 3);
        model.add_function(Function::new("tick", "void", loc(3)).with_body(b.finish(root)));
        model.finalize(&TypedefRegistry::new(TargetAbi::default()));
        assert!(model.global("counter").unwrap().used_by.contains("tick"));
    }
}
