//! Model validation
//!
//! Every check reports into a list of [`Issue`]s; nothing here fails or
//! panics on a malformed model.

use super::layout::{LayoutCalculator, LayoutError};
use super::model::EntityModel;
use crate::features::entity_model::domain::*;
use crate::features::type_resolution::domain::{resolve_chain, TypedefError};
use crate::features::type_resolution::TypedefRegistry;
use crate::shared::models::{CType, QualType};
use std::collections::{BTreeMap, BTreeSet, HashSet};

pub struct ModelValidator<'a> {
    model: &'a EntityModel,
    registry: &'a TypedefRegistry,
}

impl<'a> ModelValidator<'a> {
    pub fn new(model: &'a EntityModel, registry: &'a TypedefRegistry) -> Self {
        Self { model, registry }
    }

    pub fn validate(&self) -> Vec<Issue> {
        let mut issues = Vec::new();
        self.check_duplicates(&mut issues);
        self.check_typedef_cycles(&mut issues);
        self.check_aggregates(&mut issues);
        self.check_declared_types(&mut issues);
        self.check_callees(&mut issues);
        self.check_macro_dependencies(&mut issues);
        self.check_directives(&mut issues);
        issues
    }

    fn check_duplicates(&self, issues: &mut Vec<Issue>) {
        let mut defined: BTreeMap<&str, &Function> = BTreeMap::new();
        for f in self.model.functions().iter().filter(|f| f.is_definition()) {
            if defined.insert(&f.name, f).is_some() {
                issues.push(
                    Issue::error(IssueKind::DuplicateName, &f.name, "function defined more than once")
                        .at(&f.location),
                );
            }
        }

        let mut seen: HashSet<(String, &str)> = HashSet::new();
        for v in self.model.variables() {
            if v.scope == VariableScope::Extern {
                continue;
            }
            if !seen.insert((v.scope_key(), v.name.as_str())) {
                issues.push(
                    Issue::error(
                        IssueKind::DuplicateName,
                        &v.name,
                        format!("variable declared twice in scope {}", v.scope_key()),
                    )
                    .at(&v.location),
                );
            }
        }

        let mut tags: HashSet<(&str, AggregateKind)> = HashSet::new();
        for a in self.model.aggregates().iter().filter(|a| !a.members.is_empty()) {
            if !tags.insert((a.name.as_str(), a.kind)) {
                issues.push(
                    Issue::error(IssueKind::DuplicateName, &a.name, "aggregate defined more than once")
                        .at(&a.location),
                );
            }
        }

        let mut enums: HashSet<&str> = HashSet::new();
        for e in self.model.enums() {
            if !enums.insert(&e.name) {
                issues.push(
                    Issue::error(IssueKind::DuplicateName, &e.name, "enum defined more than once")
                        .at(&e.location),
                );
            }
        }

        let mut aliases: BTreeMap<&str, &str> = BTreeMap::new();
        for t in self.model.typedefs() {
            match aliases.get(t.alias.as_str()) {
                Some(original) if *original != t.original_type => issues.push(
                    Issue::error(
                        IssueKind::DuplicateName,
                        &t.alias,
                        format!("typedef redefined as '{}' (was '{}')", t.original_type, original),
                    )
                    .at(&t.location),
                ),
                Some(_) => {}
                None => {
                    aliases.insert(&t.alias, &t.original_type);
                }
            }
        }

        let mut macros: BTreeMap<&str, &MacroDefinition> = BTreeMap::new();
        for m in self.model.macros().iter().filter(|m| m.enabled) {
            if let Some(prev) = macros.insert(&m.name, m) {
                if prev.value.trim() != m.value.trim() || prev.parameters != m.parameters {
                    issues.push(
                        Issue::warning(IssueKind::DuplicateName, &m.name, "macro redefined with a different body")
                            .at(&m.location),
                    );
                }
            }
        }
    }

    /// Model typedefs take precedence over registry entries, matching what
    /// `finalize` would register.
    fn alias_base(&self, alias: &str) -> Option<String> {
        self.model
            .typedef(alias)
            .map(|t| t.original_type.clone())
            .or_else(|| self.registry.base_of(alias))
    }

    fn check_typedef_cycles(&self, issues: &mut Vec<Issue>) {
        let limit = self.model.typedefs().len() + self.registry.len();
        let mut reported: HashSet<BTreeSet<String>> = HashSet::new();
        for t in self.model.typedefs() {
            if let Err(TypedefError::Cycle { chain }) =
                resolve_chain(&t.alias, |a| self.alias_base(a), limit)
            {
                let members: BTreeSet<String> = chain.iter().cloned().collect();
                if reported.insert(members) {
                    issues.push(
                        Issue::error(
                            IssueKind::TypedefCycle,
                            &t.alias,
                            format!("typedef chain does not terminate: {}", chain.join(" -> ")),
                        )
                        .at(&t.location),
                    );
                }
            }
        }
    }

    fn check_aggregates(&self, issues: &mut Vec<Issue>) {
        let calc = LayoutCalculator::new(self.model, self.registry);
        for a in self.model.aggregates().iter().filter(|a| !a.members.is_empty()) {
            match calc.layout_of_definition(a) {
                Ok(_) => {}
                Err(err @ LayoutError::SelfContainment { .. }) => {
                    issues.push(Issue::error(IssueKind::SelfContainment, &a.name, err.to_string()).at(&a.location))
                }
                Err(err @ LayoutError::UnresolvedType { .. }) => {
                    issues.push(Issue::error(IssueKind::UnresolvedType, &a.name, err.to_string()).at(&a.location))
                }
            }
        }
    }

    fn check_declared_types(&self, issues: &mut Vec<Issue>) {
        for v in self.model.variables() {
            if let Some(missing) = self.unresolved(&v.qual_type()) {
                issues.push(
                    Issue::error(
                        IssueKind::UnresolvedType,
                        &v.name,
                        format!("unknown type '{missing}'"),
                    )
                    .at(&v.location),
                );
            }
        }

        for f in self.model.functions() {
            let declared = std::iter::once(f.return_type.as_str())
                .chain(f.parameters.iter().map(|p| p.type_name.as_str()));
            for type_name in declared {
                if let Some(missing) = self.unresolved(&QualType::parse(type_name)) {
                    issues.push(
                        Issue::error(
                            IssueKind::UnresolvedType,
                            &f.name,
                            format!("unknown type '{missing}' in signature"),
                        )
                        .at(&f.location),
                    );
                }
            }
        }
    }

    /// Name of a type that cannot be resolved. Pointers to undeclared tags
    /// are legal incomplete types.
    fn unresolved(&self, ty: &QualType) -> Option<String> {
        match &ty.ty {
            CType::Builtin(_) | CType::FunctionPointer => None,
            CType::Pointer(inner) => match &inner.ty {
                CType::Struct(_) | CType::Union(_) | CType::Enum(_) => None,
                _ => self.unresolved(inner),
            },
            CType::Array(inner, _) => self.unresolved(inner),
            CType::Struct(tag) | CType::Union(tag) => {
                (self.model.aggregate(tag).is_none()).then(|| tag.clone())
            }
            CType::Enum(tag) => (self.model.enum_def(tag).is_none()).then(|| tag.clone()),
            CType::Named(name) => {
                let limit = self.model.typedefs().len() + self.registry.len();
                match resolve_chain(name, |a| self.alias_base(a), limit) {
                    Ok(resolved) => self.unresolved(&resolved.terminal),
                    // Cycles are reported separately
                    Err(TypedefError::Cycle { .. }) => None,
                    Err(TypedefError::Unknown { name: missing }) => {
                        let known = self.model.aggregate(&missing).is_some()
                            || self.model.enum_def(&missing).is_some();
                        (!known).then_some(missing)
                    }
                }
            }
        }
    }

    fn check_callees(&self, issues: &mut Vec<Issue>) {
        for f in self.model.functions() {
            for callee in &f.called_functions {
                if !self.model.has_function(callee) {
                    issues.push(
                        Issue::info(
                            IssueKind::UnknownCallee,
                            &f.name,
                            format!("calls '{callee}', which is not declared in this unit"),
                        )
                        .at(&f.location),
                    );
                }
            }
        }
    }

    fn check_macro_dependencies(&self, issues: &mut Vec<Issue>) {
        for m in self.model.macros().iter().filter(|m| m.enabled) {
            for ident in m.referenced_identifiers() {
                if !looks_like_macro_name(&ident) {
                    continue;
                }
                let known = self.model.macro_def(&ident).is_some()
                    || self.model.enumerator(&ident).is_some()
                    || self.model.find(&ident).is_some()
                    || self.registry.contains(&ident);
                if !known {
                    issues.push(
                        Issue::warning(
                            IssueKind::UndefinedMacroDependency,
                            &m.name,
                            format!("depends on undefined macro '{ident}'"),
                        )
                        .at(&m.location),
                    );
                }
            }
        }
    }

    fn check_directives(&self, issues: &mut Vec<Issue>) {
        for d in self.model.conditionals() {
            let missing = [d.parent, d.chain_head]
                .into_iter()
                .flatten()
                .find(|id| self.model.conditional(*id).is_none());
            if let Some(id) = missing {
                issues.push(
                    Issue::warning(
                        IssueKind::OrphanDirective,
                        format!("directive {}", d.id),
                        format!("refers to missing directive {id}"),
                    )
                    .at(&d.location),
                );
            }
        }
    }
}

fn looks_like_macro_name(ident: &str) -> bool {
    ident.chars().any(|c| c.is_ascii_uppercase())
        && ident
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
