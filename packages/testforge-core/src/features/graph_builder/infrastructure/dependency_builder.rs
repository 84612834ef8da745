//! Type and include dependency graphs from the entity model

use crate::features::entity_model::{EntityModel, Issue, IssueKind};
use crate::features::graph_builder::domain::{IncludeGraph, TypeDependencyGraph, TypeEdgeKind};
use crate::shared::models::{CType, QualType};
use tracing::debug;

/// Target of a member type and how it is reached
fn type_edge(ty: &QualType) -> Option<(String, TypeEdgeKind)> {
    match &ty.ty {
        CType::Struct(n) | CType::Union(n) | CType::Enum(n) | CType::Named(n) => {
            Some((n.clone(), TypeEdgeKind::Contains))
        }
        CType::Array(inner, _) => type_edge(inner),
        CType::Pointer(_) => ty
            .innermost_name()
            .map(|n| (n.to_string(), TypeEdgeKind::PointsTo)),
        CType::Builtin(_) | CType::FunctionPointer => None,
    }
}

pub fn build_type_graph(model: &EntityModel) -> TypeDependencyGraph {
    let mut graph = TypeDependencyGraph::new();
    for aggregate in model.aggregates() {
        graph.add_type(&aggregate.name);
        for member in &aggregate.members {
            if let Some((target, kind)) = type_edge(&QualType::parse(&member.type_name)) {
                graph.add_dependency(&aggregate.name, &target, kind, Some(&member.name));
            }
        }
    }
    for typedef in model.typedefs() {
        graph.add_type(&typedef.alias);
        let original = QualType::parse(&typedef.original_type);
        if let Some((target, kind)) = type_edge(&original) {
            let kind = match kind {
                TypeEdgeKind::Contains => TypeEdgeKind::Aliases,
                other => other,
            };
            graph.add_dependency(&typedef.alias, &target, kind, None);
        }
    }
    debug!(types = graph.type_count(), "type dependency graph built");
    graph
}

/// By-value containment cycles as validation issues
pub fn containment_issues(graph: &TypeDependencyGraph) -> Vec<Issue> {
    graph
        .by_value_cycles()
        .into_iter()
        .map(|group| {
            let head = group.first().cloned().unwrap_or_default();
            Issue::error(
                IssueKind::SelfContainment,
                head,
                format!("types contain each other by value: {}", group.join(", ")),
            )
        })
        .collect()
}

/// Include graph over one or more translation units. The includer of each
/// directive is the file it was written in.
pub fn build_include_graph<'m>(models: impl IntoIterator<Item = &'m EntityModel>) -> IncludeGraph {
    let mut graph = IncludeGraph::new();
    for model in models {
        if !model.source_file.is_empty() {
            graph.add_file(&model.source_file);
        }
        for include in model.includes() {
            let from = if include.location.file.is_empty() {
                model.source_file.as_str()
            } else {
                include.location.file.as_str()
            };
            graph.add_include(from, &include.path, include.location.line, include.is_system);
        }
    }
    debug!(files = graph.file_count(), "include graph built");
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::entity_model::{AggregateDefinition, IncludeDirective, TypedefDefinition};
    use crate::shared::models::SourceLocation;

    fn loc(line: u32) -> SourceLocation {
        SourceLocation::new("types.h", line)
    }

    #[test]
    fn test_type_graph_edges() {
        let mut model = EntityModel::new("types.h");
        model.add_struct(
            AggregateDefinition::structure("list", loc(1))
                .with_member("next", "struct list *")
                .with_member("items", "item_t[4]"),
        );
        model.add_typedef(TypedefDefinition::new("item_t", "struct item", loc(5)));
        let g = build_type_graph(&model);
        let deps = g.dependencies("list");
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].kind, TypeEdgeKind::PointsTo);
        assert_eq!(deps[1].to, "item_t");
        assert_eq!(deps[1].kind, TypeEdgeKind::Contains);
        assert_eq!(g.dependencies("item_t")[0].kind, TypeEdgeKind::Aliases);
        assert!(containment_issues(&g).is_empty());
        assert!(g.recursive_types().contains("list"));
    }

    #[test]
    fn test_include_graph_from_models() {
        let mut model = EntityModel::new("main.c");
        model.add_include(IncludeDirective::new("app.h", false, SourceLocation::new("main.c", 1)));
        model.add_include(IncludeDirective::new("stdint.h", true, SourceLocation::new("app.h", 2)));
        let g = build_include_graph([&model]);
        assert_eq!(g.includes_of("main.c"), vec!["app.h"]);
        assert_eq!(g.includes_of("app.h"), vec!["stdint.h"]);
        assert_eq!(g.topological_order(), vec!["stdint.h", "app.h", "main.c"]);
    }
}
