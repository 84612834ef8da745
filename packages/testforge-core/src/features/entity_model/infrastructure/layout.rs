//! Aggregate memory layout
//!
//! Struct members are placed at the next offset aligned to their own
//! alignment and the size is padded to the largest member alignment. Union
//! members all sit at offset 0 and the size is the largest member rounded up
//! to the union's alignment. Both keep `size % alignment == 0`.

use super::model::EntityModel;
use crate::features::entity_model::domain::{AggregateDefinition, AggregateLayout};
use crate::features::type_resolution::{TypedefError, TypedefRegistry};
use crate::shared::models::{CType, QualType};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("'{aggregate}' contains itself by value through member '{member}'")]
    SelfContainment { aggregate: String, member: String },

    #[error("cannot size member '{member}' of type '{type_name}'")]
    UnresolvedType { member: String, type_name: String },
}

/// Size and alignment of one type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeExtent {
    pub size: u64,
    pub alignment: u64,
}

pub struct LayoutCalculator<'a> {
    model: &'a EntityModel,
    registry: &'a TypedefRegistry,
    memo: RefCell<HashMap<String, Result<AggregateLayout, LayoutError>>>,
    in_progress: RefCell<HashSet<String>>,
}

impl<'a> LayoutCalculator<'a> {
    pub fn new(model: &'a EntityModel, registry: &'a TypedefRegistry) -> Self {
        Self {
            model,
            registry,
            memo: RefCell::new(HashMap::new()),
            in_progress: RefCell::new(HashSet::new()),
        }
    }

    /// Layout of an aggregate by tag, looked up in the model
    pub fn layout_of(&self, name: &str) -> Option<Result<AggregateLayout, LayoutError>> {
        self.model.aggregate(name).map(|a| self.layout_of_definition(a))
    }

    pub fn layout_of_definition(&self, aggregate: &AggregateDefinition) -> Result<AggregateLayout, LayoutError> {
        // Forward declarations share the tag but have no members
        if aggregate.members.is_empty() {
            return self.compute(aggregate);
        }
        if let Some(hit) = self.memo.borrow().get(&aggregate.name) {
            return hit.clone();
        }
        self.in_progress.borrow_mut().insert(aggregate.name.clone());
        let result = self.compute(aggregate);
        self.in_progress.borrow_mut().remove(&aggregate.name);
        self.memo
            .borrow_mut()
            .insert(aggregate.name.clone(), result.clone());
        result
    }

    fn compute(&self, aggregate: &AggregateDefinition) -> Result<AggregateLayout, LayoutError> {
        let mut extents = Vec::with_capacity(aggregate.members.len());
        for member in &aggregate.members {
            let extent = match (member.size, member.alignment) {
                (Some(size), Some(alignment)) => TypeExtent {
                    size,
                    alignment: alignment.max(1),
                },
                _ => {
                    let ty = QualType::parse(&member.type_name);
                    let mut extent = self.extent_of(&ty).map_err(|e| match e {
                        ExtentError::SelfContained => LayoutError::SelfContainment {
                            aggregate: aggregate.name.clone(),
                            member: member.name.clone(),
                        },
                        ExtentError::Unresolved => LayoutError::UnresolvedType {
                            member: member.name.clone(),
                            type_name: member.type_name.clone(),
                        },
                    })?;
                    if let Some(size) = member.size {
                        extent.size = size;
                    }
                    if let Some(alignment) = member.alignment {
                        extent.alignment = alignment.max(1);
                    }
                    extent
                }
            };
            extents.push(extent);
        }

        let alignment = extents.iter().map(|e| e.alignment).max().unwrap_or(1);
        let member_sizes: Vec<u64> = extents.iter().map(|e| e.size).collect();

        if aggregate.is_union() {
            let largest = member_sizes.iter().copied().max().unwrap_or(0);
            let size = round_up(largest, alignment);
            return Ok(AggregateLayout {
                size,
                alignment,
                member_offsets: vec![0; extents.len()],
                padding_bytes: size - largest,
                member_sizes,
            });
        }

        let mut offset = 0u64;
        let mut padding = 0u64;
        let mut member_offsets = Vec::with_capacity(extents.len());
        for extent in &extents {
            let aligned = round_up(offset, extent.alignment);
            padding += aligned - offset;
            member_offsets.push(aligned);
            offset = aligned + extent.size;
        }
        let size = round_up(offset, alignment);
        padding += size - offset;

        Ok(AggregateLayout {
            size,
            alignment,
            member_offsets,
            member_sizes,
            padding_bytes: padding,
        })
    }

    /// Size and alignment of any type spelling
    pub fn extent(&self, type_name: &str) -> Option<TypeExtent> {
        self.extent_of(&QualType::parse(type_name)).ok()
    }

    fn extent_of(&self, ty: &QualType) -> Result<TypeExtent, ExtentError> {
        let abi = self.registry.abi();
        match &ty.ty {
            CType::Builtin(b) => Ok(TypeExtent {
                size: b.size(abi),
                alignment: b.alignment(abi),
            }),
            CType::Pointer(_) | CType::FunctionPointer => Ok(TypeExtent {
                size: abi.pointer_size(),
                alignment: abi.pointer_alignment(),
            }),
            CType::Array(inner, count) => {
                let element = self.extent_of(inner)?;
                Ok(TypeExtent {
                    // Flexible array members occupy no storage
                    size: element.size * count.unwrap_or(0),
                    alignment: element.alignment,
                })
            }
            CType::Enum(_) => Ok(TypeExtent {
                size: 4,
                alignment: 4u64.min(abi.max_alignment).max(1),
            }),
            CType::Struct(tag) | CType::Union(tag) => self.aggregate_extent(tag),
            CType::Named(name) => match self.registry.resolve_chain(name) {
                Ok(resolved) => self.extent_of(&resolved.terminal),
                Err(TypedefError::Unknown { name: missing }) => self.aggregate_extent(&missing),
                Err(TypedefError::Cycle { .. }) => Err(ExtentError::Unresolved),
            },
        }
    }

    fn aggregate_extent(&self, tag: &str) -> Result<TypeExtent, ExtentError> {
        if self.in_progress.borrow().contains(tag) {
            return Err(ExtentError::SelfContained);
        }
        let Some(definition) = self.model.aggregate(tag) else {
            return Err(ExtentError::Unresolved);
        };
        match self.layout_of_definition(definition) {
            Ok(layout) => Ok(TypeExtent {
                size: layout.size,
                alignment: layout.alignment,
            }),
            Err(LayoutError::SelfContainment { .. }) => Err(ExtentError::SelfContained),
            Err(LayoutError::UnresolvedType { .. }) => Err(ExtentError::Unresolved),
        }
    }
}

enum ExtentError {
    SelfContained,
    Unresolved,
}

fn round_up(value: u64, alignment: u64) -> u64 {
    let alignment = alignment.max(1);
    value.div_ceil(alignment) * alignment
}
