//! Typedef registry
//!
//! One registry is created per analysis session and shared as
//! `Arc<TypedefRegistry>`. Reads take a shared lock; registration takes the
//! write lock and invalidates the resolution cache. Chains are resolved
//! lazily on first lookup, so an alias may be registered before the types
//! it refers to.

use super::defaults::{infer_base_type, BOOLEAN_ALIASES, DEFAULT_TYPEDEFS};
use super::header_scanner::scan_header;
use crate::errors::{EngineError, Result};
use crate::features::type_resolution::domain::{
    resolve_chain, ResolvedType, TypedefError, TypedefMapping, TypedefSource,
};
use crate::shared::models::{CType, NumericClass, TargetAbi, ValueRange};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone)]
struct Entry {
    base_type: String,
    bounds: Option<ValueRange>,
    size: Option<u64>,
    source: TypedefSource,
}

/// Session-scoped alias table
#[derive(Debug)]
pub struct TypedefRegistry {
    abi: TargetAbi,
    entries: RwLock<BTreeMap<String, Entry>>,
    cache: RwLock<HashMap<String, std::result::Result<ResolvedType, TypedefError>>>,
}

impl TypedefRegistry {
    /// Empty registry
    pub fn new(abi: TargetAbi) -> Self {
        Self {
            abi,
            entries: RwLock::new(BTreeMap::new()),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Registry pre-populated with the built-in aliases
    pub fn with_defaults(abi: TargetAbi) -> Self {
        let registry = Self::new(abi);
        for (alias, base) in DEFAULT_TYPEDEFS {
            registry.register(alias, base, TypedefSource::Builtin);
        }
        for alias in BOOLEAN_ALIASES {
            registry.set_bounds(alias, ValueRange::ints(0, 1));
        }
        registry
    }

    pub fn abi(&self) -> &TargetAbi {
        &self.abi
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.entries.read().contains_key(alias)
    }

    /// Register `alias → base`. Re-registering the same mapping is a no-op;
    /// a conflicting mapping replaces the existing one only when its source
    /// has equal or higher priority. Returns whether the table changed.
    pub fn register(&self, alias: &str, base_type: &str, source: TypedefSource) -> bool {
        let base_type = base_type.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut entries = self.entries.write();
        if let Some(existing) = entries.get(alias) {
            if existing.base_type == base_type
                || source.priority() > existing.source.priority()
            {
                return false;
            }
        }
        debug!(alias, base = %base_type, ?source, "typedef registered");
        entries.insert(
            alias.to_string(),
            Entry {
                base_type,
                bounds: None,
                size: None,
                source,
            },
        );
        drop(entries);
        self.cache.write().clear();
        true
    }

    /// Register a full mapping, keeping explicit bounds and size
    pub fn register_mapping(&self, mapping: &TypedefMapping) -> bool {
        let changed = self.register(&mapping.user_type, &mapping.base_type, mapping.source.clone());
        if changed {
            let mut entries = self.entries.write();
            if let Some(entry) = entries.get_mut(&mapping.user_type) {
                entry.bounds = mapping.bounds;
                entry.size = mapping.size;
            }
        }
        changed
    }

    /// Override the numeric bounds of an alias
    pub fn set_bounds(&self, alias: &str, bounds: ValueRange) {
        if let Some(entry) = self.entries.write().get_mut(alias) {
            entry.bounds = Some(bounds);
        }
    }

    /// Registered base type spelling of `alias`, without following the chain
    pub fn base_of(&self, alias: &str) -> Option<String> {
        self.entries.read().get(alias).map(|e| e.base_type.clone())
    }

    /// Follow the alias chain to its terminal type.
    ///
    /// Builtin and aggregate names resolve with an empty chain. Terminates in
    /// at most `len()` hops; a cycle is an error.
    pub fn resolve_chain(&self, name: &str) -> std::result::Result<ResolvedType, TypedefError> {
        if let Some(hit) = self.cache.read().get(name) {
            return hit.clone();
        }
        let limit = self.len();
        let result = resolve_chain(name, |alias| self.base_of(alias), limit);
        self.cache.write().insert(name.to_string(), result.clone());
        result
    }

    /// `resolve(name) → baseType?`
    pub fn resolve(&self, name: &str) -> Option<ResolvedType> {
        self.resolve_chain(name).ok()
    }

    /// Resolve, falling back to name-based inference for unknown aliases.
    /// Inferred aliases are registered so later lookups are consistent.
    pub fn resolve_or_infer(&self, name: &str) -> std::result::Result<ResolvedType, TypedefError> {
        match self.resolve_chain(name) {
            Err(TypedefError::Unknown { name: missing }) => {
                let Some(base) = infer_base_type(&missing) else {
                    return Err(TypedefError::Unknown { name: missing });
                };
                self.register(&missing, base, TypedefSource::Inferred);
                self.resolve_chain(name)
            }
            other => other,
        }
    }

    /// Numeric bounds: the nearest explicit bounds along the chain, else the
    /// representable range of the terminal builtin.
    pub fn bounds_of(&self, name: &str) -> Option<ValueRange> {
        let resolved = self.resolve_chain(name).ok()?;
        {
            let entries = self.entries.read();
            for alias in &resolved.chain {
                if let Some(bounds) = entries.get(alias).and_then(|e| e.bounds) {
                    return Some(bounds);
                }
            }
        }
        let builtin = resolved.terminal.as_builtin()?;
        match builtin.numeric_class() {
            NumericClass::Integer | NumericClass::Boolean => builtin
                .int_range(&self.abi)
                .map(|(lo, hi)| ValueRange::ints(lo, hi)),
            NumericClass::Floating => {
                let max = if builtin.size(&self.abi) == 4 {
                    f32::MAX as f64
                } else {
                    f64::MAX
                };
                Some(ValueRange::reals(-max, max))
            }
            NumericClass::Void => None,
        }
    }

    /// Size in bytes of a scalar or pointer alias; aggregates need the
    /// entity model and return `None` here.
    pub fn size_of(&self, name: &str) -> Option<u64> {
        let resolved = self.resolve_chain(name).ok()?;
        {
            let entries = self.entries.read();
            for alias in &resolved.chain {
                if let Some(size) = entries.get(alias).and_then(|e| e.size) {
                    return Some(size);
                }
            }
        }
        match &resolved.terminal.ty {
            CType::Builtin(b) => Some(b.size(&self.abi)),
            CType::Pointer(_) | CType::FunctionPointer => Some(self.abi.pointer_size()),
            CType::Enum(_) => Some(4),
            _ => None,
        }
    }

    /// `allMappings()`: every alias with its derived bounds and size
    pub fn all_mappings(&self) -> BTreeMap<String, TypedefMapping> {
        let snapshot: Vec<(String, Entry)> = self
            .entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        snapshot
            .into_iter()
            .map(|(alias, entry)| {
                let mapping = TypedefMapping {
                    bounds: entry.bounds.or_else(|| self.bounds_of(&alias)),
                    size: entry.size.or_else(|| self.size_of(&alias)),
                    user_type: alias.clone(),
                    base_type: entry.base_type,
                    source: entry.source,
                };
                (alias, mapping)
            })
            .collect()
    }

    /// Register every simple typedef found in header text
    pub fn import_header(&self, text: &str, file: &str) -> usize {
        let found = scan_header(text);
        let added = found
            .iter()
            .filter(|t| self.register(&t.alias, &t.base_type, TypedefSource::Header(file.to_string())))
            .count();
        debug!(file, discovered = found.len(), added, "header typedef scan");
        added
    }

    /// Load persisted mappings (JSON array of [`TypedefMapping`])
    pub fn load_json(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(EngineError::source_not_found(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let mappings: Vec<TypedefMapping> = serde_json::from_str(&content)?;
        let added = mappings
            .into_iter()
            .map(|mut m| {
                if m.source == TypedefSource::Builtin {
                    m.source = TypedefSource::Persisted;
                }
                m
            })
            .filter(|m| self.register_mapping(m))
            .count();
        Ok(added)
    }

    /// Persist every non-builtin mapping
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let mappings: Vec<TypedefMapping> = self
            .all_mappings()
            .into_values()
            .filter(|m| m.source != TypedefSource::Builtin)
            .collect();
        std::fs::write(path, serde_json::to_string_pretty(&mappings)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{BuiltinType, ScalarValue};

    #[test]
    fn test_defaults_resolve() {
        let reg = TypedefRegistry::with_defaults(TargetAbi::default());
        let r = reg.resolve("uint8_t").unwrap();
        assert_eq!(r.terminal.as_builtin(), Some(BuiltinType::UnsignedChar));
        assert_eq!(reg.bounds_of("uint8_t"), Some(ValueRange::ints(0, 255)));
        assert_eq!(reg.bounds_of("BOOL"), Some(ValueRange::ints(0, 1)));
        assert_eq!(reg.size_of("UINT64"), Some(8));
    }

    #[test]
    fn test_lazy_forward_registration() {
        let reg = TypedefRegistry::new(TargetAbi::default());
        reg.register("speed_t", "rpm_t", TypedefSource::Model);
        assert!(reg.resolve("speed_t").is_none());
        reg.register("rpm_t", "unsigned short", TypedefSource::Model);
        let r = reg.resolve("speed_t").unwrap();
        assert_eq!(r.chain, vec!["speed_t", "rpm_t"]);
        assert_eq!(reg.bounds_of("speed_t"), Some(ValueRange::ints(0, 65535)));
    }

    #[test]
    fn test_register_is_idempotent_and_priority_ordered() {
        let reg = TypedefRegistry::with_defaults(TargetAbi::default());
        let before = reg.len();
        assert!(!reg.register("uint8_t", "unsigned char", TypedefSource::Model));
        assert!(!reg.register("uint8_t", "int", TypedefSource::Inferred));
        assert_eq!(reg.len(), before);
        assert_eq!(
            reg.resolve("uint8_t").unwrap().terminal.as_builtin(),
            Some(BuiltinType::UnsignedChar)
        );
    }

    #[test]
    fn test_cycle_reported() {
        let reg = TypedefRegistry::new(TargetAbi::default());
        reg.register("a_t", "b_t", TypedefSource::Model);
        reg.register("b_t", "a_t", TypedefSource::Model);
        assert!(matches!(reg.resolve_chain("a_t"), Err(TypedefError::Cycle { .. })));
    }

    #[test]
    fn test_infer_registers_alias() {
        let reg = TypedefRegistry::new(TargetAbi::default());
        let r = reg.resolve_or_infer("U16").unwrap();
        assert_eq!(r.terminal.as_builtin(), Some(BuiltinType::UnsignedShort));
        assert!(reg.contains("U16"));
    }

    #[test]
    fn test_alias_to_unknown_name_is_not_a_cycle() {
        let reg = TypedefRegistry::new(TargetAbi::default());
        reg.register("a_t", "mystery_t", TypedefSource::Model);
        assert_eq!(
            reg.resolve_chain("a_t").unwrap_err(),
            TypedefError::Unknown {
                name: "mystery_t".into()
            }
        );
        assert!(reg.resolve("mystery_t").is_none());
        assert!(reg.bounds_of("a_t").is_none());
    }

    #[test]
    fn test_import_header_and_persist() {
        let reg = TypedefRegistry::new(TargetAbi::default());
        let added = reg.import_header("typedef unsigned int counter_t;\ntypedef counter_t tick_t;\n", "timer.h");
        assert_eq!(added, 2);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("typedefs.json");
        reg.save_json(&path).unwrap();

        let fresh = TypedefRegistry::new(TargetAbi::default());
        assert_eq!(fresh.load_json(&path).unwrap(), 2);
        assert_eq!(fresh.bounds_of("tick_t").map(|b| b.max), Some(ScalarValue::Int(4294967295)));
    }

    #[test]
    fn test_load_missing_file() {
        let reg = TypedefRegistry::new(TargetAbi::default());
        assert!(matches!(
            reg.load_json("/definitely/not/here.json"),
            Err(EngineError::SourceNotFound(_))
        ));
    }
}
