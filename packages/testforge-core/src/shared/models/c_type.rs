//! C type names
//!
//! Builtin scalar types are a closed enum looked up through a canonical
//! spelling table, so `long unsigned int`, `unsigned long` and
//! `unsigned long int` all map to the same [`BuiltinType`]. Derived types
//! (pointers, arrays, tagged aggregates, typedef names) are parsed into
//! [`CType`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Builtin C scalar types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinType {
    Void,
    Bool,
    Char,
    SignedChar,
    UnsignedChar,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Float,
    Double,
    LongDouble,
}

/// Which solver sort a builtin maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericClass {
    Integer,
    Floating,
    Boolean,
    Void,
}

/// Canonical spelling → builtin. Keys are produced by [`canonical_spelling`].
const BUILTIN_SPELLINGS: &[(&str, BuiltinType)] = &[
    ("void", BuiltinType::Void),
    ("_Bool", BuiltinType::Bool),
    ("bool", BuiltinType::Bool),
    ("char", BuiltinType::Char),
    ("signed char", BuiltinType::SignedChar),
    ("unsigned char", BuiltinType::UnsignedChar),
    ("short", BuiltinType::Short),
    ("signed short", BuiltinType::Short),
    ("unsigned short", BuiltinType::UnsignedShort),
    ("int", BuiltinType::Int),
    ("signed", BuiltinType::Int),
    ("signed int", BuiltinType::Int),
    ("unsigned", BuiltinType::UnsignedInt),
    ("unsigned int", BuiltinType::UnsignedInt),
    ("long", BuiltinType::Long),
    ("signed long", BuiltinType::Long),
    ("unsigned long", BuiltinType::UnsignedLong),
    ("long long", BuiltinType::LongLong),
    ("signed long long", BuiltinType::LongLong),
    ("unsigned long long", BuiltinType::UnsignedLongLong),
    ("float", BuiltinType::Float),
    ("double", BuiltinType::Double),
    ("long double", BuiltinType::LongDouble),
];

const QUALIFIERS: &[&str] = &[
    "const", "volatile", "restrict", "__restrict", "static", "extern", "register", "inline",
    "auto",
];

/// Reorder specifier words into the key format of [`BUILTIN_SPELLINGS`]:
/// signedness, then `short`/`long` count, then the base word. A redundant
/// `int` is dropped when a size or signedness word is present.
fn canonical_spelling(words: &[&str]) -> Option<String> {
    let mut sign: Option<&str> = None;
    let mut shorts = 0;
    let mut longs = 0;
    let mut base: Option<&str> = None;

    for &w in words {
        match w {
            "signed" | "unsigned" => {
                if sign.replace(w).is_some() {
                    return None;
                }
            }
            "short" => shorts += 1,
            "long" => longs += 1,
            "int" | "char" | "float" | "double" | "void" | "_Bool" | "bool" => {
                if base.replace(w).is_some() {
                    return None;
                }
            }
            _ => return None,
        }
    }

    if base == Some("int") && (shorts > 0 || longs > 0 || sign.is_some()) {
        base = None;
    }

    let mut parts: Vec<&str> = Vec::new();
    parts.extend(sign);
    parts.extend(std::iter::repeat("short").take(shorts));
    parts.extend(std::iter::repeat("long").take(longs));
    parts.extend(base);
    if parts.is_empty() {
        return None;
    }
    Some(parts.join(" "))
}

impl BuiltinType {
    /// Look up a builtin from specifier words (qualifiers allowed).
    pub fn from_name(name: &str) -> Option<Self> {
        let words: Vec<&str> = name
            .split_whitespace()
            .filter(|w| !QUALIFIERS.contains(w))
            .collect();
        let key = canonical_spelling(&words)?;
        BUILTIN_SPELLINGS
            .iter()
            .find(|(spelling, _)| *spelling == key)
            .map(|&(_, ty)| ty)
    }

    pub fn spelling(self) -> &'static str {
        match self {
            BuiltinType::Void => "void",
            BuiltinType::Bool => "_Bool",
            BuiltinType::Char => "char",
            BuiltinType::SignedChar => "signed char",
            BuiltinType::UnsignedChar => "unsigned char",
            BuiltinType::Short => "short",
            BuiltinType::UnsignedShort => "unsigned short",
            BuiltinType::Int => "int",
            BuiltinType::UnsignedInt => "unsigned int",
            BuiltinType::Long => "long",
            BuiltinType::UnsignedLong => "unsigned long",
            BuiltinType::LongLong => "long long",
            BuiltinType::UnsignedLongLong => "unsigned long long",
            BuiltinType::Float => "float",
            BuiltinType::Double => "double",
            BuiltinType::LongDouble => "long double",
        }
    }

    pub fn numeric_class(self) -> NumericClass {
        match self {
            BuiltinType::Void => NumericClass::Void,
            BuiltinType::Bool => NumericClass::Boolean,
            BuiltinType::Float | BuiltinType::Double | BuiltinType::LongDouble => {
                NumericClass::Floating
            }
            _ => NumericClass::Integer,
        }
    }

    /// Plain `char` is treated as signed.
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            BuiltinType::Char
                | BuiltinType::SignedChar
                | BuiltinType::Short
                | BuiltinType::Int
                | BuiltinType::Long
                | BuiltinType::LongLong
                | BuiltinType::Float
                | BuiltinType::Double
                | BuiltinType::LongDouble
        )
    }

    pub fn size(self, abi: &TargetAbi) -> u64 {
        match self {
            BuiltinType::Void => 1,
            BuiltinType::Bool | BuiltinType::Char | BuiltinType::SignedChar => 1,
            BuiltinType::UnsignedChar => 1,
            BuiltinType::Short | BuiltinType::UnsignedShort => 2,
            BuiltinType::Int | BuiltinType::UnsignedInt => 4,
            BuiltinType::Long | BuiltinType::UnsignedLong => abi.long_size(),
            BuiltinType::LongLong | BuiltinType::UnsignedLongLong => 8,
            BuiltinType::Float => 4,
            BuiltinType::Double => 8,
            BuiltinType::LongDouble => abi.long_double_size(),
        }
    }

    pub fn alignment(self, abi: &TargetAbi) -> u64 {
        self.size(abi).min(abi.max_alignment).max(1)
    }

    /// Representable integer range; `None` for non-integers.
    pub fn int_range(self, abi: &TargetAbi) -> Option<(i128, i128)> {
        match self.numeric_class() {
            NumericClass::Boolean => Some((0, 1)),
            NumericClass::Integer => {
                let bits = (self.size(abi) * 8) as u32;
                if self.is_signed() {
                    let half = 1i128 << (bits - 1);
                    Some((-half, half - 1))
                } else {
                    Some((0, (1i128 << bits) - 1))
                }
            }
            _ => None,
        }
    }
}

impl fmt::Display for BuiltinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spelling())
    }
}

/// Target data model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DataModel {
    /// int/long/pointer all 32-bit
    Ilp32,
    /// 64-bit long and pointer (Unix)
    #[default]
    Lp64,
    /// 64-bit pointer, 32-bit long (Windows)
    Llp64,
}

impl DataModel {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ilp32" => Some(DataModel::Ilp32),
            "lp64" => Some(DataModel::Lp64),
            "llp64" => Some(DataModel::Llp64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataModel::Ilp32 => "ilp32",
            DataModel::Lp64 => "lp64",
            DataModel::Llp64 => "llp64",
        }
    }
}

/// Sizes and alignment rules of the compilation target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetAbi {
    pub data_model: DataModel,
    /// Upper bound on any scalar's alignment
    pub max_alignment: u64,
}

impl Default for TargetAbi {
    fn default() -> Self {
        Self {
            data_model: DataModel::Lp64,
            max_alignment: 8,
        }
    }
}

impl TargetAbi {
    pub fn new(data_model: DataModel, max_alignment: u64) -> Self {
        Self {
            data_model,
            max_alignment,
        }
    }

    pub fn pointer_size(&self) -> u64 {
        match self.data_model {
            DataModel::Ilp32 => 4,
            DataModel::Lp64 | DataModel::Llp64 => 8,
        }
    }

    pub fn pointer_alignment(&self) -> u64 {
        self.pointer_size().min(self.max_alignment).max(1)
    }

    pub fn long_size(&self) -> u64 {
        match self.data_model {
            DataModel::Lp64 => 8,
            DataModel::Ilp32 | DataModel::Llp64 => 4,
        }
    }

    pub fn long_double_size(&self) -> u64 {
        match self.data_model {
            DataModel::Lp64 => 16,
            DataModel::Ilp32 | DataModel::Llp64 => 8,
        }
    }
}

/// Parsed C type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CType {
    Builtin(BuiltinType),
    Pointer(Box<QualType>),
    Array(Box<QualType>, Option<u64>),
    Struct(String),
    Union(String),
    Enum(String),
    /// Typedef name or otherwise unknown identifier
    Named(String),
    FunctionPointer,
}

/// A type with its top-level qualifiers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualType {
    pub ty: CType,
    pub is_const: bool,
    pub is_volatile: bool,
}

impl QualType {
    pub fn plain(ty: CType) -> Self {
        Self {
            ty,
            is_const: false,
            is_volatile: false,
        }
    }

    /// Parse a type name such as `const unsigned char *` or `struct node *[4]`.
    ///
    /// Unknown words are kept as a [`CType::Named`] so typedef resolution can
    /// happen later.
    pub fn parse(text: &str) -> QualType {
        let text = text.trim();
        if text.contains('(') {
            return QualType::plain(CType::FunctionPointer);
        }

        let (head, dims) = split_array_suffix(text);
        let spaced = head.replace('*', " * ");
        let mut specifiers: Vec<&str> = Vec::new();
        let mut is_const = false;
        let mut is_volatile = false;
        let mut current: Option<QualType> = None;

        for word in spaced.split_whitespace() {
            match word {
                "*" => {
                    let inner = current
                        .take()
                        .unwrap_or_else(|| base_from_specifiers(&specifiers, is_const, is_volatile));
                    current = Some(QualType::plain(CType::Pointer(Box::new(inner))));
                }
                "const" => match current.as_mut() {
                    Some(ptr) => ptr.is_const = true,
                    None => is_const = true,
                },
                "volatile" => match current.as_mut() {
                    Some(ptr) => ptr.is_volatile = true,
                    None => is_volatile = true,
                },
                w if QUALIFIERS.contains(&w) => {}
                w => {
                    if current.is_none() {
                        specifiers.push(w);
                    }
                }
            }
        }

        let mut result =
            current.unwrap_or_else(|| base_from_specifiers(&specifiers, is_const, is_volatile));
        for dim in dims.into_iter().rev() {
            result = QualType::plain(CType::Array(Box::new(result), dim));
        }
        result
    }

    /// Pointers and arrays (which decay to pointers in parameter position)
    pub fn is_pointer_like(&self) -> bool {
        matches!(
            self.ty,
            CType::Pointer(_) | CType::Array(..) | CType::FunctionPointer
        )
    }

    /// Whether the pointed-to (or element) type is const-qualified
    pub fn pointee_is_const(&self) -> bool {
        match &self.ty {
            CType::Pointer(inner) | CType::Array(inner, _) => inner.is_const,
            _ => false,
        }
    }

    pub fn as_builtin(&self) -> Option<BuiltinType> {
        match self.ty {
            CType::Builtin(b) => Some(b),
            _ => None,
        }
    }

    /// Name of a typedef or tagged aggregate this type refers to by value
    pub fn referenced_name(&self) -> Option<&str> {
        match &self.ty {
            CType::Named(n) | CType::Struct(n) | CType::Union(n) | CType::Enum(n) => Some(n),
            CType::Array(inner, _) => inner.referenced_name(),
            _ => None,
        }
    }

    /// Innermost named type reached through pointers and arrays
    pub fn innermost_name(&self) -> Option<&str> {
        match &self.ty {
            CType::Pointer(inner) | CType::Array(inner, _) => inner.innermost_name(),
            CType::Named(n) | CType::Struct(n) | CType::Union(n) | CType::Enum(n) => Some(n),
            _ => None,
        }
    }
}

fn base_from_specifiers(words: &[&str], is_const: bool, is_volatile: bool) -> QualType {
    let ty = match words {
        ["struct", tag, ..] => CType::Struct((*tag).to_string()),
        ["union", tag, ..] => CType::Union((*tag).to_string()),
        ["enum", tag, ..] => CType::Enum((*tag).to_string()),
        _ => {
            let joined = words.join(" ");
            match BuiltinType::from_name(&joined) {
                Some(b) => CType::Builtin(b),
                None if words.is_empty() => CType::Builtin(BuiltinType::Int),
                None => CType::Named(joined),
            }
        }
    };
    QualType {
        ty,
        is_const,
        is_volatile,
    }
}

fn split_array_suffix(text: &str) -> (&str, Vec<Option<u64>>) {
    let Some(first) = text.find('[') else {
        return (text, Vec::new());
    };
    let dims = text[first..]
        .split('[')
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end().trim_end_matches(']').trim().parse::<u64>().ok())
        .collect();
    (text[..first].trim_end(), dims)
}

impl fmt::Display for QualType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.is_const { "const " } else { "" };
        match &self.ty {
            CType::Builtin(b) => write!(f, "{prefix}{b}"),
            CType::Pointer(inner) => {
                write!(f, "{inner} *")?;
                if self.is_const {
                    write!(f, " const")?;
                }
                Ok(())
            }
            CType::Array(inner, Some(n)) => write!(f, "{inner}[{n}]"),
            CType::Array(inner, None) => write!(f, "{inner}[]"),
            CType::Struct(n) => write!(f, "{prefix}struct {n}"),
            CType::Union(n) => write!(f, "{prefix}union {n}"),
            CType::Enum(n) => write!(f, "{prefix}enum {n}"),
            CType::Named(n) => write!(f, "{prefix}{n}"),
            CType::FunctionPointer => write!(f, "void (*)()"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_spellings_normalize() {
        assert_eq!(
            BuiltinType::from_name("unsigned long int"),
            Some(BuiltinType::UnsignedLong)
        );
        assert_eq!(
            BuiltinType::from_name("long unsigned"),
            Some(BuiltinType::UnsignedLong)
        );
        assert_eq!(BuiltinType::from_name("signed"), Some(BuiltinType::Int));
        assert_eq!(
            BuiltinType::from_name("const long long int"),
            Some(BuiltinType::LongLong)
        );
        assert_eq!(BuiltinType::from_name("short int"), Some(BuiltinType::Short));
        assert_eq!(BuiltinType::from_name("uint8_t"), None);
        assert_eq!(BuiltinType::from_name("unsigned signed int"), None);
    }

    #[test]
    fn test_sizes_per_data_model() {
        let lp64 = TargetAbi::default();
        let llp64 = TargetAbi::new(DataModel::Llp64, 8);
        let ilp32 = TargetAbi::new(DataModel::Ilp32, 4);
        assert_eq!(BuiltinType::Long.size(&lp64), 8);
        assert_eq!(BuiltinType::Long.size(&llp64), 4);
        assert_eq!(ilp32.pointer_size(), 4);
        assert_eq!(BuiltinType::Double.alignment(&ilp32), 4);
    }

    #[test]
    fn test_int_ranges() {
        let abi = TargetAbi::default();
        assert_eq!(BuiltinType::UnsignedChar.int_range(&abi), Some((0, 255)));
        assert_eq!(BuiltinType::Short.int_range(&abi), Some((-32768, 32767)));
        assert_eq!(BuiltinType::Bool.int_range(&abi), Some((0, 1)));
        assert_eq!(BuiltinType::Double.int_range(&abi), None);
    }

    #[test]
    fn test_parse_pointer_qualifiers() {
        let t = QualType::parse("const unsigned char *");
        assert!(t.is_pointer_like());
        assert!(t.pointee_is_const());
        assert!(!t.is_const);

        let t = QualType::parse("char * const");
        assert!(t.is_const);
        assert!(!t.pointee_is_const());
    }

    #[test]
    fn test_parse_aggregates_and_arrays() {
        let t = QualType::parse("struct node *");
        assert_eq!(t.innermost_name(), Some("node"));
        assert_eq!(t.referenced_name(), None);

        let t = QualType::parse("int[4]");
        assert_eq!(
            t.ty,
            CType::Array(Box::new(QualType::plain(CType::Builtin(BuiltinType::Int))), Some(4))
        );

        let t = QualType::parse("uint8_t");
        assert_eq!(t.ty, CType::Named("uint8_t".into()));
    }
}
