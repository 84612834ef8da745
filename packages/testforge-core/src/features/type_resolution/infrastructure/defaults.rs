//! Built-in typedef defaults and name-based inference

/// Aliases every session starts with: fixed-width embedded names,
/// Windows-style names and the C99 `<stdint.h>`/`<stddef.h>` set.
pub const DEFAULT_TYPEDEFS: &[(&str, &str)] = &[
    ("UINT8", "unsigned char"),
    ("UINT16", "unsigned short"),
    ("UINT32", "unsigned int"),
    ("UINT64", "unsigned long long"),
    ("INT8", "signed char"),
    ("INT16", "short"),
    ("INT32", "int"),
    ("INT64", "long long"),
    ("BYTE", "unsigned char"),
    ("WORD", "unsigned short"),
    ("DWORD", "unsigned int"),
    ("QWORD", "unsigned long long"),
    ("BOOL", "int"),
    ("uint8_t", "unsigned char"),
    ("uint16_t", "unsigned short"),
    ("uint32_t", "unsigned int"),
    ("uint64_t", "unsigned long long"),
    ("int8_t", "signed char"),
    ("int16_t", "short"),
    ("int32_t", "int"),
    ("int64_t", "long long"),
    ("size_t", "unsigned long"),
    ("ssize_t", "long"),
    ("ptrdiff_t", "long"),
    ("intptr_t", "long"),
    ("uintptr_t", "unsigned long"),
];

/// `BOOL` is an `int` that only ever holds 0 or 1.
pub const BOOLEAN_ALIASES: &[&str] = &["BOOL"];

/// Guess a base type from naming conventions (`UINT16`, `u32`, `int8_t`).
pub fn infer_base_type(user_type: &str) -> Option<&'static str> {
    let upper = user_type.to_ascii_uppercase();
    let stem = upper.trim_end_matches("_T");

    let width = ["64", "32", "16", "8"]
        .into_iter()
        .find(|w| stem.ends_with(w));

    let unsigned = stem.starts_with("UINT") || (stem.starts_with('U') && stem.len() <= 3);
    let signed = stem.starts_with("INT")
        || stem.starts_with("SINT")
        || (stem.starts_with('S') && stem.len() <= 3)
        || (stem.starts_with('I') && stem.len() <= 3);

    if let Some(w) = width {
        if unsigned {
            return Some(match w {
                "8" => "unsigned char",
                "16" => "unsigned short",
                "32" => "unsigned int",
                _ => "unsigned long long",
            });
        }
        if signed {
            return Some(match w {
                "8" => "signed char",
                "16" => "short",
                "32" => "int",
                _ => "long long",
            });
        }
        if stem.starts_with("FLOAT") || stem.starts_with("REAL") || stem.starts_with('F') {
            return match w {
                "32" => Some("float"),
                "64" => Some("double"),
                _ => None,
            };
        }
    }

    match stem {
        "BYTE" => Some("unsigned char"),
        "WORD" => Some("unsigned short"),
        "DWORD" => Some("unsigned int"),
        "QWORD" => Some("unsigned long long"),
        "BOOL" | "BOOLEAN" => Some("int"),
        _ => None,
    }
}
