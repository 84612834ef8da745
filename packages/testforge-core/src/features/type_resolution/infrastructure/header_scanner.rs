//! Header scanning for simple `typedef` declarations
//!
//! Only scalar and pointer aliases are discovered here. Aggregate typedefs
//! (`typedef struct {...} t;`) arrive through the entity model instead.

use once_cell::sync::Lazy;
use regex::Regex;

static BLOCK_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("static regex"));
static LINE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"//[^\n]*").expect("static regex"));
static SIMPLE_TYPEDEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"typedef\s+([^;{}()]+?)\s*(\*+)?\s*\b([A-Za-z_]\w*)\s*;").expect("static regex")
});

/// One discovered `typedef <base> <alias>;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedTypedef {
    pub alias: String,
    pub base_type: String,
    pub line: u32,
}

/// Extract simple typedefs from header text, in source order.
pub fn scan_header(text: &str) -> Vec<ScannedTypedef> {
    let without_blocks = BLOCK_COMMENT.replace_all(text, |caps: &regex::Captures| {
        // Keep line numbering stable
        "\n".repeat(caps[0].matches('\n').count())
    });
    let cleaned = LINE_COMMENT.replace_all(&without_blocks, "");

    SIMPLE_TYPEDEF
        .captures_iter(&cleaned)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let mut base = normalize_spaces(caps.get(1)?.as_str());
            if let Some(stars) = caps.get(2) {
                base.push(' ');
                base.push_str(stars.as_str());
            }
            let alias = caps.get(3)?.as_str().to_string();
            if base.is_empty() || base == alias {
                return None;
            }
            let line = cleaned[..whole.start()].matches('\n').count() as u32 + 1;
            Some(ScannedTypedef {
                alias,
                base_type: base,
                line,
            })
        })
        .collect()
}

fn normalize_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
