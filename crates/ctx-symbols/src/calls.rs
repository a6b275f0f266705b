//! Call-edge extraction over a caller symbol's source region.

use crate::{CallEdge, Symbol};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

static CALL: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Za-z_][A-Za-z0-9_.]*)\s*\(").unwrap());

static KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // control flow, common across go/ts/js/python
        "if", "else", "elif", "for", "while", "switch", "case", "default", "return", "break",
        "continue", "goto", "try", "catch", "except", "finally", "raise", "throw", "yield",
        "with", "defer", "select", "range",
        // declarations
        "func", "function", "def", "class", "struct", "interface", "type", "package", "import",
        "from", "export", "const", "let", "var", "new", "lambda", "async", "await",
        // builtins worth ignoring as call targets
        "len", "str", "int", "list", "dict", "set", "tuple", "print", "isinstance", "super",
        "typeof", "instanceof", "console", "require",
    ]
    .into_iter()
    .collect()
});

/// Build a name → symbol-id index from every symbol discovered in a
/// commit, indexing both the fully qualified name and, for dotted FQNs,
/// the short form after the last `.`.
#[must_use]
pub fn build_symbol_index(symbols: &[Symbol]) -> HashMap<String, String> {
    let mut index = HashMap::new();
    for symbol in symbols {
        index.entry(symbol.fqn.clone()).or_insert_with(|| symbol.symbol_id.clone());
        if let Some((_, short)) = symbol.fqn.rsplit_once('.') {
            index.entry(short.to_string()).or_insert_with(|| symbol.symbol_id.clone());
        }
    }
    index
}

/// Scan `region_text` (the caller's own source span) for call sites,
/// resolving each callee name against `symbol_index`.
#[must_use]
pub fn extract_calls(caller: &Symbol, region_text: &str, symbol_index: &HashMap<String, String>) -> Vec<CallEdge> {
    let mut seen = HashSet::new();
    let mut edges = Vec::new();

    for cap in CALL.captures_iter(region_text) {
        let full = &cap[1];
        let short = full.rsplit('.').next().unwrap_or(full);

        if KEYWORDS.contains(short) || short == caller.name {
            continue;
        }

        let resolved = symbol_index.get(full).or_else(|| symbol_index.get(short));
        let (to_symbol_id, to_external_ref, confidence) = match resolved {
            Some(id) => (Some(id.clone()), None, 0.8),
            None => (None, Some(short.to_string()), 0.5),
        };

        let dedup_key = to_symbol_id.clone().unwrap_or_else(|| format!("ext:{short}"));
        if !seen.insert(dedup_key) {
            continue;
        }

        edges.push(CallEdge {
            from_symbol_id: caller.symbol_id.clone(),
            to_symbol_id,
            to_external_ref,
            confidence,
        });
    }

    edges
}
