//! Go symbol and import extraction.

use crate::{
    brace_balance_span, content_hash, region_id, symbol_id, FileExtraction, ImportEdge, Language,
    Region, Symbol, SymbolKind, Visibility,
};
use once_cell::sync::Lazy;
use regex::Regex;

static FUNC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^func\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(([^)]*)\)\s*([^{]*)\{?").unwrap());
static METHOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^func\s+\(([^)]*)\)\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(([^)]*)\)\s*([^{]*)\{?").unwrap()
});
static TYPE_STRUCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^type\s+([A-Za-z_][A-Za-z0-9_]*)\s+struct\s*\{").unwrap());
static TYPE_IFACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^type\s+([A-Za-z_][A-Za-z0-9_]*)\s+interface\s*\{").unwrap());
static TOP_CONST: Lazy<Regex> = Lazy::new(|| Regex::new(r"^const\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap());
static TOP_VAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^var\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap());
static IMPORT_SINGLE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^import\s+"([^"]+)"#).unwrap());
static IMPORT_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^\s*(?:[A-Za-z_][A-Za-z0-9_]*\s+)?"([^"]+)"\s*$"#).unwrap());

fn exported(name: &str) -> Visibility {
    match name.chars().next() {
        Some(c) if c.is_uppercase() => Visibility::Public,
        _ => Visibility::Private,
    }
}

/// Extract Go symbols, regions, and imports from `content`.
pub fn extract(path_id: &str, content: &str) -> FileExtraction {
    let lines: Vec<&str> = content.lines().collect();
    let mut out = FileExtraction::default();
    let mut in_import_block = false;

    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();

        if in_import_block {
            if trimmed.starts_with(')') {
                in_import_block = false;
                continue;
            }
            if let Some(c) = IMPORT_LINE.captures(trimmed) {
                out.imports.push(ImportEdge {
                    from_path_id: path_id.to_string(),
                    to_path_id: None,
                    to_external_module: Some(c[1].to_string()),
                });
            }
            continue;
        }
        if trimmed == "import (" {
            in_import_block = true;
            continue;
        }
        if let Some(c) = IMPORT_SINGLE.captures(trimmed) {
            out.imports.push(ImportEdge {
                from_path_id: path_id.to_string(),
                to_path_id: None,
                to_external_module: Some(c[1].to_string()),
            });
            continue;
        }

        if let Some(c) = METHOD.captures(trimmed) {
            let receiver = c[1].trim();
            let recv_type = receiver
                .rsplit(' ')
                .next()
                .unwrap_or(receiver)
                .trim_start_matches('*');
            let name = &c[2];
            let signature = format!("func ({receiver}) {name}({}) {}", &c[3], c[4].trim());
            push_symbol(
                &mut out, &lines, path_id, i, SymbolKind::Method, name,
                &format!("{recv_type}.{name}"), exported(name), &signature,
            );
        } else if let Some(c) = FUNC.captures(trimmed) {
            let name = &c[1];
            let signature = format!("func {name}({}) {}", &c[2], c[3].trim());
            push_symbol(&mut out, &lines, path_id, i, SymbolKind::Function, name, name, exported(name), &signature);
        } else if let Some(c) = TYPE_STRUCT.captures(trimmed) {
            let name = &c[1];
            push_symbol(&mut out, &lines, path_id, i, SymbolKind::Struct, name, name, exported(name), trimmed);
        } else if let Some(c) = TYPE_IFACE.captures(trimmed) {
            let name = &c[1];
            push_symbol(&mut out, &lines, path_id, i, SymbolKind::Interface, name, name, exported(name), trimmed);
        } else if let Some(c) = TOP_CONST.captures(trimmed) {
            let name = &c[1];
            push_leaf_symbol(&mut out, path_id, i, SymbolKind::Const, name, exported(name), trimmed);
        } else if let Some(c) = TOP_VAR.captures(trimmed) {
            let name = &c[1];
            push_leaf_symbol(&mut out, path_id, i, SymbolKind::Var, name, exported(name), trimmed);
        }
    }

    out
}

#[allow(clippy::too_many_arguments)]
fn push_symbol(
    out: &mut FileExtraction,
    lines: &[&str],
    path_id: &str,
    start_idx: usize,
    kind: SymbolKind,
    name: &str,
    fqn: &str,
    visibility: Visibility,
    signature: &str,
) {
    let end_idx = brace_balance_span(lines, start_idx);
    let start_line = (start_idx + 1) as u32;
    let end_line = (end_idx + 1) as u32;
    let rid = region_id(path_id, start_line, end_line);
    let body = lines[start_idx..=end_idx].join("\n");
    out.regions.push(Region {
        path_id: path_id.to_string(),
        region_id: rid.clone(),
        start_line,
        start_col: 0,
        end_line,
        end_col: lines[end_idx].len() as u32,
        purpose: "definition".to_string(),
        region_hash: content_hash(&body),
    });
    out.symbols.push(Symbol {
        path_id: path_id.to_string(),
        symbol_id: symbol_id(path_id, kind, name),
        region_id: rid,
        kind,
        name: name.to_string(),
        fqn: fqn.to_string(),
        visibility,
        language: Language::Go,
        signature: signature.to_string(),
        docstring: None,
    });
}

#[allow(clippy::too_many_arguments)]
fn push_leaf_symbol(
    out: &mut FileExtraction,
    path_id: &str,
    idx: usize,
    kind: SymbolKind,
    name: &str,
    visibility: Visibility,
    signature: &str,
) {
    let line = (idx + 1) as u32;
    let rid = region_id(path_id, line, line);
    out.regions.push(Region {
        path_id: path_id.to_string(),
        region_id: rid.clone(),
        start_line: line,
        start_col: 0,
        end_line: line,
        end_col: signature.len() as u32,
        purpose: "definition".to_string(),
        region_hash: content_hash(signature),
    });
    out.symbols.push(Symbol {
        path_id: path_id.to_string(),
        symbol_id: symbol_id(path_id, kind, name),
        region_id: rid,
        kind,
        name: name.to_string(),
        fqn: name.to_string(),
        visibility,
        language: Language::Go,
        signature: signature.to_string(),
        docstring: None,
    });
}
