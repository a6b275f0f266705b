//! Python symbol and import extraction.

use crate::{
    content_hash, indent_block_span, indent_of, region_id, symbol_id, FileExtraction, ImportEdge,
    Language, Region, Symbol, SymbolKind, Visibility,
};
use once_cell::sync::Lazy;
use regex::Regex;

static DEF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^def\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(([^)]*)\)").unwrap());
static CLASS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^class\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap());
static IMPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^import\s+([A-Za-z_][\w.]*)").unwrap());
static FROM_IMPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^from\s+([A-Za-z_][\w.]*)\s+import\s+").unwrap());

fn visibility_for(name: &str) -> Visibility {
    if name.starts_with('_') {
        Visibility::Private
    } else {
        Visibility::Public
    }
}

/// Extract Python symbols, regions, and imports from `content`.
pub fn extract(path_id: &str, content: &str) -> FileExtraction {
    let lines: Vec<&str> = content.lines().collect();
    let mut out = FileExtraction::default();
    let mut current_class: Option<(String, usize)> = None;

    for (i, line) in lines.iter().enumerate() {
        let indent = indent_of(line);
        let trimmed = line.trim_start();

        if let Some((_, class_indent)) = &current_class {
            if !trimmed.is_empty() && indent <= *class_indent {
                current_class = None;
            }
        }

        if let Some(c) = IMPORT.captures(trimmed) {
            out.imports.push(ImportEdge {
                from_path_id: path_id.to_string(),
                to_path_id: None,
                to_external_module: Some(c[1].to_string()),
            });
            continue;
        }
        if let Some(c) = FROM_IMPORT.captures(trimmed) {
            out.imports.push(ImportEdge {
                from_path_id: path_id.to_string(),
                to_path_id: None,
                to_external_module: Some(c[1].to_string()),
            });
            continue;
        }

        if let Some(c) = CLASS.captures(trimmed) {
            let name = c[1].to_string();
            push_symbol(&mut out, &lines, path_id, i, indent, SymbolKind::Class, &name, &name, visibility_for(&name), trimmed);
            current_class = Some((name, indent));
            continue;
        }

        if let Some(c) = DEF.captures(trimmed) {
            let name = c[1].to_string();
            let kind = if indent > 0 { SymbolKind::Method } else { SymbolKind::Function };
            let fqn = match (&current_class, kind) {
                (Some((class_name, _)), SymbolKind::Method) => format!("{class_name}.{name}"),
                _ => name.clone(),
            };
            let signature = format!("def {name}({})", &c[2]);
            push_symbol(&mut out, &lines, path_id, i, indent, kind, &name, &fqn, visibility_for(&name), &signature);
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
    header_indent: usize,
    kind: SymbolKind,
    name: &str,
    fqn: &str,
    visibility: Visibility,
    signature: &str,
) {
    let end_idx = indent_block_span(lines, start_idx, header_indent);
    let start_line = (start_idx + 1) as u32;
    let end_line = (end_idx + 1) as u32;
    let rid = region_id(path_id, start_line, end_line);
    let body = lines[start_idx..=end_idx].join("\n");

    let docstring = lines[start_idx + 1..=end_idx]
        .iter()
        .find(|l| !l.trim().is_empty())
        .and_then(|l| {
            let t = l.trim();
            if t.starts_with("\"\"\"") || t.starts_with("'''") {
                Some(t.trim_matches(|c| c == '"' || c == '\'').to_string())
            } else {
                None
            }
        });

    out.regions.push(Region {
        path_id: path_id.to_string(),
        region_id: rid.clone(),
        start_line,
        start_col: header_indent as u32,
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
        language: Language::Python,
        signature: signature.to_string(),
        docstring,
    });
}
