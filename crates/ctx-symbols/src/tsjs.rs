//! TypeScript/JavaScript symbol and import extraction.

use crate::{
    brace_balance_span, content_hash, region_id, symbol_id, FileExtraction, ImportEdge, Language,
    Region, Symbol, SymbolKind, Visibility,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static FUNCTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(export\s+)?(default\s+)?function\s*\*?\s+([A-Za-z_$][\w$]*)\s*\(([^)]*)\)").unwrap());
static ARROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(export\s+)?(const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*(?:async\s*)?\(([^)]*)\)\s*(?::[^=]+)?=>").unwrap()
});
static CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(export\s+)?(default\s+)?class\s+([A-Za-z_$][\w$]*)").unwrap());
static INTERFACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(export\s+)?interface\s+([A-Za-z_$][\w$]*)").unwrap());
static TYPE_ALIAS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(export\s+)?type\s+([A-Za-z_$][\w$]*)\s*=").unwrap());

static IMPORT_FROM: Lazy<Regex> = Lazy::new(|| Regex::new(r#"import\s+.*?\s+from\s+['"]([^'"]+)['"]"#).unwrap());
static IMPORT_SIDE_EFFECT: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^\s*import\s+['"]([^'"]+)['"]"#).unwrap());
static REQUIRE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"require\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap());
static DYNAMIC_IMPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r#"import\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap());

const RELATIVE_SUFFIXES: &[&str] = &["", ".ts", ".tsx", ".js", ".jsx", "/index.ts", "/index.js"];

fn visibility_for(exported: bool) -> Visibility {
    if exported {
        Visibility::Public
    } else {
        Visibility::Private
    }
}

fn dir_of(path: &str) -> Vec<String> {
    let mut segments: Vec<String> = path.split('/').map(str::to_string).collect();
    segments.pop();
    segments
}

fn resolve_relative(base_dir: &[String], spec: &str) -> String {
    let mut segments = base_dir.to_vec();
    for part in spec.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other.to_string()),
        }
    }
    segments.join("/")
}

/// Extract TS/JS symbols, regions, and imports from `content`.
pub fn extract(path_id: &str, path: &str, content: &str, resolve_import: &dyn Fn(&str) -> Option<String>) -> FileExtraction {
    let lines: Vec<&str> = content.lines().collect();
    let mut out = FileExtraction::default();
    let base_dir = dir_of(path);
    let mut seen_modules = BTreeSet::new();

    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        let exported = trimmed.starts_with("export");

        if let Some(c) = FUNCTION.captures(trimmed) {
            let name = c[3].to_string();
            let signature = format!("function {name}({})", &c[4]);
            push_symbol(&mut out, &lines, path_id, i, SymbolKind::Function, &name, &name, visibility_for(exported), &signature);
        } else if let Some(c) = ARROW.captures(trimmed) {
            let name = c[3].to_string();
            let signature = format!("{name} = ({}) => ...", &c[4]);
            push_symbol(&mut out, &lines, path_id, i, SymbolKind::Function, &name, &name, visibility_for(exported), &signature);
        } else if let Some(c) = CLASS.captures(trimmed) {
            let name = c[3].to_string();
            push_symbol(&mut out, &lines, path_id, i, SymbolKind::Class, &name, &name, visibility_for(exported), trimmed);
        } else if let Some(c) = INTERFACE.captures(trimmed) {
            let name = c[2].to_string();
            push_symbol(&mut out, &lines, path_id, i, SymbolKind::Interface, &name, &name, visibility_for(exported), trimmed);
        } else if let Some(c) = TYPE_ALIAS.captures(trimmed) {
            let name = c[2].to_string();
            push_leaf_symbol(&mut out, path_id, i, SymbolKind::Type, &name, visibility_for(exported), trimmed);
        }

        for m in IMPORT_FROM.captures_iter(line) {
            seen_modules.insert(m[1].to_string());
        }
        if let Some(c) = IMPORT_SIDE_EFFECT.captures(line) {
            seen_modules.insert(c[1].to_string());
        }
        for m in REQUIRE.captures_iter(line) {
            seen_modules.insert(m[1].to_string());
        }
        for m in DYNAMIC_IMPORT.captures_iter(line) {
            seen_modules.insert(m[1].to_string());
        }
    }

    for module in seen_modules {
        let resolved = if module.starts_with('.') {
            RELATIVE_SUFFIXES.iter().find_map(|suffix| {
                let candidate = format!("{}{suffix}", resolve_relative(&base_dir, &module));
                resolve_import(&candidate)
            })
        } else {
            None
        };
        match resolved {
            Some(to_path_id) => out.imports.push(ImportEdge {
                from_path_id: path_id.to_string(),
                to_path_id: Some(to_path_id),
                to_external_module: None,
            }),
            None => out.imports.push(ImportEdge {
                from_path_id: path_id.to_string(),
                to_path_id: None,
                to_external_module: Some(module),
            }),
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
        language: Language::TypeScript,
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
        language: Language::TypeScript,
        signature: signature.to_string(),
        docstring: None,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_resolve(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn extracts_function_class_and_arrow() {
        let src = "export function add(a, b) {\n  return a + b;\n}\n\nconst mul = (a, b) => {\n  return a * b;\n};\n\nclass Widget {\n  render() {}\n}\n";
        let out = extract("p1", "src/app.ts", src, &no_resolve);
        let names: Vec<_> = out.symbols.iter().map(|s| s.name.as_str()).collect();
        assert!(names.contains(&"add"));
        assert!(names.contains(&"mul"));
        assert!(names.contains(&"Widget"));
        let add = out.symbols.iter().find(|s| s.name == "add").unwrap();
        assert_eq!(add.visibility, Visibility::Public);
        let mul = out.symbols.iter().find(|s| s.name == "mul").unwrap();
        assert_eq!(mul.visibility, Visibility::Private);
    }

    #[test]
    fn dedups_imports() {
        let src = "import { a } from 'left-pad';\nimport { b } from 'left-pad';\nconst c = require('left-pad');\n";
        let out = extract("p1", "src/app.ts", src, &no_resolve);
        assert_eq!(out.imports.len(), 1);
        assert_eq!(out.imports[0].to_external_module.as_deref(), Some("left-pad"));
    }

    #[test]
    fn resolves_relative_imports_internally() {
        let src = "import { helper } from '../lib/helper';\n";
        let resolve = |candidate: &str| -> Option<String> {
            if candidate == "src/lib/helper" {
                Some("path-id-helper".to_string())
            } else {
                None
            }
        };
        let out = extract("p1", "src/app/main.ts", src, &resolve);
        assert_eq!(out.imports[0].to_path_id.as_deref(), Some("path-id-helper"));
    }
}
