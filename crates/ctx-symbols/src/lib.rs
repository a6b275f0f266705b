// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Regex and line-scan symbol, region, import, and call extraction.
//!
//! Deliberately not AST-aware: every language rule here is a line-pattern
//! match plus a brace- or indentation-balance span scan. Good enough to
//! locate definitions and rough call sites; not a compiler front end.

mod calls;
mod go;
mod python;
mod tsjs;

pub use calls::{build_symbol_index, extract_calls};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A detected source language. `Other` covers unsupported or data/text
/// files, which always extract nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    /// Go.
    Go,
    /// TypeScript (including `.tsx`).
    TypeScript,
    /// JavaScript (including `.jsx`, `.mjs`, `.cjs`).
    JavaScript,
    /// Python.
    Python,
    /// Rust.
    Rust,
    /// Java.
    Java,
    /// Ruby.
    Ruby,
    /// C.
    C,
    /// C++.
    Cpp,
    /// C#.
    CSharp,
    /// Swift.
    Swift,
    /// Kotlin.
    Kotlin,
    /// Anything else: detected for classification but never extracted.
    Other,
}

/// Classify a file's language from its path extension.
#[must_use]
pub fn detect_language(path: &str) -> Language {
    let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "go" => Language::Go,
        "ts" | "tsx" => Language::TypeScript,
        "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
        "py" => Language::Python,
        "rs" => Language::Rust,
        "java" => Language::Java,
        "rb" => Language::Ruby,
        "c" | "h" => Language::C,
        "cpp" | "cc" | "cxx" | "hpp" | "hxx" => Language::Cpp,
        "cs" => Language::CSharp,
        "swift" => Language::Swift,
        "kt" | "kts" => Language::Kotlin,
        _ => Language::Other,
    }
}

/// Whether a symbol is exported/public or private to its defining scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Exported/public.
    Public,
    /// Unexported/private.
    Private,
}

/// What kind of definition a [`Symbol`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    /// A free function.
    Function,
    /// A method bound to a receiver or class.
    Method,
    /// A struct type.
    Struct,
    /// An interface type.
    Interface,
    /// A class type.
    Class,
    /// A type alias.
    Type,
    /// A top-level constant.
    Const,
    /// A top-level variable.
    Var,
}

impl SymbolKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Struct => "struct",
            Self::Interface => "interface",
            Self::Class => "class",
            Self::Type => "type",
            Self::Const => "const",
            Self::Var => "var",
        }
    }
}

/// A contiguous source span, e.g. the body of a function definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Region {
    /// Owning file's path-id.
    pub path_id: String,
    /// Derived region identifier.
    pub region_id: String,
    /// 1-based start line.
    pub start_line: u32,
    /// 0-based start column.
    pub start_col: u32,
    /// 1-based end line (inclusive).
    pub end_line: u32,
    /// 0-based end column.
    pub end_col: u32,
    /// What this region is for, e.g. `"definition"`.
    pub purpose: String,
    /// Content hash of the region's source text.
    pub region_hash: String,
}

/// A symbol definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Symbol {
    /// Owning file's path-id.
    pub path_id: String,
    /// Derived symbol identifier.
    pub symbol_id: String,
    /// Identifier of the symbol's definition region.
    pub region_id: String,
    /// What kind of definition this is.
    pub kind: SymbolKind,
    /// Bare name.
    pub name: String,
    /// Fully qualified name (e.g. `Receiver.Method`).
    pub fqn: String,
    /// Exported/public vs. unexported/private.
    pub visibility: Visibility,
    /// Detected language.
    pub language: Language,
    /// Best-effort signature text.
    pub signature: String,
    /// A one-line docstring preview, if one was found immediately after
    /// the definition header.
    pub docstring: Option<String>,
}

/// An import edge: internal if it resolves to a known path in this
/// commit's path map, external otherwise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportEdge {
    /// The importing file's path-id.
    pub from_path_id: String,
    /// The imported file's path-id, if resolved internally.
    pub to_path_id: Option<String>,
    /// The imported module's external name, if not resolved internally.
    pub to_external_module: Option<String>,
}

/// A call edge: internal if the callee is a known symbol in this commit,
/// external otherwise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallEdge {
    /// The calling symbol's id.
    pub from_symbol_id: String,
    /// The called symbol's id, if it resolved to a known symbol.
    pub to_symbol_id: Option<String>,
    /// The called name, if it did not resolve to a known symbol.
    pub to_external_ref: Option<String>,
    /// Confidence in [0, 1]: 0.8 for a resolved internal call, 0.5
    /// otherwise.
    pub confidence: f64,
}

/// Everything extracted from one file's content at one commit.
#[derive(Debug, Clone, Default)]
pub struct FileExtraction {
    /// Symbols defined in this file.
    pub symbols: Vec<Symbol>,
    /// Their definition regions.
    pub regions: Vec<Region>,
    /// Import edges originating from this file.
    pub imports: Vec<ImportEdge>,
}

/// Extract symbols, regions, and imports from one file's content.
///
/// `resolve_import` maps a raw relative/module specifier to an internal
/// path-id, or `None` if it does not resolve to a known path in this
/// commit (in which case the import is recorded as external).
pub fn extract_file(
    path_id: &str,
    path: &str,
    content: &str,
    resolve_import: &dyn Fn(&str) -> Option<String>,
) -> FileExtraction {
    match detect_language(path) {
        Language::Go => go::extract(path_id, content),
        Language::TypeScript | Language::JavaScript => {
            tsjs::extract(path_id, path, content, resolve_import)
        }
        Language::Python => python::extract(path_id, content),
        _ => FileExtraction::default(),
    }
}

/// Derive a 128-bit identifier from colon-joined parts, returned as 32
/// lowercase hex characters.
#[must_use]
pub fn derive_id(parts: &[&str]) -> String {
    let joined = parts.join(":");
    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}

mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        let mut s = String::with_capacity(bytes.len() * 2);
        for b in bytes {
            s.push_str(&format!("{b:02x}"));
        }
        s
    }
}

pub(crate) fn symbol_id(path_id: &str, kind: SymbolKind, name: &str) -> String {
    derive_id(&[path_id, kind.as_str(), name])
}

pub(crate) fn region_id(path_id: &str, start_line: u32, end_line: u32) -> String {
    derive_id(&[path_id, &start_line.to_string(), &end_line.to_string()])
}

pub(crate) fn content_hash(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Scan forward from `start_idx` (0-based, the line containing the first
/// `{`) until braces balance back to zero. Returns the 0-based index of
/// the closing line. Not comment/string aware — a reasonable approximation
/// for a non-AST extractor.
pub(crate) fn brace_balance_span(lines: &[&str], start_idx: usize) -> usize {
    let mut balance = 0i32;
    let mut opened = false;
    for (i, line) in lines.iter().enumerate().skip(start_idx) {
        for ch in line.chars() {
            match ch {
                '{' => {
                    balance += 1;
                    opened = true;
                }
                '}' => balance -= 1,
                _ => {}
            }
        }
        if opened && balance <= 0 {
            return i;
        }
    }
    lines.len().saturating_sub(1)
}

pub(crate) fn indent_of(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ' || *c == '\t').count()
}

/// Scan forward from `start_idx + 1` until a non-blank line with
/// indentation ≤ `header_indent`. Returns the 0-based index of the line
/// just before that (or the file's last line).
pub(crate) fn indent_block_span(lines: &[&str], start_idx: usize, header_indent: usize) -> usize {
    let mut end = start_idx;
    for (i, line) in lines.iter().enumerate().skip(start_idx + 1) {
        if line.trim().is_empty() {
            end = i;
            continue;
        }
        if indent_of(line) <= header_indent {
            return end;
        }
        end = i;
    }
    end
}
