//! File and symbol relevance scoring.

use ctx_symbols::{Language, SymbolKind, Visibility};

const RELEVANT_LANGUAGES: &[Language] =
    &[Language::Go, Language::TypeScript, Language::JavaScript, Language::Python, Language::Rust, Language::Java];

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn directory_depth(path: &str) -> usize {
    path.matches('/').count()
}

fn matches_entry_point(base: &str) -> bool {
    base.contains("main.") || base.contains("index.") || base.contains("app.")
}

/// Score a file candidate against the task's tokenized words.
#[must_use]
pub fn score_file(path: &str, language: Language, task_words: &[String]) -> f64 {
    let mut score = 0.0;

    if RELEVANT_LANGUAGES.contains(&language) {
        score += 0.5;
    }

    let lowered = path.to_lowercase();
    for word in task_words {
        if lowered.contains(word.as_str()) {
            score += 2.0;
        }
    }

    if matches_entry_point(basename(&lowered)) {
        score += 0.5;
    }

    let depth = directory_depth(path);
    if depth > 3 {
        score -= 0.1 * (depth - 3) as f64;
    }

    score
}

/// Whether `path` looks like a test file.
#[must_use]
pub fn is_test_path(path: &str) -> bool {
    let lowered = path.to_lowercase();
    const MARKERS: &[&str] = &["_test.", ".test.", ".spec.", "__tests__/", "test/", "tests/"];
    MARKERS.iter().any(|m| lowered.contains(m))
}

/// Estimate tokens for a file's raw byte size.
#[must_use]
pub fn tokens_for_bytes(byte_size: u64) -> u32 {
    ((byte_size as f64) * 0.25).floor().max(1.0) as u32
}

/// Estimate tokens for a symbol's signature plus docstring text.
#[must_use]
pub fn tokens_for_symbol_text(signature: &str, docstring: Option<&str>) -> u32 {
    let bytes = signature.len() + docstring.map_or(0, str::len);
    (((bytes as f64) * 0.25).floor() as u32).max(10)
}

/// Score a symbol against the task's tokenized words.
#[must_use]
pub fn score_symbol(kind: SymbolKind, visibility: Visibility, name: &str, fqn: &str, task_words: &[String]) -> f64 {
    let mut score = 0.0;

    if visibility == Visibility::Public {
        score += 1.0;
    }
    if matches!(kind, SymbolKind::Function | SymbolKind::Method) {
        score += 0.5;
    }

    let lowered_name = name.to_lowercase();
    let lowered_fqn = fqn.to_lowercase();
    for word in task_words {
        if lowered_name.contains(word.as_str()) || lowered_fqn.contains(word.as_str()) {
            score += 2.0;
        }
    }

    score
}

/// The `task-relevant-<kind>` reason label for an admitted symbol.
#[must_use]
pub fn symbol_kind_label(kind: SymbolKind) -> &'static str {
    match kind {
        SymbolKind::Function => "function",
        SymbolKind::Method => "method",
        SymbolKind::Struct => "struct",
        SymbolKind::Interface => "interface",
        SymbolKind::Class => "class",
        SymbolKind::Type => "type",
        SymbolKind::Const => "const",
        SymbolKind::Var => "var",
    }
}
