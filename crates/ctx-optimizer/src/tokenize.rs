//! Task-string tokenization for relevance scoring.

const MIN_WORD_LEN: usize = 3;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "to", "in", "of", "for", "is", "it", "on", "at", "by", "with",
    "from", "this", "that", "be", "as", "add", "fix", "update", "implement",
];

fn is_separator(c: char) -> bool {
    c.is_whitespace() || " ,.;:-_/'\"".contains(c)
}

/// Lowercase, split on whitespace/punctuation, drop short and stop words.
#[must_use]
pub fn tokenize(task: &str) -> Vec<String> {
    task.to_lowercase()
        .split(is_separator)
        .filter(|w| w.len() >= MIN_WORD_LEN)
        .filter(|w| !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}
