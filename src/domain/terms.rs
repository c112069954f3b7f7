//! Candidate medical term extraction from OCR text

use crate::domain::models::TermDefinition;
use std::collections::HashSet;

/// Candidates taken from a single document
pub const MAX_CANDIDATES: usize = 30;

/// Candidates sent to a knowledge lookup
pub const MAX_LOOKUP_TERMS: usize = 20;

const TRIM_CHARS: &[char] = &[' ', ',', '.', ':', ';', '(', ')', '[', ']', '{', '}', '"', '\''];

fn clean(word: &str) -> String {
    word.trim_matches(TRIM_CHARS).to_lowercase()
}

/// Lowercased words longer than three characters, first appearance wins
pub fn candidate_terms(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.split_whitespace()
        .filter(|word| word.chars().count() > 3)
        .map(clean)
        .filter(|word| !word.is_empty() && seen.insert(word.clone()))
        .take(MAX_CANDIDATES)
        .collect()
}

/// Narrows candidates to what a lookup query should carry
pub fn lookup_terms(candidates: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .map(|term| clean(term))
        .filter(|term| term.chars().count() >= 3 && seen.insert(term.clone()))
        .take(MAX_LOOKUP_TERMS)
        .collect()
}

/// Escape character paired with [`contains_pattern`] in `LIKE ... ESCAPE '!'`
pub const LIKE_ESCAPE: char = '!';

/// `%term%` with `%`, `_` and the escape character matched literally
pub fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_') || c == LIKE_ESCAPE {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Renders lookup rows as `term: definition` lines for the prompt
pub fn render_snippets(definitions: &[TermDefinition]) -> String {
    definitions
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
