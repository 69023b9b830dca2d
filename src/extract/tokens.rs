// src/extract/tokens.rs
//! Tokenizer and token-level helpers for the extractor.

use once_cell::sync::OnceCell;
use regex::Regex;

/// A single token with byte span and sequential index.
#[derive(Debug, Clone)]
pub struct Token {
    pub text: String,
    pub lower: String,
    pub start: usize,
    pub end: usize,
    pub index: usize,
}

impl Token {
    /// Starts uppercase and is not an acronym like "COO".
    pub fn is_capitalized(&self) -> bool {
        let mut chars = self.text.chars();
        let Some(first) = chars.next() else {
            return false;
        };
        if !first.is_uppercase() {
            return false;
        }
        let rest: Vec<char> = chars.filter(|c| c.is_alphabetic()).collect();
        rest.is_empty() || rest.iter().any(|c| c.is_lowercase())
    }

    pub fn is_initial(&self) -> bool {
        let mut chars = self.text.chars();
        matches!((chars.next(), chars.next()), (Some(c), None) if c.is_uppercase())
    }
}

/// Unicode word tokenizer; apostrophes inside a word are kept ("O'Brien").
pub fn tokenize(input: &str) -> Vec<Token> {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"(?u)\w+(?:['’]\w+)*").unwrap());
    re.find_iter(input)
        .enumerate()
        .map(|(i, m)| Token {
            text: m.as_str().to_string(),
            lower: m.as_str().to_lowercase(),
            start: m.start(),
            end: m.end(),
            index: i,
        })
        .collect()
}

/// True when only whitespace separates `a` and `b` (or an initial's period, or a hyphen).
pub fn joined(text: &str, a: &Token, b: &Token) -> bool {
    let gap = &text[a.end..b.start];
    let trimmed = gap.trim();
    trimmed.is_empty() || (trimmed == "." && a.is_initial()) || gap == "-"
}

/// Match a lowercase, space-separated phrase starting at token `at`.
pub fn phrase_at(tokens: &[Token], at: usize, phrase: &str) -> Option<usize> {
    let mut n = 0;
    for (i, word) in phrase.split(' ').enumerate() {
        let t = tokens.get(at + i)?;
        if t.lower != word {
            return None;
        }
        n += 1;
    }
    Some(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_with_spans() {
        let toks = tokenize("Pilgrim's Pride names Sean O'Brien, CFO.");
        let words: Vec<&str> = toks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(words, ["Pilgrim's", "Pride", "names", "Sean", "O'Brien", "CFO"]);
        assert_eq!(toks[3].start, 22);
        assert!(toks[3].is_capitalized());
        assert!(!toks[5].is_capitalized());
    }

    #[test]
    fn punctuation_breaks_joins() {
        let text = "Smith, CEO and John A. Doe";
        let t = tokenize(text);
        assert!(!joined(text, &t[0], &t[1]));
        assert!(joined(text, &t[3], &t[4]));
        assert!(joined(text, &t[4], &t[5]));
    }

    #[test]
    fn phrase_matching() {
        let t = tokenize("Jane Smith steps down as CFO");
        assert_eq!(phrase_at(&t, 2, "steps down"), Some(2));
        assert_eq!(phrase_at(&t, 2, "steps up"), None);
        assert_eq!(phrase_at(&t, 5, "cfo now"), None);
    }
}
