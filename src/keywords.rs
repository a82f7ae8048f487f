//! # Keyword Extractor (C3)
//!
//! Produces a small bag of salient lowercase tokens used both as a chunk's
//! sparse signature and as the query-side signature the hybrid index
//! correlates against it.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

const MAX_KEYWORDS: usize = 20;
/// Tokens of length <= this are dropped.
const MIN_TOKEN_LEN_EXCLUSIVE: usize = 2;

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do",
    "does", "did", "will", "would", "could", "should", "may", "might", "must", "shall", "can",
    "need", "it", "its", "this", "that", "these", "those", "i", "you", "he", "she", "we", "they",
    "what", "which", "who", "when", "where", "why", "how", "all", "each", "every", "both", "few",
    "more", "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so",
    "than", "too", "very", "just", "as", "if", "then", "because", "while", "although",
];

fn stopword_set() -> &'static std::collections::HashSet<&'static str> {
    static SET: OnceLock<std::collections::HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOPWORDS.iter().copied().collect())
}

fn non_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w]+").unwrap())
}

/// Extract up to [`MAX_KEYWORDS`] distinct lowercase tokens from `text`,
/// sorted by descending frequency with ties broken by first appearance.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let cleaned = non_word_re().replace_all(&lowered, " ");

    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for token in cleaned.split_whitespace() {
        if token.len() <= MIN_TOKEN_LEN_EXCLUSIVE {
            continue;
        }
        if stopword_set().contains(token) {
            continue;
        }
        let entry = counts.entry(token.to_string()).or_insert(0);
        if *entry == 0 {
            order.push(token.to_string());
        }
        *entry += 1;
    }

    order.sort_by(|a, b| {
        let ca = counts[a];
        let cb = counts[b];
        cb.cmp(&ca)
    });
    order.truncate(MAX_KEYWORDS);
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_yields_no_keywords() {
        assert!(extract_keywords("").is_empty());
    }

    #[test]
    fn strips_stopwords_and_short_tokens() {
        let kws = extract_keywords("The cat is on a mat and it is ok");
        assert!(!kws.iter().any(|k| STOPWORDS.contains(&k.as_str())));
        assert!(!kws.contains(&"ok".to_string()));
    }

    #[test]
    fn sorts_by_descending_frequency() {
        let kws = extract_keywords("apple apple apple banana banana cherry");
        assert_eq!(kws[0], "apple");
        assert_eq!(kws[1], "banana");
        assert_eq!(kws[2], "cherry");
    }

    #[test]
    fn ties_broken_by_first_appearance() {
        let kws = extract_keywords("zebra lion zebra lion");
        assert_eq!(kws[0], "zebra");
        assert_eq!(kws[1], "lion");
    }

    #[test]
    fn truncates_to_twenty() {
        let text = (0..30)
            .map(|i| format!("token{i}"))
            .collect::<Vec<_>>()
            .join(" ");
        let kws = extract_keywords(&text);
        assert_eq!(kws.len(), 20);
    }

    #[test]
    fn is_lowercase_and_distinct() {
        let kws = extract_keywords("Cats CATS cats purring Purring");
        assert_eq!(kws.iter().filter(|k| k.as_str() == "cats").count(), 1);
        assert!(kws.iter().all(|k| k == &k.to_lowercase()));
    }
}
