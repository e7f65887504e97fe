//! Keyword Matcher: bag-of-words overlap between a JD and a résumé.
//!
//! Both texts are lowercased, split on whitespace, stripped of edge punctuation
//! and filtered through `STOP_WORDS`. The ratio is computed on the full sets;
//! the returned lists are truncated for display only.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Display cap for `matched_keywords` and `jd_keywords`.
pub const MAX_DISPLAY_KEYWORDS: usize = 10;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "is", "are", "was", "were", "be", "been", "have", "has", "had", "that", "this", "it", "we",
    "you", "they", "will", "can", "should", "must", "not", "from", "as", "do", "does", "did",
    "so", "if", "our", "your", "their", "its", "who", "into", "about", "than", "looking",
    "seeking",
];

/// Punctuation trimmed from token edges. `+` and `#` survive so `c++` and `c#` stay intact.
const EDGE_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '(', ')', '[', ']', '{', '}', '"', '\''];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordMatch {
    pub matched_keywords: Vec<String>,
    pub jd_keywords: Vec<String>,
    pub match_ratio: f64,
}

/// Meaningful lowercase tokens of `text`, sorted and deduplicated.
pub fn extract_keywords(text: &str) -> BTreeSet<String> {
    text.split_whitespace()
        .map(|token| token.trim_matches(EDGE_PUNCTUATION).to_lowercase())
        .filter(|token| !token.is_empty() && !STOP_WORDS.contains(&token.as_str()))
        .collect()
}

pub fn keyword_match(jd: &str, resume_text: &str) -> KeywordMatch {
    let jd_keywords = extract_keywords(jd);
    let resume_keywords = extract_keywords(resume_text);

    let matched: Vec<String> = jd_keywords.intersection(&resume_keywords).cloned().collect();

    let match_ratio = if jd_keywords.is_empty() {
        0.0
    } else {
        (matched.len() as f64 / jd_keywords.len() as f64).clamp(0.0, 1.0)
    };

    KeywordMatch {
        matched_keywords: matched.into_iter().take(MAX_DISPLAY_KEYWORDS).collect(),
        jd_keywords: jd_keywords.into_iter().take(MAX_DISPLAY_KEYWORDS).collect(),
        match_ratio,
    }
}
