//! Identity Extractor: best-effort candidate name from noisy résumé text.
//!
//! Strategies run in a fixed order and the first hit wins. Earlier strategies
//! are precise (they look at the very top of the document or at explicit
//! labels); later ones trade precision for recall.
//!
//! 1. `from_leading_lines`    : first two non-blank lines, header lines skipped
//! 2. `from_labelled_patterns`: "Name: ...", a bare capitalized line, or a name before "Email"
//! 3. `from_email`            : `john.doe@...` → "John Doe"
//! 4. `from_capitalized_lines`: any capitalized 2–4 word line in the first 8 lines

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::extraction::contact::EMAIL_RE;
use crate::models::candidate::UNKNOWN_NAME;

/// Words that mark a line as a document/section header rather than a name.
const HEADER_WORDS: &[&str] = &[
    "resume",
    "cv",
    "curriculum",
    "vitae",
    "application",
    "profile",
    "objective",
    "summary",
    "professional",
];

/// Phrases a labelled-pattern match must not contain.
const NON_NAME_PHRASES: &[&str] = &[
    "contact information",
    "professional experience",
    "education summary",
    "skills overview",
    "work history",
    "education",
    "experience",
    "skills",
];

/// Generic résumé vocabulary skipped by the capitalized-line scan.
const SKIP_LINE_WORDS: &[&str] = &[
    "resume",
    "cv",
    "curriculum",
    "vitae",
    "experience",
    "education",
    "skills",
    "contact",
    "phone",
    "email",
    "address",
    "linkedin",
    "github",
    "portfolio",
    "website",
    "professional",
    "summary",
    "objective",
    "analyst",
    "developer",
    "engineer",
];

/// Lines containing these are ignored by the first-lines fallback heuristic.
const FIRST_LINES_SKIP_WORDS: &[&str] = &[
    "email",
    "phone",
    "address",
    "objective",
    "summary",
    "experience",
    "education",
    "skills",
    "resume",
    "cv",
];

const MIN_TEXT_CHARS: usize = 10;
const LEADING_LINES: usize = 2;
const CAPITALIZED_SCAN_LINES: usize = 8;
const MAX_NAME_LINE_CHARS: usize = 50;
const MAX_FIRST_LINE_CHARS: usize = 60;

static LABELLED_NAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // "Name: Jane Smith", "Candidate Name - Jane Smith", "Applicant Jane Smith"
        Regex::new(
            r"(?i:full name|candidate name|name|applicant)[:\s-]+([A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+){1,3})\b",
        )
        .unwrap(),
        // A line that is nothing but two to four capitalized words
        Regex::new(r"(?m)^([A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+){1,3})[ \t\r]*$").unwrap(),
        // "Jane Smith  Email: ..."
        Regex::new(r"([A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+){1,3})\s+(?i:email|phone|resume)").unwrap(),
    ]
});

static FIRST_LINE_NAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"^[A-Z][a-z]+ [A-Z][a-z]+(?: [A-Z][a-z]+)?").unwrap(),
        Regex::new(r"^[A-Z]\. [A-Z][a-z]+").unwrap(),
        Regex::new(r"^[A-Z][a-z]+, [A-Z]\.").unwrap(),
        Regex::new(r"^[A-Z][a-z]+ [A-Z]\. [A-Z][a-z]+").unwrap(),
    ]
});

/// A single name heuristic. Pure: same text, same answer.
pub type NameStrategy = fn(&str) -> Option<String>;

/// Evaluation order is significant; see the module docs.
pub const NAME_STRATEGIES: &[(&str, NameStrategy)] = &[
    ("leading_lines", from_leading_lines),
    ("labelled_patterns", from_labelled_patterns),
    ("email", from_email),
    ("capitalized_lines", from_capitalized_lines),
];

/// Returns the candidate's name, or `"Unknown"` when no strategy matches.
pub fn extract_name(text: &str) -> String {
    detect_name(text).unwrap_or_else(|| UNKNOWN_NAME.to_string())
}

pub fn detect_name(text: &str) -> Option<String> {
    if text.trim().chars().count() < MIN_TEXT_CHARS {
        return None;
    }

    NAME_STRATEGIES.iter().find_map(|(label, strategy)| {
        let name = strategy(text)?;
        debug!(strategy = *label, name = %name, "Candidate name detected");
        Some(name)
    })
}

/// Lightweight heuristic over the first `max_lines` raw lines, used by the
/// keyword fallback scorer.
pub fn name_from_first_lines(text: &str, max_lines: usize) -> Option<String> {
    text.split('\n')
        .take(max_lines)
        .map(str::trim)
        .filter(|line| !line.is_empty() && line.chars().count() <= MAX_FIRST_LINE_CHARS)
        .filter(|line| !contains_any(line, FIRST_LINES_SKIP_WORDS))
        .find_map(|line| {
            FIRST_LINE_NAME_PATTERNS
                .iter()
                .find_map(|pattern| pattern.find(line))
                .map(|m| title_case(m.as_str()))
        })
}

// ────────────────────────────────────────────────────────────────────────────
// Strategies
// ────────────────────────────────────────────────────────────────────────────

pub fn from_leading_lines(text: &str) -> Option<String> {
    non_blank_lines(text)
        .take(LEADING_LINES)
        .filter(|line| !contains_any(line, HEADER_WORDS))
        .find_map(name_from_line)
}

pub fn from_labelled_patterns(text: &str) -> Option<String> {
    LABELLED_NAME_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .find(|candidate| {
                candidate.split_whitespace().count() >= 2
                    && candidate.chars().count() < MAX_NAME_LINE_CHARS
                    && !contains_any(candidate, NON_NAME_PHRASES)
            })
            .map(str::to_string)
    })
}

pub fn from_email(text: &str) -> Option<String> {
    let email = EMAIL_RE.find(text)?;
    name_from_email(email.as_str())
}

pub fn from_capitalized_lines(text: &str) -> Option<String> {
    non_blank_lines(text)
        .take(CAPITALIZED_SCAN_LINES)
        .filter(|line| !contains_any(line, SKIP_LINE_WORDS))
        .find_map(|line| {
            let words: Vec<&str> = line.split_whitespace().collect();
            if !(2..=4).contains(&words.len()) {
                return None;
            }

            let caps: Vec<String> = words
                .iter()
                .map(|word| strip_punctuation(word))
                .filter(|word| is_capitalized_word(word))
                .collect();

            (caps.len() >= 2).then(|| caps.join(" "))
        })
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn non_blank_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty())
}

/// Case-insensitive substring check against a word list.
fn contains_any(line: &str, words: &[&str]) -> bool {
    let lower = line.to_lowercase();
    words.iter().any(|word| lower.contains(word))
}

/// A 2–4 token line under 50 chars with at least two alphabetic tokens.
fn name_from_line(line: &str) -> Option<String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if !(2..=4).contains(&words.len()) || line.chars().count() >= MAX_NAME_LINE_CHARS {
        return None;
    }

    let name_words: Vec<String> = words
        .iter()
        .map(|word| strip_punctuation(word))
        .filter(|word| is_alphabetic_token(word))
        .map(|word| title_case(&word))
        .collect();

    (name_words.len() >= 2).then(|| name_words.join(" "))
}

fn name_from_email(email: &str) -> Option<String> {
    let local = email.split('@').next()?;

    if local.contains('.') {
        let parts: Vec<String> = local
            .split('.')
            .take(3)
            .filter(|part| part.len() > 1 && is_ascii_alpha(part))
            .map(capitalize)
            .collect();
        if parts.len() >= 2 {
            return Some(parts.join(" "));
        }
    }

    if (6..=20).contains(&local.len()) && is_ascii_alpha(local) {
        return (3..local.len().min(8))
            .map(|split| local.split_at(split))
            .find(|(first, last)| is_ascii_alpha(first) && is_ascii_alpha(last))
            .map(|(first, last)| format!("{} {}", capitalize(first), capitalize(last)));
    }

    None
}

/// Keeps word characters and hyphens.
fn strip_punctuation(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Alphabetic once hyphens are ignored ("Mary-Jane" passes, "-" does not).
fn is_alphabetic_token(word: &str) -> bool {
    let mut letters = word.chars().filter(|c| *c != '-').peekable();
    letters.peek().is_some() && letters.all(char::is_alphabetic)
}

/// Starts uppercase and is at least 80% letters.
fn is_capitalized_word(word: &str) -> bool {
    let Some(first) = word.chars().next() else {
        return false;
    };
    let total = word.chars().count();
    let alpha = word.chars().filter(|c| c.is_alphabetic()).count();
    first.is_uppercase() && alpha * 5 >= total * 4
}

fn is_ascii_alpha(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Uppercases the first letter of every alphabetic run, lowercases the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_alpha = false;
    for c in text.chars() {
        if prev_alpha {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        prev_alpha = c.is_alphabetic();
    }
    out
}
