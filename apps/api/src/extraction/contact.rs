//! Contact Extractor: email, phone and GitHub profile from raw résumé text.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// local-part@domain.tld, shared with the identity extractor.
pub(crate) static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap()
});

/// Optional country code, optional (area) code, then two digit groups.
/// Matches like `+1 (555) 123-4567`, `555-123-4567`, `555.123.4567`.
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+?\d{1,3}[\s.-]?)?(?:\(?\d{2,4}\)?[\s.-]?)?\d{3,4}[\s.-]?\d{3,4}\b").unwrap()
});

static GITHUB_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:https?://)?(?:www\.)?github\.com/([A-Za-z0-9_-]+)").unwrap()
});

const MIN_PHONE_DIGITS: usize = 7;
const MAX_PHONE_DIGITS: usize = 15;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub github: Option<String>,
}

pub fn extract_contact(text: &str) -> ContactInfo {
    ContactInfo {
        email: extract_email(text),
        phone: extract_phone(text),
        github: extract_github(text),
    }
}

pub fn extract_email(text: &str) -> Option<String> {
    EMAIL_RE.find(text).map(|m| m.as_str().to_lowercase())
}

/// Only the first candidate is considered. If its digit count falls outside
/// 7..=15 the text is treated as having no phone number.
pub fn extract_phone(text: &str) -> Option<String> {
    let raw = PHONE_RE.find(text)?.as_str().trim();
    let digits = raw.chars().filter(char::is_ascii_digit).count();
    (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS)
        .contains(&digits)
        .then(|| raw.to_string())
}

pub fn extract_github(text: &str) -> Option<String> {
    GITHUB_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|handle| format!("https://github.com/{}", handle.as_str()))
}
