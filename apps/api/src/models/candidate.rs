use serde::{Deserialize, Serialize};

use crate::screening::keywords::KeywordMatch;

pub const UNKNOWN_NAME: &str = "Unknown";
pub const PROCESSING_ERROR_NAME: &str = "Processing Error";
pub const NO_TEXT_SUMMARY: &str = "No text extracted";

/// Coarse fit category assigned to every candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    Excellent,
    Strong,
    #[default]
    Partial,
    Weak,
}

impl Classification {
    /// Parses the exact label used in judgment responses. Anything else is rejected.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Excellent" => Some(Self::Excellent),
            "Strong" => Some(Self::Strong),
            "Partial" => Some(Self::Partial),
            "Weak" => Some(Self::Weak),
            _ => None,
        }
    }

    /// Threshold mapping used by the keyword fallback scorer.
    pub fn from_fallback_score(score: f64) -> Self {
        if score >= 75.0 {
            Self::Strong
        } else if score >= 60.0 {
            Self::Partial
        } else {
            Self::Weak
        }
    }
}

/// Score, classification and summary for one résumé, plus keyword diagnostics.
///
/// Produced by both the judgment path and the fallback path; the shape is the
/// same either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub name: String,
    pub score: f64,
    pub classification: Classification,
    pub summary: String,
    #[serde(flatten)]
    pub keywords: KeywordMatch,
}

/// One candidate record per input file. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateAssessment {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub github: Option<String>,
    pub score: f64,
    pub classification: Classification,
    pub summary: String,
    #[serde(flatten)]
    pub keywords: KeywordMatch,
}

impl CandidateAssessment {
    /// Zero-score record for a file that yielded no text.
    pub fn no_text() -> Self {
        Self::zero_score(UNKNOWN_NAME, NO_TEXT_SUMMARY.to_string())
    }

    /// Zero-score record for a file whose processing failed outright.
    pub fn processing_error(message: &str) -> Self {
        let truncated: String = message.chars().take(100).collect();
        Self::zero_score(
            PROCESSING_ERROR_NAME,
            format!("Failed to process file: {truncated}"),
        )
    }

    fn zero_score(name: &str, summary: String) -> Self {
        Self {
            name: name.to_string(),
            email: None,
            phone: None,
            github: None,
            score: 0.0,
            classification: Classification::Weak,
            summary,
            keywords: KeywordMatch::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Completed,
    CompletedWithErrors,
    Failed,
}

impl BatchStatus {
    pub fn from_counts(failed: usize, total: usize) -> Self {
        if failed == 0 {
            Self::Completed
        } else if failed == total {
            Self::Failed
        } else {
            Self::CompletedWithErrors
        }
    }
}

/// Aggregate result of one batch, candidates ranked by score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub status: BatchStatus,
    pub processed: usize,
    pub total: usize,
    pub candidates: Vec<CandidateAssessment>,
}
