// Screening pipeline: keyword overlap, judgment scoring, batch ranking.
// All judgment-service calls go through the JudgmentService seam in scoring.

pub mod batch;
pub mod handlers;
pub mod keywords;
pub mod prompts;
pub mod scoring;

pub use batch::{BatchOptions, BatchProcessor};
pub use scoring::{JudgmentService, ScoringEngine, ScoringLimits};
