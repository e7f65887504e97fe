//! Batch Processor: assesses every uploaded résumé and ranks the results.
//!
//! Each file runs in its own task, bounded by a semaphore. A panic or a
//! deadline overrun in one file becomes a "Processing Error" record for that
//! file only. Outcomes are collected in file order and ranked with a stable
//! sort, so completion order never leaks into the result.
//!
//! Input files are removed once, after every file has been assessed, or
//! immediately when the batch is cancelled.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};

use crate::extraction::contact::extract_contact;
use crate::extraction::TextExtractor;
use crate::extraction::identity::extract_name;
use crate::models::candidate::{BatchResult, BatchStatus, CandidateAssessment, UNKNOWN_NAME};
use crate::screening::scoring::ScoringEngine;
use crate::timing::log_performance;

pub const DEFAULT_MAX_CONCURRENT_FILES: usize = 4;
pub const DEFAULT_FILE_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Worker pool size. Values below 1 are treated as 1.
    pub max_concurrent_files: usize,
    /// Deadline for one file's extraction + scoring. `None` disables it.
    pub file_timeout: Option<Duration>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_concurrent_files: DEFAULT_MAX_CONCURRENT_FILES,
            file_timeout: Some(DEFAULT_FILE_TIMEOUT),
        }
    }
}

#[derive(Debug, Error)]
pub enum FileError {
    #[error("assessment timed out after {0:?}")]
    TimedOut(Duration),

    #[error("{0}")]
    Panicked(String),

    #[error("assessment task aborted: {0}")]
    Aborted(String),
}

/// What happened to one input file.
#[derive(Debug)]
pub enum FileOutcome {
    Assessed(CandidateAssessment),
    Failed(FileError),
}

impl FileOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, FileOutcome::Failed(_))
    }

    pub fn into_candidate(self) -> CandidateAssessment {
        match self {
            FileOutcome::Assessed(candidate) => candidate,
            FileOutcome::Failed(e) => CandidateAssessment::processing_error(&e.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct BatchProcessor {
    extractor: Arc<dyn TextExtractor>,
    engine: ScoringEngine,
    options: BatchOptions,
}

impl BatchProcessor {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        engine: ScoringEngine,
        options: BatchOptions,
    ) -> Self {
        Self {
            extractor,
            engine,
            options,
        }
    }

    /// Assesses every file against `jd`, deletes the files, and returns the
    /// ranked batch. Never fails as a whole.
    ///
    /// Dropping the returned future aborts the outstanding workers and still
    /// removes the input files.
    pub async fn process(&self, jd: &str, files: &[PathBuf]) -> BatchResult {
        let started = Instant::now();
        let mut guard = BatchGuard::new(files);

        let outcomes = self.assess_all(jd, files, &mut guard).await;
        cleanup_files(files).await;
        guard.disarm();
        let result = summarize(outcomes);

        match result.status {
            BatchStatus::Completed => info!(
                "Batch completed: {} files processed",
                result.processed
            ),
            BatchStatus::CompletedWithErrors => info!(
                "Batch completed with {} ok / {} failed",
                result.processed,
                result.total - result.processed
            ),
            BatchStatus::Failed => error!("Batch failed: all {} files failed", result.total),
        }
        log_performance("Batch processing", started.elapsed());

        result
    }

    /// One outcome per file, in input order. Worker handles are parked in
    /// `guard` so a cancelled batch can abort them.
    async fn assess_all(
        &self,
        jd: &str,
        files: &[PathBuf],
        guard: &mut BatchGuard,
    ) -> Vec<FileOutcome> {
        let total = files.len();
        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrent_files.max(1)));
        let jd: Arc<str> = Arc::from(jd);

        for (index, path) in files.iter().enumerate() {
            let extractor = Arc::clone(&self.extractor);
            let engine = self.engine.clone();
            let semaphore = Arc::clone(&semaphore);
            let jd = Arc::clone(&jd);
            let path = path.clone();
            let file_timeout = self.options.file_timeout;

            guard.workers.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                info!("Processing file {}/{}: {}", index + 1, total, file_label(&path));

                let started = Instant::now();
                let assessment = assess_file(extractor.as_ref(), &engine, &jd, &path);
                let outcome = match file_timeout {
                    Some(deadline) => tokio::time::timeout(deadline, assessment)
                        .await
                        .map_err(|_| FileError::TimedOut(deadline)),
                    None => Ok(assessment.await),
                };
                log_performance(&format!("File {} processing", index + 1), started.elapsed());
                outcome
            }));
        }

        let mut outcomes = Vec::with_capacity(total);
        for (path, handle) in files.iter().zip(guard.workers.iter_mut()) {
            let outcome = match handle.await {
                Ok(Ok(candidate)) => {
                    info!("Successfully processed: {}", file_label(path));
                    FileOutcome::Assessed(candidate)
                }
                Ok(Err(e)) => {
                    error!("Error processing {}: {e}", path.display());
                    FileOutcome::Failed(e)
                }
                Err(join_error) => {
                    let e = describe_join_error(join_error);
                    error!("Error processing {}: {e}", path.display());
                    FileOutcome::Failed(e)
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }
}

type Worker = JoinHandle<Result<CandidateAssessment, FileError>>;

/// Owns the per-file workers of one batch. If dropped while armed (the batch
/// future was cancelled), aborts every worker and removes the input files.
struct BatchGuard {
    workers: Vec<Worker>,
    files: Vec<PathBuf>,
    armed: bool,
}

impl BatchGuard {
    fn new(files: &[PathBuf]) -> Self {
        Self {
            workers: Vec::with_capacity(files.len()),
            files: files.to_vec(),
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        warn!(
            "Batch cancelled: aborting {} workers, removing {} input files",
            self.workers.len(),
            self.files.len()
        );
        for worker in &self.workers {
            worker.abort();
        }
        // Drop cannot await.
        for path in &self.files {
            log_removal(path, std::fs::remove_file(path));
        }
    }
}

/// Extraction → identity/contact → scoring for one file.
pub async fn assess_file(
    extractor: &dyn TextExtractor,
    engine: &ScoringEngine,
    jd: &str,
    path: &Path,
) -> CandidateAssessment {
    let text = extractor.extract_text(path).await;
    if text.trim().is_empty() {
        warn!("No text extracted from {}", path.display());
        return CandidateAssessment::no_text();
    }

    let extracted_name = extract_name(&text);
    let contact = extract_contact(&text);

    let started = Instant::now();
    let assessment = engine.score(jd, &text).await;
    log_performance(
        &format!("Scoring for {}", file_label(path)),
        started.elapsed(),
    );

    // The heuristic name wins over the judged one when both exist.
    let name = if extracted_name == UNKNOWN_NAME {
        assessment.name
    } else {
        extracted_name
    };

    CandidateAssessment {
        name,
        email: contact.email,
        phone: contact.phone,
        github: contact.github,
        score: assessment.score,
        classification: assessment.classification,
        summary: assessment.summary,
        keywords: assessment.keywords,
    }
}

/// Reduces per-file outcomes to the ranked batch result.
pub fn summarize(outcomes: Vec<FileOutcome>) -> BatchResult {
    let total = outcomes.len();
    let failed = outcomes.iter().filter(|o| o.is_failure()).count();

    let mut candidates: Vec<CandidateAssessment> = outcomes
        .into_iter()
        .map(FileOutcome::into_candidate)
        .collect();
    // `sort_by` is stable: equal scores keep their file order.
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    BatchResult {
        status: BatchStatus::from_counts(failed, total),
        processed: total - failed,
        total,
        candidates,
    }
}

/// Best-effort removal of the uploaded files. Failures are logged, never raised.
pub async fn cleanup_files(paths: &[PathBuf]) {
    for path in paths {
        log_removal(path, tokio::fs::remove_file(path).await);
    }
}

fn log_removal(path: &Path, result: std::io::Result<()>) {
    match result {
        Ok(()) => info!("Cleaned up: {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => error!("Failed to clean up {}: {e}", path.display()),
    }
}

fn describe_join_error(join_error: JoinError) -> FileError {
    if !join_error.is_panic() {
        return FileError::Aborted(join_error.to_string());
    }

    let payload = join_error.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unexpected panic".to_string());
    FileError::Panicked(message)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
