use crate::config::Config;
use crate::screening::BatchProcessor;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Extractor + scoring engine + pool options, wired once in `main`.
    pub processor: BatchProcessor,
}
