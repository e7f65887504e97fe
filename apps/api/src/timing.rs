use std::time::Duration;

use tracing::{error, info, warn};

/// Tier boundaries for `log_performance`, in seconds.
const FAST_SECS: f64 = 1.0;
const NORMAL_SECS: f64 = 3.0;
const SLOW_SECS: f64 = 10.0;
const OPTIMIZE_HINT_SECS: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedTier {
    Fast,
    Normal,
    Slow,
    VerySlow,
}

impl SpeedTier {
    pub fn classify(elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        if secs < FAST_SECS {
            Self::Fast
        } else if secs < NORMAL_SECS {
            Self::Normal
        } else if secs < SLOW_SECS {
            Self::Slow
        } else {
            Self::VerySlow
        }
    }
}

/// Logs how long an operation took, at a level that rises with the duration.
pub fn log_performance(operation: &str, elapsed: Duration) {
    let secs = elapsed.as_secs_f64();

    match SpeedTier::classify(elapsed) {
        SpeedTier::Fast => info!(operation, "{operation}: {secs:.2}s (fast)"),
        SpeedTier::Normal => info!(operation, "{operation}: {secs:.2}s (normal)"),
        SpeedTier::Slow => warn!(operation, "{operation}: {secs:.2}s (slow)"),
        SpeedTier::VerySlow => error!(operation, "{operation}: {secs:.2}s (very slow)"),
    }

    if secs > OPTIMIZE_HINT_SECS {
        error!(operation, "Consider optimizing {operation}: took {secs:.2}s");
    }
}
