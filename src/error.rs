use thiserror::Error;

/// Invalid configuration surfaced to the caller.
///
/// Degenerate *data* (empty input, nothing repeats) is not an error and
/// produces a well-formed empty result instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("sliding window size must be at least 1")]
    WindowSize,

    #[error("adaptive multiplier k must be non-negative, got {0}")]
    AdaptiveK(f64),

    #[error("curvature threshold must be non-negative, got {0}")]
    Threshold(f64),

    #[error("unknown emergence preset `{0}` (expected `sensitive`, `balanced` or `strict`)")]
    UnknownPreset(String),

    #[error("unknown threshold mode `{0}` (expected `static` or `adaptive`)")]
    UnknownMode(String),
}
