use thiserror::Error;

/// Failure of a single `grab` call. Never fatal: the tick is skipped.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture backend returned no image")]
    Unavailable,

    #[error("capture region is empty")]
    EmptyRegion,

    #[error("capture buffer truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("capture backend failed: {0}")]
    Backend(String),
}
