//! Error types for punctum.
//!
//! Only configuration and input-construction problems are errors. Per-peak
//! failures are reported as [`crate::fitting::FitRejection`] and per-frame
//! failures are logged and turned into empty frames.

use thiserror::Error;

/// Errors that abort a whole run before it starts.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Inverted range for '{name}': min {min} is greater than max {max}")]
    InvertedRange {
        name: &'static str,
        min: f64,
        max: f64,
    },

    #[error("Frame {index} has {actual} samples, expected {expected} ({width}x{height})")]
    FrameSize {
        index: usize,
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Frame {index} out of range, source has {count} frames")]
    FrameIndex { index: usize, count: usize },

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Fails with [`Error::InvalidParameter`] unless `value` is finite and `> 0`.
pub(crate) fn ensure_positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::invalid(name, format!("must be positive, got {value}")))
    }
}

/// Fails with [`Error::InvalidParameter`] unless `value` is finite and `>= 0`.
pub(crate) fn ensure_non_negative(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::invalid(
            name,
            format!("must be non-negative, got {value}"),
        ))
    }
}
