//! Error types for detector construction and ingestion.
//!
//! Both families are local and recoverable: a rejected configuration never
//! yields a detector, and a rejected input leaves the detector untouched.

use thiserror::Error;

/// Invalid construction parameters
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("window_size must be greater than 1, got {0}")]
    WindowTooSmall(usize),

    #[error("warmup must lie in [2, {window_size}], got {warmup}")]
    WarmupOutOfRange { warmup: usize, window_size: usize },

    #[error("{name} must be finite, got {value}")]
    NotFinite { name: &'static str, value: f64 },

    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("thresholds out of order: expected min ({min}) <= base ({base}) <= max ({max})")]
    ThresholdOrder { min: f64, base: f64, max: f64 },
}

/// Rejected input value
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("input value must be finite, got {0}")]
    NonFinite(f64),
}

/// Top-level error returned by the detector
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectorError {
    #[error("invalid detector configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid input: {0}")]
    Input(#[from] InputError),
}

impl DetectorError {
    pub fn is_input(&self) -> bool {
        matches!(self, Self::Input(_))
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
