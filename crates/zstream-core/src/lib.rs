//! # zstream-core
//!
//! Single-pass anomaly detection for a scalar stream.
//!
//! The detector keeps a bounded window of recently admitted values, maintains
//! their mean and variance incrementally, and flags values whose z-score
//! exceeds an adaptive threshold. Flagged values stay out of the window so a
//! burst of outliers cannot drag the statistics toward itself.
//!
//! ```rust
//! use zstream_core::{DetectorConfig, RollingAnomalyDetector};
//!
//! let mut detector = RollingAnomalyDetector::new(DetectorConfig::new(5, 3.0)).unwrap();
//! for v in [10.0, 10.0, 10.0, 10.0, 10.0] {
//!     detector.ingest(v).unwrap();
//! }
//! let decision = detector.ingest(100.0).unwrap();
//! assert!(decision.is_anomaly);
//! ```
//!
//! The core performs no I/O and installs no tracing subscriber; it only emits
//! `tracing` events.

pub mod config;
pub mod detector;
pub mod error;
pub mod stats;
pub mod threshold;
pub mod window;

// Re-exports for convenience
pub use config::DetectorConfig;
pub use detector::{Decision, DecisionPath, Phase, RollingAnomalyDetector, StreamDetector};
pub use error::{ConfigError, DetectorError, InputError};
pub use stats::RollingStats;
pub use threshold::ThresholdState;
pub use window::RingWindow;
