//! # zstream-sim
//!
//! Stream simulation around `zstream-core`: a seeded synthetic stream with
//! ground truth, a runner that feeds any `StreamDetector` and scores it, and
//! the JSON run configuration used by the `zstream-sim` binary.
//!
//! Detection logic lives in `zstream-core`; nothing here changes a decision.
//!
//! ```rust
//! use zstream_core::RollingAnomalyDetector;
//! use zstream_sim::{run, RunConfig, StreamGenerator};
//!
//! let cfg = RunConfig::default();
//! let mut detector = RollingAnomalyDetector::new(cfg.detector.clone()).unwrap();
//! let points = StreamGenerator::new(cfg.stream.clone(), cfg.seed)
//!     .unwrap()
//!     .take((cfg.skip + cfg.points) as usize);
//! let summary = run(&mut detector, points, cfg.skip, |_, _| Ok(())).unwrap();
//! assert_eq!(summary.points, cfg.points);
//! ```

pub mod config;
pub mod error;
pub mod generator;
pub mod runner;

pub use config::RunConfig;
pub use error::SimError;
pub use generator::{NoiseKind, StreamConfig, StreamGenerator, StreamPoint};
pub use runner::{RunSummary, run};
