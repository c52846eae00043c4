//! Detector configuration.
//!
//! `DetectorConfig` is the entire configurable surface of the detector. It
//! deserializes with defaults for every missing field so it can be embedded
//! in larger run configurations.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DetectorConfig {
    /// Number of recent admitted points used for statistics
    pub window_size: usize,
    /// Points admitted unconditionally before scoring starts.
    /// `None` means "until the window is full".
    pub warmup: Option<usize>,
    /// Nominal |z| cutoff, and the value the threshold relaxes back to
    pub base_threshold: f64,
    /// Floor the threshold can tighten down to
    pub min_threshold: f64,
    /// Ceiling the threshold is clamped to
    pub max_threshold: f64,
    /// Threshold decrease applied after each anomaly
    pub sensitivity_step: f64,
    /// Threshold movement toward base applied after each normal point
    pub decay_step: f64,
    /// Consecutive normal points after which the threshold snaps back to
    /// base (0 disables)
    pub quiet_period: u32,
    /// Deviations below this are declared normal without scoring
    pub early_stop_epsilon: f64,
    /// Lower bound on the std used as the z-score denominator
    pub std_floor: f64,
    /// Consecutive anomalies after which anomalous values are admitted so the
    /// window can follow a level shift (0 disables)
    pub rebaseline_after: u32,
    /// Ingested values between full recomputations of the statistics.
    /// `None` means once per `window_size` values; `Some(0)` disables the
    /// periodic pass (cancellation-triggered recomputation still happens).
    pub resync_interval: Option<u64>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_size: 50,
            warmup: None,
            base_threshold: 2.5,
            min_threshold: 1.5,
            max_threshold: 4.0,
            sensitivity_step: 0.5,
            decay_step: 0.1,
            quiet_period: 0,
            early_stop_epsilon: 0.5,
            std_floor: 1e-9,
            rebaseline_after: 0,
            resync_interval: None,
        }
    }
}

impl DetectorConfig {
    pub fn new(window_size: usize, base_threshold: f64) -> Self {
        Self {
            window_size,
            base_threshold,
            ..Self::default()
        }
    }

    pub fn with_threshold_bounds(mut self, min: f64, max: f64) -> Self {
        self.min_threshold = min;
        self.max_threshold = max;
        self
    }

    pub fn with_steps(mut self, sensitivity_step: f64, decay_step: f64) -> Self {
        self.sensitivity_step = sensitivity_step;
        self.decay_step = decay_step;
        self
    }

    pub fn with_early_stop(mut self, epsilon: f64) -> Self {
        self.early_stop_epsilon = epsilon;
        self
    }

    pub fn with_warmup(mut self, warmup: usize) -> Self {
        self.warmup = Some(warmup);
        self
    }

    pub fn with_quiet_period(mut self, points: u32) -> Self {
        self.quiet_period = points;
        self
    }

    pub fn with_rebaseline_after(mut self, anomalies: u32) -> Self {
        self.rebaseline_after = anomalies;
        self
    }

    pub fn with_resync_interval(mut self, values: u64) -> Self {
        self.resync_interval = Some(values);
        self
    }

    /// Effective warmup length
    pub fn warmup_len(&self) -> usize {
        self.warmup.unwrap_or(self.window_size)
    }

    /// Effective periodic resync interval (0 = disabled)
    pub fn resync_len(&self) -> u64 {
        self.resync_interval.unwrap_or(self.window_size as u64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size <= 1 {
            return Err(ConfigError::WindowTooSmall(self.window_size));
        }

        let warmup = self.warmup_len();
        if warmup < 2 || warmup > self.window_size {
            return Err(ConfigError::WarmupOutOfRange {
                warmup,
                window_size: self.window_size,
            });
        }

        for (name, value) in [
            ("base_threshold", self.base_threshold),
            ("min_threshold", self.min_threshold),
            ("max_threshold", self.max_threshold),
            ("sensitivity_step", self.sensitivity_step),
            ("decay_step", self.decay_step),
            ("early_stop_epsilon", self.early_stop_epsilon),
            ("std_floor", self.std_floor),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NotFinite { name, value });
            }
        }

        for (name, value) in [
            ("base_threshold", self.base_threshold),
            ("min_threshold", self.min_threshold),
            ("std_floor", self.std_floor),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NotPositive { name, value });
            }
        }

        for (name, value) in [
            ("sensitivity_step", self.sensitivity_step),
            ("decay_step", self.decay_step),
            ("early_stop_epsilon", self.early_stop_epsilon),
        ] {
            if value < 0.0 {
                return Err(ConfigError::Negative { name, value });
            }
        }

        if !(self.min_threshold <= self.base_threshold && self.base_threshold <= self.max_threshold)
        {
            return Err(ConfigError::ThresholdOrder {
                min: self.min_threshold,
                base: self.base_threshold,
                max: self.max_threshold,
            });
        }

        Ok(())
    }
}
