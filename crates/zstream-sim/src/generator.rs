//! Synthetic scalar stream with seasonality, drift, noise and injected spikes.
//!
//! Every point records whether a spike was injected so detections can be
//! scored against ground truth. Randomness comes from an explicitly seeded
//! `StdRng`; equal seeds give equal streams.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::error::SimError;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NoiseKind {
    /// Uniform in [-noise_level, noise_level]
    #[default]
    Uniform,
    /// Normal with sigma = noise_level
    Gaussian,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct StreamConfig {
    pub noise_level: f64,
    pub noise: NoiseKind,
    /// Steps per seasonal cycle
    pub seasonality_period: u64,
    pub seasonal_amplitude: f64,
    /// Added to the level every step
    pub drift_rate: f64,
    /// Probability of a spike at each step
    pub anomaly_chance: f64,
    /// Spike size; the sign is chosen at random
    pub anomaly_magnitude: f64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            noise_level: 0.5,
            noise: NoiseKind::Uniform,
            seasonality_period: 50,
            seasonal_amplitude: 1.0,
            drift_rate: 0.001,
            anomaly_chance: 0.05,
            anomaly_magnitude: 5.0,
        }
    }
}

impl StreamConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        if self.seasonality_period == 0 {
            return Err(SimError::Stream("seasonality_period must be positive".into()));
        }
        if !self.noise_level.is_finite() || self.noise_level < 0.0 {
            return Err(SimError::Stream(format!(
                "noise_level must be finite and non-negative, got {}",
                self.noise_level
            )));
        }
        if !(0.0..=1.0).contains(&self.anomaly_chance) {
            return Err(SimError::Stream(format!(
                "anomaly_chance must lie in [0, 1], got {}",
                self.anomaly_chance
            )));
        }
        for (name, value) in [
            ("seasonal_amplitude", self.seasonal_amplitude),
            ("drift_rate", self.drift_rate),
            ("anomaly_magnitude", self.anomaly_magnitude),
        ] {
            if !value.is_finite() {
                return Err(SimError::Stream(format!("{name} must be finite, got {value}")));
            }
        }
        Ok(())
    }
}

/// One generated value plus its ground truth
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct StreamPoint {
    pub index: u64,
    pub value: f64,
    /// A spike was injected at this point
    pub injected: bool,
}

pub struct StreamGenerator {
    config: StreamConfig,
    rng: StdRng,
    gaussian: Normal<f64>,
    step: u64,
    drift: f64,
}

impl StreamGenerator {
    pub fn new(config: StreamConfig, seed: u64) -> Result<Self, SimError> {
        config.validate()?;
        let gaussian = Normal::new(0.0, config.noise_level)
            .map_err(|e| SimError::Stream(format!("invalid noise distribution: {e}")))?;
        Ok(Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            gaussian,
            step: 0,
            drift: 0.0,
        })
    }

    pub fn next_point(&mut self) -> StreamPoint {
        let t = self.step as f64;
        let period = self.config.seasonality_period as f64;
        let seasonal =
            self.config.seasonal_amplitude * (2.0 * std::f64::consts::PI * t / period).sin();

        let noise = match self.config.noise {
            NoiseKind::Uniform if self.config.noise_level > 0.0 => self
                .rng
                .random_range(-self.config.noise_level..=self.config.noise_level),
            NoiseKind::Uniform => 0.0,
            NoiseKind::Gaussian => self.gaussian.sample(&mut self.rng),
        };

        self.drift += self.config.drift_rate;

        let injected = self.rng.random_bool(self.config.anomaly_chance);
        let spike = if injected {
            if self.rng.random_bool(0.5) {
                self.config.anomaly_magnitude
            } else {
                -self.config.anomaly_magnitude
            }
        } else {
            0.0
        };

        let point = StreamPoint {
            index: self.step,
            value: seasonal + noise + self.drift + spike,
            injected,
        };
        self.step += 1;
        point
    }
}

impl Iterator for StreamGenerator {
    type Item = StreamPoint;

    fn next(&mut self) -> Option<StreamPoint> {
        Some(self.next_point())
    }
}
