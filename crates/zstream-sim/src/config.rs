//! Run configuration: detector parameters, stream shape, seed and length.
//!
//! Loaded from JSON; every field is optional and falls back to its default.

use std::path::Path;

use serde::{Deserialize, Serialize};
use zstream_core::DetectorConfig;

use crate::error::SimError;
use crate::generator::StreamConfig;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    pub detector: DetectorConfig,
    pub stream: StreamConfig,
    pub seed: u64,
    /// Points scored after the pre-roll
    pub points: u64,
    /// Pre-roll points fed to the detector but not reported
    pub skip: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig {
                window_size: 70,
                base_threshold: 2.0,
                decay_step: 0.1,
                early_stop_epsilon: 0.1,
                ..DetectorConfig::default()
            },
            stream: StreamConfig::default(),
            seed: 0,
            points: 1_000,
            skip: 200,
        }
    }
}

impl RunConfig {
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let cfg: RunConfig = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        self.detector.validate().map_err(zstream_core::DetectorError::from)?;
        self.stream.validate()
    }

    pub fn to_json_pretty(&self) -> Result<String, SimError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
