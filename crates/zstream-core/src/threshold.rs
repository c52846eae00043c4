//! Adaptive z-score threshold.
//!
//! Additive rule: every anomaly tightens the threshold by
//! `sensitivity_step` (down to `min`), every normal point moves it one
//! `decay_step` back toward `base`. With a non-zero `quiet_period`, that many
//! consecutive normal points snap it straight back to `base`. The result is
//! always clamped to `[min, max]`.

use serde::{Deserialize, Serialize};

use crate::config::DetectorConfig;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ThresholdState {
    current: f64,
    base: f64,
    min: f64,
    max: f64,
    sensitivity_step: f64,
    decay_step: f64,
    quiet_period: u32,

    consecutive_anomalies: u32,
    consecutive_normals: u32,
    total_anomalies: u64,
}

impl ThresholdState {
    pub fn new(cfg: &DetectorConfig) -> Self {
        Self {
            current: cfg.base_threshold.clamp(cfg.min_threshold, cfg.max_threshold),
            base: cfg.base_threshold,
            min: cfg.min_threshold,
            max: cfg.max_threshold,
            sensitivity_step: cfg.sensitivity_step,
            decay_step: cfg.decay_step,
            quiet_period: cfg.quiet_period,
            consecutive_anomalies: 0,
            consecutive_normals: 0,
            total_anomalies: 0,
        }
    }

    /// Current |z| cutoff
    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn base(&self) -> f64 {
        self.base
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    pub fn consecutive_anomalies(&self) -> u32 {
        self.consecutive_anomalies
    }

    pub fn consecutive_normals(&self) -> u32 {
        self.consecutive_normals
    }

    pub fn total_anomalies(&self) -> u64 {
        self.total_anomalies
    }

    pub fn exceeds(&self, z_score: f64) -> bool {
        z_score.abs() > self.current
    }

    /// Tighten after an anomaly
    pub fn on_anomaly(&mut self) {
        self.consecutive_anomalies = self.consecutive_anomalies.saturating_add(1);
        self.consecutive_normals = 0;
        self.total_anomalies += 1;
        self.current = self.clamp(self.current - self.sensitivity_step);
    }

    /// Relax after a normal point
    pub fn on_normal(&mut self) {
        self.consecutive_anomalies = 0;
        self.consecutive_normals = self.consecutive_normals.saturating_add(1);

        if self.quiet_period > 0 && self.consecutive_normals >= self.quiet_period {
            if self.current != self.base {
                tracing::trace!(
                    from = self.current,
                    to = self.base,
                    "quiet period reached, threshold reset"
                );
            }
            self.current = self.clamp(self.base);
            self.consecutive_normals = 0;
            return;
        }

        let next = if self.current < self.base {
            (self.current + self.decay_step).min(self.base)
        } else {
            (self.current - self.decay_step).max(self.base)
        };
        self.current = self.clamp(next);
    }

    pub fn reset(&mut self) {
        self.current = self.clamp(self.base);
        self.consecutive_anomalies = 0;
        self.consecutive_normals = 0;
        self.total_anomalies = 0;
    }

    fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ThresholdState {
        let cfg = DetectorConfig::new(10, 3.0)
            .with_threshold_bounds(1.5, 4.0)
            .with_steps(0.5, 0.25);
        ThresholdState::new(&cfg)
    }

    #[test]
    fn test_tightens_to_min() {
        let mut t = state();
        let mut last = t.current();
        for _ in 0..10 {
            t.on_anomaly();
            assert!(t.current() <= last, "threshold must not increase on anomaly");
            last = t.current();
        }
        assert_eq!(t.current(), 1.5);
        assert_eq!(t.consecutive_anomalies(), 10);
        assert_eq!(t.total_anomalies(), 10);
    }

    #[test]
    fn test_relaxes_toward_base() {
        let mut t = state();
        t.on_anomaly();
        t.on_anomaly();
        assert_eq!(t.current(), 2.0);

        t.on_normal();
        assert_eq!(t.current(), 2.25);
        assert_eq!(t.consecutive_anomalies(), 0);

        for _ in 0..10 {
            t.on_normal();
        }
        assert_eq!(t.current(), 3.0, "relaxation must stop at base");
    }

    #[test]
    fn test_quiet_period_snaps_to_base() {
        let cfg = DetectorConfig::new(10, 3.0)
            .with_threshold_bounds(1.0, 4.0)
            .with_steps(1.0, 0.0)
            .with_quiet_period(3);
        let mut t = ThresholdState::new(&cfg);

        t.on_anomaly();
        t.on_anomaly();
        assert_eq!(t.current(), 1.0);

        t.on_normal();
        t.on_normal();
        assert_eq!(t.current(), 1.0, "zero decay keeps the tightened value");
        assert_eq!(t.consecutive_normals(), 2);
        t.on_normal();
        assert_eq!(t.current(), t.base());
        assert_eq!(t.consecutive_normals(), 0, "snap starts a new quiet period");
    }

    #[test]
    fn test_reset() {
        let mut t = state();
        assert_eq!(t.base(), 3.0);
        assert_eq!(t.bounds(), (1.5, 4.0));
        t.on_anomaly();
        t.on_normal();
        t.reset();
        assert_eq!(t.current(), 3.0);
        assert_eq!(t.consecutive_normals(), 0);
        assert_eq!(t.total_anomalies(), 0);
        assert!(t.exceeds(-3.1));
        assert!(!t.exceeds(3.0));
    }
}
