//! Rolling z-score anomaly detector
//!
//! One `ingest` call per arriving value:
//! 1. Warmup: admit unconditionally until the warmup length is reached
//! 2. Early stop: tiny deviations are normal without scoring
//! 3. Score: z = (value - mean) / max(std, std_floor)
//! 4. Decide: anomalies are kept out of the window and tighten the
//!    threshold, normal points are admitted and relax it
//!
//! A window of identical values has std 0; the std floor then turns any
//! deviation into a very large |z| (flagged) while an exact repeat scores 0.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::config::DetectorConfig;
use crate::error::{DetectorError, InputError};
use crate::stats::RollingStats;
use crate::threshold::ThresholdState;
use crate::window::RingWindow;

// ============================================================================
// CORE ABSTRACTIONS
// ============================================================================

/// Lifecycle state of a detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Not enough history, everything is normal
    Warmup,
    /// Full pipeline in effect
    Active,
}

/// How a decision was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionPath {
    Warmup,
    EarlyStop,
    Scored,
}

/// Per-value output of the detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub value: f64,
    /// Signed z-score; 0 when the value was not scored
    pub z_score: f64,
    pub is_anomaly: bool,
    /// Window statistics the value was judged against
    pub window_mean: f64,
    pub window_std: f64,
    /// |z| cutoff in force for this value
    pub threshold: f64,
    /// Whether the value entered the window
    pub admitted: bool,
    pub phase: Phase,
    pub path: DecisionPath,
}

/// Trait for single-stream detectors
pub trait StreamDetector {
    fn name(&self) -> &str;
    fn ingest(&mut self, value: f64) -> Result<Decision, DetectorError>;
    fn reset(&mut self);
}

// ============================================================================
// ROLLING DETECTOR
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RollingAnomalyDetector {
    config: DetectorConfig,
    window: RingWindow,
    stats: RollingStats,
    threshold: ThresholdState,
    since_resync: u64,
    processed: u64,
}

impl RollingAnomalyDetector {
    pub fn new(config: DetectorConfig) -> Result<Self, DetectorError> {
        config.validate()?;
        Ok(Self {
            window: RingWindow::new(config.window_size),
            stats: RollingStats::new(),
            threshold: ThresholdState::new(&config),
            since_resync: 0,
            processed: 0,
            config,
        })
    }

    /// Feed one value and get the decision for it
    pub fn ingest(&mut self, value: f64) -> Result<Decision, DetectorError> {
        if !value.is_finite() {
            warn!(value, processed = self.processed, "rejecting non-finite input");
            return Err(InputError::NonFinite(value).into());
        }
        self.processed += 1;

        let decision = self.decide(value);

        self.since_resync += 1;
        let interval = self.config.resync_len();
        if interval > 0 && self.since_resync >= interval {
            self.resync("periodic");
        }
        Ok(decision)
    }

    fn decide(&mut self, value: f64) -> Decision {
        let window_mean = self.stats.mean();
        let window_std = self.stats.std_dev();
        let threshold = self.threshold.current();

        if self.phase() == Phase::Warmup {
            self.admit(value);
            return Decision {
                value,
                z_score: 0.0,
                is_anomaly: false,
                window_mean,
                window_std,
                threshold,
                admitted: true,
                phase: Phase::Warmup,
                path: DecisionPath::Warmup,
            };
        }

        let deviation = (value - window_mean).abs();
        let effective_std = window_std.max(self.config.std_floor);

        // The shortcut only applies where scoring could not have flagged
        if deviation < self.config.early_stop_epsilon && deviation <= threshold * effective_std {
            self.admit(value);
            self.threshold.on_normal();
            return Decision {
                value,
                z_score: 0.0,
                is_anomaly: false,
                window_mean,
                window_std,
                threshold,
                admitted: true,
                phase: Phase::Active,
                path: DecisionPath::EarlyStop,
            };
        }

        let z_score = (value - window_mean) / effective_std;
        let is_anomaly = self.threshold.exceeds(z_score);

        let admitted = if is_anomaly {
            let run = self.threshold.consecutive_anomalies() + 1;
            let rebaseline =
                self.config.rebaseline_after > 0 && run >= self.config.rebaseline_after;
            debug!(
                value,
                z_score,
                threshold,
                run,
                rebaseline,
                "anomaly detected"
            );
            if rebaseline {
                self.admit(value);
            }
            self.threshold.on_anomaly();
            rebaseline
        } else {
            self.admit(value);
            self.threshold.on_normal();
            true
        };

        Decision {
            value,
            z_score,
            is_anomaly,
            window_mean,
            window_std,
            threshold,
            admitted,
            phase: Phase::Active,
            path: DecisionPath::Scored,
        }
    }

    fn admit(&mut self, value: f64) {
        let evicted = self.window.push(value);
        if self.stats.admit(value, evicted) {
            self.resync("cancellation");
        }
    }

    fn resync(&mut self, reason: &'static str) {
        let before = (self.stats.mean(), self.stats.std_dev());
        self.stats.resync(self.window.iter());
        self.since_resync = 0;
        trace!(
            reason,
            mean_drift = self.stats.mean() - before.0,
            std_drift = self.stats.std_dev() - before.1,
            "rolling statistics resynced"
        );
    }

    pub fn phase(&self) -> Phase {
        if self.window.len() < self.config.warmup_len() {
            Phase::Warmup
        } else {
            Phase::Active
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn window(&self) -> &RingWindow {
        &self.window
    }

    pub fn stats(&self) -> &RollingStats {
        &self.stats
    }

    /// Current |z| cutoff
    pub fn threshold(&self) -> f64 {
        self.threshold.current()
    }

    pub fn threshold_state(&self) -> &ThresholdState {
        &self.threshold
    }

    pub fn mean(&self) -> f64 {
        self.stats.mean()
    }

    pub fn std_dev(&self) -> f64 {
        self.stats.std_dev()
    }

    /// Statistics recomputed from the window contents
    pub fn batch_stats(&self) -> RollingStats {
        RollingStats::batch(self.window.iter())
    }

    /// Values accepted by `ingest` (rejected inputs are not counted)
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Return to the freshly constructed state
    pub fn reset(&mut self) {
        self.window.clear();
        self.stats.reset();
        self.threshold.reset();
        self.since_resync = 0;
        self.processed = 0;
    }
}

impl StreamDetector for RollingAnomalyDetector {
    fn name(&self) -> &str {
        "rolling-zscore"
    }

    fn ingest(&mut self, value: f64) -> Result<Decision, DetectorError> {
        RollingAnomalyDetector::ingest(self, value)
    }

    fn reset(&mut self) {
        RollingAnomalyDetector::reset(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector(window_size: usize, base: f64) -> RollingAnomalyDetector {
        RollingAnomalyDetector::new(DetectorConfig::new(window_size, base).with_early_stop(0.0))
            .unwrap()
    }

    #[test]
    fn test_constant_window_flags_spike() {
        let mut d = detector(5, 2.5);
        for _ in 0..5 {
            let decision = d.ingest(10.0).unwrap();
            assert!(!decision.is_anomaly);
            assert_eq!(decision.path, DecisionPath::Warmup);
        }
        assert_eq!(d.phase(), Phase::Active);

        let decision = d.ingest(100.0).unwrap();
        assert!(decision.is_anomaly, "spike over constant window must be flagged");
        assert!(decision.z_score > 1e6, "z-score should be huge: {}", decision.z_score);
        assert!(!decision.admitted);
        assert_eq!(d.window().to_vec(), vec![10.0; 5]);
    }

    #[test]
    fn test_constant_window_repeat_is_normal() {
        let mut d = detector(5, 2.5);
        for _ in 0..5 {
            d.ingest(10.0).unwrap();
        }
        let decision = d.ingest(10.0).unwrap();
        assert!(!decision.is_anomaly);
        assert_eq!(decision.z_score, 0.0);
    }

    #[test]
    fn test_moderate_value_admitted() {
        let mut d = detector(5, 3.0);
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            d.ingest(v).unwrap();
        }

        let decision = d.ingest(5.5).unwrap();
        assert!(!decision.is_anomaly);
        assert_eq!(decision.window_mean, 3.0);
        assert!((decision.z_score - 2.5 / 2.0_f64.sqrt()).abs() < 1e-12);
        assert!(decision.admitted);
        assert_eq!(d.window().to_vec(), vec![2.0, 3.0, 4.0, 5.0, 5.5]);
    }

    #[test]
    fn test_nan_leaves_state_unchanged() {
        let mut d = detector(5, 3.0);
        for v in [1.0, 2.0, 3.0] {
            d.ingest(v).unwrap();
        }
        let window = d.window().to_vec();
        let threshold = d.threshold();
        let mean = d.mean();

        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = d.ingest(bad).unwrap_err();
            assert!(err.is_input());
        }

        assert_eq!(d.window().to_vec(), window);
        assert_eq!(d.threshold(), threshold);
        assert_eq!(d.mean(), mean);
        assert_eq!(d.processed(), 3);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = RollingAnomalyDetector::new(DetectorConfig::new(1, 3.0)).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_anomaly_tightens_and_normal_relaxes() {
        let cfg = DetectorConfig::new(5, 3.0)
            .with_threshold_bounds(2.0, 4.0)
            .with_steps(0.5, 0.25)
            .with_early_stop(0.0);
        let mut d = RollingAnomalyDetector::new(cfg).unwrap();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            d.ingest(v).unwrap();
        }

        let spike = d.ingest(50.0).unwrap();
        assert!(spike.is_anomaly);
        assert_eq!(spike.threshold, 3.0, "decision reports the cutoff it was judged by");
        assert_eq!(d.threshold(), 2.5);

        d.ingest(50.0).unwrap();
        d.ingest(50.0).unwrap();
        assert_eq!(d.threshold(), 2.0, "threshold clamps at min");
        assert_eq!(d.threshold_state().consecutive_anomalies(), 3);

        let normal = d.ingest(3.0).unwrap();
        assert!(!normal.is_anomaly);
        assert_eq!(d.threshold(), 2.25);
        assert_eq!(d.threshold_state().consecutive_anomalies(), 0);
    }

    #[test]
    fn test_early_stop_shortcut() {
        let cfg = DetectorConfig::new(5, 2.0).with_early_stop(0.5);
        let mut d = RollingAnomalyDetector::new(cfg).unwrap();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            d.ingest(v).unwrap();
        }

        let decision = d.ingest(3.2).unwrap();
        assert_eq!(decision.path, DecisionPath::EarlyStop);
        assert!(!decision.is_anomaly);
        assert!(decision.admitted);
    }

    #[test]
    fn test_early_stop_respects_precondition() {
        // epsilon is far larger than threshold * std, so the shortcut must
        // not swallow the deviation
        let cfg = DetectorConfig::new(5, 2.0).with_early_stop(10.0);
        let mut d = RollingAnomalyDetector::new(cfg).unwrap();
        for v in [1.0, 1.01, 0.99, 1.0, 1.0] {
            d.ingest(v).unwrap();
        }

        let decision = d.ingest(2.0).unwrap();
        assert_eq!(decision.path, DecisionPath::Scored);
        assert!(decision.is_anomaly);
    }

    #[test]
    fn test_rebaseline_admits_level_shift() {
        let cfg = DetectorConfig::new(5, 3.0)
            .with_early_stop(0.0)
            .with_rebaseline_after(3);
        let mut d = RollingAnomalyDetector::new(cfg).unwrap();
        for v in [1.0, 2.0, 1.0, 2.0, 1.0] {
            d.ingest(v).unwrap();
        }

        assert!(!d.ingest(100.0).unwrap().admitted);
        assert!(!d.ingest(100.0).unwrap().admitted);
        let third = d.ingest(100.0).unwrap();
        assert!(third.is_anomaly);
        assert!(third.admitted, "third consecutive anomaly starts re-baselining");
        assert_eq!(d.window().last(), Some(100.0));
    }

    #[test]
    fn test_custom_warmup() {
        let cfg = DetectorConfig::new(10, 2.0)
            .with_warmup(3)
            .with_early_stop(0.0);
        let mut d = RollingAnomalyDetector::new(cfg).unwrap();
        for v in [5.0, 5.0, 5.0] {
            assert_eq!(d.ingest(v).unwrap().phase, Phase::Warmup);
        }
        assert_eq!(d.phase(), Phase::Active);
        assert!(d.ingest(500.0).unwrap().is_anomaly);
    }

    #[test]
    fn test_reset_returns_to_warmup() {
        let mut d = detector(5, 2.5);
        for _ in 0..5 {
            d.ingest(10.0).unwrap();
        }
        d.ingest(100.0).unwrap();
        d.reset();

        assert_eq!(d.phase(), Phase::Warmup);
        assert!(d.window().is_empty());
        assert_eq!(d.threshold(), 2.5);
        assert_eq!(d.processed(), 0);
    }

    #[test]
    fn test_trait_object() {
        let mut d: Box<dyn StreamDetector> = Box::new(detector(3, 2.0));
        assert_eq!(d.name(), "rolling-zscore");
        assert!(d.ingest(1.0).is_ok());
        d.reset();
    }

    #[test]
    fn test_decision_serializes() {
        let mut d = detector(3, 2.0);
        let decision = d.ingest(1.0).unwrap();
        let json = serde_json::to_string(&decision).unwrap();
        assert!(json.contains("\"phase\":\"warmup\""));
        assert!(json.contains("\"path\":\"warmup\""));
        let back: Decision = serde_json::from_str(&json).unwrap();
        assert_eq!(back, decision);
    }

    #[test]
    fn test_evicted_glitch_does_not_skew_stats() {
        let cfg = DetectorConfig::new(5, 2.5).with_resync_interval(0);
        let mut d = RollingAnomalyDetector::new(cfg).unwrap();
        for v in [1e12, 1.0, 2.0, 1.0, 2.0] {
            d.ingest(v).unwrap();
        }
        for i in 0..2_000 {
            d.ingest(if i % 2 == 0 { 1.0 } else { 2.0 }).unwrap();
        }

        let batch = d.batch_stats();
        assert!((d.std_dev() - batch.std_dev()).abs() < 1e-12);
        assert!((d.std_dev() - 0.4899).abs() < 1e-4, "std {}", d.std_dev());
        assert!(d.ingest(100.0).unwrap().is_anomaly);
    }

    #[test]
    fn test_overflowing_warmup_recovers() {
        let mut d = detector(3, 2.5);
        for v in [1e200, 0.0, 0.0] {
            d.ingest(v).unwrap();
        }

        let flagged = (0..10)
            .filter(|_| d.ingest(1.0).unwrap().is_anomaly)
            .count();
        assert_eq!(flagged, 0);
        assert_eq!(d.window().to_vec(), vec![1.0, 1.0, 1.0]);
        assert_eq!(d.mean(), 1.0);
        assert_eq!(d.std_dev(), 0.0);
        assert!(d.ingest(5.0).unwrap().is_anomaly);
    }

    #[test]
    fn test_periodic_resync_runs_while_flagging() {
        let cfg = DetectorConfig::new(5, 2.5).with_early_stop(0.0);
        let mut d = RollingAnomalyDetector::new(cfg).unwrap();
        for v in [1.0, 2.0, 1.0, 2.0, 1.0] {
            d.ingest(v).unwrap();
        }

        // Zero out m2 so every value off the mean is flagged and nothing is
        // admitted
        let mut state = serde_json::to_value(&d).unwrap();
        state["stats"]["m2"] = serde_json::json!(0.0);
        let mut d: RollingAnomalyDetector = serde_json::from_value(state).unwrap();
        assert_eq!(d.std_dev(), 0.0);

        let mut decisions = Vec::new();
        for _ in 0..6 {
            decisions.push(d.ingest(1.0).unwrap());
        }
        assert!(decisions[0].is_anomaly);
        assert!(
            !decisions.last().unwrap().is_anomaly,
            "periodic resync on the anomaly path must restore the statistics"
        );
        assert!((d.std_dev() - d.batch_stats().std_dev()).abs() < 1e-12);
    }
}
