//! Drives a detector over a generated stream and scores it against the
//! injected ground truth.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zstream_core::{Decision, StreamDetector};

use crate::error::SimError;
use crate::generator::StreamPoint;

/// Detection quality over a run
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RunSummary {
    pub detector: String,
    /// Points scored (pre-roll excluded)
    pub points: u64,
    pub skipped: u64,
    pub anomalies_flagged: u64,
    pub injected: u64,
    pub true_positives: u64,
    pub false_positives: u64,
    pub false_negatives: u64,
}

impl RunSummary {
    pub fn record(&mut self, point: &StreamPoint, decision: &Decision) {
        self.points += 1;
        if decision.is_anomaly {
            self.anomalies_flagged += 1;
        }
        if point.injected {
            self.injected += 1;
        }
        match (point.injected, decision.is_anomaly) {
            (true, true) => self.true_positives += 1,
            (false, true) => self.false_positives += 1,
            (true, false) => self.false_negatives += 1,
            (false, false) => {}
        }
    }

    pub fn precision(&self) -> f64 {
        let flagged = self.true_positives + self.false_positives;
        if flagged == 0 {
            return 0.0;
        }
        self.true_positives as f64 / flagged as f64
    }

    pub fn recall(&self) -> f64 {
        let actual = self.true_positives + self.false_negatives;
        if actual == 0 {
            return 0.0;
        }
        self.true_positives as f64 / actual as f64
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            return 0.0;
        }
        2.0 * p * r / (p + r)
    }
}

/// Feed `points` to `detector`.
///
/// The first `skip` points only prime the detector; the rest are passed to
/// `sink` and counted in the returned summary.
pub fn run<D, I, F>(
    detector: &mut D,
    points: I,
    skip: u64,
    mut sink: F,
) -> Result<RunSummary, SimError>
where
    D: StreamDetector + ?Sized,
    I: IntoIterator<Item = StreamPoint>,
    F: FnMut(&StreamPoint, &Decision) -> Result<(), SimError>,
{
    let mut summary = RunSummary {
        detector: detector.name().to_string(),
        ..RunSummary::default()
    };

    for point in points {
        let decision = detector.ingest(point.value)?;
        if summary.skipped < skip {
            summary.skipped += 1;
            continue;
        }
        if decision.is_anomaly {
            debug!(
                index = point.index,
                value = point.value,
                z_score = decision.z_score,
                injected = point.injected,
                "flagged"
            );
        }
        summary.record(&point, &decision);
        sink(&point, &decision)?;
    }

    info!(
        detector = %summary.detector,
        points = summary.points,
        flagged = summary.anomalies_flagged,
        injected = summary.injected,
        precision = summary.precision(),
        recall = summary.recall(),
        f1 = summary.f1(),
        "run complete"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{StreamConfig, StreamGenerator};
    use zstream_core::{DetectorConfig, RollingAnomalyDetector};

    fn point(index: u64, value: f64, injected: bool) -> StreamPoint {
        StreamPoint {
            index,
            value,
            injected,
        }
    }

    #[test]
    fn test_summary_metrics() {
        let summary = RunSummary {
            true_positives: 8,
            false_positives: 2,
            false_negatives: 8,
            ..RunSummary::default()
        };
        assert!((summary.precision() - 0.8).abs() < 1e-12);
        assert!((summary.recall() - 0.5).abs() < 1e-12);
        assert!((summary.f1() - 2.0 * 0.8 * 0.5 / 1.3).abs() < 1e-12);

        let empty = RunSummary::default();
        assert_eq!(empty.precision(), 0.0);
        assert_eq!(empty.recall(), 0.0);
        assert_eq!(empty.f1(), 0.0);
    }

    #[test]
    fn test_run_skips_preroll_and_scores() {
        let mut detector =
            RollingAnomalyDetector::new(DetectorConfig::new(5, 3.0).with_early_stop(0.0)).unwrap();
        let points = vec![
            point(0, 1.0, false),
            point(1, 2.0, false),
            point(2, 1.0, false),
            point(3, 2.0, false),
            point(4, 1.0, false),
            point(5, 1.5, false),
            point(6, 90.0, true),
            point(7, 1.2, true),
            point(8, -80.0, false),
        ];

        let mut seen = Vec::new();
        let summary = run(&mut detector, points, 5, |p, d| {
            seen.push((p.index, d.is_anomaly));
            Ok(())
        })
        .unwrap();

        assert_eq!(summary.skipped, 5);
        assert_eq!(summary.points, 4);
        assert_eq!(seen.first(), Some(&(5, false)));
        assert_eq!(summary.true_positives, 1);
        assert_eq!(summary.false_negatives, 1);
        assert_eq!(summary.false_positives, 1);
        assert_eq!(summary.injected, 2);
        assert_eq!(summary.anomalies_flagged, 2);
        assert_eq!(summary.detector, "rolling-zscore");
    }

    #[test]
    fn test_sink_error_stops_run() {
        let mut detector = RollingAnomalyDetector::new(DetectorConfig::new(3, 2.0)).unwrap();
        let points = (0..10).map(|i| point(i, i as f64, false));
        let result = run(&mut detector, points, 0, |p, _| {
            if p.index == 4 {
                return Err(SimError::Stream("sink closed".into()));
            }
            Ok(())
        });
        assert!(result.is_err());
        assert_eq!(detector.processed(), 5);
    }

    #[test]
    fn test_detects_injected_spikes() {
        let stream = StreamConfig {
            noise_level: 0.1,
            drift_rate: 0.0,
            anomaly_chance: 0.02,
            anomaly_magnitude: 8.0,
            ..StreamConfig::default()
        };
        let points = StreamGenerator::new(stream, 11).unwrap().take(3_000);
        let mut detector = RollingAnomalyDetector::new(
            DetectorConfig::new(70, 3.0).with_early_stop(0.1),
        )
        .unwrap();

        let summary = run(&mut detector, points, 200, |_, _| Ok(())).unwrap();

        assert!(summary.injected > 0);
        assert!(
            summary.recall() > 0.8,
            "large spikes should be caught: {:?}",
            summary
        );
        assert!(
            summary.precision() > 0.5,
            "seasonal swing should mostly stay under threshold: {:?}",
            summary
        );
    }
}
