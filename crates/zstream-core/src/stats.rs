//! Rolling mean/variance over the window contents.
//!
//! Growth uses Welford's update; once the window is full each admit replaces
//! the evicted value's contribution in a single step, so the cost per value
//! is constant. Variance is the population variance (`m2 / n`).
//!
//! Values are accumulated relative to `shift` (the first value seen since the
//! last reset or resync), so a large common offset does not eat the
//! precision of the spread. Removing a value that dominated `m2` cancels
//! most of its digits; `admit` reports that case so the owner can recompute
//! from the window.

use serde::{Deserialize, Serialize};

/// Once `m2` falls this far below its peak since the last recomputation, the
/// rounding carried over from the peak is no longer negligible.
const CANCELLATION_RATIO: f64 = 1e3;

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct RollingStats {
    count: usize,
    shift: f64,
    /// Mean of `value - shift`
    mean: f64,
    m2: f64,
    /// Largest `m2` since the last reset or resync
    peak: f64,
}

impl RollingStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value`, optionally replacing `evicted` which just left the window.
    ///
    /// Returns `true` when the incremental state lost precision and should be
    /// resynced from the window contents.
    #[must_use]
    pub fn admit(&mut self, value: f64, evicted: Option<f64>) -> bool {
        match evicted {
            Some(old) if self.count > 0 => self.replace(old, value),
            _ => {
                self.push(value);
                !self.is_finite()
            }
        }
    }

    fn push(&mut self, value: f64) {
        if self.count == 0 {
            self.shift = value;
            self.mean = 0.0;
            self.m2 = 0.0;
        }
        let y = value - self.shift;
        self.count += 1;
        let delta = y - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (y - self.mean);
        self.peak = self.peak.max(self.m2);
    }

    fn replace(&mut self, old: f64, value: f64) -> bool {
        let n = self.count as f64;
        let y_old = old - self.shift;
        let y_new = value - self.shift;
        let old_mean = self.mean;
        let diff = y_new - y_old;
        self.mean = old_mean + diff / n;
        self.m2 += diff * (y_new - self.mean + y_old - old_mean);
        if self.m2 < 0.0 {
            self.m2 = 0.0;
        }

        let lost = !self.is_finite() || self.m2 * CANCELLATION_RATIO < self.peak;
        self.peak = self.peak.max(self.m2);
        lost
    }

    fn is_finite(&self) -> bool {
        self.mean.is_finite() && self.m2.is_finite()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.shift + self.mean
    }

    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        (self.m2 / self.count as f64).max(0.0)
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Recompute from scratch (two-pass, shifted by the first value)
    pub fn batch<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
        I::IntoIter: Clone,
    {
        let iter = values.into_iter();
        let Some(shift) = iter.clone().next() else {
            return Self::default();
        };
        let (count, sum) = iter
            .clone()
            .fold((0usize, 0.0), |(n, s), v| (n + 1, s + (v - shift)));
        let mean = sum / count as f64;
        let m2 = iter
            .map(|v| {
                let d = (v - shift) - mean;
                d * d
            })
            .sum();
        Self {
            count,
            shift,
            mean,
            m2,
            peak: m2,
        }
    }

    /// Replace incremental state with a batch recomputation
    pub fn resync<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = f64>,
        I::IntoIter: Clone,
    {
        *self = Self::batch(values);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
