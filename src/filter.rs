// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Debounce/threshold filtering of analog sensor samples.
//!
//! The gateway's illuminance sensor is sampled every poll cycle but most
//! samples are noise. The filter turns that stream into a sparse one with
//! two guarantees:
//!
//! - any change of magnitude >= `threshold` is surfaced immediately;
//! - the sensor is never silent for longer than `debounce_period`, even
//!   with a perfectly flat signal (heartbeat).

use std::time::{Duration, Instant};

/// Threshold/debounce filter for one analog sensor.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, Instant};
/// use lumibridge::filter::DebounceFilter;
///
/// let mut filter = DebounceFilter::new(50.0, Duration::from_secs(60));
/// let t0 = Instant::now();
///
/// // First sample always publishes.
/// assert_eq!(filter.observe(500.0, t0), Some(500.0));
/// // Small wiggle inside the threshold is suppressed.
/// assert_eq!(filter.observe(549.0, t0 + Duration::from_secs(1)), None);
/// // Crossing the threshold publishes immediately.
/// assert_eq!(filter.observe(551.0, t0 + Duration::from_secs(2)), Some(551.0));
/// ```
#[derive(Debug)]
pub struct DebounceFilter {
    threshold: f64,
    debounce_period: Duration,
    last_published: Option<(f64, Instant)>,
}

impl DebounceFilter {
    /// Creates a filter with the given threshold and debounce period.
    ///
    /// A threshold of 0 publishes every sample that differs at all; a
    /// debounce period of 0 publishes every sample unconditionally.
    #[must_use]
    pub fn new(threshold: f64, debounce_period: Duration) -> Self {
        Self {
            threshold,
            debounce_period,
            last_published: None,
        }
    }

    /// Decides whether `value` is worth publishing at `now`.
    ///
    /// Returns the value to publish, updating the last-published record,
    /// or `None` when the sample is suppressed.
    pub fn observe(&mut self, value: f64, now: Instant) -> Option<f64> {
        let should_publish = match self.last_published {
            None => true,
            Some((last, at)) => {
                (value - last).abs() >= self.threshold
                    || now.saturating_duration_since(at) >= self.debounce_period
            }
        };
        if should_publish {
            self.last_published = Some((value, now));
            Some(value)
        } else {
            None
        }
    }

    /// The last value this filter published, if any.
    #[must_use]
    pub fn last_published(&self) -> Option<f64> {
        self.last_published.map(|(value, _)| value)
    }

    /// Forgets the last published value, so the next sample publishes
    /// unconditionally. Called on reconnect: a hub that just
    /// resubscribed needs a fresh snapshot, not a debounced one.
    pub fn reset(&mut self) {
        self.last_published = None;
    }
}

/// Change-only filter for a binary sensor: publishes iff the state
/// differs from the last published one, or nothing was published yet.
#[derive(Debug, Default)]
pub struct ChangeFilter {
    last: Option<bool>,
}

impl ChangeFilter {
    /// Creates a filter that has published nothing yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decides whether `state` is worth publishing.
    pub fn observe(&mut self, state: bool) -> Option<bool> {
        if self.last == Some(state) {
            None
        } else {
            self.last = Some(state);
            Some(state)
        }
    }

    /// Forgets the last published state, so the next sample publishes
    /// unconditionally.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(base: Instant, secs: u64) -> Instant {
        base + Duration::from_secs(secs)
    }

    #[test]
    fn first_sample_always_publishes() {
        let mut filter = DebounceFilter::new(50.0, Duration::from_secs(60));
        assert_eq!(filter.observe(500.0, Instant::now()), Some(500.0));
    }

    #[test]
    fn below_threshold_suppressed_above_published() {
        let base = Instant::now();
        let mut filter = DebounceFilter::new(50.0, Duration::from_secs(60));
        assert_eq!(filter.observe(500.0, base), Some(500.0));
        // 49 below threshold: suppressed.
        assert_eq!(filter.observe(549.0, t(base, 1)), None);
        // 51 at or above threshold: published.
        assert_eq!(filter.observe(551.0, t(base, 1)), Some(551.0));
    }

    #[test]
    fn delta_measured_against_last_published_not_last_seen() {
        let base = Instant::now();
        let mut filter = DebounceFilter::new(50.0, Duration::from_secs(60));
        filter.observe(500.0, base);
        assert_eq!(filter.observe(540.0, t(base, 1)), None);
        // 545 is only 5 away from the suppressed 540 but 45 from the
        // published 500: still suppressed.
        assert_eq!(filter.observe(545.0, t(base, 2)), None);
        assert_eq!(filter.observe(550.0, t(base, 3)), Some(550.0));
    }

    #[test]
    fn heartbeat_fires_on_flat_signal() {
        let base = Instant::now();
        let mut filter = DebounceFilter::new(50.0, Duration::from_secs(60));
        filter.observe(500.0, base);
        assert_eq!(filter.observe(500.0, t(base, 59)), None);
        // Identical value, but the debounce period elapsed.
        assert_eq!(filter.observe(500.0, t(base, 60)), Some(500.0));
        // And the clock resets from that publish.
        assert_eq!(filter.observe(500.0, t(base, 61)), None);
    }

    #[test]
    fn zero_threshold_publishes_any_change() {
        let base = Instant::now();
        let mut filter = DebounceFilter::new(0.0, Duration::from_secs(60));
        filter.observe(500.0, base);
        assert_eq!(filter.observe(500.5, t(base, 1)), Some(500.5));
        // A zero delta also satisfies `>= 0`, so every sample goes out.
        assert_eq!(filter.observe(500.5, t(base, 2)), Some(500.5));
    }

    #[test]
    fn zero_period_publishes_unconditionally() {
        let base = Instant::now();
        let mut filter = DebounceFilter::new(50.0, Duration::ZERO);
        filter.observe(500.0, base);
        assert_eq!(filter.observe(500.0, base), Some(500.0));
    }

    #[test]
    fn no_two_publishes_violate_the_contract() {
        let base = Instant::now();
        let threshold = 50.0;
        let period = Duration::from_secs(60);
        let mut filter = DebounceFilter::new(threshold, period);

        let samples: Vec<(f64, u64)> = vec![
            (500.0, 0),
            (520.0, 5),
            (560.0, 10),
            (560.0, 30),
            (561.0, 70),
            (700.0, 71),
        ];
        let mut published: Vec<(f64, u64)> = Vec::new();
        for &(value, secs) in &samples {
            if filter.observe(value, t(base, secs)).is_some() {
                published.push((value, secs));
            }
        }
        for pair in published.windows(2) {
            let (v0, t0) = pair[0];
            let (v1, t1) = pair[1];
            assert!(
                t1 - t0 >= 60 || (v1 - v0).abs() >= threshold,
                "published {v1} at {t1}s too close to {v0} at {t0}s"
            );
        }
    }

    #[test]
    fn reset_publishes_next_sample_inside_debounce_window() {
        let base = Instant::now();
        let mut filter = DebounceFilter::new(50.0, Duration::from_secs(60));
        filter.observe(500.0, base);
        // An unchanged sample 5s in is suppressed as usual.
        assert_eq!(filter.observe(500.0, t(base, 5)), None);
        // After a reset the identical sample goes out immediately, well
        // before the debounce period elapses.
        filter.reset();
        assert_eq!(filter.observe(500.0, t(base, 6)), Some(500.0));
    }

    #[test]
    fn change_filter_reset_republishes_same_state() {
        let mut filter = ChangeFilter::new();
        assert_eq!(filter.observe(true), Some(true));
        assert_eq!(filter.observe(true), None);
        filter.reset();
        assert_eq!(filter.observe(true), Some(true));
    }

    #[test]
    fn change_filter_publishes_edges_only() {
        let mut filter = ChangeFilter::new();
        assert_eq!(filter.observe(false), Some(false));
        assert_eq!(filter.observe(false), None);
        assert_eq!(filter.observe(true), Some(true));
        assert_eq!(filter.observe(true), None);
        assert_eq!(filter.observe(false), Some(false));
    }
}
