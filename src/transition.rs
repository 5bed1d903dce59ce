// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Light transition controller.
//!
//! Owns the authoritative light state and animates it toward requested
//! targets. A transition linearly interpolates brightness and each color
//! channel from the state at request time to the target, sampling at a
//! fixed cadence until the deadline, then snapping exactly to the target.
//!
//! Two rules keep the state machine simple:
//!
//! - at most one transition is in flight; a new request replaces any
//!   running one, restarting from whatever the current state is at that
//!   instant (last-writer-wins, no queueing);
//! - `power: false` is never interpolated. It takes effect immediately,
//!   cancelling any in-flight animation, so the bridge never animates
//!   toward an undefined color after the device went dark.

use std::time::{Duration, Instant};

use crate::types::{LightRequest, LightState, PowerState};

/// Default animation cadence: 10 interpolation steps per second.
pub const DEFAULT_CADENCE: Duration = Duration::from_millis(100);

/// An in-flight interpolation toward a target state.
#[derive(Debug, Clone)]
struct TransitionPlan {
    start_brightness: u8,
    start_color: crate::types::RgbColor,
    target: LightState,
    started_at: Instant,
    deadline: Instant,
}

impl TransitionPlan {
    /// Samples the plan at `now`, clamping progress to `[0, 1]`.
    fn sample(&self, now: Instant) -> LightState {
        let total = self.deadline.saturating_duration_since(self.started_at);
        let elapsed = now.saturating_duration_since(self.started_at);
        let progress = if total.is_zero() {
            1.0
        } else {
            (elapsed.as_secs_f64() / total.as_secs_f64()).clamp(0.0, 1.0)
        };
        let brightness = f64::from(self.start_brightness)
            + (f64::from(self.target.brightness) - f64::from(self.start_brightness)) * progress;
        // Both endpoints are u8, so the rounded value stays in range.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let brightness = brightness.round().clamp(0.0, 255.0) as u8;
        LightState {
            // The light is visibly on for the whole animation.
            state: PowerState::On,
            brightness,
            color: self.start_color.lerp(self.target.color, progress),
        }
    }
}

/// Owns the light state and serializes all transitions against it.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, Instant};
/// use lumibridge::transition::TransitionController;
/// use lumibridge::types::{LightRequest, LightState, PowerState};
///
/// let mut controller =
///     TransitionController::new(LightState::default(), Duration::from_secs(1));
/// let now = Instant::now();
/// let request = LightRequest {
///     state: Some(PowerState::On),
///     brightness: Some(100),
///     transition: Some(0.0),
///     ..LightRequest::default()
/// };
/// // Zero duration applies immediately.
/// let published = controller.request(&request, now).unwrap();
/// assert_eq!(published.brightness, 100);
/// assert!(!controller.is_active());
/// ```
#[derive(Debug)]
pub struct TransitionController {
    current: LightState,
    plan: Option<TransitionPlan>,
    default_duration: Duration,
    cadence: Duration,
}

impl TransitionController {
    /// Creates a controller owning `initial` as the current light state.
    ///
    /// `default_duration` is used for requests that carry no `transition`
    /// field.
    #[must_use]
    pub fn new(initial: LightState, default_duration: Duration) -> Self {
        Self {
            current: initial,
            plan: None,
            default_duration,
            cadence: DEFAULT_CADENCE,
        }
    }

    /// Overrides the animation cadence.
    #[must_use]
    pub fn with_cadence(mut self, cadence: Duration) -> Self {
        self.cadence = cadence;
        self
    }

    /// The animation cadence (interval between interpolation steps).
    #[must_use]
    pub fn cadence(&self) -> Duration {
        self.cadence
    }

    /// The current light state.
    #[must_use]
    pub fn current(&self) -> LightState {
        self.current
    }

    /// Whether a transition is in flight.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.plan.is_some()
    }

    /// Handles a `set` request.
    ///
    /// Returns `Some(state)` when the request applied immediately (power
    /// off, zero duration, or already at the target); the caller should
    /// publish that state once. Returns `None` when an animation was
    /// scheduled; the caller should then drive [`tick`](Self::tick) at
    /// the cadence until it reports completion.
    ///
    /// Any in-flight transition is cancelled and replaced: once this
    /// returns, no tick can ever produce a state interpolated toward the
    /// previous target.
    pub fn request(&mut self, request: &LightRequest, now: Instant) -> Option<LightState> {
        let target = request.resolve(&self.current);
        let duration = request
            .transition
            .map_or(self.default_duration, |secs| {
                Duration::from_secs_f64(secs.max(0.0))
            });

        // Power off is authoritative and immediate, never animated.
        if !target.state.is_on() {
            self.plan = None;
            self.current = target;
            return Some(self.current);
        }

        let start_brightness = self.current.effective_brightness();
        let start_color = self.current.color;

        if duration.is_zero()
            || (start_brightness == target.brightness && start_color == target.color)
        {
            self.plan = None;
            self.current = target;
            return Some(self.current);
        }

        self.plan = Some(TransitionPlan {
            start_brightness,
            start_color,
            target,
            started_at: now,
            deadline: now + duration,
        });
        None
    }

    /// Advances the active transition to `now`.
    ///
    /// Returns the interpolated state to publish, or `None` when no
    /// transition is active. At or past the deadline the state snaps
    /// exactly to the target and the transition is cleared.
    pub fn tick(&mut self, now: Instant) -> Option<LightState> {
        let plan = self.plan.as_ref()?;
        if now >= plan.deadline {
            self.current = plan.target;
            self.plan = None;
        } else {
            self.current = plan.sample(now);
        }
        Some(self.current)
    }
}
