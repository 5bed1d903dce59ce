// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Multi-press pattern classification for the physical button.
//!
//! The tracker consumes press/release edges and reports a gesture once
//! the stream settles: no edge for [`SETTLE_TIMEOUT`] after activity.
//! Click count plus held-or-not at settle time selects the action
//! (single/double/... or the `_hold` variants). A release after a
//! reported hold produces [`ButtonAction::Release`].
//!
//! The tracker itself is a pure state machine; the event loop owns the
//! settle timer and calls [`ClickTracker::on_settle`] when it fires.

use std::time::Duration;

use crate::hal::Edge;
use crate::types::ButtonAction;

/// Quiet period after which a click sequence is considered finished.
pub const SETTLE_TIMEOUT: Duration = Duration::from_millis(300);

/// Classifies button edges into multi-press gestures.
///
/// # Examples
///
/// ```
/// use lumibridge::button::ClickTracker;
/// use lumibridge::hal::Edge;
/// use lumibridge::types::ButtonAction;
///
/// let mut tracker = ClickTracker::new();
/// tracker.on_edge(Edge::Press);
/// tracker.on_edge(Edge::Release);
/// tracker.on_edge(Edge::Press);
/// tracker.on_edge(Edge::Release);
/// // Stream settles: two completed clicks.
/// assert_eq!(tracker.on_settle(), Some(ButtonAction::Double));
/// ```
#[derive(Debug, Default)]
pub struct ClickTracker {
    pressed: bool,
    /// A hold action was reported and the button is still down.
    hold_reported: bool,
    clicks: u32,
}

impl ClickTracker {
    /// Creates an idle tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the settle timer should be armed: there is activity that
    /// has not been classified yet.
    #[must_use]
    pub fn armed(&self) -> bool {
        (self.pressed && !self.hold_reported) || self.clicks > 0
    }

    /// Feeds one edge. Returns an action only for the release that ends
    /// a reported hold; everything else waits for the settle timer.
    pub fn on_edge(&mut self, edge: Edge) -> Option<ButtonAction> {
        if self.armed() {
            match edge {
                Edge::Press => self.pressed = true,
                Edge::Release => {
                    self.pressed = false;
                    self.clicks += 1;
                }
            }
            return None;
        }
        match edge {
            Edge::Press => {
                self.pressed = true;
                self.hold_reported = false;
                None
            }
            Edge::Release => {
                self.pressed = false;
                let was_held = self.hold_reported;
                self.hold_reported = false;
                was_held.then_some(ButtonAction::Release)
            }
        }
    }

    /// Classifies the accumulated edges when the stream settles.
    ///
    /// Returns `None` when there is nothing to classify (the timer fired
    /// while idle).
    pub fn on_settle(&mut self) -> Option<ButtonAction> {
        if !self.armed() {
            return None;
        }
        let action = match (self.pressed, self.clicks) {
            (false, 1) => ButtonAction::Single,
            (false, 2) => ButtonAction::Double,
            (false, 3) => ButtonAction::Triple,
            (false, 4) => ButtonAction::Quadruple,
            (false, _) => ButtonAction::Many,
            (true, 0) => ButtonAction::Hold,
            (true, 1) => ButtonAction::DoubleHold,
            (true, 2) => ButtonAction::TripleHold,
            (true, 3) => ButtonAction::QuadrupleHold,
            (true, _) => ButtonAction::ManyHold,
        };
        self.hold_reported = self.pressed;
        self.clicks = 0;
        Some(action)
    }
}
