// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Button action vocabulary published on the button's action topic.

use std::fmt;

use serde::Serialize;

/// A classified button gesture.
///
/// The classifier counts completed clicks within a settle window and
/// whether the button is still held when the window closes. Five or more
/// clicks collapse into the `many` variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonAction {
    /// One click.
    Single,
    /// Two clicks.
    Double,
    /// Three clicks.
    Triple,
    /// Four clicks.
    Quadruple,
    /// Five or more clicks.
    Many,
    /// Press held past the settle window with no prior click.
    Hold,
    /// One click, then a hold.
    DoubleHold,
    /// Two clicks, then a hold.
    TripleHold,
    /// Three clicks, then a hold.
    QuadrupleHold,
    /// Four or more clicks, then a hold.
    ManyHold,
    /// Button released after a hold was reported.
    Release,
}

impl ButtonAction {
    /// Every action this bridge can emit, in discovery order.
    pub const ALL: [Self; 11] = [
        Self::Single,
        Self::Double,
        Self::Triple,
        Self::Quadruple,
        Self::Many,
        Self::Hold,
        Self::DoubleHold,
        Self::TripleHold,
        Self::QuadrupleHold,
        Self::ManyHold,
        Self::Release,
    ];

    /// The wire name of this action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Double => "double",
            Self::Triple => "triple",
            Self::Quadruple => "quadruple",
            Self::Many => "many",
            Self::Hold => "hold",
            Self::DoubleHold => "double_hold",
            Self::TripleHold => "triple_hold",
            Self::QuadrupleHold => "quadruple_hold",
            Self::ManyHold => "many_hold",
            Self::Release => "release",
        }
    }
}

impl fmt::Display for ButtonAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
