// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Button edge events from a Linux input device.
//!
//! Reading `/dev/input/eventN` blocks until the next event, so the read
//! loop runs on its own thread and forwards edges into the event loop
//! over a tokio channel. The thread exits when the receiving side is
//! dropped.
//!
//! Events are the kernel's `struct input_event`: a timeval (two
//! pointer-sized words), then `type: u16`, `code: u16`, `value: i32`.
//! Only `EV_KEY` events matching the configured scancodes are forwarded;
//! value 1 is a press, 0 a release (2, auto-repeat, is ignored).

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::error::HardwareError;
use crate::hal::Edge;

/// Kernel event type for key/button events.
const EV_KEY: u16 = 0x01;

/// Scancode of the gateway's button (`BTN_0`).
pub const BTN_0: u16 = 0x100;

/// Default input device carrying the gateway button.
pub const DEFAULT_BUTTON_DEVICE: &str = "/dev/input/event0";

/// Size of the timeval prefix in `struct input_event`.
const TIME_SIZE: usize = 2 * size_of::<usize>();

/// Total size of `struct input_event` on this platform.
const EVENT_SIZE: usize = TIME_SIZE + 2 + 2 + 4;

/// Decodes the (type, code, value) triple of one raw event record.
fn decode_event(buf: &[u8; EVENT_SIZE]) -> (u16, u16, i32) {
    let kind = u16::from_ne_bytes([buf[TIME_SIZE], buf[TIME_SIZE + 1]]);
    let code = u16::from_ne_bytes([buf[TIME_SIZE + 2], buf[TIME_SIZE + 3]]);
    let value = i32::from_ne_bytes([
        buf[TIME_SIZE + 4],
        buf[TIME_SIZE + 5],
        buf[TIME_SIZE + 6],
        buf[TIME_SIZE + 7],
    ]);
    (kind, code, value)
}

/// Maps a raw event to an [`Edge`], filtering by scancode.
fn edge_for(kind: u16, code: u16, value: i32, scancodes: &[u16]) -> Option<Edge> {
    if kind != EV_KEY || (!scancodes.is_empty() && !scancodes.contains(&code)) {
        return None;
    }
    match value {
        1 => Some(Edge::Press),
        0 => Some(Edge::Release),
        _ => None,
    }
}

/// A button wired to a Linux input device.
#[derive(Debug, Clone)]
pub struct InputButton {
    path: PathBuf,
    scancodes: Vec<u16>,
}

impl InputButton {
    /// Creates a button reader for the given device, forwarding only the
    /// listed scancodes (an empty list forwards every key).
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, scancodes: Vec<u16>) -> Self {
        Self {
            path: path.into(),
            scancodes,
        }
    }

    /// Opens the device and spawns the blocking reader thread.
    ///
    /// Edges arrive on the returned channel. The thread stops when the
    /// receiver is dropped or the device read fails.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError`] when the device cannot be opened.
    pub fn spawn_reader(&self) -> Result<mpsc::Receiver<Edge>, HardwareError> {
        let mut file = File::open(&self.path).map_err(|source| HardwareError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        let (tx, rx) = mpsc::channel(16);
        let path = self.path.clone();
        let scancodes = self.scancodes.clone();
        std::thread::Builder::new()
            .name("button-reader".to_string())
            .spawn(move || {
                let mut buf = [0u8; EVENT_SIZE];
                loop {
                    if let Err(err) = file.read_exact(&mut buf) {
                        tracing::warn!(path = %path.display(), error = %err, "button device read failed");
                        return;
                    }
                    let (kind, code, value) = decode_event(&buf);
                    if let Some(edge) = edge_for(kind, code, value, &scancodes) {
                        if tx.blocking_send(edge).is_err() {
                            return;
                        }
                    }
                }
            })
            .map_err(|source| HardwareError::Io {
                path: self.path.display().to_string(),
                source,
            })?;
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_event(kind: u16, code: u16, value: i32) -> [u8; EVENT_SIZE] {
        let mut buf = [0u8; EVENT_SIZE];
        buf[TIME_SIZE..TIME_SIZE + 2].copy_from_slice(&kind.to_ne_bytes());
        buf[TIME_SIZE + 2..TIME_SIZE + 4].copy_from_slice(&code.to_ne_bytes());
        buf[TIME_SIZE + 4..].copy_from_slice(&value.to_ne_bytes());
        buf
    }

    #[test]
    fn decodes_key_press() {
        let buf = raw_event(EV_KEY, BTN_0, 1);
        let (kind, code, value) = decode_event(&buf);
        assert_eq!((kind, code, value), (EV_KEY, BTN_0, 1));
        assert_eq!(edge_for(kind, code, value, &[BTN_0]), Some(Edge::Press));
    }

    #[test]
    fn release_and_repeat() {
        assert_eq!(edge_for(EV_KEY, BTN_0, 0, &[BTN_0]), Some(Edge::Release));
        // Auto-repeat events are dropped.
        assert_eq!(edge_for(EV_KEY, BTN_0, 2, &[BTN_0]), None);
    }

    #[test]
    fn filters_foreign_scancodes_and_types() {
        assert_eq!(edge_for(EV_KEY, 0x101, 1, &[BTN_0]), None);
        // EV_SYN markers never map to edges.
        assert_eq!(edge_for(0x00, BTN_0, 1, &[BTN_0]), None);
        // Empty filter accepts any key.
        assert_eq!(edge_for(EV_KEY, 0x101, 1, &[]), Some(Edge::Press));
    }
}
