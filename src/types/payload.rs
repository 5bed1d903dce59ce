// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inbound payload decoding: JSON object or opaque text.
//!
//! Payloads on `set` topics are decoded exactly once, at the router
//! boundary. Downstream handlers pattern-match on the variant instead of
//! probing the bytes again.

use serde_json::{Map, Value};

/// A decoded inbound payload.
///
/// JSON decoding is attempted first; anything that is not a JSON object
/// falls back to [`Payload::Text`] with the raw bytes interpreted as
/// UTF-8 (lossily). Custom commands receive text payloads verbatim under
/// the `text` template placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A JSON object with named fields.
    Json(Map<String, Value>),
    /// Anything else, kept as opaque text.
    Text(String),
}

impl Payload {
    /// Decodes raw payload bytes.
    ///
    /// Only a top-level JSON *object* counts as [`Payload::Json`]; bare
    /// JSON scalars (`5`, `"on"`, `true`) are treated as text, matching
    /// how plain `ON`/`OFF` switch payloads arrive.
    #[must_use]
    pub fn decode(raw: &[u8]) -> Self {
        if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(raw) {
            return Self::Json(map);
        }
        Self::Text(String::from_utf8_lossy(raw).into_owned())
    }

    /// Returns the JSON object, if this payload is one.
    #[must_use]
    pub fn as_json(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Json(map) => Some(map),
            Self::Text(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_json_object() {
        let payload = Payload::decode(br#"{"state": "ON"}"#);
        let map = payload.as_json().expect("should be JSON");
        assert_eq!(map.get("state"), Some(&Value::String("ON".into())));
    }

    #[test]
    fn plain_text_falls_back() {
        assert_eq!(Payload::decode(b"hello"), Payload::Text("hello".into()));
    }

    #[test]
    fn bare_json_scalar_is_text() {
        assert_eq!(Payload::decode(b"42"), Payload::Text("42".into()));
        assert_eq!(Payload::decode(b"\"on\""), Payload::Text("\"on\"".into()));
    }

    #[test]
    fn malformed_json_is_text() {
        assert_eq!(
            Payload::decode(b"{not json"),
            Payload::Text("{not json".into())
        );
    }

    #[test]
    fn invalid_utf8_is_lossy_text() {
        let payload = Payload::decode(&[0xff, 0xfe, b'x']);
        assert!(matches!(payload, Payload::Text(ref s) if s.ends_with('x')));
    }
}
