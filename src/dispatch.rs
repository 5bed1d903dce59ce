// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Custom command execution.
//!
//! A command entity is a shell template with `{field}` placeholders. A
//! JSON-object payload exposes every top-level field by name; a plain
//! text payload is exposed as `{text}`. Missing placeholders render as
//! the empty string, which templated shell commands tolerate.
//!
//! The shell may block indefinitely (a TTS command fetching audio over
//! the network, say), so each invocation runs on its own detached task.
//! Only that task waits on the child; the event loop learns about
//! completion through a channel and echoes `OFF` on the command's state
//! topic.

use serde_json::Value;
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::registry::CustomCommand;
use crate::types::Payload;

/// Completion notice sent back to the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDone {
    /// Id of the command entity that finished.
    pub id: String,
}

/// Spawns command invocations and reports their completion.
#[derive(Debug)]
pub struct CommandDispatcher {
    completion_tx: mpsc::Sender<CommandDone>,
}

impl CommandDispatcher {
    /// Creates a dispatcher and the completion channel the event loop
    /// listens on.
    #[must_use]
    pub fn new() -> (Self, mpsc::Receiver<CommandDone>) {
        let (completion_tx, completion_rx) = mpsc::channel(16);
        (Self { completion_tx }, completion_rx)
    }

    /// Interpolates the template and launches the shell, returning
    /// immediately.
    ///
    /// Spawn failures are logged and otherwise fire the completion
    /// notice like a normal exit; the daemon never waits inline.
    pub fn execute(&self, command: &CustomCommand, payload: &Payload) {
        let rendered = render_template(&command.template, payload);
        let id = command.id.clone();
        let completion_tx = self.completion_tx.clone();
        tracing::info!(command = %id, "running custom command");
        tokio::spawn(async move {
            run_shell(&id, &rendered).await;
            tracing::info!(command = %id, "custom command done");
            let _ = completion_tx.send(CommandDone { id }).await;
        });
    }
}

async fn run_shell(id: &str, rendered: &str) {
    let spawned = Command::new("sh")
        .arg("-c")
        .arg(rendered)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn();
    match spawned {
        Ok(mut child) => match child.wait().await {
            Ok(status) if !status.success() => {
                tracing::warn!(command = %id, %status, "custom command exited nonzero");
            }
            Ok(_) => {}
            Err(err) => {
                tracing::error!(command = %id, error = %err, "cannot wait for custom command");
            }
        },
        Err(err) => {
            tracing::error!(command = %id, error = %err, "cannot start custom command");
        }
    }
}

/// Renders `{field}` placeholders from the payload.
///
/// `{{` and `}}` are literal braces. Unterminated placeholders render
/// verbatim.
#[must_use]
pub fn render_template(template: &str, payload: &Payload) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut key = String::new();
                let mut closed = false;
                for k in chars.by_ref() {
                    if k == '}' {
                        closed = true;
                        break;
                    }
                    key.push(k);
                }
                if closed {
                    out.push_str(&lookup(payload, &key));
                } else {
                    out.push('{');
                    out.push_str(&key);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Resolves one placeholder, shell-sanitized. Missing fields are empty.
fn lookup(payload: &Payload, key: &str) -> String {
    let raw = match payload {
        Payload::Json(map) => map.get(key).map(stringify),
        Payload::Text(text) => (key == "text").then(|| text.clone()),
    };
    raw.map(|value| sanitize(&value)).unwrap_or_default()
}

/// Flattens a JSON value to the text a shell command expects: strings
/// lose their quotes, everything else keeps its JSON form.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Defangs a substituted value: quotes are escaped and `$` is stripped
/// so payload text cannot break out of the template's quoting or expand
/// variables.
fn sanitize(value: &str) -> String {
    value
        .replace('$', "")
        .replace('"', "\\\"")
        .replace('\'', "\\'")
}
