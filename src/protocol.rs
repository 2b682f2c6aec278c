//! Control protocol — the messages exchanged between the control surface and
//! the render engine.
//!
//! On the wire (AudioWorklet port, JSON) every message is an object tagged by
//! its `type` field, e.g. `{"type": "noteDown", "pitchName": "C#"}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dsp::oscillator::Waveform;
use crate::error::{Result, SynthError};
use crate::pitch::Pitch;

/// Commands sent from the control surface to the render engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControlMessage {
    NoteDown {
        #[serde(rename = "pitchName", alias = "note")]
        note: Pitch,
    },
    NoteUp {
        #[serde(rename = "pitchName", alias = "note")]
        note: Pitch,
    },
    ChangeInstrument {
        instrument: Waveform,
    },
    ShiftBaseFrequency {
        #[serde(rename = "semitoneCount")]
        semitone_count: i32,
    },
    StartDebugCapture,
    EndDebugCapture,
}

/// Every `type` tag the render engine understands.
pub const CONTROL_MESSAGE_TYPES: [&str; 6] = [
    "noteDown",
    "noteUp",
    "changeInstrument",
    "shiftBaseFrequency",
    "startDebugCapture",
    "endDebugCapture",
];

impl ControlMessage {
    /// Decode a message from its JSON value.
    ///
    /// A `type` outside [`CONTROL_MESSAGE_TYPES`] is a protocol violation and
    /// yields [`SynthError::UnknownMessage`]; it is never silently skipped.
    pub fn decode(value: Value) -> Result<Self> {
        match value.get("type").and_then(Value::as_str) {
            None => {
                return Err(SynthError::MalformedMessage(
                    "missing string field 'type'".to_string(),
                ));
            }
            Some(kind) if !CONTROL_MESSAGE_TYPES.contains(&kind) => {
                return Err(SynthError::UnknownMessage {
                    kind: kind.to_string(),
                });
            }
            Some(_) => {}
        }
        serde_json::from_value(value).map_err(|e| SynthError::MalformedMessage(e.to_string()))
    }

    /// Decode a message from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| SynthError::MalformedMessage(e.to_string()))?;
        Self::decode(value)
    }

    pub fn to_json(&self) -> String {
        // Serializing a plain enum of strings and numbers cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Notifications sent from the render engine back to the control surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Notification {
    /// No note is audible any more; the output sink may be disconnected.
    Silence,
    /// Raw output samples captured between start/end debug capture.
    DebugInfo { samples: Vec<f32> },
}
