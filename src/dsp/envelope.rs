//! ADSR envelope evaluated from note timestamps.
//!
//! Unlike a gated envelope that steps per sample, this envelope is a pure
//! function of when the note went down, when (if ever) it came up, and the
//! current render-clock time, all in milliseconds.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SynthError};

/// Amplitudes below this value snap to exactly zero. A released note whose
/// envelope is zero is fully silent and may be retired.
pub const SILENCE_THRESHOLD: f64 = 0.001;

/// Envelope shape. Durations are in milliseconds, amplitudes in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeParams {
    #[serde(rename = "attackMs")]
    pub attack_ms: f64,
    /// Peak reached at the end of the attack.
    #[serde(rename = "attackAmplitude")]
    pub attack_amplitude: f64,
    #[serde(rename = "decayMs")]
    pub decay_ms: f64,
    #[serde(rename = "sustainAmplitude")]
    pub sustain_amplitude: f64,
    #[serde(rename = "releaseMs")]
    pub release_ms: f64,
    /// Hard cutoff measured from note-down, if set.
    #[serde(rename = "maxDurationMs", default, skip_serializing_if = "Option::is_none")]
    pub max_duration_ms: Option<f64>,
}

impl Default for EnvelopeParams {
    fn default() -> Self {
        Self {
            attack_ms: 100.0,
            attack_amplitude: 1.0,
            decay_ms: 10.0,
            sustain_amplitude: 0.8,
            release_ms: 100.0,
            max_duration_ms: None,
        }
    }
}

impl EnvelopeParams {
    /// Check that every duration is finite and non-negative and every
    /// amplitude lies in [0, 1].
    pub fn validate(&self) -> Result<()> {
        let durations = [
            ("attackMs", self.attack_ms),
            ("decayMs", self.decay_ms),
            ("releaseMs", self.release_ms),
        ];
        for (name, value) in durations {
            if !value.is_finite() || value < 0.0 {
                return Err(SynthError::InvalidConfig(format!(
                    "envelope {name} must be a finite, non-negative duration, got {value}"
                )));
            }
        }
        if let Some(max) = self.max_duration_ms {
            if !max.is_finite() || max < 0.0 {
                return Err(SynthError::InvalidConfig(format!(
                    "envelope maxDurationMs must be finite and non-negative, got {max}"
                )));
            }
        }
        let amplitudes = [
            ("attackAmplitude", self.attack_amplitude),
            ("sustainAmplitude", self.sustain_amplitude),
        ];
        for (name, value) in amplitudes {
            if !(0.0..=1.0).contains(&value) {
                return Err(SynthError::InvalidConfig(format!(
                    "envelope {name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Evaluate the envelope at `now`.
///
/// - `down`: when the note was pressed.
/// - `up`: when it was released, if it has been.
/// - `now`: the current render-clock time.
///
/// Once `now` reaches `up`, the release ramp applies and always starts from
/// the sustain amplitude, even if attack or decay had not finished.
pub fn envelope(down: f64, up: Option<f64>, now: f64, params: &EnvelopeParams) -> f64 {
    if now < down {
        return 0.0;
    }
    let elapsed = now - down;

    if let Some(max) = params.max_duration_ms {
        if elapsed > max {
            return 0.0;
        }
    }

    let level = match up {
        Some(up) if now >= up => release_level(now - up, params),
        _ => held_level(elapsed, params),
    };

    snap(level.clamp(0.0, 1.0))
}

fn held_level(elapsed: f64, params: &EnvelopeParams) -> f64 {
    let attack_end = params.attack_ms;
    let decay_end = attack_end + params.decay_ms;

    if elapsed <= attack_end && params.attack_ms > 0.0 {
        params.attack_amplitude * (elapsed / params.attack_ms)
    } else if elapsed <= decay_end && params.decay_ms > 0.0 {
        let t = (elapsed - attack_end) / params.decay_ms;
        params.attack_amplitude + (params.sustain_amplitude - params.attack_amplitude) * t
    } else {
        params.sustain_amplitude
    }
}

fn release_level(since_release: f64, params: &EnvelopeParams) -> f64 {
    if since_release >= params.release_ms {
        0.0
    } else {
        params.sustain_amplitude * (1.0 - since_release / params.release_ms)
    }
}

#[inline]
fn snap(level: f64) -> f64 {
    if level < SILENCE_THRESHOLD { 0.0 } else { level }
}
