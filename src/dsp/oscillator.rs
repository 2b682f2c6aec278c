//! Waveform generators — stateless functions of frequency, time and amplitude.
//!
//! Every voice is evaluated against the shared render clock, so there is no
//! per-voice phase accumulator: the value at time `t` depends only on `t`.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::SynthError;

/// Supported waveform shapes. The discriminant is the protocol instrument id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub enum Waveform {
    #[default]
    Sine = 0,
    Square = 1,
    Triangle = 2,
    Sawtooth = 3,
    ReverseSawtooth = 4,
}

impl Waveform {
    pub const ALL: [Waveform; 5] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Triangle,
        Waveform::Sawtooth,
        Waveform::ReverseSawtooth,
    ];

    /// Protocol instrument id (0–4).
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Evaluate this waveform. See [`generate`].
    #[inline]
    pub fn sample(self, frequency: f64, time: f64, amplitude: f64) -> f64 {
        generate(self, frequency, time, amplitude)
    }
}

impl TryFrom<i64> for Waveform {
    type Error = SynthError;

    fn try_from(id: i64) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(Waveform::Sine),
            1 => Ok(Waveform::Square),
            2 => Ok(Waveform::Triangle),
            3 => Ok(Waveform::Sawtooth),
            4 => Ok(Waveform::ReverseSawtooth),
            other => Err(SynthError::UnknownInstrument(other)),
        }
    }
}

impl From<Waveform> for u8 {
    fn from(waveform: Waveform) -> Self {
        waveform.id()
    }
}

/// Generate one sample of `waveform` at `time` seconds.
///
/// The result is `0.0` for a non-positive or non-finite frequency or a
/// non-finite time, so a bad tuning can never push NaN/Inf into the mix.
#[inline]
pub fn generate(waveform: Waveform, frequency: f64, time: f64, amplitude: f64) -> f64 {
    if !(frequency > 0.0) || !frequency.is_finite() || !time.is_finite() {
        return 0.0;
    }
    match waveform {
        Waveform::Sine => sine(frequency, time, amplitude),
        Waveform::Square => square(frequency, time, amplitude),
        Waveform::Triangle => triangle(frequency, time, amplitude),
        Waveform::Sawtooth => sawtooth(frequency, time, amplitude),
        Waveform::ReverseSawtooth => reverse_sawtooth(frequency, time, amplitude),
    }
}

fn sine(frequency: f64, time: f64, amplitude: f64) -> f64 {
    amplitude * (2.0 * PI * frequency * time).sin()
}

fn square(frequency: f64, time: f64, amplitude: f64) -> f64 {
    if (2.0 * PI * frequency * time).sin() > 0.0 {
        amplitude / PI
    } else {
        -amplitude / PI
    }
}

fn triangle(frequency: f64, time: f64, amplitude: f64) -> f64 {
    (2.0 * amplitude / PI) * (2.0 * PI * frequency * time).sin().asin()
}

/// Position within the current cycle, in [0, 1).
fn cycle_phase(frequency: f64, time: f64) -> f64 {
    let period = 1.0 / frequency;
    // rem_euclid can round up to `period` itself for values just below a multiple
    (frequency * time.rem_euclid(period)).min(1.0 - f64::EPSILON)
}

fn sawtooth(frequency: f64, time: f64, amplitude: f64) -> f64 {
    (4.0 * amplitude / PI) * cycle_phase(frequency, time) - (2.0 * amplitude / PI)
}

fn reverse_sawtooth(frequency: f64, time: f64, amplitude: f64) -> f64 {
    (4.0 * amplitude / PI) * (1.0 - cycle_phase(frequency, time)) - (2.0 * amplitude / PI)
}
