//! Pitch table — the 12 pitch classes and their semitone offsets from A.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SynthError;

/// Number of distinct pitch classes.
pub const PITCH_COUNT: usize = 12;

/// One of the 12 pitch classes, ordered by semitone offset from A.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Pitch {
    A,
    ASharp,
    B,
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
}

/// Every pitch in offset order; `ALL[i].semitone_offset() == i`.
pub const ALL: [Pitch; PITCH_COUNT] = [
    Pitch::A,
    Pitch::ASharp,
    Pitch::B,
    Pitch::C,
    Pitch::CSharp,
    Pitch::D,
    Pitch::DSharp,
    Pitch::E,
    Pitch::F,
    Pitch::FSharp,
    Pitch::G,
    Pitch::GSharp,
];

impl Pitch {
    /// Semitone offset 0–11 above the base pitch A.
    pub const fn semitone_offset(self) -> usize {
        self as usize
    }

    /// Inverse of [`Pitch::semitone_offset`].
    pub fn from_offset(offset: usize) -> Option<Pitch> {
        ALL.get(offset).copied()
    }

    /// Canonical (sharp) spelling.
    pub const fn name(self) -> &'static str {
        match self {
            Pitch::A => "A",
            Pitch::ASharp => "A#",
            Pitch::B => "B",
            Pitch::C => "C",
            Pitch::CSharp => "C#",
            Pitch::D => "D",
            Pitch::DSharp => "D#",
            Pitch::E => "E",
            Pitch::F => "F",
            Pitch::FSharp => "F#",
            Pitch::G => "G",
            Pitch::GSharp => "G#",
        }
    }

    /// Frequency of this pitch relative to `base_frequency` (the frequency of A).
    ///
    /// Formula: `base_frequency * 2^(offset / 12)`
    pub fn frequency(self, base_frequency: f64) -> f64 {
        base_frequency * (2.0_f64).powf(self.semitone_offset() as f64 / 12.0)
    }
}

impl FromStr for Pitch {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let pitch = match s {
            "A" => Pitch::A,
            "A#" | "Bb" => Pitch::ASharp,
            "B" => Pitch::B,
            "C" => Pitch::C,
            "C#" | "Db" => Pitch::CSharp,
            "D" => Pitch::D,
            "D#" | "Eb" => Pitch::DSharp,
            "E" => Pitch::E,
            "F" => Pitch::F,
            "F#" | "Gb" => Pitch::FSharp,
            "G" => Pitch::G,
            "G#" | "Ab" => Pitch::GSharp,
            _ => return Err(SynthError::UnknownPitch(s.to_string())),
        };
        Ok(pitch)
    }
}

impl TryFrom<String> for Pitch {
    type Error = SynthError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Pitch> for String {
    fn from(pitch: Pitch) -> Self {
        pitch.name().to_string()
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
