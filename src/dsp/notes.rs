//! Note registry — the set of sounding notes, one slot per pitch class.

use crate::pitch::{self, PITCH_COUNT, Pitch};

use super::envelope::{EnvelopeParams, envelope};

/// Timeline of one sounding pitch, in render-clock milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    /// When the pitch was most recently pressed.
    pub down_time_ms: f64,
    /// When the pitch was released, `None` while held.
    pub up_time_ms: Option<f64>,
}

impl Note {
    pub fn pressed(now_ms: f64) -> Self {
        Note {
            down_time_ms: now_ms,
            up_time_ms: None,
        }
    }

    pub fn is_released(&self) -> bool {
        self.up_time_ms.is_some()
    }

    /// Whether the release has taken effect by `now_ms`. A release stamped
    /// later than `now_ms` still counts as held.
    pub fn is_released_by(&self, now_ms: f64) -> bool {
        self.up_time_ms.is_some_and(|up| now_ms >= up)
    }

    /// Envelope amplitude of this note at `now_ms`.
    #[inline]
    pub fn amplitude(&self, now_ms: f64, params: &EnvelopeParams) -> f64 {
        envelope(self.down_time_ms, self.up_time_ms, now_ms, params)
    }

    /// A released note whose envelope has reached exactly zero.
    #[inline]
    pub fn is_finished(&self, now_ms: f64, params: &EnvelopeParams) -> bool {
        self.is_released_by(now_ms) && self.amplitude(now_ms, params) == 0.0
    }
}

/// Fixed-capacity map from pitch to [`Note`].
///
/// Indexed by semitone offset, so lookups are O(1) and the registry never
/// allocates. A pitch can only ever occupy its own slot, which makes
/// duplicate entries impossible.
#[derive(Debug, Clone, Default)]
pub struct NoteRegistry {
    slots: [Option<Note>; PITCH_COUNT],
}

impl NoteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Press `pitch`. A held or releasing pitch is re-triggered: its down time
    /// resets and any release is cleared.
    pub fn note_down(&mut self, pitch: Pitch, now_ms: f64) {
        self.slots[pitch.semitone_offset()] = Some(Note::pressed(now_ms));
    }

    /// Release `pitch`. No-op if the pitch is not active or already released.
    pub fn note_up(&mut self, pitch: Pitch, now_ms: f64) {
        if let Some(note) = &mut self.slots[pitch.semitone_offset()] {
            if note.up_time_ms.is_none() {
                note.up_time_ms = Some(now_ms);
            }
        }
    }

    /// Remove every released note whose envelope is zero at `now_ms`.
    /// Held notes are kept regardless of their level. Returns how many
    /// notes were removed.
    pub fn prune(&mut self, now_ms: f64, params: &EnvelopeParams) -> usize {
        self.retain(|_, note| !note.is_finished(now_ms, params))
    }

    /// Visit every active note in pitch order, keeping those for which `keep`
    /// returns true. Returns how many notes were removed.
    pub fn retain(&mut self, mut keep: impl FnMut(Pitch, &Note) -> bool) -> usize {
        let mut removed = 0;
        for (pitch, slot) in pitch::ALL.iter().zip(self.slots.iter_mut()) {
            let finished = match slot {
                Some(note) => !keep(*pitch, note),
                None => false,
            };
            if finished {
                *slot = None;
                removed += 1;
            }
        }
        removed
    }

    /// Remove `pitch` unconditionally.
    pub fn remove(&mut self, pitch: Pitch) -> Option<Note> {
        self.slots[pitch.semitone_offset()].take()
    }

    pub fn get(&self, pitch: Pitch) -> Option<&Note> {
        self.slots[pitch.semitone_offset()].as_ref()
    }

    pub fn contains(&self, pitch: Pitch) -> bool {
        self.get(pitch).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn clear(&mut self) {
        self.slots = [None; PITCH_COUNT];
    }

    /// Active notes in pitch order.
    pub fn iter(&self) -> impl Iterator<Item = (Pitch, &Note)> {
        pitch::ALL
            .iter()
            .zip(self.slots.iter())
            .filter_map(|(pitch, slot)| slot.as_ref().map(|note| (*pitch, note)))
    }
}
