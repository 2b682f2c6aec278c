//! DSP — the real-time synthesis path.
//!
//! Waveforms and envelopes are pure functions of the render clock; the note
//! registry and engine hold the only mutable state. The same code runs
//! natively and inside a WebAudio AudioWorklet via WASM.

pub mod engine;
pub mod envelope;
pub mod notes;
pub mod oscillator;
