//! Render Engine — turns held notes into audio, one frame at a time.
//!
//! The engine owns every piece of synthesis state. The control surface never
//! touches it directly: commands arrive through a bounded queue and are
//! applied at the start of each block, and notifications go back through a
//! second queue. Nothing in [`RenderEngine::process`] blocks, and the only
//! allocation is the bounded debug-capture buffer.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::{info, trace, warn};

use crate::config::{MAX_BASE_FREQUENCY, MIN_BASE_FREQUENCY, SynthConfig};
use crate::pitch::{self, PITCH_COUNT};
use crate::protocol::{ControlMessage, Notification};

use super::envelope::EnvelopeParams;
use super::notes::NoteRegistry;
use super::oscillator::Waveform;

/// The real-time side of the synthesizer.
pub struct RenderEngine {
    sample_rate: f64,
    envelope: EnvelopeParams,
    /// Frames rendered since start. The render clock is `sample_index / sample_rate`.
    sample_index: u64,
    /// Frequency of A in Hz.
    base_frequency: f64,
    /// Per-pitch frequencies derived from `base_frequency`, indexed by semitone offset.
    frequencies: [f64; PITCH_COUNT],
    instrument: Waveform,
    notes: NoteRegistry,
    is_silent: bool,
    /// Silence was reached but the notification queue had no room for it yet.
    silence_pending: bool,
    capture: Option<Vec<f32>>,
    capture_capacity: usize,
    inbox: Receiver<ControlMessage>,
    outbox: Sender<Notification>,
}

impl RenderEngine {
    /// Build an engine reading commands from `inbox` and writing
    /// notifications to `outbox`. `config` is assumed validated.
    pub fn new(
        config: &SynthConfig,
        inbox: Receiver<ControlMessage>,
        outbox: Sender<Notification>,
    ) -> Self {
        info!(
            sample_rate = config.sample_rate,
            base_frequency = config.base_frequency,
            instrument = ?config.instrument,
            "Render engine created"
        );
        let base_frequency = config
            .base_frequency
            .clamp(MIN_BASE_FREQUENCY, MAX_BASE_FREQUENCY);
        RenderEngine {
            sample_rate: config.sample_rate,
            envelope: config.envelope,
            sample_index: 0,
            base_frequency,
            frequencies: pitch_frequencies(base_frequency),
            instrument: config.instrument,
            notes: NoteRegistry::new(),
            is_silent: true,
            silence_pending: false,
            capture: None,
            capture_capacity: config.debug_capture_capacity,
            inbox,
            outbox,
        }
    }

    /// Render one block of interleaved audio.
    ///
    /// Pending control messages are applied first, in arrival order. Each
    /// frame's mono value is written to all `channels` of that frame.
    pub fn process(&mut self, output: &mut [f32], channels: usize) {
        self.drain_messages();

        for frame in output.chunks_mut(channels.max(1)) {
            let value = self.render_frame() as f32;
            frame.fill(value);
        }
    }

    /// Apply every queued control message. Returns how many were applied.
    pub fn drain_messages(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(message) = self.inbox.try_recv() {
            self.apply(message);
            applied += 1;
        }
        applied
    }

    /// Apply a single control message at the current render clock.
    pub fn apply(&mut self, message: ControlMessage) {
        trace!(?message, sample_index = self.sample_index, "Applying control message");
        let now = self.now_ms();
        match message {
            ControlMessage::NoteDown { note } => {
                self.notes.note_down(note, now);
                self.is_silent = false;
                self.silence_pending = false;
            }
            ControlMessage::NoteUp { note } => {
                self.notes.note_up(note, now);
            }
            ControlMessage::ChangeInstrument { instrument } => {
                self.instrument = instrument;
            }
            ControlMessage::ShiftBaseFrequency { semitone_count } => {
                self.shift_base_frequency(semitone_count);
            }
            ControlMessage::StartDebugCapture => {
                self.capture = Some(Vec::with_capacity(self.capture_capacity));
            }
            ControlMessage::EndDebugCapture => {
                if let Some(samples) = self.capture.take() {
                    self.notify(Notification::DebugInfo { samples });
                }
            }
        }
    }

    /// Render a single frame and advance the clock.
    ///
    /// Sums every active note's waveform weighted by its envelope, retires
    /// released notes that have decayed to zero, and sends one `Silence`
    /// notification when the last note is gone. A `Silence` that finds the
    /// notification queue full is retried on later frames.
    pub fn render_frame(&mut self) -> f64 {
        if self.silence_pending {
            self.send_silence();
        }
        if self.is_silent && self.notes.is_empty() {
            self.record(0.0);
            self.sample_index += 1;
            return 0.0;
        }

        let now_ms = self.now_ms();
        let time = self.now_seconds();
        let params = self.envelope;
        let instrument = self.instrument;
        let frequencies = &self.frequencies;

        let mut mix = 0.0;
        self.notes.retain(|pitch, note| {
            let amplitude = note.amplitude(now_ms, &params);
            if amplitude > 0.0 {
                let frequency = frequencies[pitch.semitone_offset()];
                mix += instrument.sample(frequency, time, amplitude);
            }
            // released and fully decayed
            !(note.is_released_by(now_ms) && amplitude == 0.0)
        });

        if self.notes.is_empty() && !self.is_silent {
            self.is_silent = true;
            self.send_silence();
        }

        self.record(mix as f32);
        self.sample_index += 1;
        mix
    }

    fn shift_base_frequency(&mut self, semitone_count: i32) {
        let shifted = self.base_frequency * (2.0_f64).powf(semitone_count as f64 / 12.0);
        if !shifted.is_finite() {
            warn!(semitone_count, "Ignoring tuning shift with non-finite result");
            return;
        }
        let clamped = shifted.clamp(MIN_BASE_FREQUENCY, MAX_BASE_FREQUENCY);
        if clamped != shifted {
            warn!(
                requested = shifted,
                clamped, "Base frequency clamped to the supported range"
            );
        }
        self.base_frequency = clamped;
        self.frequencies = pitch_frequencies(clamped);
    }

    fn record(&mut self, value: f32) {
        if let Some(buffer) = &mut self.capture {
            if buffer.len() < self.capture_capacity {
                buffer.push(value);
            }
        }
    }

    fn send_silence(&mut self) {
        self.silence_pending = match self.outbox.try_send(Notification::Silence) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => false,
            Err(TrySendError::Full(_)) => true,
        };
    }

    /// Debug notifications are diagnostic; if the control side is not draining
    /// them the notification is dropped rather than blocking.
    fn notify(&self, notification: Notification) {
        let _ = self.outbox.try_send(notification);
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn sample_index(&self) -> u64 {
        self.sample_index
    }

    /// Current render-clock time in seconds.
    pub fn now_seconds(&self) -> f64 {
        self.sample_index as f64 / self.sample_rate
    }

    /// Current render-clock time in milliseconds.
    pub fn now_ms(&self) -> f64 {
        self.sample_index as f64 * 1000.0 / self.sample_rate
    }

    pub fn base_frequency(&self) -> f64 {
        self.base_frequency
    }

    pub fn instrument(&self) -> Waveform {
        self.instrument
    }

    pub fn envelope(&self) -> &EnvelopeParams {
        &self.envelope
    }

    pub fn is_silent(&self) -> bool {
        self.is_silent
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }

    pub fn active_notes(&self) -> &NoteRegistry {
        &self.notes
    }
}

fn pitch_frequencies(base_frequency: f64) -> [f64; PITCH_COUNT] {
    pitch::ALL.map(|p| p.frequency(base_frequency))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::envelope::envelope;
    use crate::pitch::Pitch;
    use crossbeam_channel::bounded;
    use std::f64::consts::PI;

    struct Harness {
        engine: RenderEngine,
        notifications: Receiver<Notification>,
    }

    fn harness(config: SynthConfig) -> Harness {
        let (_tx, inbox) = bounded(16);
        let (outbox, notifications) = bounded(16);
        Harness {
            engine: RenderEngine::new(&config, inbox, outbox),
            notifications,
        }
    }

    fn default_harness() -> Harness {
        harness(SynthConfig::default())
    }

    /// Render frames until the render clock reaches `ms`.
    fn run_until(engine: &mut RenderEngine, ms: f64) {
        while engine.now_ms() < ms {
            engine.render_frame();
        }
    }

    fn silence_count(rx: &Receiver<Notification>) -> usize {
        rx.try_iter().filter(|n| *n == Notification::Silence).count()
    }

    #[test]
    fn starts_silent() {
        let Harness { mut engine, notifications } = default_harness();
        assert!(engine.is_silent());
        for _ in 0..128 {
            assert_eq!(engine.render_frame(), 0.0);
        }
        assert_eq!(engine.sample_index(), 128);
        assert_eq!(
            silence_count(&notifications),
            0,
            "Never-played engine should not announce silence"
        );
    }

    #[test]
    fn clock_follows_sample_index() {
        let Harness { mut engine, .. } = default_harness();
        for _ in 0..480 {
            engine.render_frame();
        }
        assert!((engine.now_ms() - 10.0).abs() < 1e-9);
        assert!((engine.now_seconds() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn single_sine_note_matches_formula() {
        let Harness { mut engine, .. } = default_harness();
        engine.apply(ControlMessage::NoteDown { note: Pitch::A });
        let params = EnvelopeParams::default();

        for _ in 0..2400 {
            let now_ms = engine.now_ms();
            let t = engine.now_seconds();
            let expected = envelope(0.0, None, now_ms, &params) * (2.0 * PI * 440.0 * t).sin();
            let got = engine.render_frame();
            assert!(
                (got - expected).abs() < 1e-12,
                "Frame at {now_ms}ms: expected {expected}, got {got}"
            );
        }
    }

    #[test]
    fn chord_is_sum_of_notes() {
        let Harness { mut engine, .. } = default_harness();
        engine.apply(ControlMessage::NoteDown { note: Pitch::A });
        engine.apply(ControlMessage::NoteDown { note: Pitch::C });
        let params = EnvelopeParams::default();
        let a = Pitch::A.frequency(440.0);
        let c = Pitch::C.frequency(440.0);

        run_until(&mut engine, 150.0);
        for _ in 0..256 {
            let now_ms = engine.now_ms();
            let t = engine.now_seconds();
            let level = envelope(0.0, None, now_ms, &params);
            let expected = level * (2.0 * PI * a * t).sin() + level * (2.0 * PI * c * t).sin();
            let got = engine.render_frame();
            assert!(
                (got - expected).abs() < 1e-12,
                "Chord frame should be the sum, expected {expected}, got {got}"
            );
        }
    }

    #[test]
    fn instrument_change_selects_generator() {
        let Harness { mut engine, .. } = default_harness();
        engine.apply(ControlMessage::ChangeInstrument { instrument: Waveform::Square });
        engine.apply(ControlMessage::NoteDown { note: Pitch::A });
        run_until(&mut engine, 200.0);
        let v = engine.render_frame();
        assert!(
            (v.abs() - 0.8 / PI).abs() < 1e-9,
            "Sustained square should be ±0.8/π, got {v}"
        );
        assert_eq!(engine.instrument(), Waveform::Square);
    }

    #[test]
    fn released_note_is_retired_and_silence_sent_once() {
        let Harness { mut engine, notifications } = default_harness();
        engine.apply(ControlMessage::NoteDown { note: Pitch::A });
        run_until(&mut engine, 200.0);
        engine.apply(ControlMessage::NoteUp { note: Pitch::A });
        assert!(!engine.is_silent());

        run_until(&mut engine, 320.0);
        assert!(engine.active_notes().is_empty(), "Decayed note should be pruned");
        assert!(engine.is_silent());

        run_until(&mut engine, 1000.0);
        assert_eq!(silence_count(&notifications), 1, "Silence must be announced exactly once");
    }

    #[test]
    fn silence_announced_again_after_next_phrase() {
        let Harness { mut engine, notifications } = default_harness();
        for start in [0.0, 500.0] {
            run_until(&mut engine, start);
            engine.apply(ControlMessage::NoteDown { note: Pitch::E });
            run_until(&mut engine, start + 150.0);
            engine.apply(ControlMessage::NoteUp { note: Pitch::E });
            run_until(&mut engine, start + 300.0);
        }
        assert_eq!(silence_count(&notifications), 2);
    }

    #[test]
    fn held_note_keeps_engine_awake() {
        let Harness { mut engine, notifications } = default_harness();
        engine.apply(ControlMessage::NoteDown { note: Pitch::D });
        run_until(&mut engine, 2000.0);
        assert!(!engine.is_silent());
        assert_eq!(engine.active_notes().len(), 1);
        assert_eq!(silence_count(&notifications), 0);
    }

    #[test]
    fn release_of_unknown_note_is_noop() {
        let Harness { mut engine, .. } = default_harness();
        engine.apply(ControlMessage::NoteUp { note: Pitch::F });
        assert!(engine.active_notes().is_empty());
        assert!(engine.is_silent());
    }

    #[test]
    fn octave_shift_doubles_and_restores() {
        let Harness { mut engine, .. } = default_harness();
        engine.apply(ControlMessage::ShiftBaseFrequency { semitone_count: 12 });
        assert!((engine.base_frequency() - 880.0).abs() < 1e-9);

        engine.apply(ControlMessage::ShiftBaseFrequency { semitone_count: -12 });
        engine.apply(ControlMessage::ShiftBaseFrequency { semitone_count: -12 });
        engine.apply(ControlMessage::ShiftBaseFrequency { semitone_count: 12 });
        assert!((engine.base_frequency() - 440.0).abs() < 1e-9);
    }

    #[test]
    fn tuning_is_clamped() {
        let Harness { mut engine, .. } = default_harness();
        for _ in 0..100 {
            engine.apply(ControlMessage::ShiftBaseFrequency { semitone_count: -12 });
        }
        assert_eq!(engine.base_frequency(), MIN_BASE_FREQUENCY);

        engine.apply(ControlMessage::ShiftBaseFrequency { semitone_count: 240 });
        assert_eq!(engine.base_frequency(), MAX_BASE_FREQUENCY);

        // 2^(i32::MAX / 12) overflows; the shift is ignored
        engine.apply(ControlMessage::ShiftBaseFrequency { semitone_count: i32::MAX });
        assert_eq!(engine.base_frequency(), MAX_BASE_FREQUENCY);

        engine.apply(ControlMessage::NoteDown { note: Pitch::GSharp });
        for _ in 0..4800 {
            let v = engine.render_frame();
            assert!(v.is_finite(), "Output must stay finite at extreme tuning, got {v}");
        }
    }

    #[test]
    fn process_fills_interleaved_channels() {
        let Harness { mut engine, .. } = default_harness();
        engine.apply(ControlMessage::NoteDown { note: Pitch::B });
        let mut block = vec![0.0_f32; 128 * 2];
        engine.process(&mut block, 2);
        for frame in block.chunks(2) {
            assert_eq!(frame[0], frame[1], "Both channels should carry the same sample");
        }
        assert_eq!(engine.sample_index(), 128);
    }

    #[test]
    fn messages_applied_at_block_start() {
        let (tx, inbox) = bounded(16);
        let (outbox, _notifications) = bounded(16);
        let mut engine = RenderEngine::new(&SynthConfig::default(), inbox, outbox);

        let mut block = vec![0.0_f32; 128];
        engine.process(&mut block, 1);
        assert!(block.iter().all(|&s| s == 0.0));

        tx.send(ControlMessage::NoteDown { note: Pitch::A }).unwrap();
        tx.send(ControlMessage::NoteUp { note: Pitch::A }).unwrap();
        tx.send(ControlMessage::NoteDown { note: Pitch::A }).unwrap();
        engine.process(&mut block, 1);

        let note = engine.active_notes().get(Pitch::A).unwrap();
        assert_eq!(note.up_time_ms, None, "Messages must apply in arrival order");
        let expected_down = 128.0 * 1000.0 / 48_000.0;
        assert!((note.down_time_ms - expected_down).abs() < 1e-9);
        assert!(block.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn debug_capture_collects_output() {
        let Harness { mut engine, notifications } = default_harness();
        engine.apply(ControlMessage::NoteDown { note: Pitch::C });
        engine.apply(ControlMessage::StartDebugCapture);
        assert!(engine.is_capturing());

        let mut rendered = Vec::new();
        for _ in 0..64 {
            rendered.push(engine.render_frame() as f32);
        }
        engine.apply(ControlMessage::EndDebugCapture);
        assert!(!engine.is_capturing());

        let captured: Vec<Notification> = notifications.try_iter().collect();
        assert_eq!(captured, vec![Notification::DebugInfo { samples: rendered }]);
    }

    #[test]
    fn debug_capture_is_bounded() {
        let config = SynthConfig {
            debug_capture_capacity: 10,
            ..Default::default()
        };
        let Harness { mut engine, notifications } = harness(config);
        engine.apply(ControlMessage::StartDebugCapture);
        for _ in 0..100 {
            engine.render_frame();
        }
        engine.apply(ControlMessage::EndDebugCapture);
        match notifications.try_recv() {
            Ok(Notification::DebugInfo { samples }) => assert_eq!(samples.len(), 10),
            other => panic!("Expected debug info, got {other:?}"),
        }
    }

    #[test]
    fn end_capture_without_start_is_noop() {
        let Harness { mut engine, notifications } = default_harness();
        engine.apply(ControlMessage::EndDebugCapture);
        assert!(notifications.try_recv().is_err());
    }

    #[test]
    fn silence_delivered_once_queue_has_room() {
        let (_tx, inbox) = bounded(1);
        let (outbox, notifications) = bounded(1);
        let mut engine = RenderEngine::new(&SynthConfig::default(), inbox, outbox);

        // an undrained debug dump fills the queue
        engine.apply(ControlMessage::StartDebugCapture);
        engine.apply(ControlMessage::EndDebugCapture);

        engine.apply(ControlMessage::NoteDown { note: Pitch::A });
        run_until(&mut engine, 150.0);
        engine.apply(ControlMessage::NoteUp { note: Pitch::A });
        run_until(&mut engine, 400.0);
        assert!(engine.is_silent());

        assert!(matches!(notifications.try_recv(), Ok(Notification::DebugInfo { .. })));
        assert!(notifications.try_recv().is_err(), "Queue was full, Silence not sent yet");

        run_until(&mut engine, 410.0);
        assert_eq!(notifications.try_recv(), Ok(Notification::Silence));
        run_until(&mut engine, 1000.0);
        assert!(notifications.try_recv().is_err(), "Silence must not repeat");
    }

    #[test]
    fn note_down_cancels_undelivered_silence() {
        let (_tx, inbox) = bounded(1);
        let (outbox, notifications) = bounded(1);
        let mut engine = RenderEngine::new(&SynthConfig::default(), inbox, outbox);
        engine.apply(ControlMessage::StartDebugCapture);
        engine.apply(ControlMessage::EndDebugCapture);

        engine.apply(ControlMessage::NoteDown { note: Pitch::C });
        run_until(&mut engine, 150.0);
        engine.apply(ControlMessage::NoteUp { note: Pitch::C });
        run_until(&mut engine, 400.0);
        engine.apply(ControlMessage::NoteDown { note: Pitch::C });

        assert!(notifications.try_recv().is_ok());
        run_until(&mut engine, 500.0);
        assert!(notifications.try_recv().is_err(), "Stale silence must not arrive mid-note");
    }

    #[test]
    fn full_notification_queue_does_not_block() {
        let (_tx, inbox) = bounded(1);
        let (outbox, notifications) = bounded(1);
        let mut engine = RenderEngine::new(&SynthConfig::default(), inbox, outbox);
        for _ in 0..3 {
            engine.apply(ControlMessage::StartDebugCapture);
            engine.apply(ControlMessage::EndDebugCapture);
        }
        assert_eq!(notifications.try_iter().count(), 1);
    }
}
