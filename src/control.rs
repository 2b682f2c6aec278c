//! Control surface — the non-real-time handle to a [`RenderEngine`].
//!
//! Commands are forwarded unmodified through a bounded queue; the surface
//! never blocks on a full queue and never touches synthesis state.

use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use tracing::debug;

use crate::config::SynthConfig;
use crate::dsp::engine::RenderEngine;
use crate::dsp::oscillator::Waveform;
use crate::error::{Result, SynthError};
use crate::pitch::Pitch;
use crate::protocol::{ControlMessage, Notification};

/// Sending half of the control protocol plus the notification inbox.
#[derive(Debug, Clone)]
pub struct ControlSurface {
    commands: Sender<ControlMessage>,
    notifications: Receiver<Notification>,
}

/// Validate `config` and build a connected control surface and render engine.
///
/// The engine is meant to be moved into the audio callback; the surface stays
/// on the control thread.
pub fn connect(config: SynthConfig) -> Result<(ControlSurface, RenderEngine)> {
    config.validate()?;
    let (commands, inbox) = bounded(config.message_queue_capacity);
    let (outbox, notifications) = bounded(config.notification_queue_capacity);
    let engine = RenderEngine::new(&config, inbox, outbox);
    Ok((
        ControlSurface {
            commands,
            notifications,
        },
        engine,
    ))
}

impl ControlSurface {
    /// Enqueue a command without blocking.
    pub fn send(&self, message: ControlMessage) -> Result<()> {
        debug!(?message, "Sending control message");
        self.commands.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => SynthError::QueueFull,
            TrySendError::Disconnected(_) => SynthError::Disconnected,
        })
    }

    /// Decode a JSON wire message and enqueue it.
    pub fn send_json(&self, json: &str) -> Result<()> {
        self.send(ControlMessage::from_json(json)?)
    }

    pub fn note_down(&self, note: Pitch) -> Result<()> {
        self.send(ControlMessage::NoteDown { note })
    }

    pub fn note_up(&self, note: Pitch) -> Result<()> {
        self.send(ControlMessage::NoteUp { note })
    }

    pub fn change_instrument(&self, instrument: Waveform) -> Result<()> {
        self.send(ControlMessage::ChangeInstrument { instrument })
    }

    pub fn shift_base_frequency(&self, semitone_count: i32) -> Result<()> {
        self.send(ControlMessage::ShiftBaseFrequency { semitone_count })
    }

    pub fn start_debug_capture(&self) -> Result<()> {
        self.send(ControlMessage::StartDebugCapture)
    }

    pub fn end_debug_capture(&self) -> Result<()> {
        self.send(ControlMessage::EndDebugCapture)
    }

    /// Next pending notification, if any.
    pub fn try_recv_notification(&self) -> Option<Notification> {
        self.notifications.try_recv().ok()
    }

    /// Wait up to `timeout` for a notification.
    pub fn recv_notification_timeout(&self, timeout: Duration) -> Option<Notification> {
        self.notifications.recv_timeout(timeout).ok()
    }

    /// Drain every pending notification.
    pub fn poll_notifications(&self) -> Vec<Notification> {
        self.notifications.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_rejects_invalid_config() {
        let config = SynthConfig {
            sample_rate: 0.0,
            ..Default::default()
        };
        assert!(matches!(connect(config), Err(SynthError::InvalidConfig(_))));
    }

    #[test]
    fn commands_reach_engine() {
        let (control, mut engine) = connect(SynthConfig::default()).unwrap();
        control.note_down(Pitch::C).unwrap();
        control.change_instrument(Waveform::Triangle).unwrap();
        control.shift_base_frequency(12).unwrap();

        assert_eq!(engine.drain_messages(), 3);
        assert!(engine.active_notes().contains(Pitch::C));
        assert_eq!(engine.instrument(), Waveform::Triangle);
        assert!((engine.base_frequency() - 880.0).abs() < 1e-9);
    }

    #[test]
    fn send_json_rejects_unknown_type() {
        let (control, mut engine) = connect(SynthConfig::default()).unwrap();
        let err = control.send_json(r#"{"type":"panic"}"#).unwrap_err();
        assert_eq!(err, SynthError::UnknownMessage { kind: "panic".to_string() });
        assert_eq!(engine.drain_messages(), 0);

        control.send_json(r#"{"type":"noteDown","pitchName":"Gb"}"#).unwrap();
        assert_eq!(engine.drain_messages(), 1);
        assert!(engine.active_notes().contains(Pitch::FSharp));
    }

    #[test]
    fn full_queue_reports_error() {
        let config = SynthConfig {
            message_queue_capacity: 2,
            ..Default::default()
        };
        let (control, _engine) = connect(config).unwrap();
        control.note_down(Pitch::A).unwrap();
        control.note_down(Pitch::B).unwrap();
        assert_eq!(control.note_down(Pitch::C), Err(SynthError::QueueFull));
    }

    #[test]
    fn dropped_engine_reports_disconnect() {
        let (control, engine) = connect(SynthConfig::default()).unwrap();
        drop(engine);
        assert_eq!(control.note_up(Pitch::A), Err(SynthError::Disconnected));
    }

    #[test]
    fn debug_capture_round_trip() {
        let (control, mut engine) = connect(SynthConfig::default()).unwrap();
        control.start_debug_capture().unwrap();
        let mut block = [0.0_f32; 32];
        engine.process(&mut block, 1);
        control.end_debug_capture().unwrap();
        engine.process(&mut block, 1);

        assert_eq!(
            control.poll_notifications(),
            vec![Notification::DebugInfo { samples: vec![0.0; 32] }]
        );
        assert_eq!(control.try_recv_notification(), None);
    }
}
