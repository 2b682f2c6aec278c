//! Synthesizer configuration, loadable from JSON.

use serde::{Deserialize, Serialize};

use crate::dsp::envelope::EnvelopeParams;
use crate::dsp::oscillator::Waveform;
use crate::error::{Result, SynthError};

/// Lowest base (A) frequency the engine will tune to, in Hz.
pub const MIN_BASE_FREQUENCY: f64 = 1.0;
/// Highest base (A) frequency the engine will tune to, in Hz.
pub const MAX_BASE_FREQUENCY: f64 = 20_000.0;

/// Engine configuration. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SynthConfig {
    /// Output sample rate in Hz.
    pub sample_rate: f64,
    /// Frequency of the pitch A in Hz.
    pub base_frequency: f64,
    /// Initially selected waveform (instrument id 0–4).
    pub instrument: Waveform,
    pub envelope: EnvelopeParams,
    /// Capacity of the control → render queue.
    pub message_queue_capacity: usize,
    /// Capacity of the render → control queue.
    pub notification_queue_capacity: usize,
    /// Maximum number of samples kept by one debug capture.
    pub debug_capture_capacity: usize,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            base_frequency: 440.0,
            instrument: Waveform::Sine,
            envelope: EnvelopeParams::default(),
            message_queue_capacity: 256,
            notification_queue_capacity: 16,
            debug_capture_capacity: 48_000,
        }
    }
}

impl SynthConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SynthConfig = serde_json::from_str(json)
            .map_err(|e| SynthError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(SynthError::InvalidConfig(format!(
                "sampleRate must be positive, got {}",
                self.sample_rate
            )));
        }
        if !(MIN_BASE_FREQUENCY..=MAX_BASE_FREQUENCY).contains(&self.base_frequency) {
            return Err(SynthError::InvalidConfig(format!(
                "baseFrequency must be in [{MIN_BASE_FREQUENCY}, {MAX_BASE_FREQUENCY}] Hz, got {}",
                self.base_frequency
            )));
        }
        if self.message_queue_capacity == 0 || self.notification_queue_capacity == 0 {
            return Err(SynthError::InvalidConfig(
                "queue capacities must be at least 1".to_string(),
            ));
        }
        self.envelope.validate()
    }
}
