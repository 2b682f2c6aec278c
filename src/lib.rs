pub mod config;
pub mod control;
pub mod dsp;
pub mod error;
pub mod pitch;
pub mod protocol;

pub use crate::config::SynthConfig;
pub use crate::control::{ControlSurface, connect};
pub use crate::dsp::engine::RenderEngine;
pub use crate::dsp::oscillator::Waveform;
pub use crate::error::SynthError;
pub use crate::pitch::Pitch;
pub use crate::protocol::{ControlMessage, Notification};

use tracing::error;
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the polytone-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

fn to_js_error(e: SynthError) -> JsValue {
    JsValue::from_str(&format!("{e}"))
}

/// WASM-exposed: a render engine hosted inside an AudioWorkletProcessor.
///
/// The worklet forwards every `port.onmessage` payload to `postMessage`, calls
/// `process` once per render quantum, and posts whatever `takeNotifications`
/// returns back to the main thread.
#[wasm_bindgen]
pub struct ToneProcessor {
    control: ControlSurface,
    engine: RenderEngine,
}

#[wasm_bindgen]
impl ToneProcessor {
    /// Create a processor from an optional JSON [`SynthConfig`].
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<ToneProcessor, JsValue> {
        let config = match config_json {
            Some(json) => SynthConfig::from_json(&json).map_err(to_js_error)?,
            None => SynthConfig::default(),
        };
        let (control, engine) = connect(config).map_err(to_js_error)?;
        Ok(ToneProcessor { control, engine })
    }

    /// Queue one control message. Unknown or malformed messages throw: a
    /// message type the engine does not understand means the page and the
    /// worklet were built from different protocol versions.
    #[wasm_bindgen(js_name = postMessage)]
    pub fn post_message(&self, message: JsValue) -> Result<(), JsValue> {
        let value: serde_json::Value = serde_wasm_bindgen::from_value(message)
            .map_err(|e| JsValue::from_str(&format!("{e}")))?;
        let result = ControlMessage::decode(value).and_then(|msg| self.control.send(msg));
        if let Err(e) = &result {
            error!("Rejected control message: {e}");
        }
        result.map_err(to_js_error)
    }

    /// Render one block into `output` (interleaved, `channels` wide).
    /// Always returns `true` so the worklet stays alive.
    pub fn process(&mut self, output: &mut [f32], channels: usize) -> bool {
        self.engine.process(output, channels);
        true
    }

    /// Drain pending notifications as an array of `{type, ...}` objects.
    #[wasm_bindgen(js_name = takeNotifications)]
    pub fn take_notifications(&self) -> Result<JsValue, JsValue> {
        let notifications = self.control.poll_notifications();
        serde_wasm_bindgen::to_value(&notifications).map_err(|e| JsValue::from_str(&format!("{e}")))
    }

    #[wasm_bindgen(getter, js_name = isSilent)]
    pub fn is_silent(&self) -> bool {
        self.engine.is_silent()
    }

    #[wasm_bindgen(getter, js_name = baseFrequency)]
    pub fn base_frequency(&self) -> f64 {
        self.engine.base_frequency()
    }
}
