use thiserror::Error;

/// Errors raised at the edges of the synthesizer: message decoding,
/// configuration and the control queue. The render step itself never fails.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SynthError {
    #[error("Unknown pitch name '{0}'")]
    UnknownPitch(String),

    #[error("Unknown instrument id {0} (expected 0-4)")]
    UnknownInstrument(i64),

    /// A control message whose `type` is not part of the protocol. This means
    /// the control and render contexts disagree on the protocol version.
    #[error("Unknown control message type '{kind}'")]
    UnknownMessage { kind: String },

    #[error("Malformed control message: {0}")]
    MalformedMessage(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Control queue is full, message dropped")]
    QueueFull,

    #[error("Render engine has been dropped")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, SynthError>;
