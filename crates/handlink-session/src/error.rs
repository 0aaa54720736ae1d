/// Errors that can occur during a register transaction.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Link-level failure, including timeouts and cancellation.
    #[error("transport error: {0}")]
    Transport(#[from] handlink_transport::TransportError),

    /// Wire-level failure, including unknown register names.
    #[error("frame error: {0}")]
    Frame(#[from] handlink_frame::FrameError),

    /// A register block takes between one and six values.
    #[error("invalid value count {0} (expected 1..=6)")]
    InvalidValueCount(usize),

    /// A write value is outside the channel's documented range.
    #[error("{what} value {value} out of range {min}..={max}")]
    ValueOutOfRange {
        what: &'static str,
        value: i16,
        min: i16,
        max: i16,
    },

    /// The register is telemetry and cannot be written.
    #[error("register {0:?} is read-only")]
    ReadOnly(&'static str),

    /// The register is a control trigger and cannot be read back.
    #[error("register {0:?} is write-only")]
    WriteOnly(&'static str),
}

pub type Result<T> = std::result::Result<T, SessionError>;
