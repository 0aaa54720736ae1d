/// Errors that can occur while building or parsing frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The register name is not in the register table.
    #[error("unknown register {0:?}")]
    UnknownRegister(String),

    /// No valid start marker was found in the receive window.
    #[error("malformed frame: {0}")]
    MalformedFrame(&'static str),

    /// The buffer ends before the expected value window.
    #[error("short frame ({len} bytes, need {need})")]
    ShortFrame { len: usize, need: usize },

    /// More values than one frame of this variant can carry.
    #[error("too many values for one frame ({count}, max {max})")]
    TooManyValues { count: usize, max: usize },

    /// Strict decoding found a checksum that does not match the frame body.
    #[error("checksum mismatch (frame {found:#04x}, computed {computed:#04x})")]
    ChecksumMismatch { found: u8, computed: u8 },
}

pub type Result<T> = std::result::Result<T, FrameError>;
