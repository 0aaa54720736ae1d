use std::time::Duration;

use crate::error::Result;

/// A blocking point-to-point byte link.
///
/// One request frame is in flight at a time; the session layer holds exclusive
/// use of the transport for the duration of a transaction. Implementations
/// wrap whatever carries the bytes — a serial device, a USB-CAN adapter in
/// serial passthrough mode, or an in-memory script in tests.
pub trait Transport {
    /// Write a complete frame to the link (blocking).
    fn send(&mut self, frame: &[u8]) -> Result<()>;

    /// Read up to `max_len` bytes, waiting at most `timeout`.
    ///
    /// Returns whatever the link had available, possibly shorter than
    /// `max_len` and possibly empty. A timeout with nothing received is
    /// `TransportError::Timeout`; distinguishing "empty buffer" from
    /// "timed out" is left to the receive discipline.
    fn recv(&mut self, max_len: usize, timeout: Duration) -> Result<Vec<u8>>;
}
