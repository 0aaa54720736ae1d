use std::time::Duration;

use handlink_frame::ProtocolVariant;
use handlink_transport::ReceiveDiscipline;

/// Configuration for a [`HandSession`](crate::session::HandSession).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Which of the two sibling wire protocols the module speaks.
    pub variant: ProtocolVariant,
    /// Device id on the link (RS-485 address byte). Default: 1.
    pub device_id: u8,
    /// How to wait for each response. Default: bounded polling.
    pub discipline: ReceiveDiscipline,
    /// Minimum spacing between sending a frame and reading its response.
    /// The module needs settling time on the half-duplex link. Default: 15 ms.
    pub inter_frame_gap: Duration,
    /// Receive buffer cap per read attempt. Default: 64 bytes.
    pub max_response_len: usize,
    /// Verify response checksums (strict decode). Default: off, matching
    /// fielded receiver behavior.
    pub verify_checksums: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            variant: ProtocolVariant::Can,
            device_id: 1,
            discipline: ReceiveDiscipline::default(),
            inter_frame_gap: Duration::from_millis(15),
            max_response_len: 64,
            verify_checksums: false,
        }
    }
}

impl SessionConfig {
    /// Defaults for the RS-485 register protocol.
    pub fn rs485(device_id: u8) -> Self {
        Self {
            variant: ProtocolVariant::Rs485,
            device_id,
            ..Self::default()
        }
    }

    /// Defaults for the CAN-over-serial protocol.
    pub fn can() -> Self {
        Self::default()
    }
}
