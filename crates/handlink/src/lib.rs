//! Serial register driver for dexterous hand actuator modules.
//!
//! handlink talks to multi-actuator hand modules over a point-to-point serial
//! link, in either of the two wire protocols such modules speak: a direct
//! RS-485 register protocol and a CAN-over-serial tunnel with byte stuffing.
//!
//! # Crate Structure
//!
//! - [`transport`] — Byte-level link abstraction, receive disciplines, and
//!   cancellation
//! - [`frame`] — Register map, frame encode/decode, byte stuffing, checksums
//! - [`session`] — Blocking request/response sessions with typed helpers
//!
//! # Example
//!
//! ```no_run
//! use handlink::session::{HandSession, SessionConfig};
//! # fn open_serial_port() -> handlink::transport::ScriptedTransport {
//! #     handlink::transport::ScriptedTransport::new()
//! # }
//!
//! let port = open_serial_port();
//! let mut hand = HandSession::new(port, SessionConfig::can());
//! hand.set_angles(&[1000, 1000, 1000, 1000, 1000, -1])?;
//! let felt = hand.forces()?;
//! # Ok::<(), handlink::session::SessionError>(())
//! ```

/// Re-export transport types.
pub mod transport {
    pub use handlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use handlink_frame::*;
}

/// Re-export session types.
pub mod session {
    pub use handlink_session::*;
}
