//! Register access sessions for hand actuator modules.
//!
//! A [`HandSession`] owns a transport and drives complete register
//! transactions over it: one request frame out, one response in, with
//! configurable pacing and receive discipline. Six-wide register blocks are
//! split across two physical frames when the wire format cannot carry them
//! atomically, and returned values are sanitized per register class.

pub mod config;
pub mod error;
pub mod session;

pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use session::HandSession;
