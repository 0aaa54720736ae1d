//! Blocking serial-link transport abstraction.
//!
//! Provides the [`Transport`] trait consumed by the frame and session layers:
//! blocking "write these bytes" and "read up to N bytes within a timeout"
//! primitives over a point-to-point link. Opening and configuring a physical
//! serial device is deliberately not part of this crate; callers bring their
//! own implementation (or use [`ScriptedTransport`] for tests and demos).

pub mod discipline;
pub mod error;
pub mod mem;
pub mod traits;

pub use discipline::{receive_with, CancelToken, ReceiveDiscipline};
pub use error::{Result, TransportError};
pub use mem::ScriptedTransport;
pub use traits::Transport;
