use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Cooperative cancellation handle for polling receives.
///
/// Clones share the same flag; cancelling any clone cancels the receive at the
/// next attempt boundary. Deadline receives are bounded by their timeout and
/// have no cancellation path.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of any receive holding a clone of this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// How to wait for a response frame.
#[derive(Debug, Clone)]
pub enum ReceiveDiscipline {
    /// One read attempt racing a single deadline. If the deadline fires first
    /// the operation fails with `TransportError::Timeout`.
    Deadline {
        timeout: Duration,
    },

    /// Repeated short reads until a non-empty buffer arrives, with a fixed
    /// pause between attempts. Bounded: after `max_attempts` empty reads the
    /// receive fails with `TransportError::Timeout`.
    Polling {
        attempt_timeout: Duration,
        max_attempts: u32,
        backoff: Duration,
    },
}

impl ReceiveDiscipline {
    /// Polling defaults: 50 ms per attempt, 40 attempts, 5 ms backoff.
    pub fn polling() -> Self {
        Self::Polling {
            attempt_timeout: Duration::from_millis(50),
            max_attempts: 40,
            backoff: Duration::from_millis(5),
        }
    }

    /// Single read racing `timeout`.
    pub fn deadline(timeout: Duration) -> Self {
        Self::Deadline { timeout }
    }

    /// Upper bound on how long a receive under this discipline can block.
    pub fn budget(&self) -> Duration {
        match self {
            Self::Deadline { timeout } => *timeout,
            Self::Polling {
                attempt_timeout,
                max_attempts,
                backoff,
            } => (*attempt_timeout + *backoff) * *max_attempts,
        }
    }
}

impl Default for ReceiveDiscipline {
    fn default() -> Self {
        Self::polling()
    }
}

/// Wait for a non-empty response buffer under the given discipline.
pub fn receive_with<T: Transport>(
    transport: &mut T,
    max_len: usize,
    discipline: &ReceiveDiscipline,
    cancel: &CancelToken,
) -> Result<Vec<u8>> {
    match discipline {
        ReceiveDiscipline::Deadline { timeout } => {
            let buf = transport.recv(max_len, *timeout)?;
            if buf.is_empty() {
                return Err(TransportError::Timeout(*timeout));
            }
            trace!(len = buf.len(), "received response (deadline)");
            Ok(buf)
        }
        ReceiveDiscipline::Polling {
            attempt_timeout,
            max_attempts,
            backoff,
        } => {
            for attempt in 0..*max_attempts {
                if cancel.is_cancelled() {
                    return Err(TransportError::Cancelled);
                }
                match transport.recv(max_len, *attempt_timeout) {
                    Ok(buf) if !buf.is_empty() => {
                        trace!(len = buf.len(), attempt, "received response (polling)");
                        return Ok(buf);
                    }
                    Ok(_) | Err(TransportError::Timeout(_)) => {
                        std::thread::sleep(*backoff);
                    }
                    Err(err) => return Err(err),
                }
            }
            Err(TransportError::Timeout(discipline.budget()))
        }
    }
}
