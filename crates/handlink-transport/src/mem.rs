use std::collections::VecDeque;
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// In-memory transport that records sent frames and replays queued responses.
///
/// Each `recv` pops the next queued buffer; when the queue is empty the
/// receive times out, which makes a freshly emptied (or [`silent`]) transport
/// behave like a device that never answers. Responses are truncated to the
/// caller's `max_len`, mirroring a real link returning a short buffer.
///
/// [`silent`]: ScriptedTransport::silent
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    sent: Vec<Vec<u8>>,
    responses: VecDeque<Vec<u8>>,
    closed: bool,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport that never responds; every `recv` times out.
    pub fn silent() -> Self {
        Self::default()
    }

    /// Queue a buffer to be returned by the next unanswered `recv`.
    pub fn queue_response(&mut self, bytes: Vec<u8>) {
        self.responses.push_back(bytes);
    }

    /// All frames sent so far, in order.
    pub fn sent_frames(&self) -> &[Vec<u8>] {
        &self.sent
    }

    /// Simulate the far end tearing the link down.
    pub fn close(&mut self) {
        self.closed = true;
    }
}

impl Transport for ScriptedTransport {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        debug!(len = frame.len(), "scripted send");
        self.sent.push(frame.to_vec());
        Ok(())
    }

    fn recv(&mut self, max_len: usize, timeout: Duration) -> Result<Vec<u8>> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        match self.responses.pop_front() {
            Some(mut buf) => {
                buf.truncate(max_len);
                debug!(len = buf.len(), "scripted recv");
                Ok(buf)
            }
            None => Err(TransportError::Timeout(timeout)),
        }
    }
}
