use std::time::Duration;

/// Errors that can occur on the underlying serial link.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No response arrived within the allowed time.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// An I/O error occurred on the link.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link was closed by the other side or torn down locally.
    #[error("link closed")]
    Closed,

    /// The receive was cancelled via its cancellation token.
    #[error("receive cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, TransportError>;
