use std::path::PathBuf;
use std::time::Duration;

use crate::channel::ChannelId;

/// Errors that can occur in channel transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the pipe for the given channel.
    #[error("failed to connect to channel {channel} ({path}): {source}")]
    Connect {
        channel: ChannelId,
        path: PathBuf,
        source: std::io::Error,
    },

    /// The pipe did not report connected within the bounded wait.
    #[error("channel {channel} did not connect within {waited:?}")]
    Timeout { channel: ChannelId, waited: Duration },

    /// Every channel in the scan range failed.
    #[error("no channel available (tried {attempted} channels)")]
    NoChannelAvailable { attempted: u8 },

    /// A channel id outside `0..CHANNEL_COUNT` was requested.
    #[error("channel id {0} out of range")]
    InvalidChannel(u32),

    /// No channel handle is held (never connected, closed, or disposed).
    #[error("channel not connected")]
    NotConnected,

    /// The channel failed after part of a buffer had been written.
    #[error("write failed after {written} of {expected} bytes: {source}")]
    PartialWrite {
        written: usize,
        expected: usize,
        source: std::io::Error,
    },

    /// An I/O error occurred on the channel stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TransportError> for std::io::Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Io(io) => io,
            TransportError::Connect { source, .. } => source,
            TransportError::NotConnected => {
                std::io::Error::new(std::io::ErrorKind::NotConnected, "channel not connected")
            }
            timeout @ TransportError::Timeout { .. } => {
                std::io::Error::new(std::io::ErrorKind::TimedOut, timeout.to_string())
            }
            other => std::io::Error::other(other),
        }
    }
}

impl TransportError {
    /// Whether the peer received a truncated buffer.
    pub fn is_partial_write(&self) -> bool {
        matches!(self, TransportError::PartialWrite { .. })
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
