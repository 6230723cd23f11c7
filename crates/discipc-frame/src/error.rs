use discipc_transport::TransportError;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Fewer than 4 bytes were available for the opcode.
    #[error("bad opcode (read {read} of 4 bytes)")]
    BadOpcode { read: usize },

    /// Fewer than 4 bytes were available for the payload length.
    #[error("bad length (read {read} of 4 bytes)")]
    BadLength { read: usize },

    /// The payload ended before the declared length was read.
    #[error("bad data (read {read} of {expected} bytes)")]
    BadData { expected: usize, read: usize },

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The underlying channel reported a transport fault.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The handshake payload could not be serialized or parsed.
    #[error("handshake payload error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FrameError {
    /// Whether a failed read left the channel without frame alignment.
    ///
    /// After a short read the read cursor sits somewhere inside a frame, so
    /// the next bytes cannot be trusted as a header.
    pub fn breaks_framing(&self) -> bool {
        matches!(
            self,
            FrameError::BadOpcode { .. }
                | FrameError::BadLength { .. }
                | FrameError::BadData { .. }
                | FrameError::PayloadTooLarge { .. }
                | FrameError::Io(_)
                | FrameError::Transport(_)
        )
    }

    /// Whether a write stopped after part of the frame reached the peer.
    pub fn is_partial_write(&self) -> bool {
        matches!(self, FrameError::Transport(err) if err.is_partial_write())
    }
}

/// Map an I/O error from a channel stream back to the transport fault it
/// carries, surfacing a missing channel as such.
pub(crate) fn from_io(err: std::io::Error) -> FrameError {
    let carries_transport = err
        .get_ref()
        .is_some_and(|inner| inner.is::<TransportError>());
    if !carries_transport {
        return if err.kind() == std::io::ErrorKind::NotConnected {
            FrameError::Transport(TransportError::NotConnected)
        } else {
            FrameError::Io(err)
        };
    }

    match err.into_inner().map(|inner| inner.downcast::<TransportError>()) {
        Some(Ok(transport)) => FrameError::Transport(*transport),
        Some(Err(inner)) => FrameError::Io(std::io::Error::other(inner)),
        None => FrameError::Io(std::io::Error::other("empty I/O error")),
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
