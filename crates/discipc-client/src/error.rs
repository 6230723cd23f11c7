use discipc_transport::ChannelId;

/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] discipc_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] discipc_frame::FrameError),

    /// No channel is open.
    #[error("not connected")]
    NotConnected,

    /// An earlier read or truncated write lost frame alignment; the channel
    /// must be reopened.
    #[error("channel {channel:?} lost frame alignment; reconnect required")]
    Desynchronized { channel: Option<ChannelId> },
}

pub type Result<T> = std::result::Result<T, ClientError>;
