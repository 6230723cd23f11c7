//! Channel manager for `discord-ipc-{n}` named pipes.
//!
//! Resolves a numeric channel id to a platform pipe name:
//! - Unix domain sockets under the runtime/temp directory (Linux/macOS)
//! - Named pipes under `\\.\pipe\` (Windows)
//!
//! This is the lowest layer of discipc. It owns the raw duplex byte channel,
//! scans channel ids when connecting, and exposes byte-level read/write.
//! Framing lives in `discipc-frame`.

pub mod channel;
pub mod connector;
pub mod error;
pub mod manager;
pub mod stream;
#[cfg(unix)]
mod uds;

pub use channel::{ChannelId, CHANNEL_COUNT, PIPE_NAME_PREFIX};
pub use connector::{Connector, SystemConnector};
pub use error::{Result, TransportError};
pub use manager::{ChannelManager, ConnectConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_POLL_INTERVAL};
pub use stream::{IpcStream, PipeStream};
