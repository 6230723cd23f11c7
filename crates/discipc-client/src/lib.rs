//! Frame client for discord-ipc channels.
//!
//! This is the "just works" layer. Connect to a peer, send the handshake,
//! then exchange frames. A failed frame read closes the channel; the client
//! refuses further I/O until it is reconnected.

pub mod client;
pub mod error;

pub use client::{Client, ClientConfig};
pub use error::{ClientError, Result};
