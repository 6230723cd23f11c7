//! Client transport for discord-ipc named pipes.
//!
//! discipc connects to a peer listening on `discord-ipc-{0..9}`, sends the
//! one-time handshake, and exchanges opcode + length-prefixed frames.
//!
//! # Crate Structure
//!
//! - [`transport`] - Channel manager: pipe naming, channel scan, raw I/O
//! - [`frame`] - Frame codec and handshake payload
//! - [`client`] - Handshake-aware client with the short-read policy (behind `client` feature)

/// Re-export transport types.
pub mod transport {
    pub use discipc_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use discipc_frame::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use discipc_client::*;
}
