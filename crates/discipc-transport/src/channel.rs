//! Channel ids and pipe naming.
//!
//! A peer listens on one of `CHANNEL_COUNT` well-known pipes named
//! `discord-ipc-0` through `discord-ipc-9`. Lower ids are occupied first.

use std::fmt;

use crate::error::{Result, TransportError};

/// Number of channel ids probed by a full scan.
pub const CHANNEL_COUNT: u8 = 10;

/// Pipe name prefix; the channel id is appended.
pub const PIPE_NAME_PREFIX: &str = "discord-ipc-";

/// Identifies one candidate pipe endpoint, always in `0..CHANNEL_COUNT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(u8);

impl ChannelId {
    /// Create a channel id, rejecting values outside `0..CHANNEL_COUNT`.
    pub fn new(id: u32) -> Result<Self> {
        match u8::try_from(id) {
            Ok(id) if id < CHANNEL_COUNT => Ok(Self(id)),
            _ => Err(TransportError::InvalidChannel(id)),
        }
    }

    /// All channel ids in ascending scan order.
    pub fn all() -> impl Iterator<Item = ChannelId> {
        (0..CHANNEL_COUNT).map(ChannelId)
    }

    /// The first `count` channel ids in ascending order (clamped to `CHANNEL_COUNT`).
    pub fn first(count: u8) -> impl Iterator<Item = ChannelId> {
        (0..count.min(CHANNEL_COUNT)).map(ChannelId)
    }

    /// Numeric value of this id.
    pub fn get(self) -> u8 {
        self.0
    }

    /// Platform-independent pipe name, e.g. `discord-ipc-3`.
    pub fn pipe_name(self) -> String {
        format!("{PIPE_NAME_PREFIX}{}", self.0)
    }
}

impl TryFrom<u32> for ChannelId {
    type Error = TransportError;

    fn try_from(id: u32) -> Result<Self> {
        Self::new(id)
    }
}

impl From<ChannelId> for u32 {
    fn from(id: ChannelId) -> Self {
        u32::from(id.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
