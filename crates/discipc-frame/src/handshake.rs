use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Protocol version sent in the handshake by default.
pub const HANDSHAKE_VERSION: u32 = 1;

/// Payload of the Handshake frame, sent once right after connecting.
///
/// Serialized as `{"v": <version>, "client_id": "<id>"}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Handshake {
    #[serde(rename = "v")]
    pub version: u32,
    pub client_id: String,
}

impl Handshake {
    /// Handshake for `client_id` at [`HANDSHAKE_VERSION`].
    pub fn new(client_id: impl Into<String>) -> Self {
        Self::with_version(HANDSHAKE_VERSION, client_id)
    }

    pub fn with_version(version: u32, client_id: impl Into<String>) -> Self {
        Self {
            version,
            client_id: client_id.into(),
        }
    }

    /// Serialize to the frame payload.
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse a frame payload.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}
