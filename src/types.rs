//! Channel identity and metadata types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque 256-bit identifier for a channel, printable as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId([u8; 32]);

impl ChannelId {
    /// Builds a channel id from its raw 32 bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        ChannelId(bytes)
    }

    /// Returns the raw bytes of the id.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex representation, as used in `to_json` and in on-chain
    /// dispute/resolution payloads.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelId({})", self.to_hex())
    }
}

/// One participant in a channel: a display name plus the chain address that
/// signs on their behalf.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// The participant's name, as it appears in `ChannelMetadata`.
    pub name: String,
    /// The chain address used to verify this participant's signatures.
    pub address: String,
}

/// The ordered list of participants in a channel. Index 0 moves first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMetadata {
    /// Participants in turn order.
    pub participants: Vec<Participant>,
}

impl ChannelMetadata {
    /// Returns the participant index whose `name` matches, or `None` if this
    /// channel does not involve a participant with that name (i.e. the
    /// channel is not ours).
    pub fn local_index(&self, name: &str) -> Option<usize> {
        self.participants.iter().position(|p| p.name == name)
    }
}
