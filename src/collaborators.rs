//! Collaborator traits for everything outside the channel manager's own
//! concerns: proof verification, on-chain submission, off-chain fan-out and
//! wallet signing. The manager only ever depends on these boundaries.

use crate::proof::StateProof;
use crate::types::{ChannelId, ChannelMetadata};
use crate::Result;

/// Judges whether a `StateProof` carries every signature `metadata`
/// requires. Signature scheme details are entirely the verifier's concern.
pub trait ProofVerifier: Send + Sync {
    /// Returns whether `proof` is valid with respect to `metadata`.
    fn verify(&self, metadata: &ChannelMetadata, proof: &StateProof) -> bool;
}

/// The logical content of an on-chain transaction the manager wants
/// submitted. The move sender is responsible for JSON-encoding this and the
/// base64 proof encoding, then calling the wallet's `name_update`.
pub enum OnChainPayload {
    /// File a dispute carrying the given proof.
    Dispute {
        /// The channel the dispute is filed against.
        channel_id: ChannelId,
        /// The proof to publish alongside the dispute.
        proof: StateProof,
    },
    /// Resolve a pending dispute with a newer proof.
    Resolution {
        /// The channel the resolution responds for.
        channel_id: ChannelId,
        /// The newer proof resolving the dispute.
        proof: StateProof,
    },
    /// A game-specific on-chain move, opaque to the manager.
    Move(serde_json::Value),
}

/// Submits on-chain transactions (disputes, resolutions, and game-specific
/// moves) and reports back the transaction id.
pub trait MoveSender: Send + Sync {
    /// Submits `payload` on-chain, returning the hex transaction id.
    fn send(&self, payload: OnChainPayload) -> Result<String>;
}

/// Fans a serialized proof message out to peers. Fire-and-forget: failures
/// are the broadcaster's own concern to log, since a later move will carry
/// a newer state anyway.
pub trait OffChainBroadcast: Send + Sync {
    /// Sends the already-serialized `BroadcastMessage` bytes to peers.
    fn send_message(&self, bytes: &[u8]);
}

/// Signs textual messages on behalf of a local chain address.
pub trait Wallet: Send + Sync {
    /// Signs `message` as `address`, returning a base64 signature.
    fn sign_message(&self, address: &str, message: &str) -> Result<String>;
}
