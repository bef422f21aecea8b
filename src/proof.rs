//! State proofs: the signed chain of states a channel's participants hand
//! each other off-chain, and the anchoring `reinit_id` derived from a
//! channel's metadata and initial state.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::ChannelMetadata;

/// Content hash of `(metadata, initial_state)`, identifying one channel
/// *instance*. Two on-chain anchors for the same `ChannelId` with different
/// metadata or initial state are different instances and cause a
/// `reinitialise` rather than an update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReinitId(Vec<u8>);

impl ReinitId {
    /// Raw bytes of the hash.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// One signed transition in a state proof: the state it produced, together
/// with the mover's signature over the canonical message for that state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// The board state resulting from this transition.
    pub state: Vec<u8>,
    /// Base64 (or collaborator-defined) signature authorizing the move that
    /// produced `state`.
    pub signature: String,
}

/// An ordered, non-empty chain `[s0, t1, t2, ..., tk]`: a signed initial
/// state followed by zero or more signed transitions. The end state is
/// `tk.state`, or `s0` if there are no transitions yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateProof {
    /// The signed initial board state.
    pub initial_state: Vec<u8>,
    /// Signatures over the initial state, one per participant required to
    /// co-sign channel creation.
    pub initial_signatures: Vec<String>,
    /// The chain of transitions applied since `initial_state`.
    pub transitions: Vec<Transition>,
}

impl StateProof {
    /// Builds a proof consisting only of a signed initial state.
    pub fn new(initial_state: Vec<u8>, initial_signatures: Vec<String>) -> Self {
        StateProof {
            initial_state,
            initial_signatures,
            transitions: Vec::new(),
        }
    }

    /// The end state of the chain, without checking any signature.
    pub fn unverified_end_state(&self) -> &[u8] {
        match self.transitions.last() {
            Some(t) => &t.state,
            None => &self.initial_state,
        }
    }

    /// Appends one signed transition, extending the chain by a single move.
    pub fn append_transition(&mut self, transition: Transition) {
        self.transitions.push(transition);
    }
}

/// Computes the `ReinitId` for a `(metadata, initial_state)` pair.
pub fn compute_reinit_id(metadata: &ChannelMetadata, initial_state: &[u8]) -> ReinitId {
    let mut hasher = Sha256::new();
    for participant in &metadata.participants {
        hasher.update(participant.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(participant.address.as_bytes());
        hasher.update([0u8]);
    }
    hasher.update(initial_state);
    ReinitId(hasher.finalize().to_vec())
}

/// The off-chain wire message: a state proof tagged with the channel
/// instance it belongs to. Peers discard messages whose `reinit` does not
/// match their own.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BroadcastMessage {
    /// The reinit id of the sender's channel instance.
    pub reinit: ReinitId,
    /// The proof being proposed.
    pub proof: StateProof,
}
