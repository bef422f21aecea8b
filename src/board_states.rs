//! Canonical channel state: the current metadata and state proof, plus the
//! derived `reinit_id` that identifies the channel instance.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::proof::{compute_reinit_id, ReinitId, StateProof, Transition};
use crate::rules::GameRules;
use crate::types::ChannelMetadata;

struct ChannelInstance {
    metadata: ChannelMetadata,
    proof: StateProof,
    reinit_id: ReinitId,
}

/// Holds the current channel metadata and state proof, and answers
/// turn/count queries over the stored proof's end state.
pub struct BoardStates {
    rules: Arc<dyn GameRules>,
    current: Option<ChannelInstance>,
}

impl BoardStates {
    /// Creates an empty `BoardStates` for a channel that has not yet been
    /// observed on-chain.
    pub fn new(rules: Arc<dyn GameRules>) -> Self {
        BoardStates {
            rules,
            current: None,
        }
    }

    /// Replaces the stored chain for a new channel instance. Rejects the
    /// call if `initial_state` disagrees with `proof`'s signed initial
    /// state; the `reinit_id` only changes through this method.
    pub fn reinitialise(
        &mut self,
        metadata: ChannelMetadata,
        initial_state: Vec<u8>,
        proof: StateProof,
    ) -> Result<()> {
        if proof.initial_state != initial_state {
            return Err(Error::InitialStateMismatch);
        }
        let reinit_id = compute_reinit_id(&metadata, &initial_state);
        self.current = Some(ChannelInstance {
            metadata,
            proof,
            reinit_id,
        });
        Ok(())
    }

    /// Unconditionally replaces the stored proof, leaving metadata and
    /// `reinit_id` untouched. No-op if the channel has never been
    /// reinitialised.
    fn set_proof(&mut self, proof: StateProof) {
        if let Some(cur) = self.current.as_mut() {
            cur.proof = proof;
        }
    }

    /// Accepts `proof` iff its end-state turn count is strictly greater
    /// than the current one, and its initial state matches. Used for
    /// off-chain updates. Returns whether the proof was adopted.
    pub fn update_with_move(&mut self, proof: StateProof) -> bool {
        let Some(cur) = self.current.as_ref() else {
            return false;
        };
        if proof.initial_state != cur.proof.initial_state {
            return false;
        }
        let new_count = self.rules.turn_count(proof.unverified_end_state());
        let cur_count = self.rules.turn_count(cur.proof.unverified_end_state());
        if new_count > cur_count {
            self.set_proof(proof);
            true
        } else {
            false
        }
    }

    /// Accepts `proof` iff its end-state turn count is greater-or-equal to
    /// the current one, and its initial state matches. Used for on-chain
    /// confirmations, where equality re-confirms an already-known anchor.
    /// Returns whether the proof was adopted.
    pub fn adopt_on_chain(&mut self, proof: StateProof) -> bool {
        let Some(cur) = self.current.as_ref() else {
            return false;
        };
        if proof.initial_state != cur.proof.initial_state {
            return false;
        }
        let new_count = self.rules.turn_count(proof.unverified_end_state());
        let cur_count = self.rules.turn_count(cur.proof.unverified_end_state());
        if new_count >= cur_count {
            self.set_proof(proof);
            true
        } else {
            false
        }
    }

    /// Appends one already-signed transition to the stored chain, used for
    /// local moves and auto-moves. No-op if the channel has never been
    /// reinitialised.
    pub fn append_local_transition(&mut self, transition: Transition) {
        if let Some(cur) = self.current.as_mut() {
            cur.proof.append_transition(transition);
        }
    }

    /// The full stored state proof, if the channel has been reinitialised.
    pub fn state_proof(&self) -> Option<&StateProof> {
        self.current.as_ref().map(|c| &c.proof)
    }

    /// The unverified end-state bytes of the stored proof.
    pub fn latest_state(&self) -> Option<&[u8]> {
        self.current.as_ref().map(|c| c.proof.unverified_end_state())
    }

    /// The `reinit_id` of the current channel instance.
    pub fn reinit_id(&self) -> Option<&ReinitId> {
        self.current.as_ref().map(|c| &c.reinit_id)
    }

    /// The current channel metadata.
    pub fn metadata(&self) -> Option<&ChannelMetadata> {
        self.current.as_ref().map(|c| &c.metadata)
    }

    /// The participant index whose move is next, per the rules plugin.
    pub fn whose_turn(&self) -> Option<usize> {
        self.latest_state().and_then(|s| self.rules.whose_turn(s))
    }

    /// The turn count of the stored proof's end state, or 0 if the channel
    /// has never been reinitialised.
    pub fn turn_count(&self) -> u32 {
        self.latest_state()
            .map(|s| self.rules.turn_count(s))
            .unwrap_or(0)
    }

    /// The turn count a candidate proof's end state would carry, without
    /// adopting it.
    pub fn candidate_turn_count(&self, proof: &StateProof) -> u32 {
        self.rules.turn_count(proof.unverified_end_state())
    }
}
