//! In-flight on-chain emission tracking: makes dispute filing and
//! game-specific on-chain moves idempotent across repeated `post_process`
//! invocations that don't correspond to a fresh trigger.

/// Tracks which on-chain emissions are outstanding so each is attempted at
/// most once per triggering observation.
#[derive(Default)]
pub struct PendingMoves {
    dispute_pending: bool,
    dispute_attempted: bool,
    on_chain_move_sent_for: Option<Vec<u8>>,
}

impl PendingMoves {
    /// Requests a dispute be filed. Returns `false` (and does nothing) if a
    /// dispute is already pending, matching `file_dispute`'s "already
    /// pending emission" guard.
    pub fn request_dispute(&mut self) -> bool {
        if self.dispute_pending {
            return false;
        }
        self.dispute_pending = true;
        self.dispute_attempted = false;
        true
    }

    /// Whether a dispute filing has been requested and not yet cleared by
    /// an on-chain observation.
    pub fn dispute_pending(&self) -> bool {
        self.dispute_pending
    }

    /// Whether `post_process` should attempt to emit the pending dispute
    /// right now (it hasn't already tried and succeeded or is still mid
    /// retry since the last failure).
    pub fn should_attempt_dispute(&self) -> bool {
        self.dispute_pending && !self.dispute_attempted
    }

    /// Marks the pending dispute as having been submitted successfully, so
    /// further `post_process` calls within the same episode don't resend
    /// it.
    pub fn mark_dispute_attempted(&mut self) {
        self.dispute_attempted = true;
    }

    /// Clears the dispute-pending state. Called on every `process_on_chain`,
    /// regardless of the observed dispute height, since any in-flight
    /// dispute transaction is then considered observed.
    pub fn clear_dispute_pending(&mut self) {
        self.dispute_pending = false;
        self.dispute_attempted = false;
    }

    /// Whether a game-specific on-chain move should be (re)submitted for
    /// the given end state: true unless we already sent one for this exact
    /// state.
    pub fn should_send_on_chain_move(&self, end_state: &[u8]) -> bool {
        self.on_chain_move_sent_for.as_deref() != Some(end_state)
    }

    /// Records that an on-chain move was submitted successfully for the
    /// given end state.
    pub fn mark_on_chain_move_sent(&mut self, end_state: &[u8]) {
        self.on_chain_move_sent_for = Some(end_state.to_vec());
    }

    /// Resets all tracking, used when the channel is reinitialised under a
    /// new instance.
    pub fn reset(&mut self) {
        self.dispute_pending = false;
        self.dispute_attempted = false;
        self.on_chain_move_sent_for = None;
    }
}
