//! The optional on-chain dispute record for a channel.

/// A dispute currently recorded on-chain for this channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisputeRecord {
    /// Block height at which the dispute was filed.
    pub height: u64,
    /// Participant index that must move to resolve the dispute.
    pub turn: usize,
    /// Turn count of the state the dispute was filed with.
    pub count: u32,
    /// Whether a resolution transaction for this dispute has already been
    /// submitted successfully.
    pub pending_resolution: bool,
}

/// Holds at most one `DisputeRecord` at a time.
#[derive(Default)]
pub struct DisputeTracker {
    current: Option<DisputeRecord>,
}

impl DisputeTracker {
    /// Current dispute record, if any.
    pub fn get(&self) -> Option<&DisputeRecord> {
        self.current.as_ref()
    }

    /// Replaces the dispute record with a freshly observed one. Always
    /// starts with `pending_resolution: false`, matching the rule that a
    /// newly (re-)observed dispute height resets resolution eligibility.
    pub fn set(&mut self, height: u64, turn: usize, count: u32) {
        self.current = Some(DisputeRecord {
            height,
            turn,
            count,
            pending_resolution: false,
        });
    }

    /// Clears the dispute record (the dispute was resolved or never
    /// existed).
    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Marks the current dispute's resolution as submitted. No-op if there
    /// is no current dispute.
    pub fn mark_resolution_pending(&mut self) {
        if let Some(d) = self.current.as_mut() {
            d.pending_resolution = true;
        }
    }

    /// Whether the channel is resolvable: a dispute exists, it is the local
    /// player's turn to respond, the current turn count has moved past the
    /// dispute's, and no resolution has been submitted for it yet.
    pub fn is_resolvable(&self, current_turn_count: u32, local_index: Option<usize>) -> bool {
        match (&self.current, local_index) {
            (Some(d), Some(idx)) => {
                !d.pending_resolution && d.turn == idx && current_turn_count > d.count
            }
            _ => false,
        }
    }
}
