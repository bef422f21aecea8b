//! The game-rules plugin boundary: everything the manager needs to ask a
//! concrete game about a board state, without the manager ever
//! understanding the byte layout itself.

use crate::types::ChannelId;

/// Capabilities a concrete game must provide so the manager can interpret
/// board states, validate and apply moves, and project state to JSON for
/// `to_json`.
///
/// Implementations must be reentrant with respect to their own state: the
/// manager invokes these methods only while holding its lock, so a call
/// here must not call back into the owning `ChannelManager`.
pub trait GameRules: Send + Sync {
    /// Whether two board states are equal. Implementations that store
    /// states in a canonical byte form can default to plain byte equality;
    /// this is not provided as a default here since "equal" is meaningful
    /// only in terms of the game's own representation.
    fn states_equal(&self, a: &[u8], b: &[u8]) -> bool;

    /// The participant index whose move is next, or `None` if the game is
    /// in a no-turn / terminal state.
    fn whose_turn(&self, state: &[u8]) -> Option<usize>;

    /// The monotone turn count of a state.
    fn turn_count(&self, state: &[u8]) -> u32;

    /// Applies a move to a state, returning the resulting state, or `None`
    /// if the move is invalid in this state.
    fn apply_move(&self, state: &[u8], move_bytes: &[u8]) -> Option<Vec<u8>>;

    /// Returns a move the given player should make automatically from this
    /// state (e.g. a forced response), or `None` if no automatic move
    /// applies.
    fn maybe_auto_move(&self, state: &[u8], local_player_index: usize) -> Option<Vec<u8>>;

    /// Returns a game-specific on-chain move payload the current state
    /// demands, or `None` if none is needed.
    fn maybe_on_chain_move(&self, state: &[u8]) -> Option<serde_json::Value>;

    /// Projects a state to JSON for introspection via `to_json`.
    fn state_to_json(&self, state: &[u8]) -> serde_json::Value;

    /// The canonical textual message the wallet should sign to authorize a
    /// transition into `new_state` for the given channel.
    fn signing_message(&self, channel_id: &ChannelId, new_state: &[u8]) -> String;
}
