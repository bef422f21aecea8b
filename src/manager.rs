//! The `ChannelManager`: event ingress under a single mutex, orchestrating
//! `BoardStates`, `DisputeTracker` and `PendingMoves`, and notifying
//! `wait_for_change` callers of observable changes.

use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::json;

use crate::board_states::BoardStates;
use crate::collaborators::{MoveSender, OffChainBroadcast, OnChainPayload, ProofVerifier, Wallet};
use crate::config::ManagerConfig;
use crate::dispute::{DisputeRecord, DisputeTracker};
use crate::error::Error;
use crate::notifier::{ChangeNotifier, WAITFORCHANGE_ALWAYS_BLOCK};
use crate::pending::PendingMoves;
use crate::proof::{compute_reinit_id, BroadcastMessage, ReinitId, StateProof, Transition};
use crate::rules::GameRules;
use crate::types::{ChannelId, ChannelMetadata};

/// Locks `mutex`, recovering and loudly logging if it was poisoned by an
/// earlier panic: we still trust the data enough to keep serving ingress
/// calls from it rather than wedging the channel forever. `what` names the
/// lock, for the log line.
fn lock_logged<'a, T>(mutex: &'a Mutex<T>, what: &str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::error!("{what} mutex poisoned by an earlier panic, recovering: {}", Error::Poisoned);
            poisoned.into_inner()
        }
    }
}

struct Inner {
    exists: bool,
    board: BoardStates,
    dispute: DisputeTracker,
    pending: PendingMoves,
    version: i64,
    stopped: bool,
}

/// A snapshot of everything `to_json` exposes, used only to decide whether
/// an ingress call produced an observable change.
#[derive(PartialEq)]
struct Snapshot {
    exists: bool,
    reinit_id: Option<ReinitId>,
    proof: Option<StateProof>,
    dispute: Option<DisputeRecord>,
}

fn snapshot(inner: &Inner) -> Snapshot {
    Snapshot {
        exists: inner.exists,
        reinit_id: inner.board.reinit_id().cloned(),
        proof: inner.board.state_proof().cloned(),
        dispute: inner.dispute.get().cloned(),
    }
}

/// State threaded through a single ingress call's mutation and its
/// subsequent `post_process`, recording whether the stored proof advanced
/// due to a local move or auto-move (which gates the off-chain broadcast).
#[derive(Default)]
struct PostProcessCtx {
    broadcast_local: bool,
}

/// Reconciles on-chain observations, off-chain peer proofs and local player
/// moves against one channel's state, deciding when to emit on-chain
/// transactions and off-chain broadcasts, and notifying `wait_for_change`
/// waiters of every observable change.
///
/// All ingress methods take `&self` and synchronize internally: the
/// manager is meant to be shared (typically via `Arc`) across the
/// block-watcher, peer-transport and UI threads that drive it.
pub struct ChannelManager {
    rules: Arc<dyn GameRules>,
    verifier: Arc<dyn ProofVerifier>,
    wallet: Arc<dyn Wallet>,
    move_sender: Mutex<Option<Arc<dyn MoveSender>>>,
    broadcaster: Mutex<Option<Arc<dyn OffChainBroadcast>>>,
    channel_id: ChannelId,
    player_name: String,
    config: ManagerConfig,
    inner: Mutex<Inner>,
    notifier: ChangeNotifier,
}

impl ChannelManager {
    /// Creates a new manager for `channel_id`, observed as `player_name`.
    /// The move sender and off-chain broadcaster are attached afterwards
    /// via their setters.
    pub fn new(
        rules: Arc<dyn GameRules>,
        verifier: Arc<dyn ProofVerifier>,
        wallet: Arc<dyn Wallet>,
        channel_id: ChannelId,
        player_name: String,
        config: ManagerConfig,
    ) -> Self {
        ChannelManager {
            rules: rules.clone(),
            verifier,
            wallet,
            move_sender: Mutex::new(None),
            broadcaster: Mutex::new(None),
            channel_id,
            player_name,
            config,
            inner: Mutex::new(Inner {
                exists: false,
                board: BoardStates::new(rules),
                dispute: DisputeTracker::default(),
                pending: PendingMoves::default(),
                version: 0,
                stopped: false,
            }),
            notifier: ChangeNotifier::default(),
        }
    }

    /// Attaches (or replaces) the on-chain move sender.
    pub fn set_move_sender(&self, sender: Arc<dyn MoveSender>) {
        *lock_logged(&self.move_sender, "move sender") = Some(sender);
    }

    /// Attaches (or replaces) the off-chain broadcaster.
    pub fn set_off_chain_broadcast(&self, broadcaster: Arc<dyn OffChainBroadcast>) {
        *lock_logged(&self.broadcaster, "off-chain broadcaster") = Some(broadcaster);
    }

    fn move_sender(&self) -> Option<Arc<dyn MoveSender>> {
        lock_logged(&self.move_sender, "move sender").clone()
    }

    fn broadcaster(&self) -> Option<Arc<dyn OffChainBroadcast>> {
        lock_logged(&self.broadcaster, "off-chain broadcaster").clone()
    }

    /// The channel id this manager was constructed for.
    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    fn run_ingress<F>(&self, mutate: F)
    where
        F: FnOnce(&mut Inner, &mut PostProcessCtx),
    {
        let mut guard = lock_logged(&self.inner, "channel manager");
        if guard.stopped {
            return;
        }

        let before = snapshot(&guard);
        let mut ctx = PostProcessCtx::default();
        mutate(&mut guard, &mut ctx);
        self.post_process(&mut guard, &mut ctx);
        let after = snapshot(&guard);

        if before != after {
            guard.version += 1;
            self.notifier.notify_all();
        }
    }

    /// Applies a move as the local player: validates it against the rules,
    /// signs the resulting transition through the wallet, and appends it to
    /// the stored chain. Shared by `process_local_move` and the auto-move
    /// loop in `post_process`, since both must go through the same
    /// validate-then-sign path. Returns whether the move was applied.
    fn apply_local_move(&self, inner: &mut Inner, move_bytes: &[u8]) -> bool {
        let local_idx = match inner
            .board
            .metadata()
            .and_then(|m| m.local_index(&self.player_name))
        {
            Some(idx) => idx,
            None => return false,
        };
        let current_state = match inner.board.latest_state() {
            Some(s) => s.to_vec(),
            None => return false,
        };
        let next_state = match self.rules.apply_move(&current_state, move_bytes) {
            Some(s) => s,
            None => return false,
        };
        let address = inner
            .board
            .metadata()
            .expect("metadata present since local_index resolved above")
            .participants[local_idx]
            .address
            .clone();
        let message = self.rules.signing_message(&self.channel_id, &next_state);

        match self.wallet.sign_message(&address, &message) {
            Ok(signature) => {
                inner.board.append_local_transition(Transition {
                    state: next_state,
                    signature,
                });
                true
            }
            Err(err) => {
                log::warn!(
                    target: &self.config.log_target,
                    "channel {}: wallet failed to sign move for {}: {}",
                    self.channel_id,
                    address,
                    err
                );
                false
            }
        }
    }

    fn post_process(&self, inner: &mut Inner, ctx: &mut PostProcessCtx) {
        if !inner.exists {
            return;
        }

        // 1. Auto-moves, applied through the same signing path as a local
        // move, for as long as it remains the local player's turn and the
        // rules keep proposing one. Bounded by `auto_move_cap` so a
        // misbehaving `GameRules` can't spin the lock forever.
        for _ in 0..self.config.auto_move_cap {
            let local_idx = match inner
                .board
                .metadata()
                .and_then(|m| m.local_index(&self.player_name))
            {
                Some(idx) => idx,
                None => break,
            };
            if inner.board.whose_turn() != Some(local_idx) {
                break;
            }
            let state = match inner.board.latest_state() {
                Some(s) => s.to_vec(),
                None => break,
            };
            let mv = match self.rules.maybe_auto_move(&state, local_idx) {
                Some(mv) => mv,
                None => break,
            };
            if self.apply_local_move(inner, &mv) {
                ctx.broadcast_local = true;
            } else {
                // Defensive: a rules implementation that proposes an
                // auto-move it then rejects would otherwise spin forever.
                log::error!(
                    target: &self.config.log_target,
                    "channel {}: rules proposed an auto-move that failed to apply or sign",
                    self.channel_id
                );
                break;
            }
        }

        // 2. Game-specific on-chain move, at most once per distinct end
        // state.
        if let Some(state) = inner.board.latest_state().map(<[u8]>::to_vec) {
            if let Some(payload) = self.rules.maybe_on_chain_move(&state) {
                if inner.pending.should_send_on_chain_move(&state) {
                    if let Some(sender) = self.move_sender() {
                        match sender.send(OnChainPayload::Move(payload)) {
                            Ok(txid) => {
                                log::info!(
                                    target: &self.config.log_target,
                                    "channel {}: submitted on-chain move, txid {}",
                                    self.channel_id,
                                    txid
                                );
                                inner.pending.mark_on_chain_move_sent(&state);
                            }
                            Err(err) => log::warn!(
                                target: &self.config.log_target,
                                "channel {}: failed to submit on-chain move: {}",
                                self.channel_id,
                                err
                            ),
                        }
                    }
                }
            }
        }

        // 3. Resolution of a pending dispute that is ours to answer.
        let local_idx = inner
            .board
            .metadata()
            .and_then(|m| m.local_index(&self.player_name));
        let current_count = inner.board.turn_count();
        if inner.dispute.is_resolvable(current_count, local_idx) {
            if let (Some(sender), Some(proof)) =
                (self.move_sender(), inner.board.state_proof().cloned())
            {
                match sender.send(OnChainPayload::Resolution {
                    channel_id: self.channel_id,
                    proof,
                }) {
                    Ok(txid) => {
                        log::info!(
                            target: &self.config.log_target,
                            "channel {}: submitted resolution, txid {}",
                            self.channel_id,
                            txid
                        );
                        inner.dispute.mark_resolution_pending();
                    }
                    Err(err) => log::warn!(
                        target: &self.config.log_target,
                        "channel {}: failed to submit resolution: {}",
                        self.channel_id,
                        err
                    ),
                }
            }
        }

        // 4. Dispute emission, latched so repeated post_process calls
        // don't resend while we wait for the chain to confirm.
        if inner.pending.should_attempt_dispute() && inner.dispute.get().is_none() {
            if let (Some(sender), Some(proof)) =
                (self.move_sender(), inner.board.state_proof().cloned())
            {
                match sender.send(OnChainPayload::Dispute {
                    channel_id: self.channel_id,
                    proof,
                }) {
                    Ok(txid) => {
                        log::info!(
                            target: &self.config.log_target,
                            "channel {}: filed dispute, txid {}",
                            self.channel_id,
                            txid
                        );
                        inner.pending.mark_dispute_attempted();
                    }
                    Err(err) => log::warn!(
                        target: &self.config.log_target,
                        "channel {}: failed to file dispute: {}",
                        self.channel_id,
                        err
                    ),
                }
            }
        }

        // 5. Off-chain broadcast, exactly once if a local move or
        // auto-move advanced the proof during this call.
        if ctx.broadcast_local {
            if let (Some(broadcaster), Some(reinit), Some(proof)) = (
                self.broadcaster(),
                inner.board.reinit_id().cloned(),
                inner.board.state_proof().cloned(),
            ) {
                let message = BroadcastMessage { reinit, proof };
                match bincode::serialize(&message) {
                    Ok(bytes) => broadcaster.send_message(&bytes),
                    Err(err) => log::error!(
                        target: &self.config.log_target,
                        "channel {}: failed to serialize broadcast message: {}",
                        self.channel_id,
                        err
                    ),
                }
            }
        }
    }

    /// Processes an on-chain observation: new metadata, initial state,
    /// proof and current dispute height (0 if no dispute is on-chain).
    pub fn process_on_chain(
        &self,
        metadata: ChannelMetadata,
        initial_state: Vec<u8>,
        proof: StateProof,
        dispute_height: u64,
    ) {
        self.run_ingress(|inner, _ctx| {
            let was_exists = inner.exists;
            inner.exists = true;

            let new_reinit = compute_reinit_id(&metadata, &initial_state);
            let needs_reinit = !was_exists || inner.board.reinit_id() != Some(&new_reinit);

            if needs_reinit {
                if self.verifier.verify(&metadata, &proof) {
                    match inner.board.reinitialise(
                        metadata.clone(),
                        initial_state.clone(),
                        proof.clone(),
                    ) {
                        Ok(()) => inner.pending.reset(),
                        Err(err) => log::warn!(
                            target: &self.config.log_target,
                            "channel {}: rejected on-chain reinitialisation: {}",
                            self.channel_id,
                            err
                        ),
                    }
                } else {
                    log::warn!(
                        target: &self.config.log_target,
                        "channel {}: rejected on-chain reinitialisation: proof failed verification",
                        self.channel_id
                    );
                }
            } else {
                let candidate_count = inner.board.candidate_turn_count(&proof);
                if candidate_count >= inner.board.turn_count()
                    && self.verifier.verify(&metadata, &proof)
                {
                    inner.board.adopt_on_chain(proof.clone());
                }
            }

            if dispute_height == 0 {
                inner.dispute.clear();
            } else {
                let end_state = proof.unverified_end_state();
                match self.rules.whose_turn(end_state) {
                    Some(turn) => {
                        let count = self.rules.turn_count(end_state);
                        inner.dispute.set(dispute_height, turn, count);
                    }
                    None => {
                        log::warn!(
                            target: &self.config.log_target,
                            "channel {}: on-chain dispute state has no mover; ignoring dispute record",
                            self.channel_id
                        );
                        inner.dispute.clear();
                    }
                }
            }

            inner.pending.clear_dispute_pending();
        });
    }

    /// Processes the observation that the channel does not (or no longer)
    /// exists on-chain.
    pub fn process_on_chain_non_existent(&self) {
        self.run_ingress(|inner, _ctx| {
            inner.exists = false;
            inner.dispute.clear();
        });
    }

    /// Processes a proof received from a peer off-chain.
    pub fn process_off_chain(&self, reinit: Vec<u8>, proof: StateProof) {
        self.run_ingress(|inner, _ctx| {
            if !inner.exists {
                return;
            }
            if !reinit.is_empty() {
                match inner.board.reinit_id() {
                    Some(current) if current.as_bytes() == reinit.as_slice() => {}
                    _ => return,
                }
            }
            let metadata = match inner.board.metadata().cloned() {
                Some(m) => m,
                None => return,
            };
            if self.verifier.verify(&metadata, &proof) {
                inner.board.update_with_move(proof);
            }
        });
    }

    /// Processes a move made by the local player.
    pub fn process_local_move(&self, move_bytes: &[u8]) {
        self.run_ingress(|inner, ctx| {
            if !inner.exists {
                return;
            }
            let local_idx = match inner
                .board
                .metadata()
                .and_then(|m| m.local_index(&self.player_name))
            {
                Some(idx) => idx,
                None => return,
            };
            if inner.board.whose_turn() != Some(local_idx) {
                return;
            }
            if self.apply_local_move(inner, move_bytes) {
                ctx.broadcast_local = true;
            }
        });
    }

    /// Requests that a dispute be filed for this channel.
    pub fn file_dispute(&self) {
        self.run_ingress(|inner, _ctx| {
            if !inner.exists {
                return;
            }
            if inner.dispute.get().is_some() {
                return;
            }
            inner.pending.request_dispute();
        });
    }

    /// Stops the manager: all further ingress calls are no-ops, and any
    /// `wait_for_change` caller (current or future) returns immediately.
    pub fn stop_updates(&self) {
        let mut guard = lock_logged(&self.inner, "channel manager");
        guard.stopped = true;
        drop(guard);
        self.notifier.notify_all();
    }

    /// Blocks until the version differs from `known_version`, until
    /// `stop_updates` is called, or (if `known_version` is
    /// `WAITFORCHANGE_ALWAYS_BLOCK`) until the next change regardless of
    /// the caller's last known version. Returns the `to_json` snapshot
    /// taken at the moment of wake, under the same lock.
    pub fn wait_for_change(&self, known_version: i64) -> serde_json::Value {
        let mut guard = lock_logged(&self.inner, "channel manager");
        loop {
            if guard.stopped {
                return self.snapshot_json(&guard);
            }
            if known_version != WAITFORCHANGE_ALWAYS_BLOCK && known_version != guard.version {
                return self.snapshot_json(&guard);
            }
            guard = self.notifier.wait(guard);
        }
    }

    /// The current observable state: existence, the channel's metadata and
    /// latest board state if it exists, and any outstanding dispute record.
    pub fn to_json(&self) -> serde_json::Value {
        let guard = lock_logged(&self.inner, "channel manager");
        self.snapshot_json(&guard)
    }

    fn snapshot_json(&self, inner: &Inner) -> serde_json::Value {
        let mut root = json!({
            "id": self.channel_id.to_hex(),
            "playername": self.player_name,
            "existsonchain": inner.exists,
            "version": inner.version,
        });

        if inner.exists {
            if let (Some(metadata), Some(state)) = (inner.board.metadata(), inner.board.latest_state())
            {
                let participants: Vec<serde_json::Value> = metadata
                    .participants
                    .iter()
                    .map(|p| json!({ "name": p.name, "address": p.address }))
                    .collect();
                root["current"] = json!({
                    "meta": { "participants": participants },
                    "state": {
                        "parsed": self.rules.state_to_json(state),
                        "turncount": self.rules.turn_count(state),
                        "whoseturn": self.rules.whose_turn(state),
                    },
                });
            }
        }

        if let Some(dispute) = inner.dispute.get() {
            let local_idx = inner
                .board
                .metadata()
                .and_then(|m| m.local_index(&self.player_name));
            let current_count = inner.board.turn_count();
            let can_resolve = local_idx == Some(dispute.turn) && current_count > dispute.count;
            root["dispute"] = json!({
                "height": dispute.height,
                "whoseturn": dispute.turn,
                "canresolve": can_resolve,
            });
        }

        root
    }
}
