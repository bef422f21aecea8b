//! Shared test fixtures: a tiny `GameRules` test double and in-memory fakes
//! for every collaborator trait, plus a `Fixture` that wires a
//! `ChannelManager` up against them.

use std::sync::{Arc, Mutex, Once};

use gamechannel::{
    ChannelId, ChannelManager, ChannelMetadata, Error, GameRules, ManagerConfig, MoveSender,
    OffChainBroadcast, OnChainPayload, Participant, ProofVerifier, Result, StateProof, Transition,
    Wallet,
};

/// Encodes a board state as `"<count> <turn>"`, where `turn` is the
/// participant index whose move is next, or `-1` for no-turn/terminal.
pub fn state(count: u32, turn: i32) -> Vec<u8> {
    format!("{count} {turn}").into_bytes()
}

fn parse(s: &[u8]) -> (u32, i32) {
    let text = std::str::from_utf8(s).expect("test states are always utf8");
    let mut parts = text.split_whitespace();
    let count: u32 = parts.next().unwrap().parse().unwrap();
    let turn: i32 = parts.next().unwrap().parse().unwrap();
    (count, turn)
}

/// Builds a `StateProof` anchored at `initial` whose unverified end state is
/// `end` (a single synthetic transition is appended if they differ).
pub fn proof_to(initial: &[u8], end: &[u8]) -> StateProof {
    let mut proof = StateProof::new(initial.to_vec(), vec!["s0-sig".to_string()]);
    if initial != end {
        proof.append_transition(Transition {
            state: end.to_vec(),
            signature: "t1-sig".to_string(),
        });
    }
    proof
}

/// A minimal turn-based game over `"<count> <turn>"` states. `auto_move_cap`
/// bounds how many times `maybe_auto_move` proposes another step before
/// standing down (0 disables auto-moves). `on_chain_move_threshold`, if set,
/// makes `maybe_on_chain_move` fire once `count` reaches it.
pub struct FixedTurnGame {
    pub participants: usize,
    pub auto_move_cap: u32,
    pub on_chain_move_threshold: Option<u32>,
}

impl Default for FixedTurnGame {
    fn default() -> Self {
        FixedTurnGame {
            participants: 2,
            auto_move_cap: 0,
            on_chain_move_threshold: None,
        }
    }
}

impl GameRules for FixedTurnGame {
    fn states_equal(&self, a: &[u8], b: &[u8]) -> bool {
        a == b
    }

    fn whose_turn(&self, state: &[u8]) -> Option<usize> {
        let (_, turn) = parse(state);
        if turn < 0 {
            None
        } else {
            Some(turn as usize)
        }
    }

    fn turn_count(&self, state: &[u8]) -> u32 {
        parse(state).0
    }

    fn apply_move(&self, state: &[u8], move_bytes: &[u8]) -> Option<Vec<u8>> {
        let (count, _) = parse(state);
        let (new_count, _) = parse(move_bytes);
        if new_count == count + 1 {
            Some(move_bytes.to_vec())
        } else {
            None
        }
    }

    fn maybe_auto_move(&self, state: &[u8], local_player_index: usize) -> Option<Vec<u8>> {
        let (count, turn) = parse(state);
        if self.auto_move_cap == 0 || turn != local_player_index as i32 || count >= self.auto_move_cap
        {
            return None;
        }
        let next_turn = if self.participants <= 1 {
            turn
        } else {
            (turn + 1) % self.participants as i32
        };
        Some(state(count + 1, next_turn))
    }

    fn maybe_on_chain_move(&self, state: &[u8]) -> Option<serde_json::Value> {
        let (count, _) = parse(state);
        match self.on_chain_move_threshold {
            Some(threshold) if count >= threshold => Some(serde_json::json!({ "count": count })),
            _ => None,
        }
    }

    fn state_to_json(&self, state: &[u8]) -> serde_json::Value {
        let (count, turn) = parse(state);
        serde_json::json!({ "count": count, "turn": turn })
    }

    fn signing_message(&self, channel_id: &ChannelId, new_state: &[u8]) -> String {
        format!("{}:{}", channel_id, String::from_utf8_lossy(new_state))
    }
}

/// Accepts every proof unconditionally; signature verification is out of
/// this crate's scope.
pub struct AcceptAllVerifier;

impl ProofVerifier for AcceptAllVerifier {
    fn verify(&self, _metadata: &ChannelMetadata, _proof: &StateProof) -> bool {
        true
    }
}

/// Signs by concatenating the address and message; fails when `should_fail`
/// is set, to exercise the signing-failure path.
#[derive(Default)]
pub struct FakeWallet {
    should_fail: Mutex<bool>,
}

impl FakeWallet {
    pub fn set_should_fail(&self, value: bool) {
        *self.should_fail.lock().unwrap() = value;
    }
}

impl Wallet for FakeWallet {
    fn sign_message(&self, address: &str, message: &str) -> Result<String> {
        if *self.should_fail.lock().unwrap() {
            return Err(Error::SigningFailed {
                address: address.to_string(),
                reason: "test wallet configured to fail".to_string(),
            });
        }
        Ok(format!("sig({address},{message})"))
    }
}

/// What `FakeMoveSender` recorded about one `send` call, erasing the proof
/// content (assertions only care about which kind of transaction fired).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedPayload {
    Dispute,
    Resolution,
    Move(serde_json::Value),
}

/// Records every submission it receives; fails (without recording success)
/// when `should_fail` is set.
#[derive(Default)]
pub struct FakeMoveSender {
    should_fail: Mutex<bool>,
    sent: Mutex<Vec<RecordedPayload>>,
}

impl FakeMoveSender {
    pub fn set_should_fail(&self, value: bool) {
        *self.should_fail.lock().unwrap() = value;
    }

    pub fn sent(&self) -> Vec<RecordedPayload> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&RecordedPayload) -> bool) -> usize {
        self.sent.lock().unwrap().iter().filter(|p| matches(*p)).count()
    }
}

impl MoveSender for FakeMoveSender {
    fn send(&self, payload: OnChainPayload) -> Result<String> {
        if *self.should_fail.lock().unwrap() {
            return Err(Error::SubmissionFailed("test sender configured to fail".to_string()));
        }
        let recorded = match payload {
            OnChainPayload::Dispute { .. } => RecordedPayload::Dispute,
            OnChainPayload::Resolution { .. } => RecordedPayload::Resolution,
            OnChainPayload::Move(value) => RecordedPayload::Move(value),
        };
        self.sent.lock().unwrap().push(recorded);
        Ok("deadbeef".to_string())
    }
}

/// Records every broadcast message it receives.
#[derive(Default)]
pub struct FakeBroadcast {
    messages: Mutex<Vec<Vec<u8>>>,
}

impl FakeBroadcast {
    pub fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

impl OffChainBroadcast for FakeBroadcast {
    fn send_message(&self, bytes: &[u8]) {
        self.messages.lock().unwrap().push(bytes.to_vec());
    }
}

/// Two participants, "alice" (the local player, index 0) and "bob" (index 1).
pub fn two_player_metadata() -> ChannelMetadata {
    ChannelMetadata {
        participants: vec![
            Participant {
                name: "alice".to_string(),
                address: "addr-alice".to_string(),
            },
            Participant {
                name: "bob".to_string(),
                address: "addr-bob".to_string(),
            },
        ],
    }
}

/// A single local participant, "alice".
pub fn single_player_metadata() -> ChannelMetadata {
    ChannelMetadata {
        participants: vec![Participant {
            name: "alice".to_string(),
            address: "addr-alice".to_string(),
        }],
    }
}

pub struct Fixture {
    pub manager: Arc<ChannelManager>,
    pub sender: Arc<FakeMoveSender>,
    pub broadcaster: Arc<FakeBroadcast>,
    pub wallet: Arc<FakeWallet>,
}

static LOG_INIT: Once = Once::new();

fn init_logging() {
    LOG_INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Builds a manager observed as "alice" over the given rules, with its move
/// sender and broadcaster attached and recording.
pub fn build(rules: FixedTurnGame) -> Fixture {
    init_logging();
    let wallet = Arc::new(FakeWallet::default());
    let manager = Arc::new(ChannelManager::new(
        Arc::new(rules),
        Arc::new(AcceptAllVerifier),
        wallet.clone(),
        ChannelId::from_bytes([7u8; 32]),
        "alice".to_string(),
        ManagerConfig::default(),
    ));
    let sender = Arc::new(FakeMoveSender::default());
    let broadcaster = Arc::new(FakeBroadcast::default());
    manager.set_move_sender(sender.clone());
    manager.set_off_chain_broadcast(broadcaster.clone());
    Fixture {
        manager,
        sender,
        broadcaster,
        wallet,
    }
}
