//! Client-side state-channel manager for blockchain-backed games.
//!
//! A `ChannelManager` reconciles on-chain observations, off-chain proofs
//! exchanged directly between participants, and local player moves against
//! one game channel's state. It decides when disputes must be filed, when a
//! pending dispute can be resolved, when a game-specific move must be sent
//! on-chain, and when the locally advanced state should be broadcast to
//! peers — and it notifies any thread blocked in `wait_for_change` whenever
//! the observable state moves forward.
//!
//! The manager itself never talks to a wallet, a blockchain node or a peer
//! transport directly; those are injected as collaborators (`GameRules`,
//! `ProofVerifier`, `MoveSender`, `OffChainBroadcast`, `Wallet`) so this
//! crate stays usable against any concrete game and any concrete chain
//! plumbing.
#![deny(unused_must_use)]
#![warn(missing_docs)]

mod board_states;
mod collaborators;
mod config;
mod dispute;
mod error;
mod manager;
mod notifier;
mod pending;
mod proof;
mod rules;
mod types;

pub use collaborators::{MoveSender, OffChainBroadcast, OnChainPayload, ProofVerifier, Wallet};
pub use config::ManagerConfig;
pub use dispute::DisputeRecord;
pub use error::{Error, Result};
pub use manager::ChannelManager;
pub use notifier::WAITFORCHANGE_ALWAYS_BLOCK;
pub use proof::{compute_reinit_id, BroadcastMessage, ReinitId, StateProof, Transition};
pub use rules::GameRules;
pub use types::{ChannelId, ChannelMetadata, Participant};
