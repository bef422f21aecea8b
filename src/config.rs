//! Deployment knobs for a `ChannelManager`, supplied by the embedding
//! daemon rather than read from a file by this crate — file and CLI
//! parsing stay the daemon's job.

/// Configuration a `ChannelManager` is constructed with.
#[derive(Clone, Debug)]
pub struct ManagerConfig {
    /// Upper bound on consecutive auto-moves applied within a single
    /// `post_process` pass, guarding against an auto-move loop that never
    /// terminates due to a misbehaving `GameRules` implementation.
    pub auto_move_cap: u32,
    /// The `log` target this manager's messages are emitted under, so an
    /// embedding daemon running several channels can filter per channel.
    pub log_target: String,
}

impl Default for ManagerConfig {
    /// 64 auto-moves is generous for any turn-based game while still
    /// bounding a runaway loop.
    fn default() -> Self {
        ManagerConfig {
            auto_move_cap: 64,
            log_target: "gamechannel".to_string(),
        }
    }
}
