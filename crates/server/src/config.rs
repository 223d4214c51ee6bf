use std::time::Duration;

use tiltrace::{DEFAULT_TICK, Difficulty, LinkLossSimulation, SessionConfig, TrackKind};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub tick: Duration,
    pub track_kind: TrackKind,
    /// `None` generates the chosen kind without obstructions.
    pub difficulty: Option<Difficulty>,
    /// Seed for the first map; later maps use the following seeds.
    pub seed: Option<u64>,
    pub link_loss: Option<LinkLossSimulation>,
    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            track_kind: TrackKind::RandomBlocks,
            difficulty: Some(Difficulty::Easy),
            seed: None,
            link_loss: None,
            session: SessionConfig::default(),
        }
    }
}
