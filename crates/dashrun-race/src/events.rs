use serde::{Deserialize, Serialize};

use dashrun_core::player::PlayerId;

/// Why a race stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceEndReason {
    TimeLimit,
    AllFinished,
}

/// Notable things that happened during a tick, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceEvent {
    CountdownTick { remaining: u32 },
    RaceStarted { start_time_ms: u64 },
    CheckpointReached { player_id: PlayerId, index: usize },
    LapCompleted { player_id: PlayerId, lap: u32 },
    PlayerRespawned { player_id: PlayerId },
    PlayerFinished { player_id: PlayerId, finish_time_ms: u64 },
    RaceEnded { reason: RaceEndReason },
}
