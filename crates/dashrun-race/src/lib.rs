pub mod collision;
pub mod config;
pub mod events;
pub mod input;
pub mod level;
pub mod physics;
pub mod progress;
pub mod racer;
pub mod ranking;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use dashrun_core::codec::{self, CodecError};
use dashrun_core::player::{Player, PlayerId};
use dashrun_core::time::TimestampMs;

pub use config::{ConfigError, PhysicsConfig, RaceConfig};
pub use events::{RaceEndReason, RaceEvent};
pub use input::RaceInput;
pub use level::{Level, LevelError, RaceMode, TileKind};
pub use racer::Racer;
pub use ranking::RaceResult;

use collision::TickStart;

/// Race lifecycle. `Finished` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceStatus {
    Waiting,
    Countdown,
    Racing,
    Finished,
}

/// Everything one lobby's race owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Ordered by id so every tick walks racers in the same order.
    pub players: BTreeMap<PlayerId, Racer>,
    pub level: Level,
    pub mode: RaceMode,
    pub status: RaceStatus,
    pub tick: u64,
    /// Whole seconds left while counting down.
    pub countdown: Option<u32>,
    pub start_time_ms: Option<TimestampMs>,
    pub end_time_ms: Option<TimestampMs>,
    pub end_reason: Option<RaceEndReason>,
}

/// Per-tick broadcast view of [`GameState`] without the static level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub tick: u64,
    pub status: RaceStatus,
    pub countdown: Option<u32>,
    pub start_time_ms: Option<TimestampMs>,
    pub end_time_ms: Option<TimestampMs>,
    pub end_reason: Option<RaceEndReason>,
    pub racers: Vec<Racer>,
}

/// Authoritative simulation for one lobby.
pub struct RaceSimulation {
    state: GameState,
    config: RaceConfig,
    /// Latest input per racer since the last tick.
    pending_inputs: BTreeMap<PlayerId, RaceInput>,
    last_tick_ms: Option<TimestampMs>,
    countdown_started_ms: Option<TimestampMs>,
}

impl RaceSimulation {
    /// Validate the level and place every roster entry on the start tile.
    pub fn new(level: Level, roster: &[Player], config: RaceConfig) -> Result<Self, LevelError> {
        level.validate()?;
        let (spawn_x, spawn_y) =
            progress::spawn_point(&level, &config.physics).ok_or(LevelError::MissingStart)?;
        let players = roster
            .iter()
            .map(|p| (p.id, Racer::new(p, spawn_x, spawn_y)))
            .collect();

        Ok(Self {
            state: GameState {
                players,
                mode: level.mode,
                level,
                status: RaceStatus::Waiting,
                tick: 0,
                countdown: None,
                start_time_ms: None,
                end_time_ms: None,
                end_reason: None,
            },
            config,
            pending_inputs: BTreeMap::new(),
            last_tick_ms: None,
            countdown_started_ms: None,
        })
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    pub fn status(&self) -> RaceStatus {
        self.state.status
    }

    pub fn racer(&self, player_id: PlayerId) -> Option<&Racer> {
        self.state.players.get(&player_id)
    }

    pub fn start_countdown(&mut self, now_ms: TimestampMs) -> Vec<RaceEvent> {
        if self.state.status != RaceStatus::Waiting {
            return Vec::new();
        }
        let secs = self.config.countdown_secs;
        self.state.status = RaceStatus::Countdown;
        self.state.countdown = Some(secs);
        self.countdown_started_ms = Some(now_ms);
        tracing::info!(level = %self.state.level.id, seconds = secs, "race countdown started");
        vec![RaceEvent::CountdownTick { remaining: secs }]
    }

    /// Skip straight to racing. Also used when the countdown runs out.
    pub fn start_race(&mut self, now_ms: TimestampMs) -> Vec<RaceEvent> {
        if !matches!(
            self.state.status,
            RaceStatus::Waiting | RaceStatus::Countdown
        ) {
            return Vec::new();
        }
        self.state.status = RaceStatus::Racing;
        self.state.countdown = None;
        self.state.start_time_ms = Some(now_ms);
        self.pending_inputs.clear();
        tracing::info!(
            level = %self.state.level.id,
            racers = self.state.players.len(),
            "race started"
        );
        vec![RaceEvent::RaceStarted {
            start_time_ms: now_ms,
        }]
    }

    /// Buffer an input for the next tick, received at server time `now_ms`.
    /// Stale messages are dropped on arrival and never reach the buffer.
    /// Returns false when the input was not buffered.
    pub fn submit_input(
        &mut self,
        player_id: PlayerId,
        input: RaceInput,
        now_ms: TimestampMs,
    ) -> bool {
        if self.state.status != RaceStatus::Racing {
            return false;
        }
        match self.state.players.get(&player_id) {
            None => {
                tracing::debug!(player_id, "input for unknown player ignored");
                false
            },
            Some(racer) if racer.finished => false,
            Some(_) if input.is_stale(now_ms, self.config.stale_input_ms) => {
                tracing::debug!(
                    player_id,
                    timestamp_ms = input.timestamp_ms,
                    now_ms,
                    "stale input dropped"
                );
                false
            },
            Some(_) => {
                self.pending_inputs
                    .entry(player_id)
                    .and_modify(|buffered| buffered.merge(input))
                    .or_insert(input);
                true
            },
        }
    }

    pub fn player_left(&mut self, player_id: PlayerId) {
        if self.state.players.remove(&player_id).is_some() {
            tracing::debug!(player_id, "racer left the race");
        }
        self.pending_inputs.remove(&player_id);
    }

    /// Fixed-rate gate: runs at most one tick per call, and only once a full
    /// tick interval has passed since the previous one.
    pub fn update(&mut self, now_ms: TimestampMs) -> Vec<RaceEvent> {
        let tick_ms = self.config.tick_ms();
        match self.last_tick_ms {
            Some(last) if now_ms.saturating_sub(last) < tick_ms => return Vec::new(),
            Some(last) => {
                let next = last + tick_ms;
                // Far behind: resync instead of replaying a burst of ticks.
                let resync = now_ms - next >= tick_ms;
                self.last_tick_ms = Some(if resync { now_ms } else { next });
            },
            None => self.last_tick_ms = Some(now_ms),
        }
        self.tick(now_ms)
    }

    /// Advance exactly one tick at server time `now_ms`.
    pub fn tick(&mut self, now_ms: TimestampMs) -> Vec<RaceEvent> {
        let mut events = Vec::new();
        match self.state.status {
            RaceStatus::Waiting | RaceStatus::Finished => return events,
            RaceStatus::Countdown => self.tick_countdown(now_ms, &mut events),
            RaceStatus::Racing => self.tick_race(now_ms, &mut events),
        }
        self.state.tick += 1;

        if tracing::enabled!(tracing::Level::TRACE)
            && let Ok(hash) = self.state_hash()
        {
            tracing::trace!(tick = self.state.tick, %hash, "state hash");
        }
        events
    }

    fn tick_countdown(&mut self, now_ms: TimestampMs, events: &mut Vec<RaceEvent>) {
        let started = self.countdown_started_ms.unwrap_or(now_ms);
        let elapsed = now_ms.saturating_sub(started);
        let secs = self.config.countdown_secs;

        if elapsed >= u64::from(secs) * 1000 {
            events.extend(self.start_race(now_ms));
            return;
        }
        let remaining = secs - (elapsed / 1000) as u32;
        if self.state.countdown != Some(remaining) {
            self.state.countdown = Some(remaining);
            events.push(RaceEvent::CountdownTick { remaining });
        }
    }

    fn tick_race(&mut self, now_ms: TimestampMs, events: &mut Vec<RaceEvent>) {
        let elapsed = now_ms.saturating_sub(self.state.start_time_ms.unwrap_or(now_ms));
        let config = &self.config;
        let level = &self.state.level;

        for racer in self.state.players.values_mut() {
            let input = self.pending_inputs.remove(&racer.id);
            if racer.finished {
                continue;
            }
            let input = input.filter(|i| {
                let stale = i.is_stale(now_ms, config.stale_input_ms);
                if stale {
                    tracing::debug!(
                        player_id = racer.id,
                        timestamp_ms = i.timestamp_ms,
                        now_ms,
                        "stale input dropped"
                    );
                }
                !stale
            });
            step_racer(racer, input.as_ref(), level, config, elapsed, events);
        }

        if let Some(reason) =
            progress::race_end_reason(self.state.players.values(), self.state.mode, elapsed, config)
        {
            self.state.status = RaceStatus::Finished;
            self.state.end_time_ms = Some(now_ms);
            self.state.end_reason = Some(reason);
            self.pending_inputs.clear();
            tracing::info!(?reason, elapsed_ms = elapsed, "race ended");
            events.push(RaceEvent::RaceEnded { reason });
        }
    }

    /// Standings for the current state; final once the race is finished.
    pub fn ranked_results(&self) -> Vec<RaceResult> {
        ranking::rank(self.state.players.values())
    }

    pub fn snapshot(&self) -> RaceSnapshot {
        RaceSnapshot {
            tick: self.state.tick,
            status: self.state.status,
            countdown: self.state.countdown,
            start_time_ms: self.state.start_time_ms,
            end_time_ms: self.state.end_time_ms,
            end_reason: self.state.end_reason,
            racers: self.state.players.values().cloned().collect(),
        }
    }

    pub fn snapshot_bytes(&self) -> Result<Vec<u8>, CodecError> {
        codec::encode(&self.snapshot())
    }

    /// Hex SHA-256 of the encoded snapshot, for determinism checks.
    pub fn state_hash(&self) -> Result<String, CodecError> {
        let bytes = self.snapshot_bytes()?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}

/// One racer, one tick: input, integration, collision, then progress.
fn step_racer(
    racer: &mut Racer,
    input: Option<&RaceInput>,
    level: &Level,
    config: &RaceConfig,
    elapsed_ms: u64,
    events: &mut Vec<RaceEvent>,
) {
    let cfg = &config.physics;
    input::tick_cooldown(racer);
    let start = TickStart::capture(racer);

    let horizontal = input.is_some_and(|i| input::apply_input(racer, i, level, cfg));
    input::steer_dash(racer, cfg);
    physics::integrate(racer, horizontal, cfg);

    let contacts = collision::resolve(racer, &start, level, config);
    if contacts.respawned {
        events.push(RaceEvent::PlayerRespawned {
            player_id: racer.id,
        });
        return;
    }
    input::advance_dash(racer, start.x, contacts.wrapped, cfg);

    if let Some(advance) = progress::check_checkpoint(racer, &start, level, config) {
        events.push(RaceEvent::CheckpointReached {
            player_id: racer.id,
            index: advance.index,
        });
        if advance.lap_completed {
            events.push(RaceEvent::LapCompleted {
                player_id: racer.id,
                lap: racer.lap_count,
            });
        }
    }

    if progress::check_finish(racer, level, config, elapsed_ms) {
        tracing::info!(player_id = racer.id, finish_time_ms = elapsed_ms, "racer finished");
        events.push(RaceEvent::PlayerFinished {
            player_id: racer.id,
            finish_time_ms: elapsed_ms,
        });
    }
}
