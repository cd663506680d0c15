use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use dashrun_core::codec;
use dashrun_core::player::{Player, PlayerId};
use dashrun_core::time::Clock;
use dashrun_race::{Level, LevelError, RaceConfig, RaceInput, RaceSimulation, RaceStatus};

use crate::config::LimitsConfig;
use crate::rate_limit::InputRateLimiter;

/// Commands sent from a lobby's connections to its race loop.
#[derive(Debug)]
pub enum RaceCommand {
    PlayerInput {
        player_id: PlayerId,
        input: RaceInput,
    },
    PlayerLeft {
        player_id: PlayerId,
    },
    Stop,
}

/// Broadcasts sent from the race loop to everyone in the lobby.
#[derive(Debug, Clone)]
pub enum RaceBroadcast {
    /// MessagePack-encoded `RaceSnapshot` after a tick.
    Snapshot(Bytes),
    /// MessagePack-encoded `Vec<RaceResult>`, sent once when the race ends.
    Results(Bytes),
    /// The loop has exited.
    RaceEnded,
}

/// Everything needed to run one lobby's race.
pub struct RaceSessionConfig {
    pub level: Level,
    pub players: Vec<Player>,
    pub race: RaceConfig,
    pub limits: LimitsConfig,
    pub broadcast_snapshots: bool,
}

/// Spawn a race tick loop as a tokio task.
///
/// The level is validated before anything is spawned. The race starts its
/// countdown immediately. Returns the command sender, the broadcast receiver
/// and the task handle.
pub fn spawn_race_session(
    config: RaceSessionConfig,
    clock: Arc<dyn Clock>,
) -> Result<
    (
        mpsc::UnboundedSender<RaceCommand>,
        mpsc::UnboundedReceiver<RaceBroadcast>,
        JoinHandle<()>,
    ),
    LevelError,
> {
    let RaceSessionConfig {
        level,
        players,
        race,
        limits,
        broadcast_snapshots,
    } = config;
    let sim = RaceSimulation::new(level, &players, race)?;

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (broadcast_tx, broadcast_rx) = mpsc::unbounded_channel();

    let handle = tokio::spawn(async move {
        run_race_tick_loop(
            sim,
            clock,
            limits,
            broadcast_snapshots,
            cmd_rx,
            broadcast_tx,
        )
        .await;
    });

    Ok((cmd_tx, broadcast_rx, handle))
}

/// The server-authoritative race tick loop.
async fn run_race_tick_loop(
    mut sim: RaceSimulation,
    clock: Arc<dyn Clock>,
    limits: LimitsConfig,
    broadcast_snapshots: bool,
    mut cmd_rx: mpsc::UnboundedReceiver<RaceCommand>,
    broadcast_tx: mpsc::UnboundedSender<RaceBroadcast>,
) {
    sim.start_countdown(clock.now_ms());

    let tick_interval = Duration::from_millis(sim.config().tick_ms());
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut limiter =
        InputRateLimiter::new(f64::from(limits.input_burst), limits.input_per_sec);
    let mut snapshot_buf: Vec<u8> = Vec::with_capacity(512);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                // The interval is the fixed-rate gate; one tick per firing.
                sim.tick(clock.now_ms());

                // Reuse buffer to avoid per-tick allocations
                if broadcast_snapshots {
                    match codec::encode_into(&sim.snapshot(), &mut snapshot_buf) {
                        Ok(()) => {
                            let _ = broadcast_tx.send(RaceBroadcast::Snapshot(
                                Bytes::copy_from_slice(&snapshot_buf),
                            ));
                        },
                        Err(e) => tracing::error!(
                            tick = sim.state().tick,
                            error = %e,
                            "Failed to encode race snapshot"
                        ),
                    }
                }

                if sim.status() == RaceStatus::Finished {
                    match codec::encode(&sim.ranked_results()) {
                        Ok(data) => {
                            let _ = broadcast_tx.send(RaceBroadcast::Results(Bytes::from(data)));
                        },
                        Err(e) => tracing::error!(error = %e, "Failed to encode race results"),
                    }
                    break;
                }
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(RaceCommand::PlayerInput { player_id, input }) => {
                        if !limiter.check(player_id, Instant::now()) {
                            tracing::warn!(player_id, "Input rate limit exceeded, dropping input");
                            continue;
                        }
                        if !sim.submit_input(player_id, input, clock.now_ms()) {
                            tracing::debug!(
                                player_id,
                                status = ?sim.status(),
                                "Input not accepted"
                            );
                        }
                    },
                    Some(RaceCommand::PlayerLeft { player_id }) => {
                        sim.player_left(player_id);
                        limiter.forget(player_id);
                        tracing::debug!(
                            player_id,
                            remaining = sim.state().players.len(),
                            rate_limited = limiter.tracked_players(),
                            "Player left race"
                        );
                    },
                    Some(RaceCommand::Stop) | None => {
                        break;
                    },
                }
            }
        }
    }

    let _ = broadcast_tx.send(RaceBroadcast::RaceEnded);
}
