use crate::collision::{TickStart, floor_row};
use crate::config::{PhysicsConfig, RaceConfig};
use crate::events::RaceEndReason;
use crate::level::{Level, RaceMode, TileKind};
use crate::racer::{DashState, JumpState, Racer};

/// A checkpoint advance produced by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointAdvance {
    pub index: usize,
    pub lap_completed: bool,
}

/// Top-left position that puts a racer centred on top of the start tile.
pub fn spawn_point(level: &Level, cfg: &PhysicsConfig) -> Option<(f32, f32)> {
    let (col, row) = level.start_tile()?;
    Some((
        col as f32 * cfg.tile_size + (cfg.tile_size - cfg.player_width) / 2.0,
        row as f32 * cfg.tile_size - cfg.player_height,
    ))
}

/// Put a racer back on the start tile with movement state cleared.
///
/// The lap count survives; checkpoint progress for the current lap does not.
pub fn respawn(racer: &mut Racer, level: &Level, cfg: &PhysicsConfig) {
    let Some((x, y)) = spawn_point(level, cfg) else {
        return;
    };
    racer.x = x;
    racer.y = y;
    racer.vx = 0.0;
    racer.vy = 0.0;
    racer.jump = JumpState::Spent;
    racer.dash = DashState::Ready;
    racer.dash_charged = false;
    racer.rotation = 0.0;
    racer.last_checkpoint_index = -1;
    tracing::debug!(player_id = racer.id, "racer respawned at start");
}

/// Advance to the next checkpoint when the racer's centre tile is within
/// tolerance of it. At most one advance per call.
pub fn check_checkpoint(
    racer: &mut Racer,
    start: &TickStart,
    level: &Level,
    config: &RaceConfig,
) -> Option<CheckpointAdvance> {
    if level.mode != RaceMode::Lap || level.checkpoints.is_empty() {
        return None;
    }
    let cfg = &config.physics;
    let count = level.checkpoints.len();
    let next = (racer.last_checkpoint_index + 1) as usize % count;
    let (cx, cy) = level.tile_coords(level.checkpoints[next]);
    let tolerance = config.checkpoint_tolerance_tiles;
    let within = |(tx, ty): (i32, i32)| (tx - cx).abs().max((ty - cy).abs()) <= tolerance;

    if !within(racer.centre_tile(cfg)) {
        return None;
    }

    // A single-checkpoint loop only counts again after leaving the zone.
    if next as i32 == racer.last_checkpoint_index {
        let was_inside = within((
            cfg.tile_of(start.x + cfg.player_width / 2.0),
            cfg.tile_of(start.y + cfg.player_height / 2.0),
        ));
        if was_inside {
            return None;
        }
    }

    racer.last_checkpoint_index = next as i32;
    let lap_completed = next == count - 1;
    if lap_completed {
        racer.lap_count += 1;
        tracing::debug!(player_id = racer.id, lap = racer.lap_count, "lap completed");
    }
    tracing::debug!(player_id = racer.id, checkpoint = next, "checkpoint reached");
    Some(CheckpointAdvance {
        index: next,
        lap_completed,
    })
}

/// Mark the racer finished when its centre is on (or standing on) a finish
/// tile. Returns true only on the tick the finish is recorded.
pub fn check_finish(racer: &mut Racer, level: &Level, config: &RaceConfig, elapsed_ms: u64) -> bool {
    if racer.finished {
        return false;
    }
    let cfg = &config.physics;
    let (cx, cy) = racer.centre_tile(cfg);
    let on_finish = level.kind_at(cx, cy) == TileKind::Finish
        || (racer.is_grounded() && level.kind_at(cx, floor_row(racer.y, cfg)) == TileKind::Finish);
    if !on_finish {
        return false;
    }
    if level.mode == RaceMode::Lap && racer.lap_count < config.required_laps {
        return false;
    }

    racer.finished = true;
    racer.finish_time_ms = Some(elapsed_ms);
    racer.vx = 0.0;
    racer.vy = 0.0;
    racer.dash = DashState::Ready;
    true
}

/// Time limit applies to every mode; sprint races also end once every
/// remaining racer has finished.
pub fn race_end_reason<'a>(
    racers: impl IntoIterator<Item = &'a Racer>,
    mode: RaceMode,
    elapsed_ms: u64,
    config: &RaceConfig,
) -> Option<RaceEndReason> {
    if elapsed_ms > config.max_race_ms {
        return Some(RaceEndReason::TimeLimit);
    }
    if mode == RaceMode::Sprint && racers.into_iter().all(|r| r.finished) {
        return Some(RaceEndReason::AllFinished);
    }
    None
}
