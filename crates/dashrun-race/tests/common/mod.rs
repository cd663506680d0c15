//! Shared level fixtures and drivers for the race integration tests.

use dashrun_core::player::PlayerId;
use dashrun_core::test_helpers::make_players;
use dashrun_race::{Level, RaceConfig, RaceEvent, RaceInput, RaceMode, RaceSimulation};

pub const WIDTH: usize = 24;
pub const TICK_MS: u64 = 50;
/// Pixel width of every fixture level.
pub const WIDTH_PX: f32 = WIDTH as f32 * 32.0;
pub const BOX_W: f32 = 24.0;

/// Blank rows above a floor on row 8 with bedrock on row 9. Start pad at
/// column 1, finish pad at column 22.
pub fn floor_rows() -> Vec<String> {
    let mut rows = vec![".".repeat(WIDTH); 8];
    rows.push(format!("#S{}F#", "#".repeat(WIDTH - 4)));
    rows.push("#".repeat(WIDTH));
    rows
}

pub fn put(rows: &mut [String], x: usize, y: usize, glyph: char) {
    let mut chars: Vec<char> = rows[y].chars().collect();
    chars[x] = glyph;
    rows[y] = chars.into_iter().collect();
}

pub fn build(id: &str, mode: RaceMode, rows: &[String]) -> Level {
    let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
    Level::from_ascii(id, mode, &refs).unwrap()
}

/// Same layout with columns reversed.
pub fn mirrored(rows: &[String]) -> Vec<String> {
    rows.iter().map(|r| r.chars().rev().collect()).collect()
}

pub fn sprint_level() -> Level {
    build("flat-sprint", RaceMode::Sprint, &floor_rows())
}

/// One-tile ledge at column 8, two-tile wall at column 14.
pub fn ledge_and_wall_rows() -> Vec<String> {
    let mut rows = floor_rows();
    put(&mut rows, 8, 7, '#');
    put(&mut rows, 14, 7, '#');
    put(&mut rows, 14, 6, '#');
    rows
}

/// Full-height wall at column 12 that cannot be jumped.
pub fn tall_wall_level() -> Level {
    let mut rows = floor_rows();
    for y in 0..8 {
        put(&mut rows, 12, y, '#');
    }
    build("tall-wall", RaceMode::Sprint, &rows)
}

/// Spikes standing on the floor at column 10.
pub fn hazard_level() -> Level {
    let mut rows = floor_rows();
    put(&mut rows, 10, 7, '^');
    build("spikes", RaceMode::Sprint, &rows)
}

/// Wrapping lap arena: finish pad at column 3, checkpoints at 6, 12 and 18.
pub fn lap_arena() -> Level {
    let mut rows = floor_rows();
    put(&mut rows, 22, 8, '#');
    put(&mut rows, 3, 8, 'F');
    for x in [6, 12, 18] {
        put(&mut rows, x, 7, 'C');
    }
    build(dashrun_race::config::WRAP_LEVEL_ID, RaceMode::Lap, &rows)
}

/// A simulation already racing, started at time 0.
pub fn racing(level: Level, players: usize, config: RaceConfig) -> RaceSimulation {
    let mut sim = RaceSimulation::new(level, &make_players(players), config).unwrap();
    sim.start_race(0);
    sim
}

pub fn input(bits: (bool, bool, bool, bool), timestamp_ms: u64) -> RaceInput {
    let (left, right, jump, dash) = bits;
    RaceInput {
        left,
        right,
        jump,
        dash,
        timestamp_ms,
    }
}

pub fn hold_right(timestamp_ms: u64) -> RaceInput {
    input((false, true, false, false), timestamp_ms)
}

/// Run tick `n` (1-based) with one input per listed player.
pub fn tick_with(
    sim: &mut RaceSimulation,
    n: u64,
    inputs: &[(PlayerId, (bool, bool, bool, bool))],
) -> Vec<RaceEvent> {
    let now = n * TICK_MS;
    for &(id, bits) in inputs {
        sim.submit_input(id, input(bits, now), now);
    }
    sim.tick(now)
}
