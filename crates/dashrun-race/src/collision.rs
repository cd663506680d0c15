//! Tile collision resolution.
//!
//! Resolution runs as an ordered list of independent rules over one racer:
//! embedded correction, ground, ceiling, walls, level bounds, hazards. A rule
//! may stop the chain (hazard respawn).

use std::ops::RangeInclusive;

use crate::config::{PhysicsConfig, RaceConfig};
use crate::level::{Level, TileKind};
use crate::progress;
use crate::racer::{JumpState, Racer};

/// Nudge used so a box edge resting exactly on a tile boundary does not count
/// as overlapping the next tile.
pub const EDGE_EPSILON: f32 = 0.001;

/// Racer state captured before input and integration for this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickStart {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub grounded: bool,
}

impl TickStart {
    pub fn capture(racer: &Racer) -> Self {
        Self {
            x: racer.x,
            y: racer.y,
            vx: racer.vx,
            grounded: racer.is_grounded(),
        }
    }
}

/// What happened during resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Contacts {
    pub embedded: bool,
    pub landed: bool,
    pub bumped_head: bool,
    pub stepped_up: bool,
    pub blocked: bool,
    pub wrapped: bool,
    pub respawned: bool,
}

/// How a column entered horizontally treats the racer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallClass {
    Clear,
    /// One tile up with free headroom: climb without jumping.
    StepUp,
    Block,
}

enum Flow {
    Continue,
    Stop,
}

struct Resolve<'a> {
    racer: &'a mut Racer,
    level: &'a Level,
    config: &'a RaceConfig,
    start: TickStart,
    contacts: Contacts,
}

type Rule = fn(&mut Resolve<'_>) -> Flow;

const RULES: [Rule; 6] = [
    embedded_correction,
    ground,
    ceiling,
    walls,
    level_bounds,
    hazards,
];

/// Resolve all tile contacts for one racer after integration.
pub fn resolve(racer: &mut Racer, start: &TickStart, level: &Level, config: &RaceConfig) -> Contacts {
    let mut ctx = Resolve {
        racer,
        level,
        config,
        start: *start,
        contacts: Contacts::default(),
    };
    for rule in RULES {
        if let Flow::Stop = rule(&mut ctx) {
            break;
        }
    }
    ctx.contacts
}

// ================================================================
// Geometry helpers
// ================================================================

/// Row directly below the lowest row the box overlaps.
pub fn floor_row(y: f32, cfg: &PhysicsConfig) -> i32 {
    cfg.tile_of(y + cfg.player_height - EDGE_EPSILON) + 1
}

/// Columns overlapped by a box whose left edge is at `x`.
pub fn column_span(x: f32, cfg: &PhysicsConfig) -> RangeInclusive<i32> {
    cfg.tile_of(x)..=cfg.tile_of(x + cfg.player_width - EDGE_EPSILON)
}

/// Rows overlapped by a box whose top edge is at `y`.
pub fn row_span(y: f32, cfg: &PhysicsConfig) -> RangeInclusive<i32> {
    cfg.tile_of(y)..=cfg.tile_of(y + cfg.player_height - EDGE_EPSILON)
}

/// Solid at both one and two rows above `floor`.
pub fn is_thick_wall(level: &Level, col: i32, floor: i32) -> bool {
    level.is_solid_at(col, floor - 1) && level.is_solid_at(col, floor - 2)
}

/// Classify `col` for a box at (`x`, `y`) moving into it.
pub fn classify_column(level: &Level, col: i32, x: f32, y: f32, cfg: &PhysicsConfig) -> WallClass {
    let floor = floor_row(y, cfg);
    let Some(blocking_row) = row_span(y, cfg).rev().find(|&row| level.is_solid_at(col, row)) else {
        return WallClass::Clear;
    };

    let elevation = floor - blocking_row;
    if elevation != 1 || is_thick_wall(level, col, floor) {
        return WallClass::Block;
    }

    let head_row = floor - 2;
    let span = column_span(x, cfg);
    let headroom = span
        .chain(col..=col)
        .all(|c| !level.is_solid_at(c, head_row));
    if headroom {
        WallClass::StepUp
    } else {
        WallClass::Block
    }
}

/// Highest standable tile top within the landing band under the box.
fn find_ground(level: &Level, racer: &Racer, cfg: &PhysicsConfig) -> Option<f32> {
    let bottom = racer.bottom(cfg);
    let lo = bottom - cfg.ground_tolerance - racer.vy.max(0.0);
    let hi = bottom + cfg.ground_tolerance;

    let surface_in = |col: i32| {
        (cfg.tile_of(lo)..=cfg.tile_of(hi)).find_map(|row| {
            let top = row as f32 * cfg.tile_size;
            let standable = (lo..=hi).contains(&top)
                && level.is_solid_at(col, row)
                && !level.is_solid_at(col, row - 1);
            standable.then_some(top)
        })
    };

    let (cx, _) = racer.centre(cfg);
    if let Some(top) = surface_in(cfg.tile_of(cx)) {
        return Some(top);
    }
    column_span(racer.x, cfg)
        .filter_map(surface_in)
        .reduce(f32::min)
}

// ================================================================
// Rules
// ================================================================

/// A box that starts the tick inside a thick wall is pushed to the nearer face
/// of the contiguous wall run.
fn embedded_correction(ctx: &mut Resolve<'_>) -> Flow {
    let cfg = &ctx.config.physics;
    let level = ctx.level;
    let floor = floor_row(ctx.start.y, cfg);
    let Some(col) = column_span(ctx.start.x, cfg).find(|&c| is_thick_wall(level, c, floor)) else {
        return Flow::Continue;
    };

    let mut first = col;
    while is_thick_wall(level, first - 1, floor) {
        first -= 1;
    }
    let mut last = col;
    while is_thick_wall(level, last + 1, floor) {
        last += 1;
    }

    let left_face = first as f32 * cfg.tile_size - cfg.player_width;
    let right_face = (last + 1) as f32 * cfg.tile_size;
    let x = if ctx.start.x - left_face <= right_face - ctx.start.x {
        left_face
    } else {
        right_face
    };

    ctx.racer.x = x;
    ctx.racer.vx = 0.0;
    ctx.racer.end_dash(cfg.dash_cooldown_ticks);
    ctx.start.x = x;
    ctx.contacts.embedded = true;
    Flow::Continue
}

fn ground(ctx: &mut Resolve<'_>) -> Flow {
    let cfg = &ctx.config.physics;
    let racer = &mut *ctx.racer;

    let surface = if racer.vy < -cfg.upward_tolerance {
        None
    } else {
        find_ground(ctx.level, racer, cfg)
    };

    match surface {
        Some(top) => {
            racer.y = top - cfg.player_height;
            racer.land();
            ctx.contacts.landed = true;
        },
        None => {
            if racer.jump == JumpState::Grounded {
                racer.jump = JumpState::FirstJumpAvailable;
            }
        },
    }
    Flow::Continue
}

/// Only checks the columns occupied at tick start; new columns belong to the
/// wall rule.
fn ceiling(ctx: &mut Resolve<'_>) -> Flow {
    let cfg = &ctx.config.physics;
    let racer = &mut *ctx.racer;
    if racer.is_dashing() || racer.vy >= 0.0 {
        return Flow::Continue;
    }

    let row = cfg.tile_of(racer.y);
    if column_span(ctx.start.x, cfg).any(|c| ctx.level.is_solid_at(c, row)) {
        racer.y = (row + 1) as f32 * cfg.tile_size;
        racer.vy = 0.0;
        ctx.contacts.bumped_head = true;
    }
    Flow::Continue
}

/// Sweep every column the leading edge crossed this tick, nearest first.
fn walls(ctx: &mut Resolve<'_>) -> Flow {
    let cfg = &ctx.config.physics;
    let dx = ctx.racer.x - ctx.start.x;
    if dx == 0.0 {
        return Flow::Continue;
    }

    let moving_right = dx > 0.0;
    let columns: Vec<i32> = if moving_right {
        let from = cfg.tile_of(ctx.start.x + cfg.player_width - EDGE_EPSILON) + 1;
        let to = cfg.tile_of(ctx.racer.right(cfg) - EDGE_EPSILON);
        (from..=to).collect()
    } else {
        let from = cfg.tile_of(ctx.start.x) - 1;
        let to = cfg.tile_of(ctx.racer.x);
        (to..=from).rev().collect()
    };

    for col in columns {
        let racer = &mut *ctx.racer;
        match classify_column(ctx.level, col, racer.x, racer.y, cfg) {
            WallClass::Clear => {},
            WallClass::StepUp => {
                let floor = floor_row(racer.y, cfg);
                racer.y = (floor - 1) as f32 * cfg.tile_size - cfg.player_height;
                racer.land();
                ctx.contacts.stepped_up = true;
            },
            WallClass::Block => {
                racer.x = if moving_right {
                    col as f32 * cfg.tile_size - cfg.player_width
                } else {
                    (col + 1) as f32 * cfg.tile_size
                };
                racer.vx = 0.0;
                racer.end_dash(cfg.dash_cooldown_ticks);
                if !racer.is_grounded() && racer.vy < 0.0 {
                    racer.vy = 0.0;
                }
                ctx.contacts.blocked = true;
                break;
            },
        }
    }
    Flow::Continue
}

/// Side edges block, except in the wrap arena where they lead to the
/// opposite edge.
fn level_bounds(ctx: &mut Resolve<'_>) -> Flow {
    let cfg = &ctx.config.physics;
    let racer = &mut *ctx.racer;
    let width_px = ctx.level.pixel_width(cfg.tile_size);
    let max_x = width_px - cfg.player_width;

    if ctx.level.id == ctx.config.wrap_level_id {
        if racer.x < 0.0 {
            racer.x = max_x;
            ctx.contacts.wrapped = true;
        } else if racer.x > max_x {
            racer.x = 0.0;
            ctx.contacts.wrapped = true;
        }
        return Flow::Continue;
    }

    let clamped = racer.x.clamp(0.0, max_x);
    if clamped != racer.x {
        racer.x = clamped;
        racer.vx = 0.0;
        racer.end_dash(cfg.dash_cooldown_ticks);
        ctx.contacts.blocked = true;
    }
    Flow::Continue
}

/// Hazards overlapped by the box, or set into the floor row under a racer
/// standing on it, send the racer back to the start. So does falling out.
fn hazards(ctx: &mut Resolve<'_>) -> Flow {
    let cfg = &ctx.config.physics;
    let racer = &mut *ctx.racer;
    let level = ctx.level;
    let is_hazard = |c: i32, row: i32| level.kind_at(c, row) == TileKind::Hazard;

    let fell_out = racer.y > level.pixel_height(cfg.tile_size);
    let touching =
        column_span(racer.x, cfg).any(|c| row_span(racer.y, cfg).any(|row| is_hazard(c, row)));

    let floor = floor_row(racer.y, cfg);
    let on_floor = racer.is_grounded()
        || (floor as f32 * cfg.tile_size - racer.bottom(cfg)).abs() <= cfg.ground_tolerance;
    let underfoot = on_floor && column_span(racer.x, cfg).any(|c| is_hazard(c, floor));

    if !(fell_out || touching || underfoot) {
        return Flow::Continue;
    }

    progress::respawn(racer, level, cfg);
    ctx.contacts.respawned = true;
    Flow::Stop
}
