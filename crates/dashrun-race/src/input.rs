use serde::{Deserialize, Serialize};

use dashrun_core::time::TimestampMs;

use crate::collision::{self, EDGE_EPSILON};
use crate::config::PhysicsConfig;
use crate::level::Level;
use crate::racer::{DashState, Facing, JumpState, Racer};

/// Dash remainder below which the dash counts as complete.
const DASH_DONE_EPSILON: f32 = 0.01;

/// One input message from a client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceInput {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub dash: bool,
    /// Client send time on the server clock.
    pub timestamp_ms: TimestampMs,
}

impl RaceInput {
    /// -1, 0 or +1. Holding both directions cancels out.
    pub fn direction(&self) -> f32 {
        match (self.left, self.right) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }

    /// Fold a later message into a buffered one. Jump and dash presses are
    /// kept until a tick consumes them. Direction and timestamp follow the
    /// message with the newest timestamp, so the buffer never ages.
    pub fn merge(&mut self, later: RaceInput) {
        self.jump |= later.jump;
        self.dash |= later.dash;
        if later.timestamp_ms >= self.timestamp_ms {
            self.left = later.left;
            self.right = later.right;
            self.timestamp_ms = later.timestamp_ms;
        }
    }

    /// Outside the staleness window in either direction.
    pub fn is_stale(&self, now_ms: TimestampMs, window_ms: u64) -> bool {
        now_ms.abs_diff(self.timestamp_ms) > window_ms
    }
}

/// Turn one input into movement intent. Returns whether horizontal input was
/// applied this tick (which suppresses ground friction).
pub fn apply_input(racer: &mut Racer, input: &RaceInput, level: &Level, cfg: &PhysicsConfig) -> bool {
    if input.dash {
        try_start_dash(racer, input, level, cfg);
    }
    if racer.is_dashing() {
        return false;
    }

    let dir = input.direction();
    if dir != 0.0 {
        racer.vx = if racer.is_grounded() {
            dir * cfg.ground_speed
        } else {
            dir * cfg.ground_speed * cfg.air_control
        };
    }

    if input.jump {
        jump(racer, cfg);
    }
    dir != 0.0
}

fn jump(racer: &mut Racer, cfg: &PhysicsConfig) {
    match racer.jump {
        JumpState::Grounded | JumpState::FirstJumpAvailable => {
            racer.vy = cfg.jump_velocity;
            racer.jump = JumpState::SecondJumpAvailable;
        },
        JumpState::SecondJumpAvailable => {
            if racer.vy < 0.0 {
                racer.vy = cfg.double_jump_velocity;
            } else {
                racer.vy += cfg.double_jump_velocity;
            }
            racer.jump = JumpState::Spent;
        },
        JumpState::Spent => {},
    }
}

fn try_start_dash(racer: &mut Racer, input: &RaceInput, level: &Level, cfg: &PhysicsConfig) {
    if racer.dash != DashState::Ready || !racer.dash_charged {
        return;
    }
    let direction = if racer.vx != 0.0 {
        facing_of(racer.vx)
    } else if input.direction() != 0.0 {
        facing_of(input.direction())
    } else {
        Facing::Right
    };

    racer.dash = DashState::Dashing {
        direction,
        remaining: dash_reach(racer, direction, level, cfg),
    };
    racer.dash_charged = false;
    racer.vy = 0.0;
}

fn facing_of(v: f32) -> Facing {
    if v < 0.0 { Facing::Left } else { Facing::Right }
}

/// Full dash distance, trimmed to the face of the first thick wall ahead.
pub fn dash_reach(racer: &Racer, direction: Facing, level: &Level, cfg: &PhysicsConfig) -> f32 {
    let full = cfg.dash_distance();
    let floor = collision::floor_row(racer.y, cfg);

    let face_distance = match direction {
        Facing::Right => {
            let lead = racer.right(cfg);
            let from = cfg.tile_of(lead - EDGE_EPSILON) + 1;
            let to = cfg.tile_of(lead + full - EDGE_EPSILON);
            (from..=to)
                .find(|&col| collision::is_thick_wall(level, col, floor))
                .map(|col| col as f32 * cfg.tile_size - lead)
        },
        Facing::Left => {
            let lead = racer.x;
            let from = cfg.tile_of(lead) - 1;
            let to = cfg.tile_of(lead - full);
            (to..=from)
                .rev()
                .find(|&col| collision::is_thick_wall(level, col, floor))
                .map(|col| lead - (col + 1) as f32 * cfg.tile_size)
        },
    };

    face_distance.map_or(full, |d| d.clamp(0.0, full))
}

/// Count down the dash cooldown. Runs once per tick regardless of input.
pub fn tick_cooldown(racer: &mut Racer) {
    if let DashState::Cooldown { ticks_remaining } = racer.dash {
        racer.dash = if ticks_remaining <= 1 {
            DashState::Ready
        } else {
            DashState::Cooldown {
                ticks_remaining: ticks_remaining - 1,
            }
        };
    }
}

/// Drive an active dash before integration: fixed speed, never past the
/// remaining distance, no vertical motion.
pub fn steer_dash(racer: &mut Racer, cfg: &PhysicsConfig) {
    if let DashState::Dashing {
        direction,
        remaining,
    } = racer.dash
    {
        racer.vx = direction.sign() * cfg.dash_speed.min(remaining.max(0.0));
        racer.vy = 0.0;
    }
}

/// Charge the distance covered this tick against the dash. A dash whose
/// velocity was forced to zero, or that has run its course, ends and starts
/// the cooldown. A completed dash hands back normal running speed.
pub fn advance_dash(racer: &mut Racer, start_x: f32, wrapped: bool, cfg: &PhysicsConfig) {
    let DashState::Dashing {
        direction,
        remaining,
    } = racer.dash
    else {
        return;
    };

    let covered = if wrapped {
        racer.vx.abs()
    } else {
        (racer.x - start_x).abs()
    };
    let remaining = remaining - covered;

    if racer.vx == 0.0 {
        racer.end_dash(cfg.dash_cooldown_ticks);
    } else if remaining <= DASH_DONE_EPSILON {
        racer.end_dash(cfg.dash_cooldown_ticks);
        let speed = if racer.is_grounded() {
            cfg.ground_speed
        } else {
            cfg.ground_speed * cfg.air_control
        };
        racer.vx = direction.sign() * speed;
    } else {
        racer.dash = DashState::Dashing {
            direction,
            remaining,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{RaceMode, TileKind};
    use dashrun_core::test_helpers::make_players;

    fn flat_level() -> Level {
        let mut level = Level::empty("flat", 20, 10, RaceMode::Sprint);
        for x in 0..20 {
            level.set_tile(x, 8, TileKind::Solid);
        }
        level
    }

    fn grounded() -> Racer {
        Racer::new(&make_players(1)[0], 100.0, 228.0)
    }

    fn press(left: bool, right: bool, jump: bool, dash: bool) -> RaceInput {
        RaceInput {
            left,
            right,
            jump,
            dash,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn direction_cancels_when_both_held() {
        assert_eq!(press(true, true, false, false).direction(), 0.0);
        assert_eq!(press(true, false, false, false).direction(), -1.0);
        assert_eq!(press(false, true, false, false).direction(), 1.0);
    }

    #[test]
    fn staleness_is_symmetric() {
        let input = RaceInput {
            timestamp_ms: 10_000,
            ..Default::default()
        };
        assert!(!input.is_stale(10_500, 500));
        assert!(input.is_stale(10_501, 500));
        assert!(!input.is_stale(9_500, 500));
        assert!(input.is_stale(9_499, 500));
    }

    // REGRESSION: a jump press followed by a release before the tick must not be lost
    #[test]
    fn merge_keeps_presses_and_latest_direction() {
        let mut buffered = RaceInput {
            right: true,
            jump: true,
            timestamp_ms: 1,
            ..Default::default()
        };
        buffered.merge(RaceInput {
            left: true,
            timestamp_ms: 2,
            ..Default::default()
        });
        assert!(buffered.jump);
        assert!(buffered.left && !buffered.right);
        assert_eq!(buffered.timestamp_ms, 2);
    }

    #[test]
    fn merge_never_moves_timestamp_backwards() {
        let mut buffered = RaceInput {
            right: true,
            timestamp_ms: 2_050,
            ..Default::default()
        };
        buffered.merge(RaceInput {
            left: true,
            dash: true,
            timestamp_ms: 2_000,
            ..Default::default()
        });
        assert_eq!(buffered.timestamp_ms, 2_050);
        assert!(buffered.right && !buffered.left);
        assert!(buffered.dash);
    }

    // ================================================================
    // Horizontal and jump FSM
    // ================================================================

    #[test]
    fn ground_and_air_speed() {
        let cfg = PhysicsConfig::default();
        let level = flat_level();
        let mut r = grounded();
        assert!(apply_input(&mut r, &press(false, true, false, false), &level, &cfg));
        assert_eq!(r.vx, 8.0);

        r.jump = JumpState::Spent;
        apply_input(&mut r, &press(true, false, false, false), &level, &cfg);
        assert_eq!(r.vx, -6.0);

        assert!(!apply_input(&mut r, &RaceInput::default(), &level, &cfg));
        assert_eq!(r.vx, -6.0);
    }

    #[test]
    fn jump_then_double_jump_then_spent() {
        let cfg = PhysicsConfig::default();
        let level = flat_level();
        let mut r = grounded();
        r.vx = 8.0;
        let jump = press(false, false, true, false);

        apply_input(&mut r, &jump, &level, &cfg);
        assert_eq!(r.vy, -18.0);
        assert_eq!(r.vx, 8.0);
        assert_eq!(r.jump, JumpState::SecondJumpAvailable);

        // Ascending: impulse replaces vy.
        r.vy = -6.0;
        apply_input(&mut r, &jump, &level, &cfg);
        assert_eq!(r.vy, -14.0);
        assert_eq!(r.jump, JumpState::Spent);

        apply_input(&mut r, &jump, &level, &cfg);
        assert_eq!(r.vy, -14.0);
    }

    #[test]
    fn falling_double_jump_adds_impulse() {
        let cfg = PhysicsConfig::default();
        let level = flat_level();
        let mut r = grounded();
        r.jump = JumpState::SecondJumpAvailable;
        r.vy = 10.0;
        apply_input(&mut r, &press(false, false, true, false), &level, &cfg);
        assert_eq!(r.vy, -4.0);
    }

    #[test]
    fn ledge_walk_off_gets_full_first_jump() {
        let cfg = PhysicsConfig::default();
        let level = flat_level();
        let mut r = grounded();
        r.jump = JumpState::FirstJumpAvailable;
        r.vy = 4.0;
        apply_input(&mut r, &press(false, false, true, false), &level, &cfg);
        assert_eq!(r.vy, -18.0);
        assert_eq!(r.jump, JumpState::SecondJumpAvailable);
    }

    // ================================================================
    // Dash
    // ================================================================

    #[test]
    fn dash_direction_prefers_velocity_then_input() {
        let cfg = PhysicsConfig::default();
        let level = flat_level();

        let mut r = grounded();
        r.vx = -3.0;
        apply_input(&mut r, &press(false, true, false, true), &level, &cfg);
        assert!(matches!(
            r.dash,
            DashState::Dashing {
                direction: Facing::Left,
                ..
            }
        ));

        let mut r = grounded();
        apply_input(&mut r, &press(true, false, false, true), &level, &cfg);
        assert!(matches!(
            r.dash,
            DashState::Dashing {
                direction: Facing::Left,
                ..
            }
        ));

        let mut r = grounded();
        apply_input(&mut r, &press(false, false, false, true), &level, &cfg);
        assert!(matches!(
            r.dash,
            DashState::Dashing {
                direction: Facing::Right,
                remaining,
            } if remaining == 128.0
        ));
    }

    #[test]
    fn dash_ignores_horizontal_and_jump() {
        let cfg = PhysicsConfig::default();
        let level = flat_level();
        let mut r = grounded();
        r.vx = 8.0;
        let held = apply_input(&mut r, &press(true, false, true, true), &level, &cfg);
        assert!(!held);
        assert_eq!(r.vx, 8.0);
        assert!(r.is_grounded());
        assert!(!r.dash_charged);
    }

    #[test]
    fn dash_gated_by_cooldown_and_charge() {
        let cfg = PhysicsConfig::default();
        let level = flat_level();
        let dash = press(false, false, false, true);

        let mut r = grounded();
        r.dash = DashState::Cooldown { ticks_remaining: 3 };
        apply_input(&mut r, &dash, &level, &cfg);
        assert!(!r.is_dashing());

        let mut r = grounded();
        r.dash_charged = false;
        apply_input(&mut r, &dash, &level, &cfg);
        assert!(!r.is_dashing());
    }

    #[test]
    fn dash_reach_trimmed_at_thick_wall() {
        let cfg = PhysicsConfig::default();
        let mut level = flat_level();
        level.set_tile(6, 7, TileKind::Solid);
        level.set_tile(6, 6, TileKind::Solid);
        let r = grounded();
        // Leading edge at 124, wall face at 192.
        assert_eq!(dash_reach(&r, Facing::Right, &level, &cfg), 68.0);
        assert_eq!(dash_reach(&r, Facing::Left, &level, &cfg), 128.0);

        // A single-tile ledge does not trim.
        let mut level = flat_level();
        level.set_tile(5, 7, TileKind::Solid);
        assert_eq!(dash_reach(&r, Facing::Right, &level, &cfg), 128.0);
    }

    #[test]
    fn cooldown_counts_down_to_ready() {
        let mut r = grounded();
        r.dash = DashState::Cooldown { ticks_remaining: 2 };
        tick_cooldown(&mut r);
        assert_eq!(r.dash, DashState::Cooldown { ticks_remaining: 1 });
        tick_cooldown(&mut r);
        assert_eq!(r.dash, DashState::Ready);
        tick_cooldown(&mut r);
        assert_eq!(r.dash, DashState::Ready);
    }

    #[test]
    fn dash_runs_its_distance_then_restores_speed() {
        let cfg = PhysicsConfig::default();
        let mut r = grounded();
        r.dash = DashState::Dashing {
            direction: Facing::Right,
            remaining: 40.0,
        };
        let mut ticks = 0;
        while r.is_dashing() {
            let start_x = r.x;
            steer_dash(&mut r, &cfg);
            r.x += r.vx;
            advance_dash(&mut r, start_x, false, &cfg);
            ticks += 1;
        }
        assert_eq!(ticks, 3);
        assert_eq!(r.x, 140.0);
        assert_eq!(r.vx, cfg.ground_speed);
        assert_eq!(
            r.dash,
            DashState::Cooldown {
                ticks_remaining: cfg.dash_cooldown_ticks
            }
        );
    }

    #[test]
    fn dash_forced_to_zero_ends_without_speed() {
        let cfg = PhysicsConfig::default();
        let mut r = grounded();
        r.dash = DashState::Dashing {
            direction: Facing::Right,
            remaining: 100.0,
        };
        r.vx = 0.0;
        let start_x = r.x;
        advance_dash(&mut r, start_x, false, &cfg);
        assert_eq!(r.vx, 0.0);
        assert!(matches!(r.dash, DashState::Cooldown { .. }));
    }
}
