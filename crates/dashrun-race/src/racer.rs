use serde::{Deserialize, Serialize};

use dashrun_core::player::{Player, PlayerColor, PlayerId};

use crate::config::PhysicsConfig;

/// Jump availability. Everything except `Grounded` is airborne.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JumpState {
    Grounded,
    /// Left the ground without jumping; the next jump is a full first jump.
    FirstJumpAvailable,
    SecondJumpAvailable,
    Spent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DashState {
    Ready,
    Dashing { direction: Facing, remaining: f32 },
    Cooldown { ticks_remaining: u32 },
}

/// Per-race simulation record for one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Racer {
    pub id: PlayerId,
    pub display_name: String,
    pub color: PlayerColor,
    /// Top-left of the collision box, pixels.
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub jump: JumpState,
    pub dash: DashState,
    /// Dash charge, consumed by a dash and restored on ground contact.
    pub dash_charged: bool,
    /// Degrees in [0, 360).
    pub rotation: f32,
    /// -1 until the first checkpoint of the current lap.
    pub last_checkpoint_index: i32,
    pub lap_count: u32,
    pub finished: bool,
    pub finish_time_ms: Option<u64>,
    /// Furthest x reached.
    pub distance: f32,
}

impl Racer {
    pub fn new(player: &Player, spawn_x: f32, spawn_y: f32) -> Self {
        Self {
            id: player.id,
            display_name: player.display_name.clone(),
            color: player.color,
            x: spawn_x,
            y: spawn_y,
            vx: 0.0,
            vy: 0.0,
            jump: JumpState::Grounded,
            dash: DashState::Ready,
            dash_charged: true,
            rotation: 0.0,
            last_checkpoint_index: -1,
            lap_count: 0,
            finished: false,
            finish_time_ms: None,
            distance: spawn_x,
        }
    }

    pub fn is_grounded(&self) -> bool {
        self.jump == JumpState::Grounded
    }

    pub fn is_dashing(&self) -> bool {
        matches!(self.dash, DashState::Dashing { .. })
    }

    /// Ground contact: reset jumps, spin and the dash charge.
    pub fn land(&mut self) {
        self.vy = 0.0;
        self.jump = JumpState::Grounded;
        self.rotation = 0.0;
        self.dash_charged = true;
    }

    /// End an active dash and start the cooldown.
    pub fn end_dash(&mut self, cooldown_ticks: u32) {
        if self.is_dashing() {
            self.dash = DashState::Cooldown {
                ticks_remaining: cooldown_ticks,
            };
        }
    }

    pub fn right(&self, cfg: &PhysicsConfig) -> f32 {
        self.x + cfg.player_width
    }

    pub fn bottom(&self, cfg: &PhysicsConfig) -> f32 {
        self.y + cfg.player_height
    }

    pub fn centre(&self, cfg: &PhysicsConfig) -> (f32, f32) {
        (
            self.x + cfg.player_width / 2.0,
            self.y + cfg.player_height / 2.0,
        )
    }

    /// Tile under the box centre.
    pub fn centre_tile(&self, cfg: &PhysicsConfig) -> (i32, i32) {
        let (cx, cy) = self.centre(cfg);
        (cfg.tile_of(cx), cfg.tile_of(cy))
    }
}
