use serde::{Deserialize, Serialize};

/// Tile edge length in pixels.
pub const TILE_SIZE: f32 = 32.0;
/// Racer collision box width in pixels.
pub const PLAYER_WIDTH: f32 = 24.0;
/// Racer collision box height in pixels.
pub const PLAYER_HEIGHT: f32 = 28.0;
/// Downward acceleration (px/tick^2). Y grows downward.
pub const GRAVITY: f32 = 2.0;
/// Symmetric bound on vertical speed (px/tick).
pub const MAX_VERTICAL_SPEED: f32 = 24.0;
/// Bound on horizontal speed while airborne (px/tick).
pub const MAX_AIR_SPEED: f32 = 16.0;
/// Horizontal speed assigned by directional input on the ground.
pub const GROUND_SPEED: f32 = 8.0;
/// Fraction of ground speed assigned by directional input in the air.
pub const AIR_CONTROL: f32 = 0.75;
/// Per-tick multiplicative decay of grounded horizontal speed.
pub const FRICTION: f32 = 0.8;
/// Horizontal speed below which friction snaps to zero.
pub const FRICTION_EPSILON: f32 = 0.1;
/// First jump impulse (negative is up).
pub const JUMP_VELOCITY: f32 = -18.0;
/// Second jump impulse.
pub const DOUBLE_JUMP_VELOCITY: f32 = -14.0;
/// Airborne visual spin (degrees/tick).
pub const SPIN_PER_TICK: f32 = 15.0;
/// Dash reach in tiles.
pub const DASH_TILES: u32 = 4;
/// Dash speed (px/tick).
pub const DASH_SPEED: f32 = 16.0;
/// Ticks before a dash can be used again.
pub const DASH_COOLDOWN_TICKS: u32 = 20;
/// Band around a tile top that counts as standing on it (px).
pub const GROUND_TOLERANCE: f32 = 4.0;
/// Upward speed (px/tick) above which ground contact is ignored.
pub const UPWARD_TOLERANCE: f32 = 0.5;

/// Simulation tick rate.
pub const TICK_RATE_HZ: u32 = 20;
/// Inputs further than this from server time are dropped.
pub const STALE_INPUT_MS: u64 = 500;
/// Hard cap on race length.
pub const MAX_RACE_MS: u64 = 180_000;
/// Laps needed to finish a lap race.
pub const REQUIRED_LAPS: u32 = 3;
/// Chebyshev distance (tiles) at which a checkpoint counts as reached.
pub const CHECKPOINT_TOLERANCE_TILES: i32 = 1;
/// Countdown length before the race starts.
pub const COUNTDOWN_SECS: u32 = 3;
/// Level id of the arena whose side edges wrap around.
pub const WRAP_LEVEL_ID: &str = "loop-arena";

/// Movement and collision tunables, loadable from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub tile_size: f32,
    pub player_width: f32,
    pub player_height: f32,
    pub gravity: f32,
    pub max_vertical_speed: f32,
    pub max_air_speed: f32,
    pub ground_speed: f32,
    pub air_control: f32,
    pub friction: f32,
    pub friction_epsilon: f32,
    pub jump_velocity: f32,
    pub double_jump_velocity: f32,
    pub spin_per_tick: f32,
    pub dash_tiles: u32,
    pub dash_speed: f32,
    pub dash_cooldown_ticks: u32,
    pub ground_tolerance: f32,
    pub upward_tolerance: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            tile_size: TILE_SIZE,
            player_width: PLAYER_WIDTH,
            player_height: PLAYER_HEIGHT,
            gravity: GRAVITY,
            max_vertical_speed: MAX_VERTICAL_SPEED,
            max_air_speed: MAX_AIR_SPEED,
            ground_speed: GROUND_SPEED,
            air_control: AIR_CONTROL,
            friction: FRICTION,
            friction_epsilon: FRICTION_EPSILON,
            jump_velocity: JUMP_VELOCITY,
            double_jump_velocity: DOUBLE_JUMP_VELOCITY,
            spin_per_tick: SPIN_PER_TICK,
            dash_tiles: DASH_TILES,
            dash_speed: DASH_SPEED,
            dash_cooldown_ticks: DASH_COOLDOWN_TICKS,
            ground_tolerance: GROUND_TOLERANCE,
            upward_tolerance: UPWARD_TOLERANCE,
        }
    }
}

impl PhysicsConfig {
    /// Full dash reach in pixels before wall trimming.
    pub fn dash_distance(&self) -> f32 {
        self.dash_tiles as f32 * self.tile_size
    }

    /// Tile index containing the pixel coordinate `v`.
    pub fn tile_of(&self, v: f32) -> i32 {
        (v / self.tile_size).floor() as i32
    }
}

/// Top-level race configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    pub physics: PhysicsConfig,
    pub tick_rate_hz: u32,
    pub stale_input_ms: u64,
    pub max_race_ms: u64,
    pub required_laps: u32,
    pub checkpoint_tolerance_tiles: i32,
    pub countdown_secs: u32,
    pub wrap_level_id: String,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            physics: PhysicsConfig::default(),
            tick_rate_hz: TICK_RATE_HZ,
            stale_input_ms: STALE_INPUT_MS,
            max_race_ms: MAX_RACE_MS,
            required_laps: REQUIRED_LAPS,
            checkpoint_tolerance_tiles: CHECKPOINT_TOLERANCE_TILES,
            countdown_secs: COUNTDOWN_SECS,
            wrap_level_id: WRAP_LEVEL_ID.to_string(),
        }
    }
}

impl RaceConfig {
    /// Load config from a TOML file. Falls back to defaults if the file is
    /// missing, unparseable or fails validation.
    pub fn load() -> Self {
        let path = std::env::var("DASHRUN_RACE_CONFIG")
            .unwrap_or_else(|_| "config/race.toml".to_string());
        Self::load_from(&path)
    }

    /// Same as [`RaceConfig::load`] with an explicit path.
    pub fn load_from(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_toml_str(&content) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!("Failed to load {path}: {e}, using defaults");
                    RaceConfig::default()
                },
            },
            Err(_) => RaceConfig::default(),
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let cfg: RaceConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Milliseconds between ticks.
    pub fn tick_ms(&self) -> u64 {
        1000 / u64::from(self.tick_rate_hz.max(1))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.physics;
        if self.tick_rate_hz == 0 || self.tick_rate_hz > 1000 {
            return Err(ConfigError::invalid("tick_rate_hz", "must be within 1..=1000"));
        }
        if !(p.tile_size.is_finite() && p.tile_size > 0.0) {
            return Err(ConfigError::invalid("physics.tile_size", "must be positive"));
        }
        if !(p.player_width > 0.0 && p.player_width <= p.tile_size) {
            return Err(ConfigError::invalid(
                "physics.player_width",
                "must be positive and no wider than one tile",
            ));
        }
        if !(p.player_height > 0.0 && p.player_height <= p.tile_size) {
            return Err(ConfigError::invalid(
                "physics.player_height",
                "must be positive and no taller than one tile",
            ));
        }
        if !(p.dash_speed.is_finite() && p.dash_speed > 0.0) {
            return Err(ConfigError::invalid("physics.dash_speed", "must be positive"));
        }
        if !(0.0..1.0).contains(&p.friction) {
            return Err(ConfigError::invalid("physics.friction", "must be within [0, 1)"));
        }
        if !(p.max_vertical_speed > 0.0 && p.max_air_speed > 0.0) {
            return Err(ConfigError::invalid(
                "physics.max_vertical_speed",
                "speed bounds must be positive",
            ));
        }
        if p.ground_tolerance < 0.0 || p.upward_tolerance < 0.0 {
            return Err(ConfigError::invalid(
                "physics.ground_tolerance",
                "tolerances cannot be negative",
            ));
        }
        if self.checkpoint_tolerance_tiles < 0 {
            return Err(ConfigError::invalid(
                "checkpoint_tolerance_tiles",
                "cannot be negative",
            ));
        }
        Ok(())
    }
}

/// Rejected configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Parse(String),
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: &str) -> Self {
        Self::Invalid {
            field,
            reason: reason.to_string(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "parse error: {e}"),
            Self::Invalid { field, reason } => write!(f, "invalid {field}: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}
