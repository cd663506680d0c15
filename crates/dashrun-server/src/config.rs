use serde::Deserialize;

use dashrun_race::{ConfigError, RaceConfig};

/// Host configuration, loaded from `dashrun.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// TOML file holding the [`RaceConfig`] tunables.
    pub race_config_path: String,
    pub limits: LimitsConfig,
    /// Send an encoded snapshot after every tick.
    pub broadcast_snapshots: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            race_config_path: "config/race.toml".to_string(),
            limits: LimitsConfig::default(),
            broadcast_snapshots: true,
        }
    }
}

/// Per-player input limits.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Max burst of inputs accepted back to back.
    pub input_burst: u32,
    /// Token refill rate (inputs per second).
    pub input_per_sec: f64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            input_burst: 10,
            input_per_sec: 60.0, // 3x the tick rate
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.race_config_path.is_empty() {
            return Err(ConfigError::invalid(
                "race_config_path",
                "must not be empty",
            ));
        }
        if self.limits.input_burst == 0 {
            return Err(ConfigError::invalid(
                "limits.input_burst",
                "must be > 0",
            ));
        }
        if !(self.limits.input_per_sec.is_finite() && self.limits.input_per_sec >= 0.0) {
            return Err(ConfigError::invalid(
                "limits.input_per_sec",
                "must be a non-negative number",
            ));
        }
        Ok(())
    }

    /// Load config from `DASHRUN_SERVER_CONFIG` (or `dashrun.toml`) if it
    /// exists, then apply env var overrides. Invalid files fall back to
    /// defaults.
    pub fn load() -> Self {
        let path = std::env::var("DASHRUN_SERVER_CONFIG")
            .ok()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "dashrun.toml".to_string());

        let mut config = match std::fs::read_to_string(&path) {
            Ok(content) => match Self::from_toml_str(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from {path}");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to load {path}: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No {path} found, using defaults");
                ServerConfig::default()
            },
        };

        // Environment variable overrides
        if let Ok(race_path) = std::env::var("DASHRUN_RACE_CONFIG")
            && !race_path.is_empty()
        {
            config.race_config_path = race_path;
        }
        if let Ok(rate) = std::env::var("DASHRUN_INPUT_RATE_LIMIT")
            && let Ok(rate) = rate.parse::<f64>()
            && rate.is_finite()
            && rate >= 0.0
        {
            config.limits.input_per_sec = rate;
        }

        config
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let cfg: ServerConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Race tunables from [`ServerConfig::race_config_path`].
    pub fn race_config(&self) -> RaceConfig {
        RaceConfig::load_from(&self.race_config_path)
    }
}
