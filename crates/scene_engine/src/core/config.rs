//! # Engine Configuration
//!
//! Configuration structures for the host loop and asset locations. All of
//! them load from TOML or RON through [`Config`].

use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError};

/// # Engine Configuration
///
/// Frame pacing and logging for the host loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,
    /// Target FPS for frame rate limiting; unlimited when unset
    pub target_fps: Option<u32>,
    /// Fixed time step in seconds; measured wall time when unset
    pub fixed_delta: Option<f32>,
    /// Stop after this many frames
    pub max_frames: Option<u64>,
    /// Upper bound on a frame delta, in seconds
    pub max_delta: f32,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            target_fps: None,
            fixed_delta: None,
            max_frames: None,
            max_delta: 0.25,
        }
    }

    /// Set log level
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set target FPS
    #[must_use]
    pub fn with_target_fps(mut self, fps: u32) -> Self {
        self.target_fps = Some(fps);
        self
    }

    /// Use a fixed time step instead of measured time
    #[must_use]
    pub fn with_fixed_delta(mut self, seconds: f32) -> Self {
        self.fixed_delta = Some(seconds);
        self
    }

    /// Stop after the given number of frames
    #[must_use]
    pub fn with_max_frames(mut self, frames: u64) -> Self {
        self.max_frames = Some(frames);
        self
    }

    /// Clamp frame deltas
    #[must_use]
    pub fn with_max_delta(mut self, seconds: f32) -> Self {
        self.max_delta = seconds;
        self
    }

    /// Parsed log level
    pub fn level_filter(&self) -> Result<log::LevelFilter, String> {
        self.log_level
            .parse()
            .map_err(|_| format!("Unknown log level: {}", self.log_level))
    }

    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), String> {
        self.level_filter()?;
        if self.target_fps == Some(0) {
            return Err("Target FPS must be at least 1".to_string());
        }
        if let Some(delta) = self.fixed_delta {
            if !(delta.is_finite() && delta > 0.0) {
                return Err(format!("Fixed delta must be positive, got {delta}"));
            }
        }
        if !(self.max_delta.is_finite() && self.max_delta > 0.0) {
            return Err(format!("Max delta must be positive, got {}", self.max_delta));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Asset Configuration
///
/// Where sprites and data files live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Base directory for sprites and other binary assets
    pub assets_dir: String,
    /// Directory for RON data files (stats, levels)
    pub data_dir: String,
}

impl AssetConfig {
    /// Create a new asset configuration
    pub fn new() -> Self {
        Self {
            assets_dir: "assets".to_string(),
            data_dir: "data".to_string(),
        }
    }

    /// Set assets directory
    #[must_use]
    pub fn with_assets_dir(mut self, dir: impl Into<String>) -> Self {
        self.assets_dir = dir.into();
        self
    }

    /// Set data directory
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<String>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Validate the asset configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.assets_dir.is_empty() || self.data_dir.is_empty() {
            return Err("Asset directories cannot be empty".to_string());
        }
        Ok(())
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Complete Application Configuration
///
/// Top-level configuration applications load at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Application name, used in log output
    pub name: String,
    /// Engine core configuration
    pub engine: EngineConfig,
    /// Asset locations
    pub assets: AssetConfig,
}

impl ApplicationConfig {
    /// Create a new application configuration with defaults
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            engine: EngineConfig::default(),
            assets: AssetConfig::default(),
        }
    }

    /// Replace the engine configuration
    #[must_use]
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Replace the asset configuration
    #[must_use]
    pub fn with_assets(mut self, assets: AssetConfig) -> Self {
        self.assets = assets;
        self
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("Application name cannot be empty".to_string());
        }
        self.engine.validate()?;
        self.assets.validate()?;
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self::new("Scene Engine Application")
    }
}

impl Config for EngineConfig {}
impl Config for ApplicationConfig {}
