//! # Core Engine Module
//!
//! Shared configuration for the engine and applications built on it.

pub mod config;

pub use config::{ApplicationConfig, AssetConfig, Config, ConfigError, EngineConfig};
