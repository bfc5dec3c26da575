//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Shared handles for scene-owned data
//! - Frame timing
//! - Logging utilities

pub mod collections;
pub mod time;
pub mod logging;
