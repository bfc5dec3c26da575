//! Arena demo application
//!
//! Runs a headless top-down arena: a player ship steered by scripted key
//! presses shoots at drifting rocks. Settings come from `arena.toml` when
//! present.

mod arena;
mod components;
mod input;
mod stats;
mod systems;
mod weapons;

use scene_engine::core::{ApplicationConfig, Config};
use scene_engine::foundation::logging;
use scene_engine::Engine;

use arena::ArenaApp;

const CONFIG_PATH: &str = "arena.toml";
const SEED: u64 = 0x5eed;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ApplicationConfig::load_or_default(CONFIG_PATH)?;
    if config.engine.fixed_delta.is_none() {
        config.engine = config.engine.with_fixed_delta(1.0 / 60.0);
    }
    if config.engine.max_frames.is_none() {
        config.engine = config.engine.with_max_frames(1800);
    }
    config.validate().map_err(|e| format!("Invalid configuration: {e}"))?;

    logging::init_with_level(&config.engine.log_level);
    log::info!("Starting {}", config.name);

    let mut app = ArenaApp::new(&config.assets, SEED);
    let mut engine = Engine::new(config.engine)?;
    engine.run(&mut app)?;
    Ok(())
}
