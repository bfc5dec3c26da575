//! Session-wide counters

use scene_engine::ecs::Singleton;

/// Totals for the whole process, shared by every scene
#[derive(Debug, Default)]
pub struct GameStats {
    pub shots_fired: u64,
    pub rocks_destroyed: u64,
}

impl Singleton for GameStats {}
