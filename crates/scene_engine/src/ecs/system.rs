//! System trait and implementations

use std::any::{type_name, Any};

use super::error::EcsResult;
use super::scene::Scene;

/// Processing unit run once per frame over the components it queries
///
/// A scene holds at most one system per concrete type. Systems keep no
/// per-entity state; anything tied to an entity lives in its components.
pub trait System: Any {
    /// Run the system for one frame
    ///
    /// `delta_time` is the time since the previous frame, in seconds.
    fn update(&mut self, scene: &mut Scene, delta_time: f32) -> EcsResult<()>;

    /// Name used in logs and errors
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}
