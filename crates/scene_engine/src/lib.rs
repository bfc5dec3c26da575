//! # Scene Engine
//!
//! A small Entity-Component-System engine for 2D tile games.
//!
//! ## Features
//!
//! - **Scene**: entities, components and priority-scheduled systems behind one façade
//! - **Queries**: lazy iteration over the entities holding a set of component types
//! - **Events**: typed event bus with per-component listeners
//! - **Assets**: named caches for immutable content loaded from RON files
//! - **Host loop**: frame timing, frame rate cap and an application lifecycle
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! struct Position(i32, i32);
//! impl Component for Position {}
//!
//! struct Velocity(i32, i32);
//! impl Component for Velocity {}
//!
//! struct Movement;
//!
//! impl System for Movement {
//!     fn update(&mut self, scene: &mut Scene, _delta_time: f32) -> EcsResult<()> {
//!         for (_, (position, velocity)) in scene.get_entities_with::<(Position, Velocity)>() {
//!             let velocity = velocity.borrow();
//!             let mut position = position.borrow_mut();
//!             position.0 += velocity.0;
//!             position.1 += velocity.1;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! struct MyGame;
//!
//! impl Application for MyGame {
//!     fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
//!         let scene = engine.scene_mut();
//!         scene.create_entity((Position(0, 0), Velocity(1, 2)))?;
//!         scene.add_system(Movement, 10);
//!         Ok(())
//!     }
//!
//!     fn update(&mut self, _engine: &mut Engine, _delta_time: f32) -> Result<(), AppError> {
//!         Ok(())
//!     }
//!
//!     fn cleanup(&mut self, _engine: &mut Engine) {}
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     scene_engine::foundation::logging::init();
//!     let mut engine = Engine::new(EngineConfig::default().with_max_frames(60))?;
//!     engine.run(&mut MyGame)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod core;

pub mod assets;
pub mod config;
pub mod ecs;
pub mod events;
pub mod foundation;

mod application;
mod engine;

pub use application::{AppError, Application};
pub use engine::{Engine, EngineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{AssetError, NamedCache},
        core::config::{ApplicationConfig, AssetConfig, Config, EngineConfig},
        ecs::{
            singleton::{self, Singleton},
            Component, EcsError, EcsResult, Entity, Owner, Scene, System, SystemEntry,
        },
        events::{Event, EventBus, EventFilter, EventSystem, ListenerKey},
        foundation::{
            collections::{Shared, WeakShared},
            time::{FrameLimiter, Timer},
        },
        AppError, Application, Engine, EngineError,
    };
}
