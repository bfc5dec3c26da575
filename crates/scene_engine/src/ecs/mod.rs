//! Entity-Component-System implementation
//!
//! Entities are bare identifiers, components are plain Rust types held
//! behind [`Shared`](crate::foundation::collections::Shared) handles, and
//! systems are scheduled by priority. [`Scene`] ties them together.

pub mod component;
pub mod entity;
pub mod error;
pub mod query;
pub mod scene;
pub mod scheduler;
pub mod singleton;
pub mod storage;
pub mod system;

pub use component::{Component, ComponentBundle, ComponentCell, Owner};
pub use entity::{Entity, EntityRegistry};
pub use error::{EcsError, EcsResult};
pub use query::{ComponentSet, Query};
pub use scene::{Scene, SceneId};
pub use scheduler::{Priority, SystemEntry, SystemRegistry, DEFAULT_PRIORITY};
pub use singleton::Singleton;
pub use storage::{ComponentMap, ComponentStore};
pub use system::System;
