//! ECS error taxonomy
//!
//! Every variant signals caller misuse (a stale entity, a component that was
//! never attached, a system that was never scheduled). They are raised at the
//! point of detection and never retried; the `try_*` lookups on
//! [`Scene`](super::Scene) are the sanctioned way to probe for absence.

use super::Entity;
use thiserror::Error;

/// Result alias for scene operations
pub type EcsResult<T> = Result<T, EcsError>;

/// Scene operation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// The entity is not registered in this scene
    #[error("Entity with ID {0} is invalid")]
    MissingEntity(Entity),

    /// The entity does not hold a component of the requested type
    #[error("Entity with ID {entity} does not have Component \"{component}\"")]
    MissingComponent {
        /// Entity that was queried
        entity: Entity,
        /// Requested component type name
        component: &'static str,
    },

    /// No entity in the scene holds a component of the requested type
    #[error("No entity has Component \"{component}\"")]
    NoComponentOfType {
        /// Requested component type name
        component: &'static str,
    },

    /// The system type is not scheduled in this scene
    #[error("System \"{system}\" is not present in this Scene")]
    MissingSystem {
        /// Requested system type name
        system: &'static str,
    },

    /// The resource type has not been inserted into this scene
    #[error("Resource \"{resource}\" is not present in this Scene")]
    MissingResource {
        /// Requested resource type name
        resource: &'static str,
    },

    /// The system is already running (re-entrant scene update)
    #[error("System \"{system}\" is already running")]
    SystemBusy {
        /// Name of the running system
        system: &'static str,
    },

    /// The component is borrowed elsewhere and cannot be handed to a hook
    #[error("Component \"{component}\" is borrowed elsewhere")]
    ComponentBusy {
        /// Borrowed component type name
        component: &'static str,
    },
}

impl EcsError {
    /// Whether this error reports an absent component
    pub fn is_missing_component(&self) -> bool {
        matches!(self, Self::MissingComponent { .. } | Self::NoComponentOfType { .. })
    }

    /// Whether this error reports an unknown entity
    pub fn is_missing_entity(&self) -> bool {
        matches!(self, Self::MissingEntity(_))
    }
}
