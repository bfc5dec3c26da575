//! Entity implementation

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Entity identifier
///
/// Carries no data of its own; it only groups the components a scene has
/// attached to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entity {
    id: u64,
}

impl Entity {
    /// Create an entity handle with the given ID
    pub(super) fn new(id: u64) -> Self {
        Self { id }
    }

    /// Get the entity ID
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

/// Allocates entity identifiers
///
/// IDs come from one process-wide counter, so an identifier is never handed
/// out twice, not even by two different scenes.
pub struct EntityRegistry;

impl EntityRegistry {
    /// Allocate a fresh entity identifier
    pub fn create() -> Entity {
        Entity::new(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<_> = (0..1000).map(|_| EntityRegistry::create()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_ids_increase() {
        let a = EntityRegistry::create();
        let b = EntityRegistry::create();
        assert!(b.id() > a.id());
        assert_eq!(a.to_string(), a.id().to_string());
    }
}
