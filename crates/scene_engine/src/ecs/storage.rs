//! Component storage
//!
//! Two indexes over the same data:
//! - the entity index, `Entity -> {TypeId -> ComponentCell}`, answers
//!   "what does this entity hold";
//! - the type index, `TypeId -> {Entity}`, answers "who holds this type"
//!   and drives queries.
//!
//! Every mutation updates both indexes before returning, so an
//! `(entity, type)` pair is present in one exactly when it is present in the
//! other.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};

use super::component::ComponentCell;
use super::error::{EcsError, EcsResult};
use super::Entity;

/// Components held by one entity, keyed by concrete type
pub type ComponentMap = HashMap<TypeId, ComponentCell>;

/// Entity and type indexes for one scene
#[derive(Default)]
pub struct ComponentStore {
    entities: HashMap<Entity, ComponentMap>,
    types: HashMap<TypeId, HashSet<Entity>>,
}

impl ComponentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity with no components
    pub fn register(&mut self, entity: Entity) {
        self.entities.entry(entity).or_default();
    }

    /// Whether the entity is registered
    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains_key(&entity)
    }

    /// Number of registered entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether no entity is registered
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate all registered entities
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.keys().copied()
    }

    /// Components of an entity
    pub fn components(&self, entity: Entity) -> EcsResult<&ComponentMap> {
        self.entities.get(&entity).ok_or(EcsError::MissingEntity(entity))
    }

    /// Entities holding a component of the given type
    pub fn holders(&self, type_id: TypeId) -> Option<&HashSet<Entity>> {
        self.types.get(&type_id)
    }

    /// Number of entities holding a component of the given type
    pub fn holder_count(&self, type_id: TypeId) -> usize {
        self.types.get(&type_id).map_or(0, HashSet::len)
    }

    /// Membership test against the type index
    pub fn holds(&self, entity: Entity, type_id: TypeId) -> bool {
        self.types
            .get(&type_id)
            .is_some_and(|holders| holders.contains(&entity))
    }

    /// Attach a component cell, returning the cell it replaced
    pub fn insert(&mut self, entity: Entity, cell: ComponentCell) -> EcsResult<Option<ComponentCell>> {
        let components = self
            .entities
            .get_mut(&entity)
            .ok_or(EcsError::MissingEntity(entity))?;
        let type_id = cell.type_id();
        let replaced = components.insert(type_id, cell);
        self.types.entry(type_id).or_default().insert(entity);
        Ok(replaced)
    }

    /// Detach the component of the given type, if the entity holds one
    pub fn remove(&mut self, entity: Entity, type_id: TypeId) -> EcsResult<Option<ComponentCell>> {
        let components = self
            .entities
            .get_mut(&entity)
            .ok_or(EcsError::MissingEntity(entity))?;
        let Some(cell) = components.remove(&type_id) else {
            return Ok(None);
        };
        self.unindex(entity, type_id);
        Ok(Some(cell))
    }

    /// Remove an entity and every component it holds
    pub fn remove_entity(&mut self, entity: Entity) -> EcsResult<ComponentMap> {
        let components = self
            .entities
            .remove(&entity)
            .ok_or(EcsError::MissingEntity(entity))?;
        for type_id in components.keys() {
            self.unindex(entity, *type_id);
        }
        Ok(components)
    }

    fn unindex(&mut self, entity: Entity, type_id: TypeId) {
        if let Some(holders) = self.types.get_mut(&type_id) {
            holders.remove(&entity);
            if holders.is_empty() {
                self.types.remove(&type_id);
            }
        }
    }

    /// Check that both indexes describe the same `(entity, type)` pairs
    pub fn verify_integrity(&self) -> Result<(), String> {
        for (entity, components) in &self.entities {
            for type_id in components.keys() {
                if !self.holds(*entity, *type_id) {
                    return Err(format!("entity {entity} holds {type_id:?} but the type index disagrees"));
                }
            }
        }
        for (type_id, holders) in &self.types {
            if holders.is_empty() {
                return Err(format!("empty holder set left behind for {type_id:?}"));
            }
            for entity in holders {
                let present = self
                    .entities
                    .get(entity)
                    .is_some_and(|components| components.contains_key(type_id));
                if !present {
                    return Err(format!("type index lists entity {entity} for {type_id:?} but it holds none"));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{Component, EntityRegistry};

    struct Tag;
    impl Component for Tag {}

    struct Mass(f32);
    impl Component for Mass {}

    fn registered(store: &mut ComponentStore) -> Entity {
        let entity = EntityRegistry::create();
        store.register(entity);
        entity
    }

    #[test]
    fn test_insert_indexes_both_ways() {
        let mut store = ComponentStore::new();
        let entity = registered(&mut store);
        assert!(store.insert(entity, ComponentCell::new(Tag)).unwrap().is_none());
        assert!(store.holds(entity, TypeId::of::<Tag>()));
        assert!(store.components(entity).unwrap().contains_key(&TypeId::of::<Tag>()));
        store.verify_integrity().unwrap();
    }

    #[test]
    fn test_insert_same_type_replaces() {
        let mut store = ComponentStore::new();
        let entity = registered(&mut store);
        store.insert(entity, ComponentCell::new(Mass(1.0))).unwrap();
        let replaced = store.insert(entity, ComponentCell::new(Mass(2.0))).unwrap().unwrap();
        assert_eq!(replaced.downcast::<Mass>().unwrap().borrow().0, 1.0);
        assert_eq!(store.components(entity).unwrap().len(), 1);
        assert_eq!(store.holder_count(TypeId::of::<Mass>()), 1);
        store.verify_integrity().unwrap();
    }

    #[test]
    fn test_unknown_entity_is_rejected() {
        let mut store = ComponentStore::new();
        let stranger = EntityRegistry::create();
        assert_eq!(
            store.insert(stranger, ComponentCell::new(Tag)).unwrap_err(),
            EcsError::MissingEntity(stranger)
        );
        assert!(store.remove(stranger, TypeId::of::<Tag>()).is_err());
        assert!(store.remove_entity(stranger).is_err());
    }

    #[test]
    fn test_remove_drops_empty_holder_sets() {
        let mut store = ComponentStore::new();
        let entity = registered(&mut store);
        store.insert(entity, ComponentCell::new(Tag)).unwrap();
        assert!(store.remove(entity, TypeId::of::<Tag>()).unwrap().is_some());
        assert!(store.remove(entity, TypeId::of::<Tag>()).unwrap().is_none());
        assert!(store.holders(TypeId::of::<Tag>()).is_none());
        assert!(store.contains(entity));
        store.verify_integrity().unwrap();
    }

    #[test]
    fn test_remove_entity_clears_type_index() {
        let mut store = ComponentStore::new();
        let a = registered(&mut store);
        let b = registered(&mut store);
        store.insert(a, ComponentCell::new(Tag)).unwrap();
        store.insert(a, ComponentCell::new(Mass(1.0))).unwrap();
        store.insert(b, ComponentCell::new(Tag)).unwrap();

        let removed = store.remove_entity(a).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(!store.contains(a));
        assert!(!store.holds(a, TypeId::of::<Tag>()));
        assert!(store.holds(b, TypeId::of::<Tag>()));
        assert_eq!(store.holder_count(TypeId::of::<Mass>()), 0);
        assert_eq!(store.len(), 1);
        store.verify_integrity().unwrap();
    }
}
