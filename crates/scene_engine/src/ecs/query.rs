//! Query system for component access
//!
//! A query names its component types as a tuple, `(A, B, ...)`, and yields
//! `(Entity, (Shared<A>, Shared<B>, ...))` for every entity holding all of
//! them. Handles always come back in the requested order; the order of
//! entities is unspecified.
//!
//! Iteration is lazy. The iterator walks the smallest holder set from the
//! type index and probes the others, so nothing beyond the current entity is
//! materialised.

use std::any::{type_name, TypeId};
use std::collections::{hash_set, HashSet};
use std::marker::PhantomData;

use super::component::{Component, ComponentCell};
use super::error::{EcsError, EcsResult};
use super::storage::{ComponentMap, ComponentStore};
use super::Entity;
use crate::foundation::collections::Shared;

/// A tuple of component types fetched together
///
/// Implemented for tuples of one to eight component types.
pub trait ComponentSet {
    /// Tuple of handles, one per requested type
    type Handles;
    /// Tuple of optional handles, one per requested type
    type Optional;

    /// Type tags in requested order
    fn type_ids() -> Vec<TypeId>;

    /// Fetch every requested component, failing on the first missing one
    fn fetch(entity: Entity, components: &ComponentMap) -> EcsResult<Self::Handles>;

    /// Fetch every requested component, `None` where absent
    fn fetch_optional(components: &ComponentMap) -> Self::Optional;
}

pub(crate) fn fetch_one<T: Component>(entity: Entity, components: &ComponentMap) -> EcsResult<Shared<T>> {
    fetch_optional_one(components).ok_or(EcsError::MissingComponent {
        entity,
        component: type_name::<T>(),
    })
}

pub(crate) fn fetch_optional_one<T: Component>(components: &ComponentMap) -> Option<Shared<T>> {
    components
        .get(&TypeId::of::<T>())
        .and_then(ComponentCell::downcast::<T>)
}

macro_rules! impl_component_set {
    ($($name:ident),+) => {
        impl<$($name: Component),+> ComponentSet for ($($name,)+) {
            type Handles = ($(Shared<$name>,)+);
            type Optional = ($(Option<Shared<$name>>,)+);

            fn type_ids() -> Vec<TypeId> {
                vec![$(TypeId::of::<$name>()),+]
            }

            fn fetch(entity: Entity, components: &ComponentMap) -> EcsResult<Self::Handles> {
                Ok(($(fetch_one::<$name>(entity, components)?,)+))
            }

            fn fetch_optional(components: &ComponentMap) -> Self::Optional {
                ($(fetch_optional_one::<$name>(components),)+)
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
impl_component_set!(A, B, C, D, E, F, G);
impl_component_set!(A, B, C, D, E, F, G, H);

/// Lazy iterator over the entities holding every type of `Q`
pub struct Query<'s, Q: ComponentSet> {
    store: &'s ComponentStore,
    driver: Option<hash_set::Iter<'s, Entity>>,
    filters: Vec<&'s HashSet<Entity>>,
    _marker: PhantomData<fn() -> Q>,
}

impl<'s, Q: ComponentSet> Query<'s, Q> {
    pub(crate) fn new(store: &'s ComponentStore) -> Self {
        let mut sets = Vec::new();
        for type_id in Q::type_ids() {
            match store.holders(type_id) {
                Some(holders) => sets.push(holders),
                // One type nobody holds empties the whole intersection
                None => return Self::empty(store),
            }
        }
        sets.sort_by_key(|holders| holders.len());
        if sets.is_empty() {
            return Self::empty(store);
        }
        let driver = sets.remove(0).iter();
        Self {
            store,
            driver: Some(driver),
            filters: sets,
            _marker: PhantomData,
        }
    }

    fn empty(store: &'s ComponentStore) -> Self {
        Self {
            store,
            driver: None,
            filters: Vec::new(),
            _marker: PhantomData,
        }
    }
}

impl<'s, Q: ComponentSet> Iterator for Query<'s, Q> {
    type Item = (Entity, Q::Handles);

    fn next(&mut self) -> Option<Self::Item> {
        let driver = self.driver.as_mut()?;
        loop {
            let entity = *driver.next()?;
            if !self.filters.iter().all(|holders| holders.contains(&entity)) {
                continue;
            }
            let fetched = self
                .store
                .components(entity)
                .and_then(|components| Q::fetch(entity, components));
            match fetched {
                Ok(handles) => return Some((entity, handles)),
                Err(err) => log::error!("Component indexes out of sync during query: {}", err),
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.driver {
            Some(driver) => (0, Some(driver.len())),
            None => (0, Some(0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::EntityRegistry;

    #[derive(Debug)]
    struct T1(u8);
    impl Component for T1 {}

    #[derive(Debug)]
    struct T2(u8);
    impl Component for T2 {}

    #[derive(Debug)]
    struct Unused;
    impl Component for Unused {}

    fn spawn(store: &mut ComponentStore, cells: Vec<ComponentCell>) -> Entity {
        let entity = EntityRegistry::create();
        store.register(entity);
        for cell in cells {
            store.insert(entity, cell).unwrap();
        }
        entity
    }

    #[test]
    fn test_intersection_only() {
        let mut store = ComponentStore::new();
        spawn(&mut store, vec![ComponentCell::new(T1(1))]);
        spawn(&mut store, vec![ComponentCell::new(T2(2))]);
        let both = spawn(&mut store, vec![ComponentCell::new(T1(3)), ComponentCell::new(T2(4))]);

        let hits: Vec<_> = Query::<(T1, T2)>::new(&store).collect();
        assert_eq!(hits.len(), 1);
        let (entity, (a, b)) = &hits[0];
        assert_eq!(*entity, both);
        assert_eq!(a.borrow().0, 3);
        assert_eq!(b.borrow().0, 4);
    }

    #[test]
    fn test_handles_follow_requested_order() {
        let mut store = ComponentStore::new();
        spawn(&mut store, vec![ComponentCell::new(T1(1)), ComponentCell::new(T2(2))]);
        let (_, (second, first)) = Query::<(T2, T1)>::new(&store).next().unwrap();
        assert_eq!(second.borrow().0, 2);
        assert_eq!(first.borrow().0, 1);
    }

    #[test]
    fn test_unheld_type_yields_nothing() {
        let mut store = ComponentStore::new();
        spawn(&mut store, vec![ComponentCell::new(T1(1))]);
        let mut query = Query::<(T1, Unused)>::new(&store);
        assert_eq!(query.size_hint(), (0, Some(0)));
        assert!(query.next().is_none());
    }

    #[test]
    fn test_fetch_is_all_or_nothing() {
        let mut store = ComponentStore::new();
        let entity = spawn(&mut store, vec![ComponentCell::new(T1(1))]);
        let components = store.components(entity).unwrap();
        let err = <(T1, T2)>::fetch(entity, components).unwrap_err();
        assert!(matches!(err, EcsError::MissingComponent { component, .. } if component.ends_with("T2")));

        let (some, none) = <(T1, T2)>::fetch_optional(components);
        assert!(some.is_some());
        assert!(none.is_none());
    }
}
