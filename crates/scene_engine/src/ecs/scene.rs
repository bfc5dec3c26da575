//! Scene: the façade over entities, components, systems and resources
//!
//! A [`Scene`] owns one [`ComponentStore`], one [`SystemRegistry`] and a map
//! of typed resources. Everything a game touches goes through it.
//!
//! # Borrowing
//!
//! Queries borrow the scene immutably and structural operations need
//! `&mut Scene`, so entities cannot be created or deleted while a query is
//! being iterated. Collect the entities first, then mutate:
//!
//! ```
//! # use scene_engine::ecs::{Component, Scene};
//! struct Expired;
//! impl Component for Expired {}
//!
//! let mut scene = Scene::new();
//! scene.create_entity((Expired,)).unwrap();
//! let doomed: Vec<_> = scene.get_entities_with::<(Expired,)>().map(|(e, _)| e).collect();
//! for entity in doomed {
//!     scene.del_entity(entity).unwrap();
//! }
//! assert_eq!(scene.entity_count(), 0);
//! ```

use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::component::{Component, ComponentBundle, ComponentCell};
use super::error::{EcsError, EcsResult};
use super::query::{fetch_one, fetch_optional_one, ComponentSet, Query};
use super::scheduler::{Priority, SystemEntry, SystemRegistry, DEFAULT_PRIORITY};
use super::storage::ComponentStore;
use super::{Entity, EntityRegistry, System};
use crate::foundation::collections::Shared;

static NEXT_SCENE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique scene identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneId(u64);

impl SceneId {
    fn next() -> Self {
        Self(NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scene#{}", self.0)
    }
}

/// Container of entities, components, systems and resources
pub struct Scene {
    id: SceneId,
    store: ComponentStore,
    systems: SystemRegistry,
    resources: HashMap<TypeId, Rc<dyn Any>>,
}

impl Scene {
    /// Create an empty scene
    pub fn new() -> Self {
        let scene = Self {
            id: SceneId::next(),
            store: ComponentStore::new(),
            systems: SystemRegistry::new(),
            resources: HashMap::new(),
        };
        log::debug!("Created {}", scene.id);
        scene
    }

    /// Identifier of this scene
    pub fn id(&self) -> SceneId {
        self.id
    }

    // ---- Entities ----

    /// Create an entity holding the given components
    ///
    /// Every component is attached before any `on_attach` hook runs, so a
    /// hook can look up its siblings. Hooks run in tuple order; the first
    /// failure is returned and the components stay attached.
    pub fn create_entity<B: ComponentBundle>(&mut self, components: B) -> EcsResult<Entity> {
        let entity = EntityRegistry::create();
        self.store.register(entity);
        log::debug!("Created entity {} in {}", entity, self.id);
        self.attach_cells(entity, components.into_cells())?;
        Ok(entity)
    }

    /// Remove an entity and every component it holds
    pub fn del_entity(&mut self, entity: Entity) -> EcsResult<()> {
        let components = self.store.remove_entity(entity)?;
        log::debug!("Deleted entity {} ({} components)", entity, components.len());
        for cell in components.values() {
            cell.run_detach(self, entity);
        }
        Ok(())
    }

    /// Whether the entity belongs to this scene
    pub fn contains_entity(&self, entity: Entity) -> bool {
        self.store.contains(entity)
    }

    /// All entities of this scene, in no particular order
    pub fn get_entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.store.entities()
    }

    /// Number of entities in this scene
    pub fn entity_count(&self) -> usize {
        self.store.len()
    }

    // ---- Components ----

    /// Attach a component, replacing any component of the same type
    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) -> EcsResult<()> {
        self.attach_cells(entity, vec![ComponentCell::new(component)])
    }

    /// Attach several components at once
    pub fn add_components<B: ComponentBundle>(&mut self, entity: Entity, components: B) -> EcsResult<()> {
        self.attach_cells(entity, components.into_cells())
    }

    /// Attach an existing handle; the entity shares the instance with `component`
    pub fn attach_shared<T: Component>(&mut self, entity: Entity, component: &Shared<T>) -> EcsResult<()> {
        self.attach_cells(entity, vec![ComponentCell::from_shared(component)])
    }

    /// Handle to the component of type `T` held by `entity`
    pub fn get_component<T: Component>(&self, entity: Entity) -> EcsResult<Shared<T>> {
        fetch_one::<T>(entity, self.store.components(entity)?)
    }

    /// Handles to several components of `entity`, in requested order
    ///
    /// Fails on the first type the entity does not hold.
    pub fn get_components<Q: ComponentSet>(&self, entity: Entity) -> EcsResult<Q::Handles> {
        Q::fetch(entity, self.store.components(entity)?)
    }

    /// Like [`get_component`](Self::get_component), `None` when absent
    pub fn try_component<T: Component>(&self, entity: Entity) -> EcsResult<Option<Shared<T>>> {
        Ok(fetch_optional_one::<T>(self.store.components(entity)?))
    }

    /// Like [`get_components`](Self::get_components), `None` per absent type
    pub fn try_components<Q: ComponentSet>(&self, entity: Entity) -> EcsResult<Q::Optional> {
        Ok(Q::fetch_optional(self.store.components(entity)?))
    }

    /// Whether `entity` holds a component of type `T`
    pub fn has_component<T: Component>(&self, entity: Entity) -> EcsResult<bool> {
        self.ensure_entity(entity)?;
        Ok(self.store.holds(entity, TypeId::of::<T>()))
    }

    /// Whether `entity` holds a component of every type in `Q`
    pub fn has_components<Q: ComponentSet>(&self, entity: Entity) -> EcsResult<bool> {
        self.ensure_entity(entity)?;
        Ok(Q::type_ids()
            .into_iter()
            .all(|type_id| self.store.holds(entity, type_id)))
    }

    /// Detach the component of type `T` and hand it back
    pub fn del_component<T: Component>(&mut self, entity: Entity) -> EcsResult<Shared<T>> {
        let missing = || EcsError::MissingComponent {
            entity,
            component: type_name::<T>(),
        };
        let cell = self.store.remove(entity, TypeId::of::<T>())?.ok_or_else(missing)?;
        log::debug!("Removed {} from entity {}", cell.type_name(), entity);
        cell.run_detach(self, entity);
        cell.downcast::<T>().ok_or_else(missing)
    }

    /// Lazily iterate the entities holding every type of `Q`
    pub fn get_entities_with<Q: ComponentSet>(&self) -> Query<'_, Q> {
        Query::new(&self.store)
    }

    /// Handles to `T` for each of the given entities
    ///
    /// Each item fails on its own if that entity lacks `T`.
    pub fn get_components_from<'s, T, I>(&'s self, entities: I) -> impl Iterator<Item = EcsResult<Shared<T>>> + 's
    where
        T: Component,
        I: IntoIterator<Item = Entity>,
        I::IntoIter: 's,
    {
        entities
            .into_iter()
            .map(move |entity| self.get_component::<T>(entity))
    }

    /// One arbitrary instance of `T`, for types a scene holds once
    pub fn get_single_component<T: Component>(&self) -> EcsResult<Shared<T>> {
        let entity = self
            .store
            .holders(TypeId::of::<T>())
            .and_then(|holders| holders.iter().next().copied())
            .ok_or(EcsError::NoComponentOfType {
                component: type_name::<T>(),
            })?;
        self.get_component::<T>(entity)
    }

    /// Number of entities holding a `T`
    pub fn component_count<T: Component>(&self) -> usize {
        self.store.holder_count(TypeId::of::<T>())
    }

    /// Underlying component indexes
    pub fn store(&self) -> &ComponentStore {
        &self.store
    }

    /// Check both component indexes agree
    pub fn verify_integrity(&self) -> Result<(), String> {
        self.store.verify_integrity()
    }

    fn ensure_entity(&self, entity: Entity) -> EcsResult<()> {
        if self.store.contains(entity) {
            Ok(())
        } else {
            Err(EcsError::MissingEntity(entity))
        }
    }

    fn attach_cells(&mut self, entity: Entity, cells: Vec<ComponentCell>) -> EcsResult<()> {
        let mut pending: Vec<ComponentCell> = Vec::with_capacity(cells.len());
        let mut replaced = Vec::new();
        for cell in cells {
            let previous = self.store.insert(entity, cell.clone())?;
            log::trace!("Attached {} to entity {}", cell.type_name(), entity);
            // A repeated type within one batch: the earlier one never ran its hook
            if let Some(position) = pending.iter().position(|p| p.type_id() == cell.type_id()) {
                pending.remove(position);
            } else if let Some(old) = previous {
                if old.same_instance(&cell) {
                    log::trace!("{} already attached to entity {}", cell.type_name(), entity);
                    continue;
                }
                replaced.push(old);
            }
            pending.push(cell);
        }
        for old in &replaced {
            log::debug!("Replaced {} on entity {}", old.type_name(), entity);
            old.run_detach(self, entity);
        }
        for cell in &pending {
            cell.run_attach(self, entity)?;
        }
        Ok(())
    }

    // ---- Systems ----

    /// Schedule a system; higher priorities run earlier
    pub fn add_system<S: System>(&mut self, system: S, priority: Priority) {
        self.systems.add(system, priority);
    }

    /// Schedule a system at the default priority
    pub fn add_system_default<S: System>(&mut self, system: S) {
        self.systems.add(system, DEFAULT_PRIORITY);
    }

    /// Schedule several systems
    pub fn add_systems<I: IntoIterator<Item = SystemEntry>>(&mut self, systems: I) {
        for entry in systems {
            self.systems.add_entry(entry);
        }
    }

    /// Unschedule the system of type `S`
    pub fn del_system<S: System>(&mut self) -> EcsResult<()> {
        self.systems.remove::<S>()
    }

    /// Move the system of type `S` to another priority
    pub fn set_system_priority<S: System>(&mut self, priority: Priority) -> EcsResult<()> {
        self.systems.set_priority::<S>(priority)
    }

    /// Whether a system of type `S` is scheduled
    pub fn has_system<S: System>(&self) -> bool {
        self.systems.contains::<S>()
    }

    /// Priority of the system of type `S`
    pub fn system_priority<S: System>(&self) -> Option<Priority> {
        self.systems.priority_of::<S>()
    }

    /// Handle to the scheduled system of type `S`
    pub fn get_system<S: System>(&self) -> EcsResult<Shared<S>> {
        self.systems.get::<S>()
    }

    /// Priorities in use, highest first
    pub fn priorities(&self) -> Vec<Priority> {
        self.systems.priorities()
    }

    /// Number of scheduled systems
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// The system schedule
    pub fn systems(&self) -> &SystemRegistry {
        &self.systems
    }

    /// Run every scheduled system once, highest priority first
    ///
    /// The schedule is captured when the frame starts: systems added,
    /// moved or removed by a system take effect on the next call.
    pub fn update(&mut self, delta_time: f32) -> EcsResult<()> {
        let frame = self.systems.frame_order();
        for entry in &frame {
            let mut system = entry
                .system
                .try_borrow_mut()
                .map_err(|_| EcsError::SystemBusy { system: entry.name })?;
            log::trace!("Running system {}", system.name());
            system.update(self, delta_time)?;
        }
        Ok(())
    }

    // ---- Resources ----

    /// Store a scene-wide value, replacing any previous value of the same type
    pub fn insert_resource<R: 'static>(&mut self, resource: R) -> Shared<R> {
        let handle = Shared::new(resource);
        let erased: Rc<dyn Any> = handle.rc().clone();
        if self.resources.insert(TypeId::of::<R>(), erased).is_some() {
            log::debug!("Replaced resource {}", type_name::<R>());
        }
        handle
    }

    /// Handle to the resource of type `R`
    pub fn resource<R: 'static>(&self) -> EcsResult<Shared<R>> {
        self.try_resource::<R>().ok_or(EcsError::MissingResource {
            resource: type_name::<R>(),
        })
    }

    /// Handle to the resource of type `R`, if present
    pub fn try_resource<R: 'static>(&self) -> Option<Shared<R>> {
        self.resources.get(&TypeId::of::<R>()).and_then(downcast_resource)
    }

    /// Remove the resource of type `R`
    pub fn remove_resource<R: 'static>(&mut self) -> EcsResult<Shared<R>> {
        self.resources
            .remove(&TypeId::of::<R>())
            .as_ref()
            .and_then(downcast_resource)
            .ok_or(EcsError::MissingResource {
                resource: type_name::<R>(),
            })
    }

    /// Whether a resource of type `R` is present
    pub fn has_resource<R: 'static>(&self) -> bool {
        self.resources.contains_key(&TypeId::of::<R>())
    }
}

fn downcast_resource<R: 'static>(erased: &Rc<dyn Any>) -> Option<Shared<R>> {
    Rc::clone(erased)
        .downcast::<RefCell<R>>()
        .ok()
        .map(Shared::from_rc)
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("id", &self.id)
            .field("entities", &self.store.len())
            .field("systems", &self.systems.len())
            .field("resources", &self.resources.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records hook calls into a shared log
    struct Tracer {
        label: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Component for Tracer {
        fn on_attach(&mut self, _scene: &Scene, entity: Entity) -> EcsResult<()> {
            self.log.borrow_mut().push(format!("attach {} {}", self.label, entity));
            Ok(())
        }

        fn on_detach(&mut self, _scene: &Scene, entity: Entity) {
            self.log.borrow_mut().push(format!("detach {} {}", self.label, entity));
        }
    }

    #[derive(Debug)]
    struct Health(i32);
    impl Component for Health {}

    /// Reads its sibling during attach
    struct Shield {
        health_seen: Option<i32>,
    }

    impl Component for Shield {
        fn on_attach(&mut self, scene: &Scene, entity: Entity) -> EcsResult<()> {
            self.health_seen = Some(scene.get_component::<Health>(entity)?.borrow().0);
            Ok(())
        }
    }

    struct Failing;
    impl Component for Failing {
        fn on_attach(&mut self, _scene: &Scene, _entity: Entity) -> EcsResult<()> {
            Err(EcsError::MissingResource { resource: "Nothing" })
        }
    }

    fn tracer(label: &'static str, log: &Rc<RefCell<Vec<String>>>) -> Tracer {
        Tracer {
            label,
            log: Rc::clone(log),
        }
    }

    #[test]
    fn test_hooks_see_siblings() {
        let mut scene = Scene::new();
        let entity = scene.create_entity((Shield { health_seen: None }, Health(42))).unwrap();
        let shield = scene.get_component::<Shield>(entity).unwrap();
        assert_eq!(shield.borrow().health_seen, Some(42));
    }

    #[test]
    fn test_failing_hook_propagates_and_keeps_components() {
        let mut scene = Scene::new();
        let err = scene.create_entity((Health(1), Failing)).unwrap_err();
        assert_eq!(err, EcsError::MissingResource { resource: "Nothing" });
        assert_eq!(scene.entity_count(), 1);
        assert_eq!(scene.component_count::<Failing>(), 1);
    }

    #[test]
    fn test_replacement_runs_old_detach() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut scene = Scene::new();
        let entity = scene.create_entity((tracer("old", &log),)).unwrap();
        scene.add_component(entity, tracer("new", &log)).unwrap();
        assert_eq!(
            *log.borrow(),
            vec![
                format!("attach old {entity}"),
                format!("detach old {entity}"),
                format!("attach new {entity}"),
            ]
        );
        assert_eq!(scene.component_count::<Tracer>(), 1);
    }

    #[test]
    fn test_reattaching_same_instance_keeps_hooks_paired() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut scene = Scene::new();
        let entity = scene.create_entity(()).unwrap();
        let shared = Shared::new(tracer("once", &log));
        scene.attach_shared(entity, &shared).unwrap();
        scene.attach_shared(entity, &shared).unwrap();
        assert_eq!(*log.borrow(), vec![format!("attach once {entity}")]);

        scene.del_entity(entity).unwrap();
        assert_eq!(
            *log.borrow(),
            vec![format!("attach once {entity}"), format!("detach once {entity}")]
        );
    }

    #[test]
    fn test_del_entity_runs_every_detach() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut scene = Scene::new();
        let entity = scene.create_entity((tracer("a", &log), Health(3))).unwrap();
        scene.del_entity(entity).unwrap();
        assert!(log.borrow().contains(&format!("detach a {entity}")));
        assert_eq!(scene.del_entity(entity), Err(EcsError::MissingEntity(entity)));
        scene.verify_integrity().unwrap();
    }

    #[test]
    fn test_del_component_returns_handle() {
        let mut scene = Scene::new();
        let entity = scene.create_entity((Health(9),)).unwrap();
        let health = scene.del_component::<Health>(entity).unwrap();
        assert_eq!(health.borrow().0, 9);
        assert!(!scene.has_component::<Health>(entity).unwrap());
        assert!(scene.del_component::<Health>(entity).unwrap_err().is_missing_component());
    }

    #[test]
    fn test_attach_shared_aliases_instance() {
        let mut scene = Scene::new();
        let shared = Shared::new(Health(5));
        let a = scene.create_entity(()).unwrap();
        let b = scene.create_entity(()).unwrap();
        scene.attach_shared(a, &shared).unwrap();
        scene.attach_shared(b, &shared).unwrap();
        scene.get_component::<Health>(a).unwrap().borrow_mut().0 = 6;
        assert_eq!(scene.get_component::<Health>(b).unwrap().borrow().0, 6);
        assert!(shared.ptr_eq(&scene.get_component::<Health>(a).unwrap()));
    }

    #[test]
    fn test_single_component() {
        let mut scene = Scene::new();
        assert_eq!(
            scene.get_single_component::<Health>().unwrap_err(),
            EcsError::NoComponentOfType {
                component: type_name::<Health>()
            }
        );
        scene.create_entity((Health(1),)).unwrap();
        assert_eq!(scene.get_single_component::<Health>().unwrap().borrow().0, 1);
    }

    #[test]
    fn test_components_from_reports_each_entity() {
        let mut scene = Scene::new();
        let with = scene.create_entity((Health(1),)).unwrap();
        let without = scene.create_entity(()).unwrap();
        let results: Vec<_> = scene.get_components_from::<Health, _>([with, without]).collect();
        assert!(results[0].is_ok());
        assert!(results[1].as_ref().unwrap_err().is_missing_component());
    }

    #[test]
    fn test_resources() {
        let mut scene = Scene::new();
        assert!(!scene.has_resource::<u32>());
        assert!(scene.try_resource::<u32>().is_none());
        scene.insert_resource(7_u32);
        *scene.resource::<u32>().unwrap().borrow_mut() += 1;
        assert_eq!(*scene.resource::<u32>().unwrap().borrow(), 8);
        assert_eq!(*scene.remove_resource::<u32>().unwrap().borrow(), 8);
        assert!(matches!(scene.resource::<u32>(), Err(EcsError::MissingResource { .. })));
    }

    struct Recursive;
    impl System for Recursive {
        fn update(&mut self, scene: &mut Scene, delta_time: f32) -> EcsResult<()> {
            scene.update(delta_time)
        }
    }

    #[test]
    fn test_reentrant_update_is_rejected() {
        let mut scene = Scene::new();
        scene.add_system_default(Recursive);
        assert!(matches!(scene.update(0.1), Err(EcsError::SystemBusy { .. })));
    }

    /// Removes itself and schedules a counter
    struct OneShot;
    impl System for OneShot {
        fn update(&mut self, scene: &mut Scene, _delta_time: f32) -> EcsResult<()> {
            scene.del_system::<OneShot>()?;
            scene.add_system(Counter(0), -1);
            Ok(())
        }
    }

    struct Counter(u32);
    impl System for Counter {
        fn update(&mut self, _scene: &mut Scene, _delta_time: f32) -> EcsResult<()> {
            self.0 += 1;
            Ok(())
        }
    }

    #[test]
    fn test_schedule_edits_apply_next_frame() {
        let mut scene = Scene::new();
        scene.add_system_default(OneShot);
        scene.update(0.0).unwrap();
        assert!(!scene.has_system::<OneShot>());
        assert_eq!(scene.get_system::<Counter>().unwrap().borrow().0, 0);
        scene.update(0.0).unwrap();
        assert_eq!(scene.get_system::<Counter>().unwrap().borrow().0, 1);
    }

    #[test]
    fn test_scene_ids_differ() {
        assert_ne!(Scene::new().id(), Scene::new().id());
    }
}
