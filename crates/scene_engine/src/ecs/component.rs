//! Component trait and type-erased component cells
//!
//! A component is any `'static` type implementing [`Component`]. The scene
//! keys it by its concrete type and keeps it behind a [`Shared`] handle, so
//! systems mutate components in place through the handles a query returns.
//!
//! Construction never sees the scene. Anything that depends on the owning
//! entity (looking up sibling components, registering listeners, reading
//! scene resources) belongs in [`Component::on_attach`], which the scene
//! runs once the component is reachable from both of its indexes.

use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::error::{EcsError, EcsResult};
use super::scene::{Scene, SceneId};
use super::Entity;
use crate::foundation::collections::Shared;

/// Units of mutable data attached to entities and manipulated by systems
pub trait Component: Any {
    /// Deferred initialisation, run after the component has been attached
    ///
    /// Sibling components and scene resources are reachable from here.
    /// A handle to `Self` can be fetched from the scene (to register it as
    /// a listener, say) but not borrowed: the component is mutably borrowed
    /// for the duration of the hook.
    fn on_attach(&mut self, scene: &Scene, entity: Entity) -> EcsResult<()> {
        let _ = (scene, entity);
        Ok(())
    }

    /// Run after the component left the scene (removal, replacement or entity deletion)
    fn on_detach(&mut self, scene: &Scene, entity: Entity) {
        let _ = (scene, entity);
    }
}

/// Non-owning back-reference from a component to its scene and entity
///
/// Bind it in [`Component::on_attach`] and clear it in
/// [`Component::on_detach`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Owner {
    binding: Option<(SceneId, Entity)>,
}

impl Owner {
    /// Record the owning scene and entity
    pub fn bind(&mut self, scene: &Scene, entity: Entity) {
        self.binding = Some((scene.id(), entity));
    }

    /// Forget the owner
    pub fn clear(&mut self) {
        self.binding = None;
    }

    /// Owning entity, if attached
    pub fn entity(&self) -> Option<Entity> {
        self.binding.map(|(_, entity)| entity)
    }

    /// Owning scene, if attached
    pub fn scene_id(&self) -> Option<SceneId> {
        self.binding.map(|(scene, _)| scene)
    }

    /// Whether the component is currently attached somewhere
    pub fn is_attached(&self) -> bool {
        self.binding.is_some()
    }

    /// Whether the component is attached to the given scene
    pub fn is_owned_by(&self, scene: &Scene) -> bool {
        self.scene_id() == Some(scene.id())
    }
}

/// Type-erased storage cell for one component instance
///
/// Holds two views of the same allocation: one for downcasting back to the
/// concrete type, one for calling the lifecycle hooks. Cloning a cell clones
/// the handles, not the component.
#[derive(Clone)]
pub struct ComponentCell {
    value: Rc<dyn Any>,
    hooks: Rc<RefCell<dyn Component>>,
    type_id: TypeId,
    type_name: &'static str,
}

impl ComponentCell {
    /// Wrap a freshly constructed component
    pub fn new<T: Component>(component: T) -> Self {
        Self::from_shared(&Shared::new(component))
    }

    /// Wrap an existing handle; the cell shares the instance with `shared`
    pub fn from_shared<T: Component>(shared: &Shared<T>) -> Self {
        let cell: Rc<RefCell<T>> = Rc::clone(shared.rc());
        let hooks: Rc<RefCell<dyn Component>> = cell.clone();
        let value: Rc<dyn Any> = cell;
        Self {
            value,
            hooks,
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    /// Concrete type tag of the stored component
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Concrete type name of the stored component
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Recover a typed handle; `None` if `T` is not the stored type
    pub fn downcast<T: Component>(&self) -> Option<Shared<T>> {
        Rc::clone(&self.value)
            .downcast::<RefCell<T>>()
            .ok()
            .map(Shared::from_rc)
    }

    /// Whether both cells hold the same component instance
    pub fn same_instance(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.value, &other.value)
    }

    pub(crate) fn run_attach(&self, scene: &Scene, entity: Entity) -> EcsResult<()> {
        let mut hooks = self
            .hooks
            .try_borrow_mut()
            .map_err(|_| EcsError::ComponentBusy { component: self.type_name })?;
        hooks.on_attach(scene, entity)
    }

    pub(crate) fn run_detach(&self, scene: &Scene, entity: Entity) {
        match self.hooks.try_borrow_mut() {
            Ok(mut hooks) => hooks.on_detach(scene, entity),
            Err(_) => log::warn!(
                "Skipping detach hook of \"{}\" on entity {}: component is borrowed",
                self.type_name,
                entity
            ),
        }
    }
}

impl fmt::Debug for ComponentCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentCell")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// A set of components attached together, written as a tuple
///
/// Implemented for `()` and tuples of up to eight component types.
pub trait ComponentBundle {
    /// Convert into storage cells, in tuple order
    fn into_cells(self) -> Vec<ComponentCell>;
}

macro_rules! impl_component_bundle {
    ($($name:ident),*) => {
        impl<$($name: Component),*> ComponentBundle for ($($name,)*) {
            #[allow(non_snake_case)]
            fn into_cells(self) -> Vec<ComponentCell> {
                let ($($name,)*) = self;
                vec![$(ComponentCell::new($name)),*]
            }
        }
    };
}

impl_component_bundle!();
impl_component_bundle!(A);
impl_component_bundle!(A, B);
impl_component_bundle!(A, B, C);
impl_component_bundle!(A, B, C, D);
impl_component_bundle!(A, B, C, D, E);
impl_component_bundle!(A, B, C, D, E, F);
impl_component_bundle!(A, B, C, D, E, F, G);
impl_component_bundle!(A, B, C, D, E, F, G, H);
