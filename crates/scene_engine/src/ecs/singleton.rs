//! Process-wide singleton registry
//!
//! Types opt in by implementing [`Singleton`]. The first call to
//! [`get_or_create`] for a type runs its factory and stores the instance;
//! every later call returns the same `Arc`. Instances live until the process
//! exits.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

/// Marker for types with one shared instance per process
pub trait Singleton: Any + Send {}

type Registry = HashMap<TypeId, Box<dyn Any + Send + Sync>>;

static REGISTRY: OnceLock<Mutex<Registry>> = OnceLock::new();

fn registry() -> MutexGuard<'static, Registry> {
    lock(REGISTRY.get_or_init(|| Mutex::new(HashMap::new())))
}

/// Lock a mutex, recovering the data if a previous holder panicked
pub fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The instance of `T`, if one has been created
pub fn get<T: Singleton>() -> Option<Arc<Mutex<T>>> {
    registry()
        .get(&TypeId::of::<T>())
        .and_then(|stored| stored.downcast_ref::<Arc<Mutex<T>>>())
        .map(Arc::clone)
}

/// Whether an instance of `T` exists
pub fn contains<T: Singleton>() -> bool {
    registry().contains_key(&TypeId::of::<T>())
}

/// The instance of `T`, creating it with `init` on first use
///
/// `init` runs without the registry lock held, so it may itself request
/// other singletons. When two threads race on the same type, the instance
/// stored first wins and the other is dropped.
pub fn get_or_create<T, F>(init: F) -> Arc<Mutex<T>>
where
    T: Singleton,
    F: FnOnce() -> T,
{
    if let Some(existing) = get::<T>() {
        return existing;
    }

    let created = Arc::new(Mutex::new(init()));
    let mut registry = registry();
    let stored = registry
        .entry(TypeId::of::<T>())
        .or_insert_with(|| {
            log::debug!("Registered singleton {}", type_name::<T>());
            let erased: Box<dyn Any + Send + Sync> = Box::new(Arc::clone(&created));
            erased
        });
    match stored.downcast_ref::<Arc<Mutex<T>>>() {
        Some(instance) => Arc::clone(instance),
        None => created,
    }
}

/// The instance of `T`, default-constructed on first use
pub fn instance<T: Singleton + Default>() -> Arc<Mutex<T>> {
    get_or_create(T::default)
}
