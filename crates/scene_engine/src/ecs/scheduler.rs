//! System scheduling by priority
//!
//! Systems are grouped into priority buckets. Buckets run from the highest
//! priority value to the lowest; within a bucket systems run in the order
//! they were first added. A scene holds one instance per system type: adding
//! a type again at the same priority replaces the instance in place, adding
//! it at another priority moves it to that bucket.

use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::error::{EcsError, EcsResult};
use super::System;
use crate::foundation::collections::Shared;

/// System priority; higher values run earlier in the frame
pub type Priority = i32;

/// Priority used when none is given
pub const DEFAULT_PRIORITY: Priority = 0;

/// A scheduled system instance
struct SystemSlot {
    value: Rc<dyn Any>,
    system: Rc<RefCell<dyn System>>,
    type_id: TypeId,
    name: &'static str,
}

impl SystemSlot {
    fn new<S: System>(system: S) -> Self {
        let cell = Rc::new(RefCell::new(system));
        let dynamic: Rc<RefCell<dyn System>> = cell.clone();
        let value: Rc<dyn Any> = cell;
        Self {
            value,
            system: dynamic,
            type_id: TypeId::of::<S>(),
            name: type_name::<S>(),
        }
    }

    fn downcast<S: System>(&self) -> Option<Shared<S>> {
        Rc::clone(&self.value)
            .downcast::<RefCell<S>>()
            .ok()
            .map(Shared::from_rc)
    }
}

/// A system paired with its priority, for bulk insertion
pub struct SystemEntry {
    slot: SystemSlot,
    priority: Priority,
}

impl SystemEntry {
    /// Entry at the default priority
    pub fn new<S: System>(system: S) -> Self {
        Self {
            slot: SystemSlot::new(system),
            priority: DEFAULT_PRIORITY,
        }
    }

    /// Override the priority
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

struct PriorityBucket {
    priority: Priority,
    systems: Vec<SystemSlot>,
}

/// One entry of a frame's execution order
#[derive(Clone)]
pub(crate) struct FrameSystem {
    pub(crate) system: Rc<RefCell<dyn System>>,
    pub(crate) name: &'static str,
}

/// Priority-ordered registry of system instances
#[derive(Default)]
pub struct SystemRegistry {
    /// Sorted by ascending priority
    buckets: Vec<PriorityBucket>,
    index: HashMap<TypeId, Priority>,
}

impl SystemRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a system at the given priority
    pub fn add<S: System>(&mut self, system: S, priority: Priority) {
        self.add_entry(SystemEntry::new(system).with_priority(priority));
    }

    /// Schedule a prepared entry
    pub fn add_entry(&mut self, entry: SystemEntry) {
        let SystemEntry { slot, priority } = entry;
        let type_id = slot.type_id;
        match self.index.get(&type_id).copied() {
            Some(current) if current == priority => {
                let bucket = self.bucket_mut(priority);
                if let Some(existing) =
                    bucket.and_then(|bucket| bucket.systems.iter_mut().find(|s| s.type_id == type_id))
                {
                    log::debug!("Replacing system {} at priority {}", slot.name, priority);
                    *existing = slot;
                }
            }
            Some(current) => {
                log::debug!("Moving system {} from priority {} to {}", slot.name, current, priority);
                self.take_slot(slot.type_id, current);
                self.insert_slot(slot, priority);
            }
            None => {
                log::debug!("Adding system {} at priority {}", slot.name, priority);
                self.insert_slot(slot, priority);
            }
        }
    }

    /// Unschedule the system of type `S`
    pub fn remove<S: System>(&mut self) -> EcsResult<()> {
        let priority = self.priority_or_err::<S>()?;
        self.take_slot(TypeId::of::<S>(), priority);
        log::debug!("Removed system {}", type_name::<S>());
        Ok(())
    }

    /// Move the system of type `S` to another priority bucket
    pub fn set_priority<S: System>(&mut self, priority: Priority) -> EcsResult<()> {
        let current = self.priority_or_err::<S>()?;
        if current != priority {
            if let Some(slot) = self.take_slot(TypeId::of::<S>(), current) {
                self.insert_slot(slot, priority);
            }
        }
        Ok(())
    }

    /// Whether a system of type `S` is scheduled
    pub fn contains<S: System>(&self) -> bool {
        self.index.contains_key(&TypeId::of::<S>())
    }

    /// Priority of the scheduled system of type `S`
    pub fn priority_of<S: System>(&self) -> Option<Priority> {
        self.index.get(&TypeId::of::<S>()).copied()
    }

    /// Shared handle to the scheduled system of type `S`
    pub fn get<S: System>(&self) -> EcsResult<Shared<S>> {
        let priority = self.priority_or_err::<S>()?;
        self.buckets
            .iter()
            .find(|bucket| bucket.priority == priority)
            .and_then(|bucket| bucket.systems.iter().find(|s| s.type_id == TypeId::of::<S>()))
            .and_then(SystemSlot::downcast::<S>)
            .ok_or(EcsError::MissingSystem { system: type_name::<S>() })
    }

    /// Priorities in use, highest first
    pub fn priorities(&self) -> Vec<Priority> {
        self.buckets.iter().rev().map(|bucket| bucket.priority).collect()
    }

    /// Number of scheduled systems
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether no system is scheduled
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// System names in execution order
    pub fn execution_order(&self) -> Vec<&'static str> {
        self.iter_in_order().map(|slot| slot.name).collect()
    }

    pub(crate) fn frame_order(&self) -> Vec<FrameSystem> {
        self.iter_in_order()
            .map(|slot| FrameSystem {
                system: Rc::clone(&slot.system),
                name: slot.name,
            })
            .collect()
    }

    fn iter_in_order(&self) -> impl Iterator<Item = &SystemSlot> {
        self.buckets.iter().rev().flat_map(|bucket| bucket.systems.iter())
    }

    fn priority_or_err<S: System>(&self) -> EcsResult<Priority> {
        self.priority_of::<S>()
            .ok_or(EcsError::MissingSystem { system: type_name::<S>() })
    }

    fn bucket_mut(&mut self, priority: Priority) -> Option<&mut PriorityBucket> {
        self.buckets
            .binary_search_by_key(&priority, |bucket| bucket.priority)
            .ok()
            .map(|position| &mut self.buckets[position])
    }

    fn insert_slot(&mut self, slot: SystemSlot, priority: Priority) {
        self.index.insert(slot.type_id, priority);
        match self.buckets.binary_search_by_key(&priority, |bucket| bucket.priority) {
            Ok(position) => self.buckets[position].systems.push(slot),
            Err(position) => self.buckets.insert(
                position,
                PriorityBucket {
                    priority,
                    systems: vec![slot],
                },
            ),
        }
    }

    fn take_slot(&mut self, type_id: TypeId, priority: Priority) -> Option<SystemSlot> {
        let position = self
            .buckets
            .binary_search_by_key(&priority, |bucket| bucket.priority)
            .ok()?;
        let bucket = &mut self.buckets[position];
        let slot_position = bucket.systems.iter().position(|s| s.type_id == type_id)?;
        let slot = bucket.systems.remove(slot_position);
        if bucket.systems.is_empty() {
            self.buckets.remove(position);
        }
        self.index.remove(&type_id);
        Some(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Scene;

    struct Render;
    impl System for Render {
        fn update(&mut self, _scene: &mut Scene, _dt: f32) -> EcsResult<()> {
            Ok(())
        }
    }

    struct Physics {
        steps: u32,
    }
    impl System for Physics {
        fn update(&mut self, _scene: &mut Scene, _dt: f32) -> EcsResult<()> {
            self.steps += 1;
            Ok(())
        }
    }

    struct Input;
    impl System for Input {
        fn update(&mut self, _scene: &mut Scene, _dt: f32) -> EcsResult<()> {
            Ok(())
        }
    }

    fn short(names: Vec<&'static str>) -> Vec<&'static str> {
        names
            .into_iter()
            .map(|name| name.rsplit("::").next().unwrap_or(name))
            .collect()
    }

    #[test]
    fn test_higher_priority_runs_first() {
        let mut registry = SystemRegistry::new();
        registry.add(Render, -5);
        registry.add(Input, 10);
        registry.add(Physics { steps: 0 }, 0);
        assert_eq!(registry.priorities(), vec![10, 0, -5]);
        assert_eq!(short(registry.execution_order()), vec!["Input", "Physics", "Render"]);
    }

    #[test]
    fn test_bucket_keeps_insertion_order() {
        let mut registry = SystemRegistry::new();
        registry.add(Render, 1);
        registry.add(Input, 1);
        assert_eq!(short(registry.execution_order()), vec!["Render", "Input"]);
        assert_eq!(registry.priorities(), vec![1]);
    }

    #[test]
    fn test_same_type_same_priority_replaces() {
        let mut registry = SystemRegistry::new();
        registry.add(Physics { steps: 1 }, 3);
        registry.add(Physics { steps: 7 }, 3);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get::<Physics>().unwrap().borrow().steps, 7);
    }

    #[test]
    fn test_same_type_new_priority_moves() {
        let mut registry = SystemRegistry::new();
        registry.add(Physics { steps: 0 }, 3);
        registry.add(Physics { steps: 0 }, 8);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.priority_of::<Physics>(), Some(8));
        assert_eq!(registry.priorities(), vec![8]);
    }

    #[test]
    fn test_remove_and_missing_system() {
        let mut registry = SystemRegistry::new();
        registry.add(Input, 0);
        registry.remove::<Input>().unwrap();
        assert!(registry.is_empty());
        assert!(registry.priorities().is_empty());
        assert!(matches!(
            registry.remove::<Input>(),
            Err(EcsError::MissingSystem { system }) if system.ends_with("Input")
        ));
        assert!(registry.get::<Input>().is_err());
    }

    #[test]
    fn test_set_priority_regroups() {
        let mut registry = SystemRegistry::new();
        registry.add(Render, 0);
        registry.add(Input, 0);
        registry.set_priority::<Render>(20).unwrap();
        assert_eq!(short(registry.execution_order()), vec!["Render", "Input"]);
        assert!(registry.set_priority::<Physics>(1).is_err());
    }

    #[test]
    fn test_bulk_entries() {
        let mut registry = SystemRegistry::new();
        for entry in [SystemEntry::new(Render), SystemEntry::new(Input).with_priority(4)] {
            registry.add_entry(entry);
        }
        assert_eq!(registry.priority_of::<Render>(), Some(DEFAULT_PRIORITY));
        assert_eq!(registry.priority_of::<Input>(), Some(4));
        assert_eq!(registry.frame_order().len(), 2);
    }
}
