//! Shared handle types used by the scene storage
//!
//! Components and resources live behind reference-counted cells so that a
//! system can hold several of them at once and mutate them in place while the
//! scene itself stays borrowable.

use std::cell::{BorrowError, BorrowMutError, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

/// Shared, interior-mutable handle to a value owned by a scene
pub struct Shared<T: ?Sized> {
    cell: Rc<RefCell<T>>,
}

impl<T> Shared<T> {
    /// Wrap a value in a new handle
    pub fn new(value: T) -> Self {
        Self {
            cell: Rc::new(RefCell::new(value)),
        }
    }
}

impl<T: ?Sized> Shared<T> {
    pub(crate) fn from_rc(cell: Rc<RefCell<T>>) -> Self {
        Self { cell }
    }

    pub(crate) fn rc(&self) -> &Rc<RefCell<T>> {
        &self.cell
    }

    /// Immutably borrow the value
    ///
    /// # Panics
    /// Panics if the value is currently mutably borrowed.
    pub fn borrow(&self) -> Ref<'_, T> {
        self.cell.borrow()
    }

    /// Mutably borrow the value
    ///
    /// # Panics
    /// Panics if the value is currently borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.cell.borrow_mut()
    }

    /// Immutably borrow the value, failing instead of panicking
    pub fn try_borrow(&self) -> Result<Ref<'_, T>, BorrowError> {
        self.cell.try_borrow()
    }

    /// Mutably borrow the value, failing instead of panicking
    pub fn try_borrow_mut(&self) -> Result<RefMut<'_, T>, BorrowMutError> {
        self.cell.try_borrow_mut()
    }

    /// Whether two handles point at the same instance
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    /// Create a non-owning handle
    pub fn downgrade(&self) -> WeakShared<T> {
        WeakShared {
            cell: Rc::downgrade(&self.cell),
        }
    }

    /// Number of live strong handles
    pub fn handle_count(&self) -> usize {
        Rc::strong_count(&self.cell)
    }
}

impl<T: ?Sized> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.try_borrow() {
            Ok(value) => f.debug_tuple("Shared").field(&&*value).finish(),
            Err(_) => f.write_str("Shared(<borrowed>)"),
        }
    }
}

/// Non-owning counterpart of [`Shared`]
pub struct WeakShared<T: ?Sized> {
    cell: Weak<RefCell<T>>,
}

impl<T: ?Sized> WeakShared<T> {
    /// Recover a strong handle if the value is still alive
    pub fn upgrade(&self) -> Option<Shared<T>> {
        self.cell.upgrade().map(Shared::from_rc)
    }

    /// Whether the value has been dropped
    pub fn is_dead(&self) -> bool {
        self.cell.strong_count() == 0
    }
}

impl<T: ?Sized> Clone for WeakShared<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Weak::clone(&self.cell),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let a = Shared::new(1);
        let b = a.clone();
        *b.borrow_mut() += 41;
        assert_eq!(*a.borrow(), 42);
        assert!(a.ptr_eq(&b));
        assert_eq!(a.handle_count(), 2);
    }

    #[test]
    fn test_try_borrow_mut_while_borrowed() {
        let a = Shared::new(String::from("busy"));
        let _guard = a.borrow();
        assert!(a.try_borrow_mut().is_err());
        assert!(a.try_borrow().is_ok());
    }

    #[test]
    fn test_weak_handle_dies_with_last_strong() {
        let a = Shared::new(5_u8);
        let weak = a.downgrade();
        assert!(weak.upgrade().is_some());
        drop(a);
        assert!(weak.is_dead());
        assert!(weak.upgrade().is_none());
    }
}
