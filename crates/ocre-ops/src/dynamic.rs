//! Dynamic properties: values that can be edited after a processor is built.
//!
//! Reference: OCIO DynamicProperty.cpp
//!
//! A kernel holding a [`DynamicProperty`] snapshots the value on every apply,
//! so edits from another handle take effect on the next render without
//! rebuilding the chain.

use std::sync::{Arc, RwLock};

/// Shared mutable value with interior locking. Clones share storage.
#[derive(Debug, Default)]
pub struct DynamicProperty<T> {
    value: Arc<RwLock<T>>,
}

impl<T> Clone for DynamicProperty<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
        }
    }
}

impl<T: Clone> DynamicProperty<T> {
    /// Wraps an initial value.
    pub fn new(value: T) -> Self {
        Self {
            value: Arc::new(RwLock::new(value)),
        }
    }

    /// Snapshots the current value.
    pub fn get(&self) -> T {
        match self.value.read() {
            Ok(guard) => guard.clone(),
            // A panicked writer cannot leave a torn value behind a simple
            // assignment, so the poisoned value is still usable.
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replaces the value; visible to all clones.
    pub fn set(&self, value: T) {
        match self.value.write() {
            Ok(mut guard) => *guard = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
    }

    /// True when `other` is a clone of `self` (edits are shared).
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_edits() {
        let a = DynamicProperty::new(1.0f64);
        let b = a.clone();
        b.set(2.5);
        assert_eq!(a.get(), 2.5);
        assert!(a.shares_storage_with(&b));
    }

    #[test]
    fn independent_properties_do_not_share() {
        let a = DynamicProperty::new(1.0f64);
        let b = DynamicProperty::new(1.0f64);
        assert!(!a.shares_storage_with(&b));
        b.set(3.0);
        assert_eq!(a.get(), 1.0);
    }
}
