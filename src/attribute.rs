//! Named value holders for notifier entities.

use std::cell::OnceCell;
use std::fmt;

/// A named value holder whose writes are meant to trigger notification.
///
/// The wrapper only stores. Writing with notification goes through
/// [`Notifier::set_attribute`](crate::Notifier::set_attribute), which
/// needs the owning entity, so an entity that cannot notify cannot use it.
///
/// Until the first write, `get` computes the default from the declared
/// initializer once and caches it.
pub struct ObservableAttribute<T> {
    name: &'static str,
    value: OnceCell<T>,
    init: fn() -> T,
}

impl<T> ObservableAttribute<T> {
    pub fn new(name: &'static str, init: fn() -> T) -> Self {
        ObservableAttribute {
            name,
            value: OnceCell::new(),
            init,
        }
    }

    pub fn with_value(name: &'static str, value: T, init: fn() -> T) -> Self {
        ObservableAttribute {
            name,
            value: OnceCell::from(value),
            init,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Most recently written value, or the cached default.
    pub fn get(&self) -> &T {
        self.value.get_or_init(self.init)
    }

    /// True once a value was written or the default was materialized.
    pub fn is_set(&self) -> bool {
        self.value.get().is_some()
    }

    /// Store without notifying. Returns the previous value, if any.
    pub fn replace(&mut self, value: T) -> Option<T> {
        let previous = self.value.take();
        // Cell was just emptied
        let _ = self.value.set(value);
        previous
    }

    /// Clear the stored value; the next `get` recomputes the default.
    pub fn take(&mut self) -> Option<T> {
        self.value.take()
    }
}

impl<T: Default> ObservableAttribute<T> {
    pub fn with_default(name: &'static str) -> Self {
        Self::new(name, T::default)
    }
}

impl<T: Clone> Clone for ObservableAttribute<T> {
    fn clone(&self) -> Self {
        ObservableAttribute {
            name: self.name,
            value: self.value.clone(),
            init: self.init,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableAttribute<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableAttribute")
            .field("name", &self.name)
            .field("value", &self.value.get())
            .finish()
    }
}
