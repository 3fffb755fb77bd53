//! The notification capability: entities that own a subject.
//!
//! An entity implements [`Notifier`] by handing out its [`Subject`]; every
//! other operation, including writing observable attributes, comes for free.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::attribute::ObservableAttribute;
use crate::error::{NotifyError, ObserverError};
use crate::subject::{Observer, ObserverHandle, Subject};

/// Capability of an entity that owns a [`Subject`] and can broadcast to it.
///
/// Writing an [`ObservableAttribute`] with notification is only possible
/// through [`Notifier::set_attribute`], so every entity with observable
/// attributes is a notifier by construction.
pub trait Notifier {
    fn subject(&self) -> &Subject<Self>;

    fn subject_mut(&mut self) -> &mut Subject<Self>;

    fn register_observer(&mut self, observer: ObserverHandle<Self>) -> Result<(), ObserverError> {
        self.subject_mut().register(observer)
    }

    fn remove_observer<O>(&mut self, observer: &Rc<RefCell<O>>) -> bool
    where
        O: Observer<Self> + ?Sized,
    {
        self.subject_mut().remove(observer)
    }

    fn notify_observers(&self) -> Result<(), NotifyError> {
        self.subject().notify_all(self)
    }

    /// Store `value` in the attribute selected by `field`, then notify.
    ///
    /// The new value is already visible when the first observer runs.
    fn set_attribute<T, F>(&mut self, field: F, value: T) -> Result<(), NotifyError>
    where
        F: FnOnce(&mut Self) -> &mut ObservableAttribute<T>,
    {
        let attribute = field(self);
        debug!(attribute = attribute.name(), "attribute written");
        attribute.replace(value);
        self.notify_observers()
    }
}
