//! Thread-safe subject.
//!
//! Broadcasts snapshot the observer list and release the lock before calling
//! out, so observers may register or remove (themselves included) while a
//! broadcast is running.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError, Weak};

use tracing::{debug, trace, warn};

use crate::config::{DuplicatePolicy, NotifyPolicy, SubjectConfig};
use crate::error::{NotifyError, ObserverError};
use crate::subject::Observer;

/// Shared handle to an observer that can be notified from any thread.
pub type SharedObserver<S> = Arc<Mutex<dyn Observer<S> + Send>>;

struct Registration<S: ?Sized> {
    name: String,
    observer: Weak<Mutex<dyn Observer<S> + Send>>,
}

impl<S: ?Sized> Registration<S> {
    fn addr(&self) -> *const () {
        self.observer.as_ptr().cast::<()>()
    }

    fn is_alive(&self) -> bool {
        self.observer.strong_count() > 0
    }
}

pub struct SharedSubject<S: ?Sized> {
    observers: Mutex<Vec<Registration<S>>>,
    config: SubjectConfig,
}

impl<S: ?Sized> SharedSubject<S> {
    pub fn new() -> Self {
        Self::with_config(SubjectConfig::default())
    }

    pub fn with_config(config: SubjectConfig) -> Self {
        SharedSubject {
            observers: Mutex::new(Vec::new()),
            config,
        }
    }

    pub fn config(&self) -> SubjectConfig {
        self.config
    }

    // Every list edit is a single Vec call; a poisoned list is still consistent.
    fn registrations(&self) -> MutexGuard<'_, Vec<Registration<S>>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, observer: SharedObserver<S>) -> Result<(), ObserverError> {
        let name = shared_observer_name(&observer);
        let addr = Arc::as_ptr(&observer).cast::<()>();

        let mut observers = self.registrations();
        observers.retain(Registration::is_alive);

        if observers.iter().any(|r| r.addr() == addr) {
            match self.config.duplicate_policy {
                DuplicatePolicy::Allow => {}
                DuplicatePolicy::Ignore => {
                    debug!(observer = %name, "observer already registered, ignoring");
                    return Ok(());
                }
                DuplicatePolicy::Reject => return Err(ObserverError::Duplicate { observer: name }),
            }
        }

        debug!(observer = %name, position = observers.len(), "registering shared observer");
        observers.push(Registration {
            name,
            observer: Arc::downgrade(&observer),
        });
        Ok(())
    }

    pub fn remove<O>(&self, observer: &Arc<Mutex<O>>) -> bool
    where
        O: Observer<S> + Send + ?Sized,
    {
        let addr = Arc::as_ptr(observer).cast::<()>();
        let mut observers = self.registrations();
        observers.retain(Registration::is_alive);

        match observers.iter().position(|r| r.addr() == addr) {
            Some(index) => {
                let removed = observers.remove(index);
                debug!(observer = %removed.name, "removed shared observer");
                true
            }
            None => false,
        }
    }

    pub fn contains<O>(&self, observer: &Arc<Mutex<O>>) -> bool
    where
        O: Observer<S> + Send + ?Sized,
    {
        let addr = Arc::as_ptr(observer).cast::<()>();
        self.registrations()
            .iter()
            .any(|r| r.is_alive() && r.addr() == addr)
    }

    /// Notify the observers registered when the call starts, in order.
    ///
    /// Each observer is locked while it updates. An observer that
    /// re-broadcasts to a subject it is registered with deadlocks on itself.
    pub fn notify_all(&self, subject: &S) -> Result<(), NotifyError> {
        let snapshot: Vec<(String, SharedObserver<S>)> = self
            .registrations()
            .iter()
            .filter_map(|r| r.observer.upgrade().map(|o| (r.name.clone(), o)))
            .collect();
        debug!(observers = snapshot.len(), "notifying shared observers");

        let mut failures = Vec::new();
        for (name, observer) in snapshot {
            trace!(observer = %name, "update");
            let outcome = lock_observer(&observer).update(subject);

            if let Err(source) = outcome {
                let failure = ObserverError::UpdateFailed {
                    observer: name,
                    source,
                };
                match self.config.notify_policy {
                    NotifyPolicy::FailFast => {
                        debug!(error = %failure, "aborting notification");
                        return Err(NotifyError::single(failure));
                    }
                    NotifyPolicy::BestEffort => {
                        warn!(error = %failure, "observer failed, continuing");
                        failures.push(failure);
                    }
                }
            }
        }

        NotifyError::new(failures).into_result()
    }

    pub fn len(&self) -> usize {
        self.registrations().iter().filter(|r| r.is_alive()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.registrations().clear();
    }
}

impl<S: ?Sized> Default for SharedSubject<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ?Sized> fmt::Debug for SharedSubject<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .registrations()
            .iter()
            .filter(|r| r.is_alive())
            .map(|r| r.name.clone())
            .collect();
        f.debug_struct("SharedSubject")
            .field("observers", &names)
            .field("config", &self.config)
            .finish()
    }
}

// The observer may be mid-update and registering itself; never block on it.
fn shared_observer_name<S: ?Sized>(observer: &SharedObserver<S>) -> String {
    match observer.try_lock() {
        Ok(observer) => observer.name().to_string(),
        Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().name().to_string(),
        Err(TryLockError::WouldBlock) => String::from("<busy observer>"),
    }
}

fn lock_observer<S: ?Sized>(
    observer: &SharedObserver<S>,
) -> MutexGuard<'_, dyn Observer<S> + Send + 'static> {
    observer.lock().unwrap_or_else(|poisoned| {
        warn!("observer panicked during an earlier update, recovering");
        poisoned.into_inner()
    })
}
