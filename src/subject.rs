//! Subject: ordered, non-owning observer registry with synchronous broadcast.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use crate::config::{DuplicatePolicy, NotifyPolicy, SubjectConfig};
use crate::error::{NotifyError, ObserverError, UpdateError};

// ============================================================================
// Observer
// ============================================================================

/// Receives change notifications from a subject of type `S`.
///
/// Notification is pull-based: `update` gets the entity that changed and
/// reads whatever state it needs from it.
pub trait Observer<S: ?Sized> {
    fn update(&mut self, subject: &S) -> Result<(), UpdateError>;

    /// Label used in logs and error messages.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<S, F> Observer<S> for F
where
    S: ?Sized,
    F: FnMut(&S) -> Result<(), UpdateError>,
{
    fn update(&mut self, subject: &S) -> Result<(), UpdateError> {
        self(subject)
    }
}

/// Shared handle to a single-threaded observer.
pub type ObserverHandle<S> = Rc<RefCell<dyn Observer<S>>>;

// ============================================================================
// Subject
// ============================================================================

struct Registration<S: ?Sized> {
    name: String,
    observer: Weak<RefCell<dyn Observer<S>>>,
}

impl<S: ?Sized> Registration<S> {
    fn addr(&self) -> *const () {
        self.observer.as_ptr().cast::<()>()
    }

    fn is_alive(&self) -> bool {
        self.observer.strong_count() > 0
    }
}

/// Ordered list of registered observers for entities of type `S`.
///
/// The subject never owns its observers. An observer dropped by its owner
/// is skipped by broadcasts and pruned at the next `register`/`remove`.
pub struct Subject<S: ?Sized> {
    observers: Vec<Registration<S>>,
    config: SubjectConfig,
}

impl<S: ?Sized> Subject<S> {
    pub fn new() -> Self {
        Self::with_config(SubjectConfig::default())
    }

    pub fn with_config(config: SubjectConfig) -> Self {
        Subject {
            observers: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> SubjectConfig {
        self.config
    }

    /// Append `observer` to the registration list.
    ///
    /// Only a weak reference is kept; the caller stays the owner.
    pub fn register(&mut self, observer: ObserverHandle<S>) -> Result<(), ObserverError> {
        self.prune();
        let name = observer_name(&observer);

        if self.contains(&observer) {
            match self.config.duplicate_policy {
                DuplicatePolicy::Allow => {}
                DuplicatePolicy::Ignore => {
                    debug!(observer = %name, "observer already registered, ignoring");
                    return Ok(());
                }
                DuplicatePolicy::Reject => return Err(ObserverError::Duplicate { observer: name }),
            }
        }

        debug!(observer = %name, position = self.observers.len(), "registering observer");
        self.observers.push(Registration {
            name,
            observer: Rc::downgrade(&observer),
        });
        Ok(())
    }

    /// Remove the first registration of `observer`. Returns false if it
    /// was not registered.
    pub fn remove<O>(&mut self, observer: &Rc<RefCell<O>>) -> bool
    where
        O: Observer<S> + ?Sized,
    {
        self.prune();
        let addr = Rc::as_ptr(observer).cast::<()>();
        match self.observers.iter().position(|r| r.addr() == addr) {
            Some(index) => {
                let removed = self.observers.remove(index);
                debug!(observer = %removed.name, "removed observer");
                true
            }
            None => false,
        }
    }

    pub fn contains<O>(&self, observer: &Rc<RefCell<O>>) -> bool
    where
        O: Observer<S> + ?Sized,
    {
        let addr = Rc::as_ptr(observer).cast::<()>();
        self.observers.iter().any(|r| r.is_alive() && r.addr() == addr)
    }

    /// Call `update` on every live observer, in registration order.
    pub fn notify_all(&self, subject: &S) -> Result<(), NotifyError> {
        debug!(observers = self.observers.len(), "notifying observers");
        let mut failures = Vec::new();

        for registration in &self.observers {
            let Some(observer) = registration.observer.upgrade() else {
                continue;
            };

            let outcome = match observer.try_borrow_mut() {
                Ok(mut observer) => {
                    trace!(observer = %registration.name, "update");
                    observer
                        .update(subject)
                        .map_err(|source| ObserverError::UpdateFailed {
                            observer: registration.name.clone(),
                            source,
                        })
                }
                Err(_) => Err(ObserverError::Busy {
                    observer: registration.name.clone(),
                }),
            };

            if let Err(failure) = outcome {
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

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.observers.iter().filter(|r| r.is_alive()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of live observers, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.observers
            .iter()
            .filter(|r| r.is_alive())
            .map(|r| r.name.as_str())
    }

    pub fn clear(&mut self) {
        self.observers.clear();
    }

    /// Drop registrations whose observer no longer exists.
    pub fn prune(&mut self) {
        self.observers.retain(Registration::is_alive);
    }
}

impl<S: ?Sized> Default for Subject<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ?Sized> fmt::Debug for Subject<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subject")
            .field("observers", &self.names().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}

fn observer_name<S: ?Sized>(observer: &ObserverHandle<S>) -> String {
    match observer.try_borrow() {
        Ok(observer) => observer.name().to_string(),
        Err(_) => String::from("<busy observer>"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    type Log = Rc<RefCell<Vec<&'static str>>>;

    struct Recorder {
        label: &'static str,
        log: Log,
    }

    impl Observer<()> for Recorder {
        fn update(&mut self, _: &()) -> Result<(), UpdateError> {
            self.log.borrow_mut().push(self.label);
            Ok(())
        }

        fn name(&self) -> &str {
            self.label
        }
    }

    struct Failing;

    impl Observer<()> for Failing {
        fn update(&mut self, _: &()) -> Result<(), UpdateError> {
            Err(UpdateError::rejected("broken"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn recorder(label: &'static str, log: &Log) -> Rc<RefCell<Recorder>> {
        Rc::new(RefCell::new(Recorder {
            label,
            log: log.clone(),
        }))
    }

    #[test]
    fn test_notify_in_registration_order() {
        let log = Log::default();
        let (a, b, c) = (recorder("A", &log), recorder("B", &log), recorder("C", &log));

        let mut subject: Subject<()> = Subject::new();
        subject.register(a.clone()).unwrap();
        subject.register(b.clone()).unwrap();
        subject.register(c.clone()).unwrap();
        subject.notify_all(&()).unwrap();

        assert_eq!(*log.borrow(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_register_then_remove_notifies_nobody() {
        let log = Log::default();
        let a = recorder("A", &log);

        let mut subject: Subject<()> = Subject::new();
        subject.register(a.clone()).unwrap();
        assert!(subject.remove(&a));
        subject.notify_all(&()).unwrap();

        assert!(log.borrow().is_empty());
        assert!(subject.is_empty());
    }

    #[test]
    fn test_remove_unregistered_is_noop() {
        let log = Log::default();
        let (a, b) = (recorder("A", &log), recorder("B", &log));

        let mut subject: Subject<()> = Subject::new();
        subject.register(a.clone()).unwrap();
        assert!(!subject.remove(&b));
        assert_eq!(subject.names().collect::<Vec<_>>(), vec!["A"]);
    }

    #[test]
    fn test_duplicate_policies() {
        let log = Log::default();
        let a = recorder("A", &log);

        let mut ignore: Subject<()> = Subject::new();
        ignore.register(a.clone()).unwrap();
        ignore.register(a.clone()).unwrap();
        assert_eq!(ignore.len(), 1);

        let mut reject: Subject<()> =
            Subject::with_config(SubjectConfig::default().with_duplicate_policy(DuplicatePolicy::Reject));
        reject.register(a.clone()).unwrap();
        let err = reject.register(a.clone()).unwrap_err();
        assert!(matches!(err, ObserverError::Duplicate { ref observer } if observer == "A"));

        let mut allow: Subject<()> =
            Subject::with_config(SubjectConfig::default().with_duplicate_policy(DuplicatePolicy::Allow));
        allow.register(a.clone()).unwrap();
        allow.register(a.clone()).unwrap();
        allow.notify_all(&()).unwrap();
        assert_eq!(*log.borrow(), vec!["A", "A"]);

        // Only the first registration goes away
        assert!(allow.remove(&a));
        assert_eq!(allow.len(), 1);
    }

    #[test]
    fn test_fail_fast_stops_at_first_failure() {
        let log = Log::default();
        let a = recorder("A", &log);
        let broken = Rc::new(RefCell::new(Failing));
        let c = recorder("C", &log);

        let mut subject: Subject<()> = Subject::new();
        subject.register(a.clone()).unwrap();
        subject.register(broken.clone()).unwrap();
        subject.register(c.clone()).unwrap();

        let err = subject.notify_all(&()).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.first().map(|f| f.observer()), Some("failing"));
        assert_eq!(*log.borrow(), vec!["A"]);
    }

    #[test]
    fn test_best_effort_notifies_everyone() {
        let log = Log::default();
        let a = recorder("A", &log);
        let broken = Rc::new(RefCell::new(Failing));
        let c = recorder("C", &log);

        let mut subject: Subject<()> = Subject::with_config(SubjectConfig::best_effort());
        subject.register(a.clone()).unwrap();
        subject.register(broken.clone()).unwrap();
        subject.register(c.clone()).unwrap();

        let err = subject.notify_all(&()).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(*log.borrow(), vec!["A", "C"]);
    }

    #[test]
    fn test_dropped_observer_is_skipped_and_pruned() {
        let log = Log::default();
        let a = recorder("A", &log);
        let b = recorder("B", &log);

        let mut subject: Subject<()> = Subject::new();
        subject.register(a.clone()).unwrap();
        subject.register(b.clone()).unwrap();
        drop(a);

        subject.notify_all(&()).unwrap();
        assert_eq!(*log.borrow(), vec!["B"]);
        assert_eq!(subject.len(), 1);

        subject.prune();
        assert_eq!(subject.names().collect::<Vec<_>>(), vec!["B"]);
    }

    #[test]
    fn test_clear_and_config() {
        let log = Log::default();
        let a = recorder("A", &log);

        let mut subject: Subject<()> = Subject::with_config(SubjectConfig::best_effort());
        assert_eq!(subject.config().notify_policy, NotifyPolicy::BestEffort);

        subject.register(a.clone()).unwrap();
        subject.clear();
        subject.notify_all(&()).unwrap();

        assert!(subject.is_empty());
        assert!(!subject.contains(&a));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_closure_observer() {
        let hits = Rc::new(RefCell::new(0));
        let counter = {
            let hits = hits.clone();
            Rc::new(RefCell::new(move |_: &()| -> Result<(), UpdateError> {
                *hits.borrow_mut() += 1;
                Ok(())
            }))
        };

        let mut subject: Subject<()> = Subject::new();
        subject.register(counter.clone()).unwrap();
        subject.notify_all(&()).unwrap();
        subject.notify_all(&()).unwrap();
        assert_eq!(*hits.borrow(), 2);
    }

    // Re-broadcasts from inside its own update; the nested broadcast finds
    // this observer mid-update.
    struct Echo {
        subject: Rc<RefCell<Subject<()>>>,
        nested: Option<String>,
    }

    impl Observer<()> for Echo {
        fn update(&mut self, _: &()) -> Result<(), UpdateError> {
            if let Err(err) = self.subject.borrow().notify_all(&()) {
                self.nested = err.first().map(|f| f.to_string());
            }
            Ok(())
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[test]
    fn test_reentrant_broadcast_reports_busy() {
        let subject = Rc::new(RefCell::new(Subject::new()));
        let echo = Rc::new(RefCell::new(Echo {
            subject: subject.clone(),
            nested: None,
        }));
        subject.borrow_mut().register(echo.clone()).unwrap();

        subject.borrow().notify_all(&()).unwrap();
        assert_eq!(
            echo.borrow().nested.as_deref(),
            Some("observer 'echo' is already being updated")
        );

        // Break the cycle
        echo.borrow_mut().subject = Rc::new(RefCell::new(Subject::new()));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Register(usize),
        Remove(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..4usize).prop_map(Op::Register),
            (0..4usize).prop_map(Op::Remove),
        ]
    }

    const LABELS: [&str; 4] = ["A", "B", "C", "D"];

    proptest! {
        #[test]
        fn test_notify_matches_registration_model(
            ops in prop::collection::vec(op_strategy(), 0..40),
            allow_duplicates in any::<bool>(),
        ) {
            let log = Log::default();
            let observers: Vec<_> = LABELS.iter().map(|&l| recorder(l, &log)).collect();
            let policy = if allow_duplicates { DuplicatePolicy::Allow } else { DuplicatePolicy::Ignore };
            let mut subject: Subject<()> =
                Subject::with_config(SubjectConfig::default().with_duplicate_policy(policy));
            let mut model: Vec<usize> = Vec::new();

            for op in &ops {
                match *op {
                    Op::Register(i) => {
                        subject.register(observers[i].clone()).unwrap();
                        if allow_duplicates || !model.contains(&i) {
                            model.push(i);
                        }
                    }
                    Op::Remove(i) => {
                        let removed = subject.remove(&observers[i]);
                        let expected = model.iter().position(|&m| m == i);
                        prop_assert_eq!(removed, expected.is_some());
                        if let Some(pos) = expected {
                            model.remove(pos);
                        }
                    }
                }
            }

            subject.notify_all(&()).unwrap();
            let expected: Vec<&str> = model.iter().map(|&i| LABELS[i]).collect();
            prop_assert_eq!(&*log.borrow(), &expected);
        }
    }
}
