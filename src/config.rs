//! Broadcast and registration policies, loadable from TOML.

use serde::Deserialize;

/// What a broadcast does when an observer fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotifyPolicy {
    /// Stop at the first failing observer and report it.
    #[default]
    FailFast,
    /// Keep notifying the remaining observers, report every failure.
    BestEffort,
}

/// What `register` does with an observer that is already registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Register again; the observer is then notified once per registration.
    Allow,
    /// Keep the existing registration and do nothing.
    #[default]
    Ignore,
    /// Refuse with `ObserverError::Duplicate`.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SubjectConfig {
    pub notify_policy: NotifyPolicy,
    pub duplicate_policy: DuplicatePolicy,
}

impl SubjectConfig {
    pub fn best_effort() -> Self {
        SubjectConfig {
            notify_policy: NotifyPolicy::BestEffort,
            ..Default::default()
        }
    }

    pub fn with_notify_policy(mut self, policy: NotifyPolicy) -> Self {
        self.notify_policy = policy;
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }
}
