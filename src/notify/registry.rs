//! In-process change registry.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use super::{ChangeCallback, NotificationProvider, RegistrationToken};
use crate::query::Source;

struct Registration {
    source: Source,
    callback: ChangeCallback,
}

/// A [`NotificationProvider`] that dispatches on the thread calling
/// [`notify_change`](ChangeRegistry::notify_change).
///
/// Registrations cover their source and its descendants.
pub struct ChangeRegistry {
    registrations: DashMap<RegistrationToken, Registration>,
    next_id: AtomicU64,
}

impl ChangeRegistry {
    pub fn new() -> Self {
        Self {
            registrations: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Announce that data behind `source` may have changed.
    ///
    /// Returns the number of callbacks invoked. Callbacks run after every map
    /// guard is released, so they may register or unregister freely.
    pub fn notify_change(&self, source: &Source) -> usize {
        let callbacks: Vec<ChangeCallback> = self
            .registrations
            .iter()
            .filter(|entry| entry.value().source.covers(source))
            .map(|entry| entry.value().callback.clone())
            .collect();

        crate::debug_event!("registry", "notify", "{source} -> {} observers", callbacks.len());

        for callback in &callbacks {
            callback();
        }
        callbacks.len()
    }

    /// Number of live registrations.
    pub fn registration_count(&self) -> usize {
        self.registrations.len()
    }
}

impl Default for ChangeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationProvider for ChangeRegistry {
    fn register(&self, source: &Source, on_change: ChangeCallback) -> RegistrationToken {
        let token = RegistrationToken::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.registrations.insert(
            token,
            Registration {
                source: source.clone(),
                callback: on_change,
            },
        );
        crate::debug_event!("registry", "registered", "{token} on {source}");
        token
    }

    fn unregister(&self, token: RegistrationToken) {
        if self.registrations.remove(&token).is_some() {
            crate::debug_event!("registry", "unregistered", "{token}");
        }
    }
}
