//! Change notification capability.
//!
//! Observers register a callback for a [`Source`] and receive a token to
//! unregister it later. A callback means "content might have changed"; it is
//! not an exact change count and may fire on any thread.

mod registry;

pub use registry::ChangeRegistry;

use std::fmt;
use std::sync::Arc;

use crate::query::Source;

/// Callback fired when data behind a source may have changed.
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// Identifies one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationToken(u64);

impl RegistrationToken {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RegistrationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Register and unregister change callbacks.
///
/// `register` may invoke the callback before it returns.
pub trait NotificationProvider: Send + Sync {
    fn register(&self, source: &Source, on_change: ChangeCallback) -> RegistrationToken;

    /// Remove a registration. Unknown tokens are ignored.
    fn unregister(&self, token: RegistrationToken);
}

impl<N: NotificationProvider + ?Sized> NotificationProvider for Arc<N> {
    fn register(&self, source: &Source, on_change: ChangeCallback) -> RegistrationToken {
        (**self).register(source, on_change)
    }

    fn unregister(&self, token: RegistrationToken) {
        (**self).unregister(token)
    }
}
