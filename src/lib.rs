//! Live queries over pull-based, change-notifying data providers.
//!
//! A [`Loader`] turns a [`DataProvider`] plus a [`NotificationProvider`] into a
//! [`LoaderStream`] that yields a fresh handle every time the queried source
//! changes, or into a [`SingleLoad`] that yields exactly one.

pub mod cli;
pub mod config;
pub mod error;
pub mod loader;
pub mod logging;
pub mod notify;
pub mod provider;
pub mod query;
pub mod scheduler;

pub use config::Settings;
pub use error::{LoaderError, LoaderResult, ProviderFault};
pub use loader::{
    Loader, LoaderBuilder, LoaderStream, Next, Overflow, Ownership, SingleLoad, SubscriptionStats,
};
pub use notify::{ChangeCallback, ChangeRegistry, NotificationProvider, RegistrationToken};
pub use provider::{DataProvider, MemoryProvider, ResourceHandle, RowSet};
pub use query::{Query, QueryBuilder, Source};
pub use scheduler::{Inline, Scheduler, TokioBlocking, WorkerThread};
