//! Live query loader.
//!
//! Bridges a pull-based [`DataProvider`] and a [`NotificationProvider`] into
//! push-based streams of result handles.
//!
//! # Architecture
//!
//! ```text
//! Loader (provider + notifier + scheduler + config)
//!   |
//!   +-- stream()    -> LoaderStream  continuous, overflow policy
//!   +-- unbounded() -> LoaderStream  continuous, every reload queued
//!   +-- single()    -> SingleLoad    one load, no registration
//!         |
//!       Engine (one per subscription)
//!         - one change registration
//!         - serialized reloads on the scheduler
//!         - current / stale handle retirement
//! ```

mod engine;
mod policy;
mod single;
mod stream;

pub use engine::SubscriptionStats;
pub use policy::{Overflow, Ownership};
pub use single::SingleLoad;
pub use stream::{LoaderStream, Next};

use std::sync::Arc;

use engine::{Engine, EngineConfig};
use policy::{Backlog, Mode};

use crate::config::LoaderConfig;
use crate::error::{LoaderError, LoaderResult};
use crate::notify::NotificationProvider;
use crate::provider::{DataProvider, ResourceHandle};
use crate::query::Query;
use crate::scheduler::{Scheduler, WorkerThread};

/// Factory for live query streams over one provider.
pub struct Loader<H: ResourceHandle> {
    provider: Arc<dyn DataProvider<Handle = H>>,
    notifier: Arc<dyn NotificationProvider>,
    scheduler: Arc<dyn Scheduler>,
    config: LoaderConfig,
}

impl<H: ResourceHandle> Loader<H> {
    /// Create a builder for configuring the loader.
    pub fn builder() -> LoaderBuilder<H> {
        LoaderBuilder::new()
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Continuous stream with an explicit overflow policy.
    ///
    /// `capacity` from the loader config bounds the `Error` and `Block`
    /// policies.
    pub fn stream(&self, query: Query, ownership: Ownership, overflow: Overflow) -> LoaderStream<H> {
        let config = EngineConfig {
            ownership,
            backlog: Backlog::new(overflow, self.config.capacity),
            mode: Mode::Continuous,
            log_queries: self.config.log_queries,
        };
        LoaderStream::new(self.launch(query, config))
    }

    /// Continuous stream using the configured ownership and overflow policy.
    pub fn stream_with_defaults(&self, query: Query) -> LoaderStream<H> {
        self.stream(query, self.config.ownership, self.config.overflow)
    }

    /// Continuous stream without backpressure: every reload is queued.
    pub fn unbounded(&self, query: Query, ownership: Ownership) -> LoaderStream<H> {
        let config = EngineConfig {
            ownership,
            backlog: Backlog::Unbounded,
            mode: Mode::Continuous,
            log_queries: self.config.log_queries,
        };
        LoaderStream::new(self.launch(query, config))
    }

    /// Load once. The returned handle is always consumer-owned.
    pub fn single(&self, query: Query) -> SingleLoad<H> {
        let config = EngineConfig {
            ownership: Ownership::Consumer,
            backlog: Backlog::Unbounded,
            mode: Mode::Single,
            log_queries: self.config.log_queries,
        };
        SingleLoad::new(self.launch(query, config))
    }

    fn launch(&self, query: Query, config: EngineConfig) -> Arc<Engine<H>> {
        let engine = Engine::new(
            query,
            Arc::clone(&self.provider),
            Arc::clone(&self.notifier),
            Arc::clone(&self.scheduler),
            config,
        );
        engine.start();
        engine
    }
}

/// Builder for constructing a [`Loader`].
pub struct LoaderBuilder<H: ResourceHandle> {
    provider: Option<Arc<dyn DataProvider<Handle = H>>>,
    notifier: Option<Arc<dyn NotificationProvider>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    config: LoaderConfig,
}

impl<H: ResourceHandle> LoaderBuilder<H> {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            provider: None,
            notifier: None,
            scheduler: None,
            config: LoaderConfig::default(),
        }
    }

    /// Set the data provider. Required.
    pub fn provider(mut self, provider: impl DataProvider<Handle = H> + 'static) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    /// Set the change notification provider. Required.
    pub fn notifier(mut self, notifier: impl NotificationProvider + 'static) -> Self {
        self.notifier = Some(Arc::new(notifier));
        self
    }

    /// Set the execution context for loads.
    ///
    /// Defaults to a dedicated [`WorkerThread`] named after
    /// `config.worker_name`.
    pub fn scheduler(mut self, scheduler: impl Scheduler + 'static) -> Self {
        self.scheduler = Some(Arc::new(scheduler));
        self
    }

    /// Set the loader configuration.
    pub fn config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the Loader.
    pub fn build(self) -> LoaderResult<Loader<H>> {
        let provider = self
            .provider
            .ok_or_else(|| LoaderError::Config("a data provider is required".to_string()))?;

        let notifier = self.notifier.ok_or_else(|| {
            LoaderError::Config("a notification provider is required".to_string())
        })?;

        if self.config.capacity == 0 {
            return Err(LoaderError::Config(
                "loader.capacity must be at least 1".to_string(),
            ));
        }

        let scheduler: Arc<dyn Scheduler> = match self.scheduler {
            Some(scheduler) => scheduler,
            None => Arc::new(WorkerThread::spawn(&self.config.worker_name).map_err(|e| {
                LoaderError::Config(format!("cannot start reload worker: {e}"))
            })?),
        };

        Ok(Loader {
            provider,
            notifier,
            scheduler,
            config: self.config,
        })
    }
}

impl<H: ResourceHandle> Default for LoaderBuilder<H> {
    fn default() -> Self {
        Self::new()
    }
}
