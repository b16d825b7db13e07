//! Continuous live-query streams.

use std::sync::Arc;

use super::engine::{Engine, SubscriptionStats};
use super::policy::Ownership;
use crate::error::{LoaderError, LoaderResult};
use crate::provider::ResourceHandle;
use crate::query::Query;

/// Result of a non-blocking poll on a stream.
#[derive(Debug)]
pub enum Next<H> {
    /// A freshly loaded handle.
    Handle(Arc<H>),
    /// The stream failed; nothing follows.
    Failed(LoaderError),
    /// Nothing yet; more may come.
    Pending,
    /// The stream is over.
    Closed,
}

impl<H> Next<H> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Next::Pending)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Next::Closed)
    }

    /// The handle, if this is one.
    pub fn handle(self) -> Option<Arc<H>> {
        match self {
            Next::Handle(handle) => Some(handle),
            _ => None,
        }
    }
}

/// A live query: yields a new handle every time the underlying data changes.
///
/// Never completes on its own. It ends on cancellation, or after a terminal
/// error. Dropping the stream cancels it.
pub struct LoaderStream<H: ResourceHandle> {
    engine: Arc<Engine<H>>,
}

impl<H: ResourceHandle> LoaderStream<H> {
    pub(crate) fn new(engine: Arc<Engine<H>>) -> Self {
        Self { engine }
    }

    /// Wait for the next handle.
    ///
    /// Returns `None` once the stream is cancelled or has delivered its
    /// terminal error.
    pub async fn recv(&mut self) -> Option<LoaderResult<Arc<H>>> {
        loop {
            match self.engine.take_next() {
                Next::Handle(handle) => return Some(Ok(handle)),
                Next::Failed(error) => return Some(Err(error)),
                Next::Closed => return None,
                Next::Pending => self.engine.ready().await,
            }
        }
    }

    /// Take the next item without waiting.
    pub fn try_next(&mut self) -> Next<H> {
        self.engine.take_next()
    }

    /// Ask for a reload now, as if the source had changed.
    pub fn refresh(&self) {
        self.engine.request_reload();
    }

    /// Stop reloading and release every handle the engine owns.
    ///
    /// No handle is delivered after this returns.
    pub fn cancel(&mut self) {
        self.engine.stop();
    }

    pub fn query(&self) -> &Query {
        self.engine.query()
    }

    pub fn ownership(&self) -> Ownership {
        self.engine.ownership()
    }

    pub fn stats(&self) -> SubscriptionStats {
        self.engine.stats()
    }
}

impl<H: ResourceHandle> Drop for LoaderStream<H> {
    fn drop(&mut self) {
        self.engine.stop();
    }
}
