//! Single-shot loads.

use std::sync::Arc;

use super::engine::Engine;
use super::stream::Next;
use crate::error::{LoaderError, LoaderResult};
use crate::provider::ResourceHandle;
use crate::query::Query;

/// One load, no change tracking.
///
/// The handle belongs to the caller once [`wait`](SingleLoad::wait) returns
/// it. Dropping or cancelling before then releases whatever was loaded.
pub struct SingleLoad<H: ResourceHandle> {
    engine: Arc<Engine<H>>,
}

impl<H: ResourceHandle> SingleLoad<H> {
    pub(crate) fn new(engine: Arc<Engine<H>>) -> Self {
        Self { engine }
    }

    /// Wait for the result.
    pub async fn wait(self) -> LoaderResult<Arc<H>> {
        loop {
            match self.engine.take_next() {
                Next::Handle(handle) => return Ok(handle),
                Next::Failed(error) => return Err(error),
                Next::Closed => return Err(LoaderError::Cancelled),
                Next::Pending => self.engine.ready().await,
            }
        }
    }

    /// Take the result if it is already there.
    pub fn try_take(&mut self) -> Next<H> {
        self.engine.take_next()
    }

    pub fn query(&self) -> &Query {
        self.engine.query()
    }

    /// Abandon the load. A result that arrives later is closed.
    pub fn cancel(self) {
        drop(self);
    }
}

impl<H: ResourceHandle> Drop for SingleLoad<H> {
    fn drop(&mut self) {
        self.engine.stop();
    }
}
