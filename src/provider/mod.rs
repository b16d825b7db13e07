//! Data provider capability and resource handles.
//!
//! A provider answers point-in-time queries with closeable handles. The
//! loader only manages handle lifetimes; it never reads their contents.

mod memory;

pub use memory::{MemoryProvider, RowSet};

use std::sync::Arc;

use crate::error::ProviderFault;
use crate::query::Query;

/// An opaque, closeable query result.
///
/// `close` is not required to be idempotent. The loader closes every handle it
/// owns exactly once and never touches a handle it has handed over.
pub trait ResourceHandle: Send + Sync + 'static {
    fn close(&self);
}

/// Executes queries.
///
/// Handles are returned as `Arc`s; returning the same `Arc` twice means "the
/// same handle", and the loader will not retire it while it is still current.
pub trait DataProvider: Send + Sync {
    type Handle: ResourceHandle;

    /// Run the query. `Ok(None)` means the provider had nothing usable.
    fn execute(&self, query: &Query) -> Result<Option<Arc<Self::Handle>>, ProviderFault>;
}

impl<P: DataProvider + ?Sized> DataProvider for Arc<P> {
    type Handle = P::Handle;

    fn execute(&self, query: &Query) -> Result<Option<Arc<Self::Handle>>, ProviderFault> {
        (**self).execute(query)
    }
}
