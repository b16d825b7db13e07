//! Five-field ordered wire form of a [`Query`].

use serde::{Deserialize, Serialize};

use super::{Query, Source};
use crate::error::LoaderError;

/// `(source, columns, filter, filter_args, order)`, each nullable.
///
/// The source is nullable on the wire only so that a missing one decodes into
/// [`LoaderError::MissingSource`] instead of a generic format error.
#[derive(Debug, Serialize, Deserialize)]
pub(super) struct QueryWire(
    Option<Source>,
    Option<Vec<String>>,
    Option<String>,
    Option<Vec<String>>,
    Option<String>,
);

impl From<Query> for QueryWire {
    fn from(q: Query) -> Self {
        QueryWire(
            Some(q.source),
            q.columns,
            q.filter,
            q.filter_args,
            q.order,
        )
    }
}

impl TryFrom<QueryWire> for Query {
    type Error = LoaderError;

    fn try_from(wire: QueryWire) -> Result<Self, Self::Error> {
        let QueryWire(source, columns, filter, filter_args, order) = wire;
        Ok(Query {
            source: source.ok_or(LoaderError::MissingSource)?,
            columns,
            filter,
            filter_args,
            order,
        })
    }
}
