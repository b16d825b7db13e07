//! Immutable query descriptions.
//!
//! A [`Query`] is passed to the provider verbatim: the loader never looks
//! inside `columns`, `filter`, `filter_args` or `order`. Build one with
//! [`QueryBuilder`]; the only required part is the [`Source`].
//!
//! ```
//! use livequery::Query;
//!
//! let query = Query::builder()
//!     .source("artists")
//!     .columns(["_id", "name"])
//!     .order("name")
//!     .build()
//!     .unwrap();
//! assert_eq!(query.source().as_str(), "artists");
//! ```

mod builder;
mod source;
mod wire;

pub use builder::QueryBuilder;
pub use source::Source;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LoaderResult;
use wire::QueryWire;

/// What to fetch from a data provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "QueryWire", into = "QueryWire")]
pub struct Query {
    source: Source,
    columns: Option<Vec<String>>,
    filter: Option<String>,
    filter_args: Option<Vec<String>>,
    order: Option<String>,
}

impl Query {
    /// Start building a query.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Requested columns; `None` means the provider's default set.
    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Positional substitutions for `?` placeholders in the filter.
    pub fn filter_args(&self) -> Option<&[String]> {
        self.filter_args.as_deref()
    }

    pub fn order(&self) -> Option<&str> {
        self.order.as_deref()
    }

    /// Encode into the five-field wire form.
    pub fn encode(&self) -> LoaderResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a query previously produced by [`Query::encode`].
    ///
    /// Fails with [`LoaderError::MissingSource`](crate::LoaderError::MissingSource)
    /// when the encoded source is null.
    pub fn decode(bytes: &[u8]) -> LoaderResult<Self> {
        let wire: QueryWire = serde_json::from_slice(bytes)?;
        Query::try_from(wire)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Query{{source={}", self.source)?;
        write!(f, ", columns={}", DisplayList(self.columns.as_deref()))?;
        write!(f, ", filter={}", DisplayText(self.filter.as_deref()))?;
        write!(f, ", filter_args={}", DisplayList(self.filter_args.as_deref()))?;
        write!(f, ", order={}}}", DisplayText(self.order.as_deref()))
    }
}

struct DisplayList<'a>(Option<&'a [String]>);

impl fmt::Display for DisplayList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            None => f.write_str("null"),
            Some(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

struct DisplayText<'a>(Option<&'a str>);

impl fmt::Display for DisplayText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            None => f.write_str("null"),
            Some(text) => write!(f, "'{text}'"),
        }
    }
}
