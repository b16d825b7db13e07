//! Validating builder for [`Query`].

use super::{Query, Source};
use crate::error::{LoaderError, LoaderResult};

/// Builder for [`Query`].
///
/// Setters copy their input and overwrite any earlier value. The builder can
/// be reused after [`build`](QueryBuilder::build): every built query is an
/// independent snapshot.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    source: Option<Source>,
    columns: Option<Vec<String>>,
    filter: Option<String>,
    filter_args: Option<Vec<String>>,
    order: Option<String>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source locator. Required.
    pub fn source(&mut self, source: impl Into<Source>) -> &mut Self {
        self.source = Some(source.into());
        self
    }

    /// Set the projection.
    pub fn columns<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Set the provider-interpreted filter template.
    pub fn filter(&mut self, filter: impl Into<String>) -> &mut Self {
        self.filter = Some(filter.into());
        self
    }

    /// Set positional arguments for the filter template.
    pub fn filter_args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter_args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// Set the provider-interpreted ordering.
    pub fn order(&mut self, order: impl Into<String>) -> &mut Self {
        self.order = Some(order.into());
        self
    }

    /// Build the query.
    ///
    /// Fails with [`LoaderError::MissingSource`] if no source was set.
    pub fn build(&self) -> LoaderResult<Query> {
        let source = self.source.clone().ok_or(LoaderError::MissingSource)?;
        Ok(Query {
            source,
            columns: self.columns.clone(),
            filter: self.filter.clone(),
            filter_args: self.filter_args.clone(),
            order: self.order.clone(),
        })
    }
}
