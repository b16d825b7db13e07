//! In-memory table provider.
//!
//! Tables are keyed by [`Source`] and hold rows of strings. Queries support a
//! deliberately small dialect:
//!
//! - `columns`: projection by column name
//! - `filter`: `col = ?` clauses joined by `AND`, bound to `filter_args`
//! - `order`: `col`, `col ASC` or `col DESC`
//!
//! Mutations notify an attached [`ChangeRegistry`], the same way a content
//! store announces its own writes.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use parking_lot::RwLock;

use super::{DataProvider, ResourceHandle};
use crate::error::ProviderFault;
use crate::notify::ChangeRegistry;
use crate::query::{Query, Source};

static NEXT_ROWSET_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone)]
struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// A [`DataProvider`] over in-memory string tables.
pub struct MemoryProvider {
    tables: RwLock<HashMap<Source, Table>>,
    available: AtomicBool,
    executions: AtomicUsize,
    notifier: Option<Arc<ChangeRegistry>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
            executions: AtomicUsize::new(0),
            notifier: None,
        }
    }

    /// Announce every mutation on the given registry.
    pub fn with_notifier(mut self, notifier: Arc<ChangeRegistry>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Create (or reset) a table.
    pub fn create_table<I, S>(&self, source: impl Into<Source>, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let source = source.into();
        let table = Table {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        };
        self.tables.write().insert(source.clone(), table);
        self.announce(&source);
    }

    /// Append a row. The row must have one value per column.
    pub fn insert_row<I, S>(&self, source: impl Into<Source>, row: I) -> Result<(), ProviderFault>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let source = source.into();
        let row: Vec<String> = row.into_iter().map(Into::into).collect();
        {
            let mut tables = self.tables.write();
            let table = tables.get_mut(&source).ok_or_else(|| no_table(&source))?;
            check_width(table, &row)?;
            table.rows.push(row);
        }
        self.announce(&source);
        Ok(())
    }

    /// Replace every row of a table.
    pub fn replace_rows<R, I, S>(&self, source: impl Into<Source>, rows: R) -> Result<(), ProviderFault>
    where
        R: IntoIterator<Item = I>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let source = source.into();
        let rows: Vec<Vec<String>> = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        {
            let mut tables = self.tables.write();
            let table = tables.get_mut(&source).ok_or_else(|| no_table(&source))?;
            for row in &rows {
                check_width(table, row)?;
            }
            table.rows = rows;
        }
        self.announce(&source);
        Ok(())
    }

    /// Simulate the backing store going away (or coming back).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of queries executed so far.
    pub fn execution_count(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    fn announce(&self, source: &Source) {
        if let Some(notifier) = &self.notifier {
            let notified = notifier.notify_change(source);
            crate::debug_event!("memory", "changed", "{source} ({notified} observers)");
        }
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DataProvider for MemoryProvider {
    type Handle = RowSet;

    fn execute(&self, query: &Query) -> Result<Option<Arc<RowSet>>, ProviderFault> {
        self.executions.fetch_add(1, Ordering::SeqCst);

        if !self.available.load(Ordering::SeqCst) {
            return Err(ProviderFault::Unavailable {
                reason: format!("store for '{}' is offline", query.source()),
            });
        }

        let tables = self.tables.read();
        let Some(table) = tables.get(query.source()) else {
            return Ok(None);
        };

        let projection = match query.columns() {
            Some(names) => names
                .iter()
                .map(|name| column_index(table, name))
                .collect::<Result<Vec<_>, _>>()?,
            None => (0..table.columns.len()).collect(),
        };
        let predicates = parse_filter(table, query.filter(), query.filter_args())?;
        let ordering = parse_order(table, query.order())?;

        let mut rows: Vec<&Vec<String>> = table
            .rows
            .iter()
            .filter(|row| predicates.iter().all(|(col, value)| &row[*col] == value))
            .collect();

        if let Some((col, descending)) = ordering {
            rows.sort_by(|a, b| {
                let ord = a[col].cmp(&b[col]);
                if descending { ord.reverse() } else { ord }
            });
        }

        let columns = projection.iter().map(|&i| table.columns[i].clone()).collect();
        let rows = rows
            .into_iter()
            .map(|row| projection.iter().map(|&i| row[i].clone()).collect())
            .collect();

        Ok(Some(Arc::new(RowSet::new(columns, rows))))
    }
}

fn no_table(source: &Source) -> ProviderFault {
    ProviderFault::MalformedQuery {
        reason: format!("no table '{source}'"),
    }
}

fn check_width(table: &Table, row: &[String]) -> Result<(), ProviderFault> {
    if row.len() != table.columns.len() {
        return Err(ProviderFault::MalformedQuery {
            reason: format!(
                "row has {} values, table has {} columns",
                row.len(),
                table.columns.len()
            ),
        });
    }
    Ok(())
}

fn column_index(table: &Table, name: &str) -> Result<usize, ProviderFault> {
    table
        .columns
        .iter()
        .position(|c| c == name)
        .ok_or_else(|| ProviderFault::MalformedQuery {
            reason: format!("unknown column '{name}'"),
        })
}

/// Parse `col = ? AND col = ?` into (column index, bound value) pairs.
fn parse_filter(
    table: &Table,
    filter: Option<&str>,
    args: Option<&[String]>,
) -> Result<Vec<(usize, String)>, ProviderFault> {
    let args = args.unwrap_or_default();
    let Some(filter) = filter.map(str::trim).filter(|f| !f.is_empty()) else {
        return Ok(Vec::new());
    };

    let malformed = |reason: String| ProviderFault::MalformedQuery { reason };

    let mut predicates = Vec::new();
    let mut args_iter = args.iter();
    for clause in split_and(filter) {
        let (column, rhs) = clause
            .split_once('=')
            .ok_or_else(|| malformed(format!("unsupported clause '{clause}'")))?;
        if rhs.trim() != "?" {
            return Err(malformed(format!("expected '?' placeholder in '{clause}'")));
        }
        let value = args_iter
            .next()
            .ok_or_else(|| malformed(format!("missing argument for '{clause}'")))?;
        predicates.push((column_index(table, column.trim())?, value.clone()));
    }

    if args_iter.next().is_some() {
        return Err(malformed(format!(
            "{} arguments for {} placeholders",
            args.len(),
            predicates.len()
        )));
    }
    Ok(predicates)
}

fn split_and(filter: &str) -> Vec<&str> {
    let mut clauses = Vec::new();
    let mut rest = filter;
    loop {
        let upper = rest.to_ascii_uppercase();
        match upper.find(" AND ") {
            Some(at) => {
                clauses.push(rest[..at].trim());
                rest = &rest[at + 5..];
            }
            None => {
                clauses.push(rest.trim());
                return clauses;
            }
        }
    }
}

fn parse_order(table: &Table, order: Option<&str>) -> Result<Option<(usize, bool)>, ProviderFault> {
    let Some(order) = order.map(str::trim).filter(|o| !o.is_empty()) else {
        return Ok(None);
    };
    let mut parts = order.split_whitespace();
    let column = parts.next().unwrap_or_default();
    let descending = match parts.next().map(|d| d.to_ascii_uppercase()) {
        None => false,
        Some(d) if d == "ASC" => false,
        Some(d) if d == "DESC" => true,
        Some(other) => {
            return Err(ProviderFault::MalformedQuery {
                reason: format!("unsupported direction '{other}'"),
            });
        }
    };
    if parts.next().is_some() {
        return Err(ProviderFault::MalformedQuery {
            reason: format!("unsupported order '{order}'"),
        });
    }
    Ok(Some((column_index(table, column)?, descending)))
}

/// Result handle produced by [`MemoryProvider`].
///
/// A snapshot of the matching rows. Closing is counted rather than enforced so
/// that a double close is observable.
#[derive(Debug)]
pub struct RowSet {
    id: u64,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
    closes: AtomicUsize,
}

impl RowSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            id: NEXT_ROWSET_ID.fetch_add(1, Ordering::Relaxed),
            columns,
            rows,
            closes: AtomicUsize::new(0),
        }
    }

    /// Process-unique id, useful in logs.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Value of `column` in row `index`.
    pub fn value(&self, index: usize, column: &str) -> Option<&str> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.get(index).map(|row| row[col].as_str())
    }

    pub fn is_closed(&self) -> bool {
        self.close_count() > 0
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl ResourceHandle for RowSet {
    fn close(&self) {
        let previous = self.closes.fetch_add(1, Ordering::SeqCst);
        if previous > 0 {
            tracing::error!("[rowset] #{} closed {} times", self.id, previous + 1);
        } else {
            crate::debug_event!("rowset", "closed", "#{}", self.id);
        }
    }
}
