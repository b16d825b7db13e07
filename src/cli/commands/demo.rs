//! Demo command: a live query over an in-memory artists table.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};

use crate::config::LoaderConfig;
use crate::loader::{Loader, LoaderStream, Overflow, Ownership};
use crate::notify::ChangeRegistry;
use crate::provider::{MemoryProvider, ResourceHandle, RowSet};
use crate::query::Query;

const ARTISTS: [(&str, &str); 4] = [
    ("1", "Darkspace"),
    ("2", "Paysage d'Hiver"),
    ("3", "KMFDM"),
    ("4", "Mechina"),
];

const EMISSION_TIMEOUT: Duration = Duration::from_secs(5);

/// Options for one demo run.
#[derive(Debug, Clone)]
pub struct DemoOptions {
    pub updates: usize,
    pub overflow: Overflow,
    pub ownership: Ownership,
}

/// Run the demo, writing every emission to `out`.
///
/// Subscribes to `artists` ordered by name, then inserts `updates` rows one
/// at a time and prints the emission each insert causes.
pub async fn run_demo(
    config: &LoaderConfig,
    options: &DemoOptions,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let registry = Arc::new(ChangeRegistry::new());
    let provider = Arc::new(MemoryProvider::new().with_notifier(Arc::clone(&registry)));
    provider.create_table("artists", ["_id", "name"]);
    for (id, name) in ARTISTS {
        provider.insert_row("artists", [id, name])?;
    }

    let loader = Loader::builder()
        .provider(Arc::clone(&provider))
        .notifier(Arc::clone(&registry))
        .config(config.clone())
        .build()?;

    let query = Query::builder()
        .source("artists")
        .columns(["_id", "name"])
        .order("name")
        .build()?;
    writeln!(out, "{query}")?;

    let mut stream = loader.stream(query, options.ownership, options.overflow);
    print_emission(&mut stream, 0, options.ownership, out).await?;

    for i in 0..options.updates {
        let id = (ARTISTS.len() + i + 1).to_string();
        let name = format!("Guest artist {}", i + 1);
        provider.insert_row("artists", [id.as_str(), name.as_str()])?;
        print_emission(&mut stream, i + 1, options.ownership, out).await?;
    }

    stream.cancel();
    let stats = stream.stats();
    writeln!(
        out,
        "cancelled after {} loads ({} delivered, {} retired, {} discarded)",
        stats.loads, stats.delivered, stats.retired, stats.discarded
    )?;
    Ok(())
}

async fn print_emission(
    stream: &mut LoaderStream<RowSet>,
    index: usize,
    ownership: Ownership,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let next = tokio::time::timeout(EMISSION_TIMEOUT, stream.recv())
        .await
        .context("timed out waiting for the live query")?;

    let rows = match next {
        Some(result) => result.context("live query failed")?,
        None => bail!("live query closed unexpectedly"),
    };

    writeln!(out, "emission {index}: {} rows", rows.len())?;
    for row in 0..rows.len() {
        let id = rows.value(row, "_id").unwrap_or("?");
        let name = rows.value(row, "name").unwrap_or("?");
        writeln!(out, "  {id:>3}  {name}")?;
    }

    if ownership == Ownership::Consumer {
        rows.close();
    }
    Ok(())
}
