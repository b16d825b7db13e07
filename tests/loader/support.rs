//! Shared fixtures for loader tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use livequery::config::LoaderConfig;
use livequery::scheduler::Job;
use livequery::{
    ChangeRegistry, DataProvider, Loader, LoaderStream, MemoryProvider, ProviderFault, Query,
    RowSet, Scheduler, WorkerThread,
};
use parking_lot::{Condvar, Mutex};

pub const TIMEOUT: Duration = Duration::from_secs(5);

pub const ARTISTS: [(&str, &str); 4] = [
    ("1", "Darkspace"),
    ("2", "Paysage d'Hiver"),
    ("3", "KMFDM"),
    ("4", "Mechina"),
];

/// An artists table whose writes are announced on the returned registry.
pub fn artists() -> (Arc<ChangeRegistry>, Arc<MemoryProvider>) {
    let registry = Arc::new(ChangeRegistry::new());
    let provider = Arc::new(MemoryProvider::new().with_notifier(Arc::clone(&registry)));
    provider.create_table("artists", ["_id", "name"]);
    for (id, name) in ARTISTS {
        provider.insert_row("artists", [id, name]).unwrap();
    }
    (registry, provider)
}

pub fn artists_query() -> Query {
    Query::builder()
        .source("artists")
        .columns(["_id", "name"])
        .order("name")
        .build()
        .unwrap()
}

pub fn loader<P>(
    provider: P,
    registry: &Arc<ChangeRegistry>,
    scheduler: impl Scheduler + 'static,
    config: LoaderConfig,
) -> Loader<RowSet>
where
    P: DataProvider<Handle = RowSet> + 'static,
{
    Loader::builder()
        .provider(provider)
        .notifier(Arc::clone(registry))
        .scheduler(scheduler)
        .config(config)
        .build()
        .unwrap()
}

pub fn capacity(capacity: usize) -> LoaderConfig {
    LoaderConfig {
        capacity,
        ..LoaderConfig::default()
    }
}

/// Announce a change to the artists table.
pub fn touch(registry: &ChangeRegistry) -> usize {
    registry.notify_change(&"artists".into())
}

pub fn names(rows: &RowSet) -> Vec<String> {
    (0..rows.len())
        .filter_map(|i| rows.value(i, "name").map(str::to_string))
        .collect()
}

/// Wait until every job queued on `worker` so far has run.
pub fn flush(worker: &WorkerThread) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    let job: Job = Box::new(move || {
        let _ = tx.send(());
    });
    worker.schedule(job);
    rx.recv_timeout(TIMEOUT).expect("worker did not drain");
}

pub async fn recv_handle(stream: &mut LoaderStream<RowSet>) -> Arc<RowSet> {
    tokio::time::timeout(TIMEOUT, stream.recv())
        .await
        .expect("timed out waiting for an emission")
        .expect("stream closed")
        .expect("stream failed")
}

/// Poll `condition` until it holds or the timeout passes.
pub fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

/// Runs every job on a fresh thread, so jobs overlap freely.
pub struct ThreadPerJob;

impl Scheduler for ThreadPerJob {
    fn schedule(&self, job: Job) {
        thread::spawn(job);
    }
}

/// Wraps a [`MemoryProvider`] with a gate, an optional delay and a record of
/// every handle it returned.
pub struct TestProvider {
    inner: Arc<MemoryProvider>,
    open: Mutex<bool>,
    gate: Condvar,
    delay: Duration,
    started: AtomicUsize,
    running: AtomicUsize,
    max_running: AtomicUsize,
    returned: Mutex<Vec<Arc<RowSet>>>,
}

impl TestProvider {
    pub fn new(inner: Arc<MemoryProvider>) -> Arc<Self> {
        Self::with_delay(inner, Duration::ZERO)
    }

    pub fn with_delay(inner: Arc<MemoryProvider>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner,
            open: Mutex::new(true),
            gate: Condvar::new(),
            delay,
            started: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            max_running: AtomicUsize::new(0),
            returned: Mutex::new(Vec::new()),
        })
    }

    pub fn close_gate(&self) {
        *self.open.lock() = false;
    }

    pub fn open_gate(&self) {
        *self.open.lock() = true;
        self.gate.notify_all();
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    pub fn max_running(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }

    /// Handles in execution order.
    pub fn returned(&self) -> Vec<Arc<RowSet>> {
        self.returned.lock().clone()
    }

    pub fn wait_started(&self, count: usize) {
        assert!(
            eventually(|| self.started() >= count),
            "provider never reached {count} executions"
        );
    }

    /// Wait until nothing has started or run for `quiet`.
    pub fn wait_idle(&self, quiet: Duration) {
        let deadline = Instant::now() + TIMEOUT;
        let mut seen = self.started();
        let mut since = Instant::now();
        while Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
            let now = self.started();
            if now != seen || self.running() > 0 {
                seen = now;
                since = Instant::now();
            } else if since.elapsed() >= quiet {
                return;
            }
        }
        panic!("provider never went idle");
    }
}

impl DataProvider for TestProvider {
    type Handle = RowSet;

    fn execute(&self, query: &Query) -> Result<Option<Arc<RowSet>>, ProviderFault> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(running, Ordering::SeqCst);

        {
            let mut open = self.open.lock();
            while !*open {
                self.gate.wait(&mut open);
            }
        }
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }

        let result = self.inner.execute(query);
        if let Ok(Some(handle)) = &result {
            self.returned.lock().push(Arc::clone(handle));
        }
        self.running.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
