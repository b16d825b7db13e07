//! The reload engine.
//!
//! One engine backs one subscription. It registers for change notifications,
//! runs the query on the scheduler, queues handles for the consumer and
//! retires superseded handles.
//!
//! # Reload serialization
//!
//! Reload requests set `dirty` and schedule a drain job. The drain loop takes
//! the `draining` flag and reloads while `dirty` keeps getting set, so:
//! - at most one reload runs at a time, whatever the scheduler does
//! - requests that arrive during a reload collapse into one follow-up reload
//! - a request raised from inside a reload (same thread) is picked up by the
//!   running loop instead of recursing
//!
//! # Shared state
//!
//! The registration token, the current and stale handles, the pending queue
//! and the phase live behind one mutex. Provider and handle calls are made
//! outside of it.
//!
//! # Blocking overflow
//!
//! A full `Block` backlog never parks the scheduler. The freshly loaded handle
//! is held back, further reloads of this subscription are deferred, and the
//! consumer's next receive makes room and drives the reload loop again.
//! Other subscriptions sharing the scheduler are unaffected.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::policy::{Backlog, Mode, Ownership};
use super::stream::Next;
use crate::error::LoaderError;
use crate::notify::{ChangeCallback, NotificationProvider, RegistrationToken};
use crate::provider::{DataProvider, ResourceHandle};
use crate::query::Query;
use crate::scheduler::Scheduler;

/// Counters for one subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriptionStats {
    /// Query executions, successful or not.
    pub loads: u64,
    /// Handles received by the consumer.
    pub delivered: u64,
    /// Delivered handles closed after being superseded.
    pub retired: u64,
    /// Handles closed without ever reaching the consumer.
    pub discarded: u64,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct EngineConfig {
    pub ownership: Ownership,
    pub backlog: Backlog,
    pub mode: Mode,
    pub log_queries: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Active,
    /// No more loads; queued handles and the terminal error still drain.
    Finished,
    Stopped,
}

struct State<H> {
    phase: Phase,
    token: Option<RegistrationToken>,
    /// Last handle the consumer received.
    current: Option<Arc<H>>,
    stale: Option<Arc<H>>,
    queue: VecDeque<Arc<H>>,
    /// Loaded while a `Block` backlog was full; enters the queue on receive.
    held: Option<Arc<H>>,
    /// A reload was requested while `held` was occupied.
    deferred: bool,
    terminal: Option<LoaderError>,
    /// Handles closed by `stop` or left with the consumer at that point.
    released: Vec<Weak<H>>,
    stats: SubscriptionStats,
}

impl<H> State<H> {
    /// Whether `handle` must not be closed as undelivered: it is reachable by
    /// the consumer, waiting to be, or already settled by teardown.
    fn holds(&self, handle: &Arc<H>) -> bool {
        self.current.as_ref().is_some_and(|c| Arc::ptr_eq(c, handle))
            || self.queue.iter().any(|q| Arc::ptr_eq(q, handle))
            || self.held.as_ref().is_some_and(|h| Arc::ptr_eq(h, handle))
            || self
                .released
                .iter()
                .any(|r| std::ptr::eq(r.as_ptr(), Arc::as_ptr(handle)))
    }
}

pub(crate) struct Engine<H: ResourceHandle> {
    query: Query,
    provider: Arc<dyn DataProvider<Handle = H>>,
    notifier: Arc<dyn NotificationProvider>,
    scheduler: Arc<dyn Scheduler>,
    config: EngineConfig,
    state: Mutex<State<H>>,
    /// Wakes the consumer.
    ready: Notify,
    generation: AtomicU64,
    dirty: AtomicBool,
    draining: AtomicBool,
}

impl<H: ResourceHandle> Engine<H> {
    pub(crate) fn new(
        query: Query,
        provider: Arc<dyn DataProvider<Handle = H>>,
        notifier: Arc<dyn NotificationProvider>,
        scheduler: Arc<dyn Scheduler>,
        config: EngineConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            query,
            provider,
            notifier,
            scheduler,
            config,
            state: Mutex::new(State {
                phase: Phase::Idle,
                token: None,
                current: None,
                stale: None,
                queue: VecDeque::new(),
                held: None,
                deferred: false,
                terminal: None,
                released: Vec::new(),
                stats: SubscriptionStats::default(),
            }),
            ready: Notify::new(),
            generation: AtomicU64::new(0),
            dirty: AtomicBool::new(false),
            draining: AtomicBool::new(false),
        })
    }

    pub(crate) fn query(&self) -> &Query {
        &self.query
    }

    pub(crate) fn ownership(&self) -> Ownership {
        self.config.ownership
    }

    pub(crate) fn stats(&self) -> SubscriptionStats {
        self.state.lock().stats
    }

    /// Register for changes (continuous mode) and schedule the initial load.
    ///
    /// Only the first call does anything.
    pub(crate) fn start(self: &Arc<Self>) {
        {
            let mut state = self.state.lock();
            if state.phase != Phase::Idle {
                return;
            }
            state.phase = Phase::Active;
        }
        crate::debug_event!("engine", "started", "{}", self.query.source());

        if self.config.mode == Mode::Continuous {
            self.register();
        }
        self.request_reload();
    }

    /// Register before the first load so no change between read and observe
    /// is lost. A change in that window costs one redundant reload.
    fn register(self: &Arc<Self>) {
        let generation = self.generation.load(Ordering::SeqCst);
        let weak: Weak<Self> = Arc::downgrade(self);
        let on_change: ChangeCallback = Arc::new(move || {
            if let Some(engine) = weak.upgrade() {
                engine.on_change(generation);
            }
        });

        let token = self.notifier.register(self.query.source(), on_change);

        let orphan = {
            let mut state = self.state.lock();
            if state.phase == Phase::Active {
                state.token = Some(token);
                None
            } else {
                Some(token)
            }
        };
        // Stopped or failed while registering.
        if let Some(token) = orphan {
            self.notifier.unregister(token);
        }
    }

    fn on_change(self: &Arc<Self>, generation: u64) {
        if generation != self.generation.load(Ordering::SeqCst) {
            crate::debug_event!("engine", "late notification ignored", "{}", self.query.source());
            return;
        }
        self.request_reload();
    }

    pub(crate) fn request_reload(self: &Arc<Self>) {
        if self.dirty.swap(true, Ordering::SeqCst) {
            crate::debug_event!("engine", "reload coalesced", "{}", self.query.source());
            return;
        }
        let engine = Arc::clone(self);
        self.scheduler.schedule(Box::new(move || engine.drain()));
    }

    fn drain(&self) {
        loop {
            if self.draining.swap(true, Ordering::SeqCst) {
                return;
            }
            while self.dirty.swap(false, Ordering::SeqCst) {
                self.reload();
            }
            self.draining.store(false, Ordering::SeqCst);
            // A request may have landed between the last swap and the store.
            if !self.dirty.load(Ordering::SeqCst) {
                return;
            }
        }
    }

    fn reload(&self) {
        {
            let mut state = self.state.lock();
            if state.phase != Phase::Active {
                return;
            }
            if state.held.is_some() {
                crate::debug_event!("engine", "reload deferred", "{}", self.query.source());
                state.deferred = true;
                return;
            }
            state.stats.loads += 1;
        }

        if self.config.log_queries {
            crate::log_event!("loader", "query", "{}", self.query);
        } else {
            crate::debug_event!("loader", "query", "{}", self.query);
        }

        match self.provider.execute(&self.query) {
            Ok(Some(handle)) => self.deliver(handle),
            Ok(None) => self.finish(LoaderError::NullResult {
                locator: self.query.source().to_string(),
            }),
            Err(fault) => self.finish(LoaderError::Provider(fault)),
        }
    }

    fn deliver(&self, handle: Arc<H>) {
        let mut discard = Vec::new();
        let mut token = None;
        {
            let mut state = self.state.lock();
            if state.phase != Phase::Active {
                // Stopped while the provider was running.
                discard.push(handle);
            } else if self.config.mode == Mode::Single {
                state.queue.push_back(handle);
                state.phase = Phase::Finished;
            } else {
                match self.config.backlog {
                    Backlog::Unbounded => state.queue.push_back(handle),
                    Backlog::Latest => {
                        discard.extend(state.queue.drain(..));
                        state.queue.push_back(handle);
                    }
                    Backlog::Error(capacity) => {
                        if state.queue.len() >= capacity {
                            discard.push(handle);
                            state.terminal = Some(LoaderError::Overflow { capacity });
                            state.phase = Phase::Finished;
                            token = state.token.take();
                        } else {
                            state.queue.push_back(handle);
                        }
                    }
                    Backlog::Block(capacity) => {
                        if state.queue.len() >= capacity {
                            state.held = Some(handle);
                        } else {
                            state.queue.push_back(handle);
                        }
                    }
                }
            }
            discard.retain(|h| !state.holds(h));
            state.stats.discarded += discard.len() as u64;
        }

        if let Some(token) = token {
            tracing::warn!("[engine] consumer overflow on {}", self.query.source());
            self.notifier.unregister(token);
        }
        self.ready.notify_one();

        for handle in discard {
            crate::debug_event!("engine", "discarded undelivered handle");
            handle.close();
        }
    }

    /// End the stream with a terminal error.
    fn finish(&self, error: LoaderError) {
        let token = {
            let mut state = self.state.lock();
            if state.phase != Phase::Active {
                return;
            }
            crate::debug_event!("engine", "failed", "{}: {error}", self.query.source());
            state.phase = Phase::Finished;
            state.terminal = Some(error);
            state.token.take()
        };
        if let Some(token) = token {
            self.notifier.unregister(token);
        }
        self.ready.notify_one();
    }

    /// Hand the next queued item to the consumer.
    ///
    /// Under engine ownership, receiving handle N retires handle N-1.
    pub(crate) fn take_next(self: &Arc<Self>) -> Next<H> {
        let mut retired = None;
        let mut resume = false;
        let next = {
            let mut state = self.state.lock();
            if state.phase == Phase::Stopped {
                Next::Closed
            } else if let Some(handle) = state.queue.pop_front() {
                if let Some(held) = state.held.take() {
                    state.queue.push_back(held);
                    resume = std::mem::take(&mut state.deferred);
                }
                state.stats.delivered += 1;

                if let Some(previous) = state.current.replace(Arc::clone(&handle)) {
                    if !Arc::ptr_eq(&previous, &handle) {
                        state.stale = Some(previous);
                    }
                }
                if self.config.ownership == Ownership::Engine {
                    if let Some(stale) = state.stale.take() {
                        if !state.holds(&stale) {
                            state.stats.retired += 1;
                            retired = Some(stale);
                        }
                    }
                } else {
                    state.stale = None;
                }
                Next::Handle(handle)
            } else if let Some(error) = state.terminal.take() {
                Next::Failed(error)
            } else if state.phase == Phase::Finished {
                Next::Closed
            } else {
                Next::Pending
            }
        };

        if let Some(stale) = retired {
            crate::debug_event!("engine", "retired previous handle");
            stale.close();
        }
        if resume {
            self.request_reload();
        }
        next
    }

    /// Wait until there may be something for [`take_next`](Self::take_next).
    pub(crate) async fn ready(&self) {
        self.ready.notified().await;
    }

    /// Tear down: unregister, wake the consumer, close what the engine owns.
    ///
    /// Idempotent. After it returns nothing else is delivered, and a reload
    /// still in flight cannot close any handle settled here.
    pub(crate) fn stop(&self) {
        let (token, owned) = {
            let mut state = self.state.lock();
            if state.phase == Phase::Stopped {
                return;
            }
            state.phase = Phase::Stopped;
            self.generation.fetch_add(1, Ordering::SeqCst);

            let current = state.current.take();
            let mut candidates: Vec<Arc<H>> = state.queue.drain(..).collect();
            candidates.extend(state.held.take());
            candidates.extend(state.stale.take());
            if self.config.ownership == Ownership::Engine {
                candidates.extend(current.clone());
            }

            let mut owned: Vec<Arc<H>> = Vec::with_capacity(candidates.len());
            for handle in candidates {
                let delivered = self.config.ownership == Ownership::Consumer
                    && current.as_ref().is_some_and(|c| Arc::ptr_eq(c, &handle));
                if !delivered && !owned.iter().any(|o| Arc::ptr_eq(o, &handle)) {
                    owned.push(handle);
                }
            }
            state.released = owned
                .iter()
                .chain(current.as_ref())
                .map(Arc::downgrade)
                .collect();
            (state.token.take(), owned)
        };

        self.ready.notify_one();
        if let Some(token) = token {
            self.notifier.unregister(token);
        }

        crate::debug_event!(
            "engine",
            "stopped",
            "{} ({} handles released)",
            self.query.source(),
            owned.len()
        );
        for handle in owned {
            handle.close();
        }
    }
}
