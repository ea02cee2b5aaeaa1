use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{watch, Mutex, MutexGuard};
use tokio::time::Instant;

use super::policy::SyncPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// Never fetched.
    Idle,
    Loading,
    Success,
    Error,
}

/// What observers of one collection see.
#[derive(Debug, Clone)]
pub struct QueryState<R> {
    /// Last successfully fetched list. Kept across later failures.
    pub data: Option<Vec<R>>,
    pub status: QueryStatus,
    pub error: Option<String>,
    pub failure_count: u32,
    /// Set when a mutation made `data` stale; cleared by the next fetch
    /// that started after it.
    pub is_invalidated: bool,
    pub updated_at: Option<Instant>,
}

impl<R> Default for QueryState<R> {
    fn default() -> Self {
        Self {
            data: None,
            status: QueryStatus::Idle,
            error: None,
            failure_count: 0,
            is_invalidated: false,
            updated_at: None,
        }
    }
}

impl<R> QueryState<R> {
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_fresh(&self, policy: &SyncPolicy, now: Instant) -> bool {
        match (&self.data, self.updated_at) {
            (Some(_), Some(at)) => !self.is_invalidated && policy.is_fresh(now - at),
            _ => false,
        }
    }
}

/// What a fetch started under; handed back when it settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FetchTicket {
    generation: u64,
    epoch: u64,
}

/// Cache slot for one collection.
///
/// `generation` is bumped by every invalidation; a fetch remembers the value
/// it started under so a response that raced with a mutation is stored but
/// stays marked stale. `epoch` is bumped by `clear`; anything a fetch from an
/// earlier epoch reports is dropped.
pub struct QueryEntry<R> {
    state: watch::Sender<QueryState<R>>,
    fetch_lock: Mutex<()>,
    generation: AtomicU64,
    epoch: AtomicU64,
}

impl<R: Clone> QueryEntry<R> {
    pub fn new() -> Self {
        let (state, _) = watch::channel(QueryState::default());
        Self {
            state,
            fetch_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> QueryState<R> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryState<R>> {
        self.state.subscribe()
    }

    pub fn has_observers(&self) -> bool {
        self.state.receiver_count() > 0
    }

    pub(crate) fn fresh_data(&self, policy: &SyncPolicy, now: Instant) -> Option<Vec<R>> {
        let state = self.state.borrow();
        if state.is_fresh(policy, now) {
            state.data.clone()
        } else {
            None
        }
    }

    /// Data from a fetch that completed after `since` and has not been
    /// invalidated since.
    pub(crate) fn data_updated_since(&self, since: Instant) -> Option<Vec<R>> {
        let state = self.state.borrow();
        match state.updated_at {
            Some(at) if at >= since && !state.is_invalidated => state.data.clone(),
            _ => None,
        }
    }

    pub(crate) async fn lock_fetch(&self) -> MutexGuard<'_, ()> {
        self.fetch_lock.lock().await
    }

    pub(crate) fn begin_fetch(&self) -> FetchTicket {
        self.state.send_modify(|state| state.status = QueryStatus::Loading);
        FetchTicket {
            generation: self.generation.load(Ordering::SeqCst),
            epoch: self.epoch.load(Ordering::SeqCst),
        }
    }

    fn is_current(&self, ticket: FetchTicket) -> bool {
        self.epoch.load(Ordering::SeqCst) == ticket.epoch
    }

    pub(crate) fn record_failure(&self, ticket: FetchTicket, message: String, failures: u32) {
        if !self.is_current(ticket) {
            return;
        }
        self.state.send_modify(|state| {
            state.error = Some(message);
            state.failure_count = failures;
        });
    }

    /// Store fetched data. Returns `false` when the entry was cleared while
    /// the fetch was in flight; the data is dropped in that case.
    pub(crate) fn finish_fetch(&self, ticket: FetchTicket, data: Vec<R>) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        let raced = self.generation.load(Ordering::SeqCst) != ticket.generation;
        self.state.send_modify(|state| {
            state.data = Some(data);
            state.status = QueryStatus::Success;
            state.error = None;
            state.failure_count = 0;
            state.is_invalidated = raced;
            state.updated_at = Some(Instant::now());
        });
        true
    }

    pub(crate) fn fail_fetch(&self, ticket: FetchTicket, message: String, failures: u32) {
        if !self.is_current(ticket) {
            return;
        }
        self.state.send_modify(|state| {
            state.status = QueryStatus::Error;
            state.error = Some(message);
            state.failure_count = failures;
        });
    }

    pub(crate) fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|state| state.is_invalidated = true);
    }

    /// Appends to the cached list. Returns `false` when nothing is cached yet.
    pub(crate) fn append(&self, record: R) -> bool {
        let mut appended = false;
        self.state.send_modify(|state| {
            if let Some(data) = state.data.as_mut() {
                data.push(record);
                appended = true;
            }
        });
        appended
    }

    pub(crate) fn clear(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(QueryState::default());
    }
}

impl<R: Clone> Default for QueryEntry<R> {
    fn default() -> Self {
        Self::new()
    }
}
