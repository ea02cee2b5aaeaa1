//! Cached, observable views of the four collections.
//!
//! Reads go through a per-collection `QueryEntry`: concurrent reads share a
//! single request, failures are retried with backoff, and every successful
//! mutation invalidates the collection so the next read (or an immediate
//! background refetch, when someone is watching) picks up server truth.

mod dashboard;
mod entry;
mod policy;

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::authorized::AuthorizedClient;
use crate::error::ApiError;
use crate::feedback::{fallback_message, Action};
use crate::resources::{Collection, Event, Note, RecordId, Reminder, Resource, Todo, Validate};
use crate::service::ResourceService;
use crate::types::Confirmation;

pub use dashboard::{CollectionCount, DashboardSummary};
pub use entry::{QueryEntry, QueryState, QueryStatus};
pub use policy::{PolicyTable, RetryPolicy, SyncPolicy};

/// One cache slot per collection.
#[derive(Default)]
pub struct QuerySlots {
    todos: QueryEntry<Todo>,
    notes: QueryEntry<Note>,
    events: QueryEntry<Event>,
    reminders: QueryEntry<Reminder>,
}

/// A resource with a slot in `QuerySlots`.
pub trait Cached: Resource {
    fn entry(slots: &QuerySlots) -> &QueryEntry<Self>;
}

impl Cached for Todo {
    fn entry(slots: &QuerySlots) -> &QueryEntry<Self> {
        &slots.todos
    }
}

impl Cached for Note {
    fn entry(slots: &QuerySlots) -> &QueryEntry<Self> {
        &slots.notes
    }
}

impl Cached for Event {
    fn entry(slots: &QuerySlots) -> &QueryEntry<Self> {
        &slots.events
    }
}

impl Cached for Reminder {
    fn entry(slots: &QuerySlots) -> &QueryEntry<Self> {
        &slots.reminders
    }
}

#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<QueryInner>,
}

struct QueryInner {
    client: AuthorizedClient,
    slots: QuerySlots,
    policies: PolicyTable,
    retry: RetryPolicy,
}

impl QueryClient {
    pub fn new(client: AuthorizedClient, policies: PolicyTable, retry: RetryPolicy) -> Self {
        Self {
            inner: Arc::new(QueryInner {
                client,
                slots: QuerySlots::default(),
                policies,
                retry,
            }),
        }
    }

    pub fn policy(&self, collection: Collection) -> &SyncPolicy {
        self.inner.policies.get(collection)
    }

    pub fn service<R: Resource>(&self) -> ResourceService<R> {
        ResourceService::new(self.inner.client.clone())
    }

    pub fn entry<R: Cached>(&self) -> &QueryEntry<R> {
        R::entry(&self.inner.slots)
    }

    pub fn subscribe<R: Cached>(&self) -> watch::Receiver<QueryState<R>> {
        self.entry::<R>().subscribe()
    }

    pub fn state<R: Cached>(&self) -> QueryState<R> {
        self.entry::<R>().snapshot()
    }

    /// Cached list, without touching the network.
    pub fn cached<R: Cached>(&self) -> Option<Vec<R>> {
        self.entry::<R>().snapshot().data
    }

    /// The collection's records, from cache while fresh.
    pub async fn list<R: Cached>(&self) -> Result<Vec<R>, ApiError> {
        self.fetch::<R>(false).await
    }

    /// Re-fetch one collection regardless of freshness. Still shares a
    /// request with any fetch already in flight.
    pub async fn refetch(&self, collection: Collection) -> Result<(), ApiError> {
        match collection {
            Collection::Todos => self.fetch::<Todo>(true).await.map(drop),
            Collection::Notes => self.fetch::<Note>(true).await.map(drop),
            Collection::Events => self.fetch::<Event>(true).await.map(drop),
            Collection::Reminders => self.fetch::<Reminder>(true).await.map(drop),
        }
    }

    pub async fn create<R: Cached>(&self, draft: &R::Draft) -> Result<R, ApiError> {
        draft.validate()?;
        let record = self
            .service::<R>()
            .create(draft)
            .await
            .map_err(|err| self.mutation_failed(err))?;

        if self.policy(R::COLLECTION).optimistic_create && !self.entry::<R>().append(record.clone()) {
            tracing::debug!(collection = %R::COLLECTION, "nothing cached yet, waiting for refetch");
        }
        self.invalidate_entry::<R>();
        Ok(record)
    }

    pub async fn update<R: Cached>(&self, id: &RecordId, draft: &R::Draft) -> Result<R, ApiError> {
        draft.validate()?;
        let record = self
            .service::<R>()
            .update(id, draft)
            .await
            .map_err(|err| self.mutation_failed(err))?;
        self.invalidate_entry::<R>();
        Ok(record)
    }

    pub async fn delete<R: Cached>(&self, id: &RecordId) -> Result<Confirmation, ApiError> {
        let confirmation = self
            .service::<R>()
            .delete(id)
            .await
            .map_err(|err| self.mutation_failed(err))?;
        self.invalidate_entry::<R>();
        Ok(confirmation)
    }

    /// Mark a collection stale. Watched collections are refetched right away.
    pub fn invalidate(&self, collection: Collection) {
        match collection {
            Collection::Todos => self.invalidate_entry::<Todo>(),
            Collection::Notes => self.invalidate_entry::<Note>(),
            Collection::Events => self.invalidate_entry::<Event>(),
            Collection::Reminders => self.invalidate_entry::<Reminder>(),
        }
    }

    /// The client regained focus: invalidate every collection whose policy
    /// asks for it.
    pub fn on_focus(&self) {
        if !self.signed_in() {
            return;
        }
        for collection in Collection::ALL {
            if self.policy(collection).refetch_on_focus {
                self.invalidate(collection);
            }
        }
    }

    /// Drop every cached list, e.g. when the session ends.
    pub fn clear(&self) {
        self.inner.slots.todos.clear();
        self.inner.slots.notes.clear();
        self.inner.slots.events.clear();
        self.inner.slots.reminders.clear();
    }

    /// Start one polling task per collection with a refetch interval.
    /// Ticks are skipped while signed out.
    pub fn spawn_polling(&self) -> Vec<JoinHandle<()>> {
        Collection::ALL
            .into_iter()
            .filter_map(|collection| {
                let period = self.policy(collection).refetch_interval?;
                let client = self.clone();
                Some(tokio::spawn(client.poll(collection, period)))
            })
            .collect()
    }

    async fn poll(self, collection: Collection, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if !self.signed_in() {
                continue;
            }
            if let Err(err) = self.refetch(collection).await {
                tracing::debug!(%collection, error = %err, "poll failed");
            }
        }
    }

    async fn fetch<R: Cached>(&self, force: bool) -> Result<Vec<R>, ApiError> {
        let entry = self.entry::<R>();
        let policy = self.policy(R::COLLECTION);
        let requested_at = Instant::now();
        if !force {
            if let Some(data) = entry.fresh_data(policy, requested_at) {
                return Ok(data);
            }
        }

        let _guard = entry.lock_fetch().await;
        if let Some(data) = entry.data_updated_since(requested_at) {
            tracing::trace!(collection = %R::COLLECTION, "served by concurrent fetch");
            return Ok(data);
        }
        if !force {
            if let Some(data) = entry.fresh_data(policy, Instant::now()) {
                return Ok(data);
            }
        }

        let ticket = entry.begin_fetch();
        let service = self.service::<R>();
        let retry = self.inner.retry;
        let mut failures = 0;
        loop {
            let err = match service.get_all().await {
                Ok(items) => {
                    tracing::debug!(collection = %R::COLLECTION, count = items.len(), "fetched");
                    if !entry.finish_fetch(ticket, items.clone()) {
                        tracing::debug!(collection = %R::COLLECTION, "cache cleared during fetch, dropping result");
                    }
                    return Ok(items);
                }
                Err(err) => err,
            };

            failures += 1;
            if err.is_unauthorized() {
                self.clear();
                return Err(err);
            }
            let message = err.user_message(&fallback_message(Action::Fetch, R::COLLECTION));
            if !err.is_retryable() || failures > retry.max_retries {
                tracing::warn!(collection = %R::COLLECTION, failures, error = %err, "fetch failed");
                entry.fail_fetch(ticket, message, failures);
                return Err(err);
            }

            let delay = retry.delay_for(failures);
            tracing::debug!(collection = %R::COLLECTION, failures, ?delay, error = %err, "retrying fetch");
            entry.record_failure(ticket, message, failures);
            tokio::time::sleep(delay).await;
        }
    }

    fn invalidate_entry<R: Cached>(&self) {
        self.entry::<R>().invalidate();
        self.spawn_refetch_if_observed::<R>();
    }

    fn spawn_refetch_if_observed<R: Cached>(&self) {
        if !self.entry::<R>().has_observers() {
            return;
        }
        let Ok(handle) = Handle::try_current() else {
            return;
        };
        let client = self.clone();
        handle.spawn(async move {
            if let Err(err) = client.fetch::<R>(true).await {
                tracing::debug!(collection = %R::COLLECTION, error = %err, "background refetch failed");
            }
        });
    }

    fn mutation_failed(&self, err: ApiError) -> ApiError {
        if err.is_unauthorized() {
            self.clear();
        }
        err
    }

    fn signed_in(&self) -> bool {
        self.inner.client.session().snapshot().is_authenticated()
    }
}
