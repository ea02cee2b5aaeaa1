use std::time::Duration;

use crate::resources::Collection;

/// How eagerly one collection's cached data is re-validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
    /// Re-fetch on this period while someone is signed in. `None` caches
    /// until the next invalidation.
    pub refetch_interval: Option<Duration>,
    pub refetch_on_focus: bool,
    /// Append a freshly created record to the cached list before the
    /// confirming refetch lands.
    pub optimistic_create: bool,
}

impl SyncPolicy {
    pub const CACHE_UNTIL_INVALIDATED: SyncPolicy = SyncPolicy {
        refetch_interval: None,
        refetch_on_focus: false,
        optimistic_create: false,
    };

    pub const LIVE: SyncPolicy = SyncPolicy {
        refetch_interval: Some(Duration::from_secs(5)),
        refetch_on_focus: true,
        optimistic_create: true,
    };

    /// Whether data fetched `age` ago can still be served without a request.
    pub fn is_fresh(&self, age: Duration) -> bool {
        match self.refetch_interval {
            Some(interval) => age < interval,
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyTable {
    pub todos: SyncPolicy,
    pub notes: SyncPolicy,
    pub events: SyncPolicy,
    pub reminders: SyncPolicy,
}

impl PolicyTable {
    pub fn get(&self, collection: Collection) -> &SyncPolicy {
        match collection {
            Collection::Todos => &self.todos,
            Collection::Notes => &self.notes,
            Collection::Events => &self.events,
            Collection::Reminders => &self.reminders,
        }
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            todos: SyncPolicy::CACHE_UNTIL_INVALIDATED,
            notes: SyncPolicy::CACHE_UNTIL_INVALIDATED,
            events: SyncPolicy::LIVE,
            reminders: SyncPolicy::CACHE_UNTIL_INVALIDATED,
        }
    }
}

/// Retry budget for collection reads. Mutations are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Pause before the next attempt after `failures` consecutive failures:
    /// doubles from `base_delay`, capped at `max_delay`.
    pub fn delay_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_events_are_live_by_default() {
        let table = PolicyTable::default();
        for collection in Collection::ALL {
            let policy = table.get(collection);
            let live = collection == Collection::Events;
            assert_eq!(policy.refetch_on_focus, live, "{collection}");
            assert_eq!(policy.optimistic_create, live, "{collection}");
            assert_eq!(policy.refetch_interval.is_some(), live, "{collection}");
        }
    }

    #[test]
    fn freshness_follows_interval() {
        assert!(SyncPolicy::CACHE_UNTIL_INVALIDATED.is_fresh(Duration::from_secs(3600)));
        assert!(SyncPolicy::LIVE.is_fresh(Duration::from_secs(4)));
        assert!(!SyncPolicy::LIVE.is_fresh(Duration::from_secs(5)));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let retry = RetryPolicy::default();
        assert_eq!(retry.delay_for(1), Duration::from_secs(1));
        assert_eq!(retry.delay_for(2), Duration::from_secs(2));
        assert_eq!(retry.delay_for(3), Duration::from_secs(4));
        assert_eq!(retry.delay_for(6), Duration::from_secs(30));
        assert_eq!(retry.delay_for(40), Duration::from_secs(30));
    }
}
