use crate::error::ApiError;
use crate::resources::{Event, Note, Reminder, Todo};

use super::{Cached, QueryClient};

/// What one dashboard card shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionCount {
    Loaded(usize),
    Failed(String),
}

impl CollectionCount {
    fn from_result<R>(result: Result<Vec<R>, ApiError>) -> Self {
        match result {
            Ok(items) => CollectionCount::Loaded(items.len()),
            Err(err) => CollectionCount::Failed(err.user_message("Error loading data")),
        }
    }

    pub fn count(&self) -> Option<usize> {
        match self {
            CollectionCount::Loaded(count) => Some(*count),
            CollectionCount::Failed(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSummary {
    pub todos: CollectionCount,
    pub notes: CollectionCount,
    pub events: CollectionCount,
    pub reminders: CollectionCount,
}

impl QueryClient {
    /// Record counts for every collection. A failing collection only fails
    /// its own card.
    pub async fn dashboard(&self) -> DashboardSummary {
        let (todos, notes, events, reminders) = tokio::join!(
            self.list::<Todo>(),
            self.list::<Note>(),
            self.list::<Event>(),
            self.list::<Reminder>(),
        );
        DashboardSummary {
            todos: CollectionCount::from_result(todos),
            notes: CollectionCount::from_result(notes),
            events: CollectionCount::from_result(events),
            reminders: CollectionCount::from_result(reminders),
        }
    }

    /// Counts from cache only; `None` for collections never fetched.
    pub fn cached_counts(&self) -> [Option<usize>; 4] {
        [
            cached_len::<Todo>(self),
            cached_len::<Note>(self),
            cached_len::<Event>(self),
            cached_len::<Reminder>(self),
        ]
    }
}

fn cached_len<R: Cached>(client: &QueryClient) -> Option<usize> {
    client.entry::<R>().snapshot().data.map(|items| items.len())
}
