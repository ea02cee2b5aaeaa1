//! User-facing error messages with auto-dismissal.

use std::time::Duration;

use tokio::time::Instant;

use crate::error::ApiError;
use crate::resources::Collection;

pub const DEFAULT_NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(6);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Fetch,
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn verb(&self) -> &'static str {
        match self {
            Action::Fetch => "fetch",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

/// "Failed to fetch todos", "Failed to delete note".
pub fn fallback_message(action: Action, collection: Collection) -> String {
    let noun = match action {
        Action::Fetch => collection.path(),
        _ => collection.singular(),
    };
    format!("Failed to {} {noun}", action.verb())
}

/// One visible error message, hidden again after a timeout.
#[derive(Debug, Clone)]
pub struct ErrorSlot {
    message: Option<(String, Instant)>,
    timeout: Duration,
}

impl ErrorSlot {
    pub fn new(timeout: Duration) -> Self {
        Self {
            message: None,
            timeout,
        }
    }

    pub fn show(&mut self, message: impl Into<String>) {
        self.message = Some((message.into(), Instant::now()));
    }

    /// Show the best message for a failed `action`.
    pub fn report(&mut self, err: &ApiError, action: Action, collection: Collection) {
        self.show(err.user_message(&fallback_message(action, collection)));
    }

    pub fn clear(&mut self) {
        self.message = None;
    }

    pub fn message(&self) -> Option<&str> {
        self.message_at(Instant::now())
    }

    pub fn message_at(&self, now: Instant) -> Option<&str> {
        match &self.message {
            Some((text, shown_at)) if now.duration_since(*shown_at) < self.timeout => {
                Some(text.as_str())
            }
            _ => None,
        }
    }
}

impl Default for ErrorSlot {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_TIMEOUT)
    }
}
