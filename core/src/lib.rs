//! Client core for the planner service: todos, notes, events and reminders.
//!
//! # Overview
//! `ApiClient` builds `HttpRequest` values and parses `HttpResponse` values
//! without touching the network. A `Transport` executes the round-trip
//! (`ReqwestTransport` in production, scripted transports in tests), so every
//! layer above it stays deterministic.
//!
//! # Layers
//! - `session`: token persistence, identity decoding, login/register/logout.
//! - `authorized`: attaches the bearer token and turns a 401 into a forced
//!   logout plus navigation to the login view.
//! - `service`: typed CRUD per collection.
//! - `query`: cached, observable collection state with coalescing, retries,
//!   invalidation after mutations and interval/focus re-validation.
//! - `context`: wires the above to one configuration.

pub mod authorized;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod feedback;
pub mod http;
pub mod navigation;
pub mod query;
pub mod resources;
pub mod service;
pub mod session;
pub mod storage;
pub mod token;
pub mod transport;
pub mod types;

pub use authorized::AuthorizedClient;
pub use client::ApiClient;
pub use config::ClientConfig;
pub use context::AppContext;
pub use error::{ApiError, ValidationError};
pub use feedback::{Action, ErrorSlot};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use navigation::{guard, Navigator, Route, RouteDecision, RouterHandle};
pub use query::{QueryClient, QueryState, QueryStatus};
pub use resources::{
    Collection, Event, EventDraft, Note, NoteColor, NoteDraft, Priority, RecordId, Reminder,
    ReminderDraft, Repeat, Resource, Status, TagSet, Todo, TodoDraft, Validate,
};
pub use service::ResourceService;
pub use session::{Identity, SessionSnapshot, SessionStore};
pub use storage::{FileTokenStorage, MemoryTokenStorage, TokenStorage};
pub use transport::{ReqwestTransport, Transport};
pub use types::{Confirmation, Credentials, Registration};
