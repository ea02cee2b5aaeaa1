//! Session store: owns the persisted bearer token and the current identity.
//!
//! # Design
//! `SessionStore` is a cheap-to-clone handle over shared state. Consumers
//! read a `SessionSnapshot` or subscribe to changes through a `watch`
//! channel; only the lifecycle operations (`initialize`, `login`,
//! `register`, `logout`) and expiry detection mutate it. The identity is
//! present only while an unexpired token is persisted.
//!
//! Login and registration go straight to the transport instead of through
//! `AuthorizedClient`: a rejected login answers 401, and that must not wipe
//! whatever session was there before.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::http::HttpRequest;
use crate::storage::TokenStorage;
use crate::token::{self, Claims};
use crate::transport::Transport;
use crate::types::{AuthResponse, Credentials, Registration};

/// Keys that may carry the user identifier, in lookup order.
const SUBJECT_KEYS: [&str; 4] = ["id", "_id", "sub", "userId"];

/// Who the current user is.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub subject: String,
    /// Seconds since the epoch.
    pub issued_at: Option<i64>,
    /// Seconds since the epoch.
    pub expires_at: Option<i64>,
    pub claims: Map<String, Value>,
}

impl Identity {
    pub fn with_subject(subject: &str) -> Self {
        Self {
            subject: subject.to_string(),
            issued_at: None,
            expires_at: None,
            claims: Map::new(),
        }
    }

    /// Identity restored from a decoded token.
    pub fn from_claims(claims: &Claims) -> Option<Self> {
        let Ok(Value::Object(map)) = serde_json::to_value(claims) else {
            return None;
        };
        Some(Self {
            subject: subject_of(&map)?,
            issued_at: claims.iat,
            expires_at: Some(claims.exp),
            claims: map,
        })
    }

    /// Identity adopted from the user object of an auth response. Timing
    /// comes from the accompanying token when it decodes.
    pub fn from_user(user: &Map<String, Value>, claims: Option<&Claims>) -> Option<Self> {
        let subject = subject_of(user).or_else(|| claims.and_then(|c| c.sub.clone()))?;
        Some(Self {
            subject,
            issued_at: claims.and_then(|c| c.iat),
            expires_at: claims.map(|c| c.exp),
            claims: user.clone(),
        })
    }

    pub fn claim(&self, key: &str) -> Option<&Value> {
        self.claims.get(key)
    }
}

fn subject_of(map: &Map<String, Value>) -> Option<String> {
    SUBJECT_KEYS.iter().find_map(|key| match map.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Read-only view of the session handed to consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub identity: Option<Identity>,
    pub is_loading: bool,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    api: ApiClient,
    transport: Arc<dyn Transport>,
    storage: Arc<dyn TokenStorage>,
    state: watch::Sender<SessionSnapshot>,
}

impl SessionStore {
    /// A store that reports "loading" until `initialize` runs.
    pub fn new(api: ApiClient, transport: Arc<dyn Transport>, storage: Arc<dyn TokenStorage>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot {
            identity: None,
            is_loading: true,
        });
        Self {
            inner: Arc::new(SessionInner {
                api,
                transport,
                storage,
                state,
            }),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state.subscribe()
    }

    pub fn current_user(&self) -> Option<Identity> {
        self.inner.state.borrow().identity.clone()
    }

    /// Restore the session from the persisted token. Never fails: any
    /// problem is logged and ends in "no user".
    pub fn initialize(&self) {
        self.initialize_at(token::now_millis());
    }

    pub fn initialize_at(&self, now_ms: i64) {
        let identity = self.restore(now_ms);
        self.inner.state.send_modify(|state| {
            state.identity = identity;
            state.is_loading = false;
        });
    }

    fn restore(&self, now_ms: i64) -> Option<Identity> {
        let token = match self.inner.storage.load() {
            Ok(Some(token)) => token,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(error = %err, "could not read persisted token");
                return None;
            }
        };

        let identity = match token::decode(&token) {
            Ok(claims) if claims.is_expired_at(now_ms) => {
                tracing::info!(exp = claims.exp, "persisted token expired, discarding it");
                None
            }
            Ok(claims) => {
                let identity = Identity::from_claims(&claims);
                if identity.is_none() {
                    tracing::warn!("persisted token carries no subject, discarding it");
                }
                identity
            }
            Err(err) => {
                tracing::warn!(error = %err, "invalid persisted token, discarding it");
                None
            }
        };

        if identity.is_none() {
            self.discard_token();
        }
        identity
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<Identity, ApiError> {
        tracing::debug!(email = %credentials.email, "logging in");
        let request = self.inner.api.build_login(credentials);
        self.authenticate(request).await
    }

    pub async fn register(&self, registration: &Registration) -> Result<Identity, ApiError> {
        tracing::debug!(email = %registration.email, "registering");
        let request = self.inner.api.build_register(registration);
        self.authenticate(request).await
    }

    async fn authenticate(
        &self,
        request: Result<HttpRequest, ApiError>,
    ) -> Result<Identity, ApiError> {
        self.inner.state.send_modify(|state| state.is_loading = true);
        let result = self.exchange(request).await;
        self.inner.state.send_modify(|state| {
            if let Ok(identity) = &result {
                state.identity = Some(identity.clone());
            }
            state.is_loading = false;
        });
        if let Err(err) = &result {
            tracing::warn!(error = %err, "authentication failed");
        }
        result
    }

    async fn exchange(
        &self,
        request: Result<HttpRequest, ApiError>,
    ) -> Result<Identity, ApiError> {
        let response = self.inner.transport.execute(request?).await?;
        let AuthResponse { token, user } = self.inner.api.parse_auth(response)?;

        let claims = token::decode(&token).ok();
        if let Some(claims) = claims.as_ref().filter(|c| c.is_expired()) {
            tracing::warn!(exp = claims.exp, "auth response carried an expired token, discarding it");
            return Err(ApiError::Unauthorized {
                message: Some("Session token already expired".to_string()),
            });
        }
        let identity = Identity::from_user(&user, claims.as_ref()).ok_or_else(|| {
            ApiError::DeserializationError("auth response user has no identifier".to_string())
        })?;

        self.inner.storage.store(&token)?;
        tracing::info!(subject = %identity.subject, "session started");
        Ok(identity)
    }

    /// Drop the token and the identity. No network call.
    pub fn logout(&self) {
        self.discard_token();
        self.inner.state.send_modify(|state| state.identity = None);
        tracing::info!("logged out");
    }

    /// The persisted token, if any. A token found expired here ends the
    /// session the same way an expired token does at startup.
    pub(crate) fn bearer_token(&self) -> Option<String> {
        let token = match self.inner.storage.load() {
            Ok(token) => token?,
            Err(err) => {
                tracing::warn!(error = %err, "could not read persisted token");
                return None;
            }
        };
        match token::decode(&token) {
            Ok(claims) if claims.is_expired() => {
                tracing::info!("token expired before use, ending session");
                self.end_session();
                None
            }
            _ => Some(token),
        }
    }

    /// Clear token and identity after the server rejected the token.
    pub(crate) fn end_session(&self) {
        self.discard_token();
        self.inner.state.send_modify(|state| state.identity = None);
    }

    fn discard_token(&self) {
        if let Err(err) = self.inner.storage.clear() {
            tracing::warn!(error = %err, "could not clear persisted token");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryTokenStorage;
    use crate::token::unsigned_token;
    use crate::transport::testing::ScriptedTransport;
    use serde_json::json;

    const NOW_MS: i64 = 1_700_000_000_000;

    fn store_with(
        token: Option<&str>,
    ) -> (SessionStore, Arc<ScriptedTransport>, MemoryTokenStorage) {
        let transport = Arc::new(ScriptedTransport::new());
        let storage = match token {
            Some(t) => MemoryTokenStorage::with_token(t),
            None => MemoryTokenStorage::new(),
        };
        let store = SessionStore::new(
            ApiClient::new("http://localhost:3000/api"),
            transport.clone(),
            Arc::new(storage.clone()),
        );
        (store, transport, storage)
    }

    #[test]
    fn starts_loading_until_initialized() {
        let (store, _, _) = store_with(None);
        assert!(store.snapshot().is_loading);
        store.initialize_at(NOW_MS);
        let snapshot = store.snapshot();
        assert!(!snapshot.is_loading);
        assert!(snapshot.identity.is_none());
    }

    #[test]
    fn restores_unexpired_token() {
        let token = unsigned_token(&json!({"sub":"u1","iat":1,"exp": NOW_MS / 1000 + 60}));
        let (store, _, storage) = store_with(Some(&token));
        store.initialize_at(NOW_MS);
        let user = store.current_user().unwrap();
        assert_eq!(user.subject, "u1");
        assert_eq!(user.issued_at, Some(1));
        assert_eq!(storage.load().unwrap().as_deref(), Some(token.as_str()));
    }

    #[test]
    fn expired_token_is_discarded() {
        for exp in [NOW_MS / 1000, NOW_MS / 1000 - 1] {
            let token = unsigned_token(&json!({"sub":"u1","exp": exp}));
            let (store, _, storage) = store_with(Some(&token));
            store.initialize_at(NOW_MS);
            assert!(store.current_user().is_none());
            assert!(!store.snapshot().is_loading);
            assert_eq!(storage.load().unwrap(), None);
        }
    }

    #[test]
    fn undecodable_token_is_discarded() {
        let (store, _, storage) = store_with(Some("garbage"));
        store.initialize_at(NOW_MS);
        assert!(store.current_user().is_none());
        assert_eq!(storage.load().unwrap(), None);
    }

    #[tokio::test]
    async fn login_persists_token_and_adopts_user() {
        let (store, transport, storage) = store_with(None);
        store.initialize_at(NOW_MS);
        transport.push(200, r#"{"token":"T","user":{"id":"u1"}}"#);

        let identity = store.login(&Credentials::new("a@x.com", "p")).await.unwrap();

        assert_eq!(identity.subject, "u1");
        assert_eq!(store.current_user().unwrap().subject, "u1");
        assert_eq!(storage.load().unwrap().as_deref(), Some("T"));
        assert!(!store.snapshot().is_loading);

        let requests = transport.requests();
        assert_eq!(requests[0].path, "http://localhost:3000/api/auth/login");
        assert!(requests[0].header("authorization").is_none());
    }

    #[tokio::test]
    async fn failed_login_leaves_previous_session_alone() {
        let token = unsigned_token(&json!({"sub":"u0","exp": i64::MAX / 1000}));
        let (store, transport, storage) = store_with(Some(&token));
        store.initialize_at(NOW_MS);
        transport.push(401, r#"{"message":"Invalid credentials"}"#);

        let err = store
            .login(&Credentials::new("a@x.com", "wrong"))
            .await
            .unwrap_err();

        assert_eq!(err.server_message(), Some("Invalid credentials"));
        assert_eq!(store.current_user().unwrap().subject, "u0");
        assert_eq!(storage.load().unwrap().as_deref(), Some(token.as_str()));
        assert!(!store.snapshot().is_loading);
    }

    #[tokio::test]
    async fn register_uses_registration_endpoint() {
        let (store, transport, _) = store_with(None);
        let token = unsigned_token(&json!({"sub":"u2","iat":5,"exp": 4_102_444_800i64}));
        transport.push(
            201,
            &json!({"token": token, "user": {"_id": "u2", "name": "Ada"}}).to_string(),
        );

        let identity = store
            .register(&Registration {
                name: "Ada".to_string(),
                email: "ada@x.com".to_string(),
                password: "p".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(identity.subject, "u2");
        assert_eq!(identity.expires_at, Some(4_102_444_800));
        assert_eq!(identity.claim("name").unwrap(), "Ada");
        assert!(transport.requests()[0].path.ends_with("/auth/register"));
    }

    #[tokio::test]
    async fn expired_token_from_login_is_not_adopted() {
        let previous = unsigned_token(&json!({"sub":"u0","exp": i64::MAX / 1000}));
        let (store, transport, storage) = store_with(Some(&previous));
        store.initialize_at(NOW_MS);
        let expired = unsigned_token(&json!({"sub":"u1","exp": 1}));
        transport.push(
            200,
            &json!({"token": expired, "user": {"id": "u1"}}).to_string(),
        );

        let err = store
            .login(&Credentials::new("a@x.com", "p"))
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(store.current_user().unwrap().subject, "u0");
        assert_eq!(storage.load().unwrap().as_deref(), Some(previous.as_str()));
        assert!(!store.snapshot().is_loading);
    }

    #[tokio::test]
    async fn transport_failure_settles_loading() {
        let (store, transport, _) = store_with(None);
        transport.push_failure("connection refused");
        assert!(store.login(&Credentials::new("a", "b")).await.is_err());
        assert!(!store.snapshot().is_loading);
        assert!(store.current_user().is_none());
    }

    #[test]
    fn logout_clears_everything() {
        let token = unsigned_token(&json!({"sub":"u1","exp": i64::MAX / 1000}));
        let (store, _, storage) = store_with(Some(&token));
        store.initialize_at(NOW_MS);
        let mut rx = store.subscribe();

        store.logout();

        assert!(store.current_user().is_none());
        assert_eq!(storage.load().unwrap(), None);
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().identity.is_none());
    }

    #[test]
    fn expired_token_at_use_time_ends_session() {
        let fresh = unsigned_token(&json!({"sub":"u1","exp": i64::MAX / 1000}));
        let (store, _, storage) = store_with(Some(&fresh));
        store.initialize_at(NOW_MS);
        assert_eq!(store.bearer_token().as_deref(), Some(fresh.as_str()));

        let stale = unsigned_token(&json!({"sub":"u1","exp": 1}));
        storage.store(&stale).unwrap();
        assert_eq!(store.bearer_token(), None);
        assert!(store.current_user().is_none());
        assert_eq!(storage.load().unwrap(), None);
    }

    #[test]
    fn opaque_tokens_are_sent_as_is() {
        let (store, _, _) = store_with(Some("opaque"));
        assert_eq!(store.bearer_token().as_deref(), Some("opaque"));
    }
}
