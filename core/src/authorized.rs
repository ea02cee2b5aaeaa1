//! Cross-cutting authorization for every collection request.
//!
//! Outbound: attach the persisted token as a bearer credential when there
//! is one. Inbound: a 401 ends the session, forces the login view and comes
//! back to the caller as `ApiError::Unauthorized`. Every other response is
//! handed back untouched for `ApiClient::parse_*` to interpret.

use std::sync::Arc;

use crate::client::ApiClient;
use crate::error::{extract_server_message, ApiError};
use crate::http::{HttpRequest, HttpResponse};
use crate::navigation::{Navigator, Route};
use crate::session::SessionStore;
use crate::transport::Transport;

#[derive(Clone)]
pub struct AuthorizedClient {
    api: ApiClient,
    transport: Arc<dyn Transport>,
    session: SessionStore,
    navigator: Arc<dyn Navigator>,
}

impl AuthorizedClient {
    pub fn new(
        api: ApiClient,
        transport: Arc<dyn Transport>,
        session: SessionStore,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            api,
            transport,
            session,
            navigator,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let request = match self.session.bearer_token() {
            Some(token) => request.with_bearer(&token),
            None => request,
        };
        let method = request.method;
        let path = request.path.clone();

        let response = self.transport.execute(request).await?;
        tracing::debug!(method = method.as_str(), %path, status = response.status, "response");

        if response.is_unauthorized() {
            tracing::warn!(%path, "request rejected as unauthorized, ending session");
            self.session.end_session();
            self.navigator.navigate(Route::Login);
            return Err(ApiError::Unauthorized {
                message: extract_server_message(&response.body),
            });
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::http::HttpMethod;
    use crate::navigation::RouterHandle;
    use crate::storage::{MemoryTokenStorage, StorageError, TokenStorage};
    use crate::transport::testing::ScriptedTransport;

    /// Counts how often the token gets cleared.
    #[derive(Default)]
    struct CountingStorage {
        inner: MemoryTokenStorage,
        clears: AtomicUsize,
    }

    impl TokenStorage for CountingStorage {
        fn load(&self) -> Result<Option<String>, StorageError> {
            self.inner.load()
        }
        fn store(&self, token: &str) -> Result<(), StorageError> {
            self.inner.store(token)
        }
        fn clear(&self) -> Result<(), StorageError> {
            self.clears.fetch_add(1, Ordering::SeqCst);
            self.inner.clear()
        }
    }

    struct Fixture {
        client: AuthorizedClient,
        transport: Arc<ScriptedTransport>,
        storage: Arc<CountingStorage>,
        router: RouterHandle,
    }

    fn fixture(token: Option<&str>) -> Fixture {
        let api = ApiClient::new("http://localhost:3000/api");
        let transport = Arc::new(ScriptedTransport::new());
        let storage = Arc::new(CountingStorage::default());
        if let Some(token) = token {
            storage.inner.store(token).unwrap();
        }
        let session = SessionStore::new(api.clone(), transport.clone(), storage.clone());
        let router = RouterHandle::default();
        let client = AuthorizedClient::new(
            api,
            transport.clone(),
            session,
            Arc::new(router.clone()),
        );
        Fixture {
            client,
            transport,
            storage,
            router,
        }
    }

    fn list_request() -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: "http://localhost:3000/api/todos".to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    #[tokio::test]
    async fn attaches_bearer_token() {
        let f = fixture(Some("T"));
        f.transport.push(200, "[]");
        f.client.send(list_request()).await.unwrap();
        assert_eq!(f.transport.requests()[0].header("authorization"), Some("Bearer T"));
    }

    #[tokio::test]
    async fn sends_without_header_when_signed_out() {
        let f = fixture(None);
        f.transport.push(200, "[]");
        f.client.send(list_request()).await.unwrap();
        assert!(f.transport.requests()[0].header("authorization").is_none());
    }

    #[tokio::test]
    async fn unauthorized_clears_token_once_and_redirects() {
        let f = fixture(Some("T"));
        f.transport.push(401, r#"{"message":"jwt expired"}"#);

        let err = f.client.send(list_request()).await.unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(err.server_message(), Some("jwt expired"));
        assert_eq!(f.storage.clears.load(Ordering::SeqCst), 1);
        assert_eq!(f.storage.load().unwrap(), None);
        assert_eq!(f.router.current(), Route::Login);
        assert_eq!(f.transport.request_count(), 1);
    }

    #[tokio::test]
    async fn other_failures_pass_through() {
        let f = fixture(Some("T"));
        f.transport.push(500, "boom");
        let response = f.client.send(list_request()).await.unwrap();
        assert_eq!(response.status, 500);
        assert_eq!(f.storage.clears.load(Ordering::SeqCst), 0);
        assert_eq!(f.router.current(), Route::Dashboard);

        f.transport.push_failure("connection reset");
        let err = f.client.send(list_request()).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert_eq!(f.storage.load().unwrap().as_deref(), Some("T"));
    }
}
