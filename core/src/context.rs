//! Everything a running client shares: configuration, session, router and
//! the query cache, wired to one transport and one token store.

use std::sync::Arc;

use crate::authorized::AuthorizedClient;
use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::feedback::ErrorSlot;
use crate::navigation::{guard, Navigator, Route, RouteDecision, RouterHandle};
use crate::query::QueryClient;
use crate::session::{Identity, SessionStore};
use crate::storage::{FileTokenStorage, MemoryTokenStorage, TokenStorage};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{Credentials, Registration};

#[derive(Clone)]
pub struct AppContext {
    config: ClientConfig,
    session: SessionStore,
    router: RouterHandle,
    queries: QueryClient,
}

impl AppContext {
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn TokenStorage>,
    ) -> Self {
        let api = ApiClient::new(&config.base_url);
        let session = SessionStore::new(api.clone(), transport.clone(), storage);
        let router = RouterHandle::new(Route::Dashboard);
        let client = AuthorizedClient::new(api, transport, session.clone(), Arc::new(router.clone()));
        let queries = QueryClient::new(client, config.policy_table(), config.retry_policy());
        Self {
            config,
            session,
            router,
            queries,
        }
    }

    /// Real HTTP transport; the token goes to `token_file` when configured.
    pub fn from_config(config: ClientConfig) -> Result<Self, ApiError> {
        let transport = Arc::new(ReqwestTransport::new(config.request_timeout())?);
        let storage: Arc<dyn TokenStorage> = match &config.token_file {
            Some(path) => Arc::new(FileTokenStorage::new(path)),
            None => Arc::new(MemoryTokenStorage::new()),
        };
        tracing::info!(base_url = %config.base_url, "client configured");
        Ok(Self::new(config, transport, storage))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn router(&self) -> &RouterHandle {
        &self.router
    }

    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    pub fn error_slot(&self) -> ErrorSlot {
        ErrorSlot::new(self.config.notification_timeout())
    }

    /// Restore the persisted session and land on the view it allows.
    pub fn start(&self) -> RouteDecision {
        self.session.initialize();
        self.open(self.router.current())
    }

    /// Apply the route guard to `route` and follow any redirect.
    pub fn open(&self, route: Route) -> RouteDecision {
        let decision = guard(route, &self.session.snapshot());
        match decision {
            RouteDecision::Render(route) | RouteDecision::Redirect(route) => {
                self.router.navigate(route)
            }
            RouteDecision::Loading => {}
        }
        decision
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<Identity, ApiError> {
        let identity = self.session.login(credentials).await?;
        self.queries.clear();
        self.router.navigate(Route::Dashboard);
        Ok(identity)
    }

    pub async fn register(&self, registration: &Registration) -> Result<Identity, ApiError> {
        let identity = self.session.register(registration).await?;
        self.queries.clear();
        self.router.navigate(Route::Dashboard);
        Ok(identity)
    }

    pub fn logout(&self) {
        self.session.logout();
        self.queries.clear();
        self.router.navigate(Route::Login);
    }
}
