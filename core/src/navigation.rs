//! Views the client can be on and the session-based access rules for them.

use std::sync::Arc;

use tokio::sync::watch;

use crate::session::SessionSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Register,
    Dashboard,
    Todos,
    Notes,
    Events,
    Reminders,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Dashboard => "/",
            Route::Todos => "/todos",
            Route::Notes => "/notes",
            Route::Events => "/events",
            Route::Reminders => "/reminders",
        }
    }

    /// Unknown paths fall back to the dashboard.
    pub fn from_path(path: &str) -> Route {
        match path.trim_end_matches('/') {
            "/login" => Route::Login,
            "/register" => Route::Register,
            "/todos" => Route::Todos,
            "/notes" => Route::Notes,
            "/events" => Route::Events,
            "/reminders" => Route::Reminders,
            _ => Route::Dashboard,
        }
    }

    /// Login and registration are the only views reachable without a session.
    pub fn is_public(&self) -> bool {
        matches!(self, Route::Login | Route::Register)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// The session check has not finished yet.
    Loading,
    Render(Route),
    Redirect(Route),
}

/// Decide what to show for `requested` given the current session.
pub fn guard(requested: Route, session: &SessionSnapshot) -> RouteDecision {
    let signed_in = session.identity.is_some();
    if requested.is_public() {
        if signed_in {
            return RouteDecision::Redirect(Route::Dashboard);
        }
        return RouteDecision::Render(requested);
    }
    if session.is_loading {
        return RouteDecision::Loading;
    }
    if signed_in {
        RouteDecision::Render(requested)
    } else {
        RouteDecision::Redirect(Route::Login)
    }
}

/// Receives forced navigations, e.g. to the login view after a 401.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// A `Navigator` that publishes the current route to any number of watchers.
#[derive(Debug, Clone)]
pub struct RouterHandle {
    current: Arc<watch::Sender<Route>>,
}

impl RouterHandle {
    pub fn new(initial: Route) -> Self {
        let (current, _) = watch::channel(initial);
        Self {
            current: Arc::new(current),
        }
    }

    pub fn current(&self) -> Route {
        *self.current.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Route> {
        self.current.subscribe()
    }
}

impl Default for RouterHandle {
    fn default() -> Self {
        Self::new(Route::Dashboard)
    }
}

impl Navigator for RouterHandle {
    fn navigate(&self, route: Route) {
        tracing::debug!(path = route.path(), "navigating");
        self.current.send_replace(route);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Identity;

    fn snapshot(signed_in: bool, is_loading: bool) -> SessionSnapshot {
        SessionSnapshot {
            identity: signed_in.then(|| Identity::with_subject("u1")),
            is_loading,
        }
    }

    #[test]
    fn private_routes_wait_for_session_check() {
        assert_eq!(guard(Route::Todos, &snapshot(false, true)), RouteDecision::Loading);
    }

    #[test]
    fn anonymous_users_are_sent_to_login() {
        assert_eq!(
            guard(Route::Events, &snapshot(false, false)),
            RouteDecision::Redirect(Route::Login)
        );
        assert_eq!(
            guard(Route::Register, &snapshot(false, false)),
            RouteDecision::Render(Route::Register)
        );
    }

    #[test]
    fn signed_in_users_skip_login_views() {
        assert_eq!(
            guard(Route::Login, &snapshot(true, false)),
            RouteDecision::Redirect(Route::Dashboard)
        );
        assert_eq!(
            guard(Route::Notes, &snapshot(true, false)),
            RouteDecision::Render(Route::Notes)
        );
    }

    #[test]
    fn unknown_paths_resolve_to_dashboard() {
        assert_eq!(Route::from_path("/nowhere"), Route::Dashboard);
        assert_eq!(Route::from_path("/reminders/"), Route::Reminders);
        assert_eq!(Route::from_path(Route::Login.path()), Route::Login);
    }

    #[test]
    fn router_handle_publishes_navigation() {
        let router = RouterHandle::default();
        let rx = router.subscribe();
        router.navigate(Route::Login);
        assert_eq!(router.current(), Route::Login);
        assert_eq!(*rx.borrow(), Route::Login);
    }
}
