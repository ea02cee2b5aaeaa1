//! HTTP transport types shared by the request builder and the transports.
//!
//! # Design
//! Requests and responses are plain data. `ApiClient` builds `HttpRequest`
//! values and parses `HttpResponse` values without touching the network; a
//! `Transport` executes the round-trip in between. Authorization is layered
//! on top by `AuthorizedClient`, which only ever adds a header to an already
//! built request.

/// Name of the header carrying the bearer credential.
pub const AUTHORIZATION: &str = "authorization";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Look up a header value, ignoring the case of the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Attach `Authorization: Bearer <token>`, replacing any previous value.
    pub fn with_bearer(mut self, token: &str) -> Self {
        self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(AUTHORIZATION));
        self.headers
            .push((AUTHORIZATION.to_string(), format!("Bearer {token}")));
        self
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: "http://localhost:3000/api/todos".to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    #[test]
    fn with_bearer_adds_authorization_header() {
        let req = request().with_bearer("abc");
        assert_eq!(req.header("Authorization"), Some("Bearer abc"));
    }

    #[test]
    fn with_bearer_replaces_existing_value() {
        let req = request().with_bearer("old").with_bearer("new");
        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.header("authorization"), Some("Bearer new"));
    }

    #[test]
    fn success_range_is_2xx() {
        let mut resp = HttpResponse {
            status: 204,
            headers: Vec::new(),
            body: String::new(),
        };
        assert!(resp.is_success());
        resp.status = 401;
        assert!(!resp.is_success());
        assert!(resp.is_unauthorized());
    }
}
